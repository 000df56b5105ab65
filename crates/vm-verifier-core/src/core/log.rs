// SPDX-License-Identifier: GPL-2.0

//! Verbose logging for the verifier
//! 验证器详细日志
//!
//! The log is an explicit value owned by the verification run and passed to
//! whoever needs to write to it. It is bounded: once `max_size` would be
//! exceeded a single marker line is appended and further output is dropped.
//! 日志是有界的：超出容量时追加一行截断标记，之后的输出被丢弃。

use crate::core::insn::Insn;
use crate::core::types::*;
use crate::state::reg_state::RegValue;
use crate::state::stack_state::{SlotKind, StackSlot};
use crate::state::verifier_state::VerifierState;
use crate::stdlib::{format, String};
use core::fmt::Write;

/// Default log capacity in bytes
pub const DEFAULT_LOG_SIZE: usize = 1024 * 1024;

const TRUNCATED_MARKER: &str = "... log truncated ...\n";

/// Log level for verifier output
/// 日志级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum LogLevel {
    /// No logging
    #[default]
    Off = 0,
    /// Only the failure line
    Error = 1,
    /// Prune hits, calls and returns
    Info = 2,
    /// Branch pushes and pops, checkpoints
    Debug = 3,
    /// Every processed instruction with its register state
    Trace = 4,
}

/// Bounded verifier log buffer
/// 有界验证器日志缓冲区
#[derive(Debug, Clone, Default)]
pub struct VerifierLog {
    /// Log level threshold
    pub level: LogLevel,
    /// Log buffer
    pub buffer: String,
    /// Maximum buffer size
    pub max_size: usize,
    /// Whether output was dropped
    pub truncated: bool,
}

impl VerifierLog {
    /// Create a new log with the default capacity
    pub fn new(level: LogLevel) -> Self {
        Self::with_max_size(level, DEFAULT_LOG_SIZE)
    }

    /// Create a log with custom max size
    pub fn with_max_size(level: LogLevel, max_size: usize) -> Self {
        Self {
            level,
            buffer: String::new(),
            max_size,
            truncated: false,
        }
    }

    /// Check if logging is enabled at the given level
    pub fn enabled(&self, level: LogLevel) -> bool {
        level != LogLevel::Off && level <= self.level
    }

    /// Append one line at the given level
    pub fn log(&mut self, level: LogLevel, msg: &str) {
        if !self.enabled(level) || self.truncated {
            return;
        }
        if self.buffer.len() + msg.len() + 1 > self.max_size {
            self.truncated = true;
            self.buffer.push_str(TRUNCATED_MARKER);
            return;
        }
        self.buffer.push_str(msg);
        self.buffer.push('\n');
    }

    /// Log an error
    pub fn error(&mut self, msg: &str) {
        self.log(LogLevel::Error, msg);
    }

    /// Log info
    pub fn info(&mut self, msg: &str) {
        self.log(LogLevel::Info, msg);
    }

    /// Log debug
    pub fn debug(&mut self, msg: &str) {
        self.log(LogLevel::Debug, msg);
    }

    /// Log trace
    pub fn trace(&mut self, msg: &str) {
        self.log(LogLevel::Trace, msg);
    }

    /// Get the log contents
    pub fn contents(&self) -> &str {
        &self.buffer
    }

    /// Take the contents, leaving the log empty
    pub fn take(&mut self) -> String {
        core::mem::take(&mut self.buffer)
    }

    /// Get the current length of the log buffer
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the log buffer is empty
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

// ============================================================================
// Formatters
// 格式化
// ============================================================================

fn fmt_bounds(s: &mut String, v: &RegValue) {
    let b = &v.bounds;
    let _ = write!(
        s,
        "smin={},smax={},umin={},umax={},var_off=({:#x}; {:#x})",
        b.smin_value, b.smax_value, b.umin_value, b.umax_value, b.var_off.value, b.var_off.mask
    );
}

/// Format one abstract value without the register name
pub fn fmt_value(v: &RegValue) -> String {
    let mut s = String::new();
    match v.reg_type {
        RegType::NotInit => s.push_str("<not_init>"),
        RegType::Scalar => match v.const_value() {
            Some(c) => {
                let _ = write!(s, "{}", c as i64);
            }
            None => {
                s.push_str("scalar(");
                if v.id != 0 {
                    let _ = write!(s, "id={},", v.id);
                }
                fmt_bounds(&mut s, v);
                s.push(')');
            }
        },
        t => {
            s.push_str(t.name());
            if v.may_be_null() {
                s.push_str("_or_null");
            }
            let _ = write!(s, "(");
            if v.id != 0 {
                let _ = write!(s, "id={},", v.id);
            }
            let _ = write!(s, "off={}", v.off);
            match t {
                RegType::ConstPtrToMap(m) | RegType::PtrToMapValue(m) => {
                    let _ = write!(s, ",map={},ks={},vs={}", m.map_id, m.key_size, m.value_size);
                }
                RegType::PtrToStack { frameno } => {
                    let _ = write!(s, ",frame={}", frameno);
                }
                RegType::PtrToPacket { range } => {
                    let _ = write!(s, ",r={}", range);
                }
                RegType::PtrToMem { size } => {
                    let _ = write!(s, ",size={}", size);
                }
                RegType::PtrToObject { type_id, size } => {
                    let _ = write!(s, ",type={},size={}", type_id, size);
                }
                _ => {}
            }
            if !v.has_fixed_offset() {
                s.push(',');
                fmt_bounds(&mut s, v);
            }
            s.push(')');
        }
    }
    s
}

/// Format a register for logging, e.g. `R1=ctx(off=0)`
pub fn fmt_reg(reg: &RegValue, regno: usize) -> String {
    format!("R{}={}", regno, fmt_value(reg))
}

fn fmt_slot(s: &mut String, slot: &StackSlot, spi: usize) {
    let _ = write!(s, " fp-{}=", (spi + 1) * REG_SIZE);
    if slot.is_spill() {
        s.push_str(&fmt_value(&slot.spilled));
        return;
    }
    // highest address first, matching how the bytes sit below fp
    for kind in slot.slot_type.iter().rev() {
        s.push(match kind {
            SlotKind::Invalid => '?',
            SlotKind::Spill => 'r',
            SlotKind::Misc => 'm',
            SlotKind::Zero => '0',
        });
    }
}

/// Format all frames of a state: initialized registers and written stack slots
/// 格式化状态：所有栈帧中已初始化的寄存器和已写入的栈槽
pub fn fmt_state(state: &VerifierState) -> String {
    let mut s = String::new();
    if state.speculative {
        s.push_str("(speculative) ");
    }
    for (i, frame) in state.frames.iter().enumerate() {
        if i > 0 {
            s.push_str(" | ");
        }
        let _ = write!(s, "frame{}:", frame.frameno);
        for (r, reg) in frame.regs.iter().enumerate() {
            if reg.is_init() {
                s.push(' ');
                s.push_str(&fmt_reg(reg, r));
            }
        }
        for (spi, slot) in frame.stack.slots.iter().enumerate() {
            if slot.is_valid() {
                fmt_slot(&mut s, slot, spi);
            }
        }
        for r in frame.refs.iter() {
            let _ = write!(s, " refs={}@{}", r.id, r.insn_idx);
        }
    }
    s
}

/// Format an instruction with its index, e.g. `3: add r0, r2`
pub fn fmt_insn(insn: &Insn, idx: usize) -> String {
    format!("{}: {}", idx, insn)
}

// ============================================================================
// Event helpers
// 事件日志
// ============================================================================

/// Log an instruction about to be processed, with the state it sees
pub fn log_insn(log: &mut VerifierLog, insn: &Insn, idx: usize, state: &VerifierState) {
    if !log.enabled(LogLevel::Trace) {
        return;
    }
    let msg = format!("{} ; {}", fmt_insn(insn, idx), fmt_state(state));
    log.trace(&msg);
}

/// Log a deferred branch successor
pub fn log_state_push(log: &mut VerifierLog, from: usize, target: usize, depth: usize, speculative: bool) {
    if !log.enabled(LogLevel::Debug) {
        return;
    }
    let msg = format!(
        "{}: push {}state for {}, pending={}",
        from,
        if speculative { "speculative " } else { "" },
        target,
        depth
    );
    log.debug(&msg);
}

/// Log resuming a deferred state
pub fn log_state_pop(log: &mut VerifierLog, idx: usize, depth: usize) {
    if !log.enabled(LogLevel::Debug) {
        return;
    }
    let msg = format!("from pending: resume at {}, pending={}", idx, depth);
    log.debug(&msg);
}

/// Log a new checkpoint
pub fn log_checkpoint(log: &mut VerifierLog, idx: usize, id: usize) {
    if !log.enabled(LogLevel::Debug) {
        return;
    }
    let msg = format!("{}: checkpoint #{}", idx, id);
    log.debug(&msg);
}

/// Log the failure of a path
pub fn log_error(log: &mut VerifierLog, idx: usize, error: &str) {
    let msg = format!("{}: ERROR: {}", idx, error);
    log.error(&msg);
}

/// Log a path ended by a cache hit
pub fn log_prune(log: &mut VerifierLog, idx: usize, id: usize) {
    if !log.enabled(LogLevel::Info) {
        return;
    }
    let msg = format!("{}: safe (covered by checkpoint #{})", idx, id);
    log.info(&msg);
}

/// Log a helper or subprogram call
pub fn log_call(log: &mut VerifierLog, idx: usize, insn: &Insn, frame_depth: usize) {
    if !log.enabled(LogLevel::Info) {
        return;
    }
    let msg = if insn.is_pseudo_call() {
        format!("{}: call pc{:+}, frame depth {}", idx, insn.imm, frame_depth)
    } else {
        format!("{}: helper call #{}", idx, insn.imm)
    };
    log.info(&msg);
}

/// Log a return from a subprogram
pub fn log_return(log: &mut VerifierLog, idx: usize, frameno: usize, callsite: usize) {
    if !log.enabled(LogLevel::Info) {
        return;
    }
    let msg = format!("{}: return from frame {} to {}", idx, frameno, callsite + 1);
    log.info(&msg);
}

/// Log a speculative path ended at an instruction that will get a barrier
pub fn log_nospec(log: &mut VerifierLog, idx: usize, error: &str) {
    if !log.enabled(LogLevel::Info) {
        return;
    }
    let msg = format!("{}: speculative path ended, barrier needed ({})", idx, error);
    log.info(&msg);
}
