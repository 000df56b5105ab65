// SPDX-License-Identifier: GPL-2.0

//! Register and stack liveness propagation
//! 寄存器与栈的活跃性传播
//!
//! Every register value and stack slot carries a `parent` link to the same
//! location in the checkpoint it was inherited from. A read of a value that
//! the current state has not itself written marks the parent location READ,
//! then that location's parent, and so on, stopping at the first checkpoint
//! in which the location was WRITTEN (the value above it is no longer the one
//! being read) or at one already marked READ.
//!
//! 读取标记沿 `parent` 链向上传播，在写入该位置的检查点处停止。
//! 写入标记只属于执行写入的状态，从不向上传播。

use crate::core::types::*;
use crate::state::reg_state::RegValue;
use crate::state::verifier_state::{StateArena, StateId, VerifierState};
use crate::stdlib::Vec;

/// A location inside a frame
/// 栈帧内的位置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LiveSlot {
    /// Register number
    Reg(usize),
    /// Stack slot index
    Stack(usize),
}

fn value_at(state: &mut VerifierState, frame: usize, slot: LiveSlot) -> Option<&mut RegValue> {
    let f = state.frames.get_mut(frame)?;
    match slot {
        LiveSlot::Reg(r) => f.regs.get_mut(r),
        LiveSlot::Stack(spi) => f.stack.slots.get_mut(spi).map(|s| &mut s.spilled),
    }
}

/// Record that `value`, found at `frame`/`slot` of the current state, was read
///
/// Returns the number of checkpoint locations newly marked.
pub fn mark_read(arena: &mut StateArena, value: &RegValue, frame: usize, slot: LiveSlot) -> usize {
    if value.live.contains(Liveness::WRITTEN) {
        return 0;
    }
    let mut marked = 0;
    let mut next = value.parent;
    while let Some(id) = next {
        let Some(v) = arena
            .get_mut(id)
            .and_then(|n| value_at(&mut n.state, frame, slot))
        else {
            break;
        };
        if v.live.contains(Liveness::READ) {
            break;
        }
        v.live |= Liveness::READ;
        marked += 1;
        if v.live.contains(Liveness::WRITTEN) {
            break;
        }
        next = v.parent;
    }
    marked
}

/// Record a read of register `r` in the innermost frame of `state`
pub fn mark_reg_read(arena: &mut StateArena, state: &VerifierState, r: usize) -> usize {
    let frame = state.curframe();
    mark_read(arena, state.reg(r), frame, LiveSlot::Reg(r))
}

/// Record a read of stack slot `spi` of frame `frame`
pub fn mark_stack_read(arena: &mut StateArena, state: &VerifierState, frame: usize, spi: usize) -> usize {
    match state.frames.get(frame).and_then(|f| f.stack.get(spi)) {
        Some(slot) => mark_read(arena, &slot.spilled, frame, LiveSlot::Stack(spi)),
        None => 0,
    }
}

/// A path was pruned by checkpoint `old`: everything `old`'s descendants read
/// is read by the pruned path too
/// 路径被检查点 `old` 剪枝：把 `old` 的读取标记传给当前路径的祖先
pub fn propagate_liveness(arena: &mut StateArena, old: StateId, cur: &VerifierState) -> usize {
    let Some(node) = arena.get(old) else {
        return 0;
    };
    let mut reads = Vec::new();
    for (f, frame) in node.state.frames.iter().enumerate() {
        for (r, reg) in frame.regs.iter().enumerate() {
            if reg.live.contains(Liveness::READ) {
                reads.push((f, LiveSlot::Reg(r)));
            }
        }
        for (spi, slot) in frame.stack.slots.iter().enumerate() {
            if slot.spilled.live.contains(Liveness::READ) {
                reads.push((f, LiveSlot::Stack(spi)));
            }
        }
    }

    let mut marked = 0;
    for (f, slot) in reads {
        let value = cur.frames.get(f).and_then(|frame| match slot {
            LiveSlot::Reg(r) => frame.regs.get(r),
            LiveSlot::Stack(spi) => frame.stack.get(spi).map(|s| &s.spilled),
        });
        if let Some(value) = value {
            marked += mark_read(arena, value, f, slot);
        }
    }
    marked
}
