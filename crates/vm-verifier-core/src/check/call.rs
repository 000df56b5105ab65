// SPDX-License-Identifier: GPL-2.0

//! Calls and returns
//! 调用与返回
//!
//! Helper calls are checked against the platform's signature for the helper
//! id, subprogram calls push a new frame, and EXIT either pops a frame or
//! ends the program.

use crate::analysis::liveness::{mark_reg_read, mark_stack_read};
use crate::check::load_store::check_packet_access;
use crate::check::{check_region, read_reg};
use crate::core::error::{Result, VerifierError};
use crate::core::insn::Insn;
use crate::core::log::{log_call, log_return};
use crate::core::types::*;
use crate::platform::{HelperDef, HelperProvider, MapProvider, PlatformSpec};
use crate::state::frame::Frame;
use crate::state::reg_state::RegValue;
use crate::state::stack_state::StackState;
use crate::state::verifier_state::VerifierState;
use crate::stdlib::{format, String, ToString};
use crate::verifier::env::VerifierEnv;

/// What an EXIT does to the current path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitAction {
    /// Speculative path finished
    PathEnd,
    /// The entry function returned
    ProgramExit,
    /// Returned into the caller; continue at this index
    Return(usize),
}

/// Facts gathered from earlier arguments of one helper call
#[derive(Debug, Default)]
struct ArgMeta {
    map: Option<MapInfo>,
    mem: Option<(u8, RegValue)>,
    alloc_size: Option<u64>,
}

fn arg_name(arg: ArgType) -> &'static str {
    match arg {
        ArgType::DontCare | ArgType::Anything => "anything",
        ArgType::Scalar | ArgType::ConstSize | ArgType::ConstAllocSize => "scalar",
        ArgType::ConstMapPtr => "map_ptr",
        ArgType::PtrToMapKey | ArgType::PtrToMapValue | ArgType::PtrToMem => {
            "fp, pkt, map_value or mem"
        }
        ArgType::PtrToCtx => "ctx",
        ArgType::PtrToSocket => "sock",
        ArgType::PtrToAllocMem => "mem",
        ArgType::PtrToObject => "obj",
    }
}

fn type_name(reg: &RegValue) -> String {
    if reg.is_pointer() && reg.may_be_null() {
        format!("{}_or_null", reg.reg_type.name())
    } else {
        reg.reg_type.name().to_string()
    }
}

fn mismatch(arg: ArgType, reg: &RegValue) -> VerifierError {
    VerifierError::TypeMismatch {
        expected: arg_name(arg).to_string(),
        got: type_name(reg),
    }
}

/// Check that `size` bytes behind `reg` may be read by a helper
/// 检查辅助函数可读取的内存
fn check_helper_mem_access<P: PlatformSpec>(
    env: &mut VerifierEnv<P>,
    state: &VerifierState,
    arg: ArgType,
    regno: u8,
    reg: &RegValue,
    size: u64,
) -> Result<()> {
    if reg.may_be_null() {
        return Err(mismatch(arg, reg));
    }
    match reg.reg_type {
        RegType::PtrToStack { frameno } => {
            if !reg.has_fixed_offset() {
                return Err(VerifierError::InvalidMemoryAccess(format!(
                    "variable stack access via R{} is prohibited",
                    regno
                )));
            }
            let off = reg.off as i64;
            if off >= 0 || off < -(env.config.stack_budget as i64) || off + size as i64 > 0 {
                return Err(VerifierError::StackOutOfBounds(off));
            }
            let frame = frameno as usize;
            let initialized = state
                .frames
                .get(frame)
                .is_some_and(|f| f.stack.is_range_initialized(off, size as usize));
            if !initialized {
                return Err(VerifierError::InvalidMemoryAccess(format!(
                    "invalid indirect read from stack R{} off {}+0 size {}",
                    regno, off, size
                )));
            }
            for spi in StackState::slots_in_range(off, size as usize) {
                mark_stack_read(&mut env.arena, state, frame, spi);
            }
            Ok(())
        }
        RegType::PtrToMapValue(map) => check_region(reg, regno, 0, size, map.value_size, "map value"),
        RegType::PtrToMem { size: region } => check_region(reg, regno, 0, size, region, "mem"),
        RegType::PtrToPacket { range } => check_packet_access(reg, regno, 0, size as u32, range),
        _ => Err(mismatch(arg, reg)),
    }
}

fn check_arg<P: PlatformSpec>(
    env: &mut VerifierEnv<P>,
    state: &VerifierState,
    arg: ArgType,
    regno: u8,
    reg: &RegValue,
    meta: &mut ArgMeta,
) -> Result<()> {
    match arg {
        ArgType::DontCare => Ok(()),
        ArgType::Anything => {
            if reg.is_pointer() && !env.config.allow_ptr_leaks {
                return Err(VerifierError::PointerLeak(format!(
                    "R{} leaks addr into helper function",
                    regno
                )));
            }
            Ok(())
        }
        ArgType::Scalar => {
            if !reg.is_scalar() {
                return Err(mismatch(arg, reg));
            }
            Ok(())
        }
        ArgType::ConstMapPtr => match reg.reg_type {
            RegType::ConstPtrToMap(info) => {
                meta.map = Some(info);
                Ok(())
            }
            _ => Err(mismatch(arg, reg)),
        },
        ArgType::PtrToMapKey | ArgType::PtrToMapValue => {
            let map = meta.map.ok_or_else(|| {
                VerifierError::InvalidHelperCall(format!(
                    "invalid map_ptr to access map->{}",
                    if arg == ArgType::PtrToMapKey { "key" } else { "value" }
                ))
            })?;
            let size = if arg == ArgType::PtrToMapKey {
                map.key_size
            } else {
                map.value_size
            };
            check_helper_mem_access(env, state, arg, regno, reg, size as u64)
        }
        ArgType::PtrToMem => {
            if !matches!(
                reg.reg_type,
                RegType::PtrToStack { .. }
                    | RegType::PtrToMapValue(_)
                    | RegType::PtrToMem { .. }
                    | RegType::PtrToPacket { .. }
            ) || reg.may_be_null()
            {
                return Err(mismatch(arg, reg));
            }
            meta.mem = Some((regno, *reg));
            Ok(())
        }
        ArgType::ConstSize => {
            if !reg.is_scalar() {
                return Err(mismatch(arg, reg));
            }
            let b = &reg.bounds;
            if b.smin_value < 0 {
                return Err(VerifierError::InvalidMemoryAccess(format!(
                    "R{} min value is negative, either use unsigned or 'var &= const'",
                    regno
                )));
            }
            if b.umin_value == 0 {
                return Err(VerifierError::InvalidMemoryAccess(format!(
                    "invalid zero-sized read via R{}",
                    regno
                )));
            }
            if b.umax_value >= MAX_VAR_OFF as u64 {
                return Err(VerifierError::InvalidMemoryAccess(format!(
                    "R{} unbounded memory access, use 'var &= const' or 'if (var < const)'",
                    regno
                )));
            }
            let (mem_regno, mem) = meta.mem.take().ok_or_else(|| {
                VerifierError::InvalidHelperCall(format!("size argument R{} has no buffer", regno))
            })?;
            check_helper_mem_access(env, state, ArgType::PtrToMem, mem_regno, &mem, b.umax_value)
        }
        ArgType::ConstAllocSize => match reg.const_value() {
            Some(size) if reg.is_scalar() && size > 0 => {
                meta.alloc_size = Some(size);
                Ok(())
            }
            _ => Err(VerifierError::InvalidHelperCall(format!(
                "R{} is not a known constant",
                regno
            ))),
        },
        ArgType::PtrToCtx => {
            if reg.reg_type != RegType::PtrToCtx {
                return Err(mismatch(arg, reg));
            }
            if reg.off != 0 || !reg.has_fixed_offset() {
                return Err(VerifierError::InvalidContextAccess(format!(
                    "dereference of modified ctx ptr R{} off={} disallowed",
                    regno, reg.off
                )));
            }
            Ok(())
        }
        ArgType::PtrToSocket => match reg.reg_type {
            RegType::PtrToSocket if !reg.may_be_null() => Ok(()),
            _ => Err(mismatch(arg, reg)),
        },
        ArgType::PtrToAllocMem => match reg.reg_type {
            RegType::PtrToMem { .. } if !reg.may_be_null() && reg.off == 0 && reg.has_fixed_offset() => Ok(()),
            _ => Err(mismatch(arg, reg)),
        },
        ArgType::PtrToObject => match reg.reg_type {
            RegType::PtrToObject { .. } if !reg.may_be_null() => Ok(()),
            _ => Err(mismatch(arg, reg)),
        },
    }
}

/// R0 after a helper returning `ret`
fn return_value<P: PlatformSpec>(env: &VerifierEnv<P>, def: &HelperDef, meta: &ArgMeta) -> Result<RegValue> {
    let (reg_type, nullable) = match def.ret_type {
        RetType::Integer => return Ok(RegValue::unknown_scalar()),
        RetType::Void => return Ok(RegValue::not_init()),
        RetType::MapValueOrNull => {
            let map = meta.map.ok_or_else(|| {
                VerifierError::InvalidHelperCall(format!("{} returns a map value without a map", def.name))
            })?;
            (RegType::PtrToMapValue(map), true)
        }
        RetType::SocketOrNull => (RegType::PtrToSocket, true),
        RetType::MemOrNull => {
            let size = meta.alloc_size.ok_or_else(|| {
                VerifierError::InvalidHelperCall(format!("{} returns memory without a size", def.name))
            })?;
            (RegType::PtrToMem { size: size as u32 }, true)
        }
        RetType::Object(type_id) | RetType::ObjectOrNull(type_id) => {
            let ty = env.platform.lookup_type(type_id).ok_or_else(|| {
                VerifierError::InvalidHelperCall(format!("unknown object type {}", type_id))
            })?;
            (
                RegType::PtrToObject {
                    type_id,
                    size: ty.size,
                },
                def.ret_type.may_be_null(),
            )
        }
    };
    let mut value = RegValue::pointer(reg_type, 0);
    if nullable {
        value.flags |= RegFlags::MAYBE_NULL;
    }
    Ok(value)
}

/// Check a call to a platform helper
/// 检查辅助函数调用
///
/// All arguments and the return kind are validated before anything in
/// `state` changes. Afterwards released handles are dropped along with every
/// copy of them, R0-R5 are clobbered and R0 takes the return kind.
pub fn check_helper_call<P: PlatformSpec>(
    env: &mut VerifierEnv<P>,
    state: &mut VerifierState,
    insn: &Insn,
    idx: usize,
) -> Result<()> {
    let func_id = insn.imm as u32;
    let def = env.platform.helper().validate_call(func_id)?.clone();

    let mut meta = ArgMeta::default();
    for (i, arg) in def.arg_types.iter().take(def.arg_count()).enumerate() {
        let regno = (i + 1) as u8;
        let reg = read_reg(env, state, regno)?;
        check_arg(env, state, *arg, regno, &reg, &mut meta)?;
    }

    if let Some(info) = meta.map {
        if let Some(map) = env.platform.lookup_map(info.map_id) {
            env.platform.map().check_map_helper(map, func_id)?;
        }
    }

    let released = match def.release_arg() {
        Some(arg) => {
            let id = state.reg(arg + 1).id;
            let frame = state
                .find_ref_frame(id)
                .filter(|_| id != 0)
                .ok_or(VerifierError::InvalidReference(id))?;
            Some((frame, id))
        }
        None => None,
    };

    let mut r0 = return_value(env, &def, &meta)?;

    if let Some((frame, id)) = released {
        state.frames[frame].refs.release(id);
        let replacement = if env.config.allow_ptr_leaks {
            RegValue::unknown_scalar()
        } else {
            RegValue::not_init()
        };
        state.for_each_value_mut(|v| {
            if v.id == id {
                v.assign(&replacement);
            }
        });
    }

    state.cur_frame_mut().clobber_caller_saved();
    if r0.may_be_null() || def.acquires_ref() {
        r0.id = env.new_id();
    }
    state.write_reg(0, &r0);
    if def.acquires_ref() {
        state.cur_frame_mut().refs.acquire(r0.id, idx);
    }
    env.stats.helper_calls += 1;
    Ok(())
}

/// Check a call to a subprogram and enter it
/// 检查子程序调用并进入被调函数
///
/// Returns the index of the callee's first instruction.
pub fn check_subprog_call<P: PlatformSpec>(
    env: &mut VerifierEnv<P>,
    state: &mut VerifierState,
    insn: &Insn,
    idx: usize,
) -> Result<usize> {
    let target = insn.call_target(idx) as usize;
    let callee = env
        .layout
        .subprog_starting_at(target)
        .ok_or_else(|| VerifierError::Internal(format!("call to {} is not a function start", target)))?;

    let depth = state.frames.len();
    if depth >= env.config.max_call_depth {
        return Err(VerifierError::CallStackOverflow(depth + 1));
    }
    if state.frames.iter().any(|f| f.subprog == callee) {
        return Err(VerifierError::RecursiveCall(target));
    }

    let used: usize = state.frames.iter().map(|f| f.stack.allocated_stack()).sum();
    let total = used as u32 + env.stack_depth_of(callee);
    if total > env.config.stack_budget {
        return Err(VerifierError::StackBudgetExceeded {
            depth: total,
            budget: env.config.stack_budget,
        });
    }

    for r in 1..=5 {
        mark_reg_read(&mut env.arena, state, r);
    }
    env.record_call(state.cur_frame().subprog, callee);

    let mut frame = Frame::new(idx, depth as u32, callee);
    for r in 1..=5 {
        let mut arg = *state.reg(r);
        arg.parent = None;
        arg.live = Liveness::empty();
        frame.regs[r] = arg;
    }
    state.frames.push(frame);

    env.stats.note_call_depth(state.frames.len());
    log_call(&mut env.log, idx, insn, state.frames.len());
    Ok(target)
}

/// Check EXIT
/// 检查 EXIT 指令
pub fn check_exit<P: PlatformSpec>(
    env: &mut VerifierEnv<P>,
    state: &mut VerifierState,
    idx: usize,
) -> Result<ExitAction> {
    let r0 = read_reg(env, state, 0)?;
    if state.speculative {
        return Ok(ExitAction::PathEnd);
    }
    state.cur_frame().refs.check_released()?;

    if state.frames.len() == 1 {
        if r0.is_pointer() && !env.config.allow_ptr_leaks {
            return Err(VerifierError::PointerLeak(String::from(
                "R0 leaks addr as return value",
            )));
        }
        return Ok(ExitAction::ProgramExit);
    }

    let frameno = state.curframe() as u32;
    if r0.stack_frameno() == Some(frameno) {
        return Err(VerifierError::InvalidReturn(format!(
            "cannot return stack pointer to the caller (frame {})",
            frameno
        )));
    }

    let callsite = state.cur_frame().callsite;
    state.frames.pop();
    let caller = state.cur_frame_mut();
    caller.write_reg(0, &r0);
    for r in 1..=5 {
        caller.write_reg(r, &RegValue::not_init());
    }
    log_return(&mut env.log, idx, frameno as usize, callsite);
    Ok(ExitAction::Return(callsite + 1))
}
