// SPDX-License-Identifier: GPL-2.0

//! Load/store instruction verification
//!
//! This module checks every memory access against the region the base
//! pointer proves: stack slots of some frame, a map value, a memory region,
//! an object, packet data or a context field. It also handles 64-bit
//! immediate loads.

use crate::analysis::liveness::mark_stack_read;
use crate::bounds::scalar::ScalarBounds;
use crate::check::{check_region, read_reg};
use crate::core::error::{Result, VerifierError};
use crate::core::insn::*;
use crate::core::types::*;
use crate::platform::{ContextProvider, CtxFieldKind, PlatformSpec};
use crate::state::reg_state::RegValue;
use crate::state::stack_state::{slot_of, SlotKind, StackRead, StackState};
use crate::state::verifier_state::VerifierState;
use crate::stdlib::format;
use crate::verifier::env::VerifierEnv;

/// Value written by a store
#[derive(Debug, Clone, Copy)]
enum StoreValue {
    /// STX: a register
    Reg(RegValue),
    /// ST: a sign-extended immediate
    Imm(i32),
}

impl StoreValue {
    fn is_pointer(&self) -> bool {
        matches!(self, StoreValue::Reg(v) if v.is_pointer())
    }

    fn as_value(&self) -> RegValue {
        match self {
            StoreValue::Reg(v) => *v,
            StoreValue::Imm(imm) => RegValue::known(*imm as i64 as u64),
        }
    }
}

/// Check LD_IMM64 at `idx`, whose second slot is `next`
pub fn check_ld_imm64<P: PlatformSpec>(
    env: &mut VerifierEnv<P>,
    state: &mut VerifierState,
    insn: &Insn,
    next: &Insn,
) -> Result<()> {
    let value = if insn.src_reg == VM_PSEUDO_MAP_FD {
        let map_id = insn.imm as u32;
        let map = env
            .platform
            .lookup_map(map_id)
            .ok_or(VerifierError::UnknownMap(map_id))?;
        RegValue::pointer(RegType::ConstPtrToMap(map.info()), 0)
    } else {
        let imm = (insn.imm as u32 as u64) | ((next.imm as u32 as u64) << 32);
        RegValue::known(imm)
    };
    state.write_reg(insn.dst_reg as usize, &value);
    Ok(())
}

/// Check LDX: `dst = *(size *)(src + off)`
pub fn check_load<P: PlatformSpec>(
    env: &mut VerifierEnv<P>,
    state: &mut VerifierState,
    insn: &Insn,
    _idx: usize,
) -> Result<()> {
    let ptr = read_reg(env, state, insn.src_reg)?;
    let size = insn.size_bytes();
    let off = insn.off as i64;
    check_ptr_usable(&ptr, insn.src_reg)?;

    let value = match ptr.reg_type {
        RegType::PtrToStack { frameno } => {
            let total = stack_offset(env, &ptr, insn.src_reg, off, size)?;
            read_stack(env, state, frameno as usize, total, size)?
        }
        RegType::PtrToMapValue(map) => {
            check_region(&ptr, insn.src_reg, off, size as u64, map.value_size, "map value")?;
            RegValue::scalar(ScalarBounds::unknown_width(size))
        }
        RegType::PtrToMem { size: region } => {
            check_region(&ptr, insn.src_reg, off, size as u64, region, "mem")?;
            RegValue::scalar(ScalarBounds::unknown_width(size))
        }
        RegType::PtrToObject { size: region, .. } => {
            check_region(&ptr, insn.src_reg, off, size as u64, region, "object")?;
            RegValue::scalar(ScalarBounds::unknown_width(size))
        }
        RegType::PtrToPacket { range } => {
            check_packet_access(&ptr, insn.src_reg, off, size, range)?;
            RegValue::scalar(ScalarBounds::unknown_width(size))
        }
        RegType::PtrToCtx => read_ctx(env, &ptr, insn.src_reg, off, size)?,
        _ => return Err(invalid_base(&ptr, insn.src_reg)),
    };
    state.write_reg(insn.dst_reg as usize, &value);
    Ok(())
}

/// Check ST and STX: `*(size *)(dst + off) = src`
pub fn check_store<P: PlatformSpec>(
    env: &mut VerifierEnv<P>,
    state: &mut VerifierState,
    insn: &Insn,
    idx: usize,
) -> Result<()> {
    let ptr = read_reg(env, state, insn.dst_reg)?;
    let value = if insn.class() == VM_STX {
        StoreValue::Reg(read_reg(env, state, insn.src_reg)?)
    } else {
        StoreValue::Imm(insn.imm)
    };
    let size = insn.size_bytes();
    let off = insn.off as i64;
    check_ptr_usable(&ptr, insn.dst_reg)?;

    if value.is_pointer() && !matches!(ptr.reg_type, RegType::PtrToStack { .. }) && !env.config.allow_ptr_leaks {
        return Err(VerifierError::PointerLeak(format!(
            "R{} leaks addr into {}",
            insn.src_reg,
            ptr.reg_type.name()
        )));
    }

    match ptr.reg_type {
        RegType::PtrToStack { frameno } => {
            let total = stack_offset(env, &ptr, insn.dst_reg, off, size)?;
            write_stack(env, state, frameno as usize, total, size, &value, idx)
        }
        RegType::PtrToMapValue(map) => {
            check_region(&ptr, insn.dst_reg, off, size as u64, map.value_size, "map value")
        }
        RegType::PtrToMem { size: region } => {
            if ptr.flags.contains(RegFlags::RDONLY) {
                return Err(VerifierError::InvalidMemoryAccess(format!(
                    "R{} cannot write into read-only mem",
                    insn.dst_reg
                )));
            }
            check_region(&ptr, insn.dst_reg, off, size as u64, region, "mem")
        }
        RegType::PtrToObject { .. } => Err(VerifierError::InvalidMemoryAccess(format!(
            "R{} cannot write into obj",
            insn.dst_reg
        ))),
        RegType::PtrToPacket { range } => {
            check_packet_access(&ptr, insn.dst_reg, off, size, range)
        }
        RegType::PtrToCtx => {
            if !ptr.has_fixed_offset() {
                return Err(variable_ctx_access(insn.dst_reg));
            }
            env.platform
                .context()
                .check_access(ptr.off as i64 + off, size, true)?;
            Ok(())
        }
        _ => Err(invalid_base(&ptr, insn.dst_reg)),
    }
}

fn check_ptr_usable(ptr: &RegValue, regno: u8) -> Result<()> {
    if ptr.is_pointer() && ptr.may_be_null() {
        return Err(VerifierError::InvalidMemoryAccess(format!(
            "R{} invalid mem access '{}_or_null'",
            regno,
            ptr.reg_type.name()
        )));
    }
    Ok(())
}

fn invalid_base(ptr: &RegValue, regno: u8) -> VerifierError {
    VerifierError::InvalidMemoryAccess(format!(
        "R{} invalid mem access '{}'",
        regno,
        ptr.reg_type.name()
    ))
}

fn variable_ctx_access(regno: u8) -> VerifierError {
    VerifierError::InvalidContextAccess(format!(
        "variable ctx access via R{} is prohibited",
        regno
    ))
}

/// Frame-pointer-relative offset of a stack access
/// 计算栈访问相对帧指针的偏移
fn stack_offset<P: PlatformSpec>(
    env: &VerifierEnv<P>,
    ptr: &RegValue,
    regno: u8,
    off: i64,
    size: u32,
) -> Result<i64> {
    if !ptr.has_fixed_offset() {
        return Err(VerifierError::InvalidMemoryAccess(format!(
            "variable stack access via R{} is prohibited",
            regno
        )));
    }
    let total = ptr.off as i64 + off;
    if total >= 0 || total < -(env.config.stack_budget as i64) || total + size as i64 > 0 {
        return Err(VerifierError::StackOutOfBounds(total));
    }
    if total % size as i64 != 0 {
        return Err(VerifierError::InvalidMemoryAccess(format!(
            "misaligned stack access off {} size {}",
            total, size
        )));
    }
    Ok(total)
}

fn read_stack<P: PlatformSpec>(
    env: &mut VerifierEnv<P>,
    state: &VerifierState,
    frame: usize,
    total: i64,
    size: u32,
) -> Result<RegValue> {
    let stack = &state
        .frames
        .get(frame)
        .ok_or_else(|| VerifierError::Internal(format!("no frame {}", frame)))?
        .stack;
    let read = stack.read(total, size as usize)?;
    for spi in StackState::slots_in_range(total, size as usize) {
        mark_stack_read(&mut env.arena, state, frame, spi);
    }
    Ok(match read {
        StackRead::Spilled(v) => v,
        StackRead::Zero => RegValue::known(0),
        StackRead::Misc => RegValue::scalar(ScalarBounds::unknown_width(size)),
    })
}

/// Store into the stack of `frame`
/// 写入栈
///
/// A full-width register store spills the register so it can be restored
/// with its kind intact. Anything else writes unstructured or zero bytes.
fn write_stack<P: PlatformSpec>(
    env: &mut VerifierEnv<P>,
    state: &mut VerifierState,
    frame: usize,
    total: i64,
    size: u32,
    value: &StoreValue,
    idx: usize,
) -> Result<()> {
    let size = size as usize;
    let (spi, byte) = slot_of(total);
    let target = state
        .frames
        .get(frame)
        .ok_or_else(|| VerifierError::Internal(format!("no frame {}", frame)))?;
    let slot = target.stack.get(spi).copied().unwrap_or_default();

    if value.is_pointer() && size != REG_SIZE {
        return Err(VerifierError::InvalidMemoryAccess(format!(
            "invalid size {} of register spill",
            size
        )));
    }
    if let StoreValue::Reg(v) = value {
        if let Some(f) = v.stack_frameno() {
            if (f as usize) > frame {
                return Err(VerifierError::InvalidMemoryAccess(format!(
                    "cannot spill pointer to stack of frame {} into frame {}",
                    f, frame
                )));
            }
        }
    }
    if !env.config.allow_ptr_leaks && slot.is_spill() && slot.spilled.is_pointer() && size != REG_SIZE {
        return Err(VerifierError::InvalidMemoryAccess(format!(
            "attempt to corrupt spilled pointer on stack at fp{}",
            total
        )));
    }

    // combined stack of the chain after this store
    let need = (-total) as usize;
    let frame_alloc = target.stack.allocated_stack().max(need.div_ceil(REG_SIZE) * REG_SIZE);
    let combined: usize = state
        .frames
        .iter()
        .enumerate()
        .map(|(i, f)| if i == frame { frame_alloc } else { f.stack.allocated_stack() })
        .sum();
    if combined > env.config.stack_budget as usize {
        return Err(VerifierError::StackBudgetExceeded {
            depth: combined as u32,
            budget: env.config.stack_budget,
        });
    }

    if env.config.explores_speculative() {
        let stale = slot.slot_type[byte..byte + size]
            .iter()
            .any(|k| !matches!(k, SlotKind::Misc | SlotKind::Zero));
        if value.is_pointer() || stale {
            env.mark_stack_spill(idx);
        }
    }

    let subprog = state.frames[frame].subprog;
    let stack = &mut state.frames[frame].stack;
    let v = value.as_value();
    match value {
        StoreValue::Reg(_) if size == REG_SIZE => stack.spill(spi, &v),
        StoreValue::Imm(imm) if *imm != 0 && size == REG_SIZE => stack.spill(spi, &v),
        _ => stack.write_bytes(total, size, v.const_value() == Some(0)),
    }
    env.update_stack_depth(subprog, frame_alloc as u32);
    Ok(())
}

pub(crate) fn check_packet_access(ptr: &RegValue, regno: u8, off: i64, size: u32, range: u32) -> Result<()> {
    let var = &ptr.bounds;
    if var.smin_value < 0 {
        return Err(VerifierError::InvalidMemoryAccess(format!(
            "R{} min value is negative, either use unsigned index or do a if (index >=0) check",
            regno
        )));
    }
    let total = ptr.off as i64 + off;
    if total < 0 || var.umax_value.saturating_add(total as u64) > MAX_PACKET_OFF {
        return Err(VerifierError::InvalidMemoryAccess(format!(
            "R{} offset is outside of the packet",
            regno
        )));
    }
    if total + size as i64 > range as i64 {
        return Err(VerifierError::InvalidMemoryAccess(format!(
            "invalid access to packet, off={} size={}, R{}(id={},off={},r={})",
            total, size, regno, ptr.id, ptr.off, range
        )));
    }
    Ok(())
}

fn read_ctx<P: PlatformSpec>(
    env: &VerifierEnv<P>,
    ptr: &RegValue,
    regno: u8,
    off: i64,
    size: u32,
) -> Result<RegValue> {
    if !ptr.has_fixed_offset() {
        return Err(variable_ctx_access(regno));
    }
    let field = env
        .platform
        .context()
        .check_access(ptr.off as i64 + off, size, false)?;
    Ok(match field.kind {
        CtxFieldKind::Scalar => RegValue::scalar(ScalarBounds::unknown_width(size)),
        CtxFieldKind::PacketStart => RegValue::pointer(RegType::PtrToPacket { range: 0 }, 0),
        CtxFieldKind::PacketEnd => RegValue::pointer(RegType::PtrToPacketEnd, 0),
    })
}
