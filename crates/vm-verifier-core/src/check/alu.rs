// SPDX-License-Identifier: GPL-2.0

//! ALU instruction verification
//!
//! Moves, scalar arithmetic on the bounds domain and pointer arithmetic.
//! 32-bit operations work on the zero-extended low halves of their operands
//! and zero-extend the result.

use crate::bounds::scalar::ScalarBounds;
use crate::check::{leak_or_unknown, read_reg};
use crate::core::error::{Result, VerifierError};
use crate::core::insn::*;
use crate::core::types::*;
use crate::platform::PlatformSpec;
use crate::state::reg_state::RegValue;
use crate::state::verifier_state::VerifierState;
use crate::stdlib::format;
use crate::verifier::env::VerifierEnv;

/// Check an ALU or ALU64 instruction and update the destination register
///
/// This is the entry point for both widths. It handles:
/// - MOV (register or immediate)
/// - NEG and END (byte swap)
/// - binary scalar operations
/// - `pointer +/- scalar`
pub fn check_alu<P: PlatformSpec>(
    env: &mut VerifierEnv<P>,
    state: &mut VerifierState,
    insn: &Insn,
    idx: usize,
) -> Result<()> {
    let is64 = insn.class() == VM_ALU64;
    let value = match insn.op() {
        VM_MOV => check_mov(env, state, insn, is64)?,
        VM_NEG | VM_END => check_unary(env, state, insn, is64)?,
        VM_ADD | VM_SUB | VM_MUL | VM_DIV | VM_OR | VM_AND | VM_LSH | VM_RSH | VM_MOD
        | VM_XOR | VM_ARSH => check_binary(env, state, insn, is64)?,
        _ => return Err(VerifierError::InvalidInstruction(idx)),
    };
    state.write_reg(insn.dst_reg as usize, &value);
    Ok(())
}

fn check_mov<P: PlatformSpec>(
    env: &mut VerifierEnv<P>,
    state: &mut VerifierState,
    insn: &Insn,
    is64: bool,
) -> Result<RegValue> {
    if !insn.src_is_reg() {
        let imm = if is64 {
            insn.imm as i64 as u64
        } else {
            insn.imm as u32 as u64
        };
        return Ok(RegValue::known(imm));
    }

    let src_reg = insn.src_reg as usize;
    let src = read_reg(env, state, insn.src_reg)?;
    if !is64 {
        if src.is_pointer() {
            return leak_or_unknown(
                env,
                format!("R{} partial copy of pointer", insn.src_reg),
            )
            .map(|_| RegValue::scalar(ScalarBounds::unknown_width(4)));
        }
        return Ok(RegValue::scalar(src.bounds.zext32()));
    }

    let mut value = src;
    if src.is_scalar() && !src.is_const() {
        // both registers now name the same unknown value
        if src.id == 0 {
            let id = env.new_id();
            state.cur_frame_mut().regs[src_reg].id = id;
            value.id = id;
        }
    }
    Ok(value)
}

fn check_unary<P: PlatformSpec>(
    env: &mut VerifierEnv<P>,
    state: &VerifierState,
    insn: &Insn,
    is64: bool,
) -> Result<RegValue> {
    let dst = read_reg(env, state, insn.dst_reg)?;
    if dst.is_pointer() {
        return leak_or_unknown(
            env,
            format!("R{} pointer arithmetic with {} prohibited", insn.dst_reg, op_name(insn.op())),
        );
    }
    let bounds = if insn.op() == VM_NEG {
        if is64 {
            dst.bounds.neg()
        } else {
            dst.bounds.zext32().neg().zext32()
        }
    } else {
        dst.bounds
            .byte_swap(insn.imm as u32, insn.code & VM_TO_BE != 0)
    };
    Ok(RegValue::scalar(bounds))
}

fn op_name(op: u8) -> &'static str {
    match op {
        VM_ADD => "+=",
        VM_SUB => "-=",
        VM_MUL => "*=",
        VM_DIV => "/=",
        VM_OR => "|=",
        VM_AND => "&=",
        VM_LSH => "<<=",
        VM_RSH => ">>=",
        VM_NEG => "neg",
        VM_MOD => "%=",
        VM_XOR => "^=",
        VM_ARSH => "s>>=",
        VM_END => "byte swap",
        _ => "?",
    }
}

fn check_binary<P: PlatformSpec>(
    env: &mut VerifierEnv<P>,
    state: &VerifierState,
    insn: &Insn,
    is64: bool,
) -> Result<RegValue> {
    let op = insn.op();
    let dst = read_reg(env, state, insn.dst_reg)?;
    let src = if insn.src_is_reg() {
        read_reg(env, state, insn.src_reg)?
    } else {
        RegValue::known(insn.imm as i64 as u64)
    };

    if dst.is_scalar() && src.is_scalar() {
        return Ok(RegValue::scalar(scalar_op(op, &dst.bounds, &src.bounds, is64)));
    }

    if !is64 {
        return leak_or_unknown(
            env,
            format!("R{} 32-bit pointer arithmetic prohibited", insn.dst_reg),
        );
    }

    match (op, dst.is_pointer(), src.is_pointer()) {
        (VM_ADD, true, false) => adjust_ptr(env, &dst, insn.dst_reg, &src, false),
        (VM_SUB, true, false) => adjust_ptr(env, &dst, insn.dst_reg, &src, true),
        (VM_ADD, false, true) => adjust_ptr(env, &src, insn.src_reg, &dst, false),
        (VM_SUB, false, true) => Err(VerifierError::InvalidPointerArithmetic(format!(
            "R{} tried to subtract pointer from scalar",
            insn.dst_reg
        ))),
        (VM_SUB, true, true) => leak_or_unknown(
            env,
            format!("R{} pointer -= pointer prohibited", insn.dst_reg),
        ),
        _ => leak_or_unknown(
            env,
            format!("R{} pointer arithmetic with {} operator prohibited", insn.dst_reg, op_name(op)),
        ),
    }
}

/// Compute `ptr +/- scalar`
/// 计算指针加减标量
///
/// A constant scalar moves the fixed offset and keeps everything else. A
/// variable scalar is folded into the variable part, which must stay within
/// `MAX_VAR_OFF`; packet pointers then get a fresh id and lose their proven
/// range, since their base is no longer shared with the checked pointer.
fn adjust_ptr<P: PlatformSpec>(
    env: &mut VerifierEnv<P>,
    ptr: &RegValue,
    regno: u8,
    scalar: &RegValue,
    is_sub: bool,
) -> Result<RegValue> {
    if !ptr.reg_type.allows_arithmetic() {
        return Err(VerifierError::InvalidPointerArithmetic(format!(
            "R{} pointer arithmetic on {} prohibited",
            regno,
            ptr.reg_type.name()
        )));
    }
    if ptr.may_be_null() {
        return Err(VerifierError::InvalidPointerArithmetic(format!(
            "R{} pointer arithmetic on {}_or_null prohibited, null-check it first",
            regno,
            ptr.reg_type.name()
        )));
    }

    let mut result = *ptr;
    if let Some(c) = scalar.const_value() {
        let c = c as i64;
        let off = if is_sub {
            (ptr.off as i64).checked_sub(c)
        } else {
            (ptr.off as i64).checked_add(c)
        };
        match off {
            Some(off) if off.abs() < MAX_VAR_OFF => result.off = off as i32,
            _ => {
                return Err(VerifierError::InvalidPointerArithmetic(format!(
                    "R{} offset is outside of the allowed range",
                    regno
                )))
            }
        }
        return Ok(result);
    }

    let s = &scalar.bounds;
    if s.smin_value <= -MAX_VAR_OFF || s.smax_value >= MAX_VAR_OFF {
        return Err(VerifierError::InvalidPointerArithmetic(format!(
            "R{} unbounded variable offset",
            regno
        )));
    }
    let var = if is_sub {
        ptr.bounds.sub(s)
    } else {
        ptr.bounds.add(s)
    };
    if var.smin_value <= -MAX_VAR_OFF || var.smax_value >= MAX_VAR_OFF {
        return Err(VerifierError::InvalidPointerArithmetic(format!(
            "R{} variable offset is outside of the allowed range",
            regno
        )));
    }
    result.bounds = var;
    if let RegType::PtrToPacket { .. } = result.reg_type {
        result.reg_type = RegType::PtrToPacket { range: 0 };
        result.id = env.new_id();
    }
    Ok(result)
}

/// Result bounds of a scalar operation
/// 标量运算的结果边界
pub fn scalar_op(op: u8, dst: &ScalarBounds, src: &ScalarBounds, is64: bool) -> ScalarBounds {
    let bits: u64 = if is64 { 64 } else { 32 };
    let (a, b) = if is64 {
        (*dst, *src)
    } else {
        (dst.zext32(), src.zext32())
    };
    let shift = b.as_const().filter(|s| *s < bits).map(|s| s as u32);
    let result = match op {
        VM_ADD => a.add(&b),
        VM_SUB => a.sub(&b),
        VM_MUL => a.mul(&b),
        VM_DIV => a.div(&b),
        VM_MOD => a.modulo(&b),
        VM_AND => a.and(&b),
        VM_OR => a.or(&b),
        VM_XOR => a.xor(&b),
        VM_LSH => match shift {
            Some(s) => a.lsh(s),
            None => ScalarBounds::unknown(),
        },
        VM_RSH => match shift {
            Some(s) => a.rsh(s),
            None => ScalarBounds::unknown(),
        },
        VM_ARSH => match shift {
            Some(s) if is64 => a.arsh(s),
            Some(s) => dst.sext32().arsh(s),
            None => ScalarBounds::unknown(),
        },
        _ => ScalarBounds::unknown(),
    };
    if is64 {
        result
    } else {
        result.zext32()
    }
}
