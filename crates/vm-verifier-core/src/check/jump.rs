// SPDX-License-Identifier: GPL-2.0

//! Conditional jump verification
//!
//! Decides which directions of a conditional jump are feasible and narrows
//! the operands on each feasible direction: range refinement for scalars,
//! null checks for `*_or_null` pointers and packet range proofs for
//! `pkt` against `pkt_end` comparisons.

use crate::bounds::scalar::ScalarBounds;
use crate::bounds::tnum::Tnum;
use crate::check::read_reg;
use crate::core::error::{Result, VerifierError};
use crate::core::insn::*;
use crate::core::types::*;
use crate::platform::PlatformSpec;
use crate::state::reg_state::RegValue;
use crate::state::verifier_state::VerifierState;
use crate::stdlib::{format, Box};
use crate::verifier::env::VerifierEnv;

/// Feasible directions of a conditional jump
/// 条件跳转的可行方向
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JumpDecision {
    /// Only the fall-through direction is feasible
    FallThrough,
    /// Only the taken direction is feasible
    Taken,
    /// Both are feasible; the boxed state is the taken successor and the
    /// current state has been narrowed for the fall-through
    Both(Box<VerifierState>),
    /// Neither is; no concrete value reaches this jump
    Infeasible,
}

/// Check a conditional jump
///
/// For [`JumpDecision::FallThrough`] and [`JumpDecision::Taken`] the current
/// state has already been narrowed for the single surviving direction.
pub fn check_cond_jmp<P: PlatformSpec>(
    env: &mut VerifierEnv<P>,
    state: &mut VerifierState,
    insn: &Insn,
    _idx: usize,
) -> Result<JumpDecision> {
    let is32 = insn.class() == VM_JMP32;
    let op = insn.op();
    let dst = read_reg(env, state, insn.dst_reg)?;
    let src = if insn.src_is_reg() {
        read_reg(env, state, insn.src_reg)?
    } else {
        RegValue::known(insn.imm as i64 as u64)
    };

    if dst.is_pointer() || src.is_pointer() {
        return check_ptr_cmp(env, state, insn, &dst, &src, is32);
    }

    let signed = matches!(op, VM_JSGT | VM_JSGE | VM_JSLT | VM_JSLE);
    let (a, b) = if is32 {
        (view32(&dst.bounds, signed), view32(&src.bounds, signed))
    } else {
        (dst.bounds, src.bounds)
    };

    match is_branch_taken(op, &a, &b) {
        Some(true) => return Ok(JumpDecision::Taken),
        Some(false) => return Ok(JumpDecision::FallThrough),
        None => {}
    }

    let (ta, tb) = refine(op, &a, &b, true);
    let (fa, fb) = refine(op, &a, &b, false);
    let taken_live = ta.is_sane() && tb.is_sane();
    let fall_live = fa.is_sane() && fb.is_sane();

    // a 32-bit comparison says something about the whole register only
    // when the whole register fits in the compared half
    let apply = !is32
        || (dst.bounds.umax_value <= i32::MAX as u64 && src.bounds.umax_value <= i32::MAX as u64);
    let src_reg = insn.src_is_reg().then_some(insn.src_reg as usize);
    let dst_reg = insn.dst_reg as usize;

    match (taken_live, fall_live) {
        (true, true) => {
            let mut taken = Box::new(state.clone());
            if apply {
                narrow(&mut taken, dst_reg, src_reg, &ta, &tb);
                narrow(state, dst_reg, src_reg, &fa, &fb);
            }
            Ok(JumpDecision::Both(taken))
        }
        (true, false) => {
            if apply {
                narrow(state, dst_reg, src_reg, &ta, &tb);
            }
            Ok(JumpDecision::Taken)
        }
        (false, true) => {
            if apply {
                narrow(state, dst_reg, src_reg, &fa, &fb);
            }
            Ok(JumpDecision::FallThrough)
        }
        // no value satisfies either outcome, so nothing reaches here
        (false, false) => Ok(JumpDecision::Infeasible),
    }
}

fn view32(b: &ScalarBounds, signed: bool) -> ScalarBounds {
    if signed {
        b.sext32()
    } else {
        b.zext32()
    }
}

/// Statically known direction of `a op b`, if any
/// 判断分支方向是否静态可知
pub fn is_branch_taken(op: u8, a: &ScalarBounds, b: &ScalarBounds) -> Option<bool> {
    match op {
        VM_JEQ => {
            if a.is_const() && b.is_const() {
                Some(a.as_const() == b.as_const())
            } else if a.is_disjoint(b) {
                Some(false)
            } else {
                None
            }
        }
        VM_JNE => is_branch_taken(VM_JEQ, a, b).map(|t| !t),
        VM_JSET => {
            if a.var_off.value & b.var_off.value != 0 {
                Some(true)
            } else if (a.var_off.value | a.var_off.mask) & (b.var_off.value | b.var_off.mask) == 0 {
                Some(false)
            } else {
                None
            }
        }
        VM_JGT => {
            if a.umin_value > b.umax_value {
                Some(true)
            } else if a.umax_value <= b.umin_value {
                Some(false)
            } else {
                None
            }
        }
        VM_JGE => {
            if a.umin_value >= b.umax_value {
                Some(true)
            } else if a.umax_value < b.umin_value {
                Some(false)
            } else {
                None
            }
        }
        VM_JLT => is_branch_taken(VM_JGT, b, a),
        VM_JLE => is_branch_taken(VM_JGE, b, a),
        VM_JSGT => {
            if a.smin_value > b.smax_value {
                Some(true)
            } else if a.smax_value <= b.smin_value {
                Some(false)
            } else {
                None
            }
        }
        VM_JSGE => {
            if a.smin_value >= b.smax_value {
                Some(true)
            } else if a.smax_value < b.smin_value {
                Some(false)
            } else {
                None
            }
        }
        VM_JSLT => is_branch_taken(VM_JSGT, b, a),
        VM_JSLE => is_branch_taken(VM_JSGE, b, a),
        _ => None,
    }
}

fn finish(mut b: ScalarBounds) -> ScalarBounds {
    if b.is_sane() {
        b.sync();
    }
    b
}

/// Mark `b` as admitting no value
fn dead(mut b: ScalarBounds) -> ScalarBounds {
    b.umin_value = 1;
    b.umax_value = 0;
    b
}

/// Drop the single value `c` from `b` where it sits on a range edge
fn exclude(b: &ScalarBounds, c: u64) -> ScalarBounds {
    if b.as_const() == Some(c) {
        return dead(*b);
    }
    let mut r = *b;
    if r.umin_value == c {
        r.umin_value = c.wrapping_add(1);
    }
    if r.umax_value == c {
        r.umax_value = c.wrapping_sub(1);
    }
    if r.smin_value == c as i64 {
        r.smin_value = (c as i64).wrapping_add(1);
    }
    if r.smax_value == c as i64 {
        r.smax_value = (c as i64).wrapping_sub(1);
    }
    finish(r)
}

/// `a > b` unsigned
fn refine_ugt(a: &ScalarBounds, b: &ScalarBounds) -> (ScalarBounds, ScalarBounds) {
    if b.umin_value == u64::MAX || a.umax_value == 0 {
        return (dead(*a), dead(*b));
    }
    let mut na = *a;
    let mut nb = *b;
    na.umin_value = na.umin_value.max(b.umin_value + 1);
    nb.umax_value = nb.umax_value.min(a.umax_value - 1);
    (finish(na), finish(nb))
}

/// `a >= b` unsigned
fn refine_uge(a: &ScalarBounds, b: &ScalarBounds) -> (ScalarBounds, ScalarBounds) {
    let mut na = *a;
    let mut nb = *b;
    na.umin_value = na.umin_value.max(b.umin_value);
    nb.umax_value = nb.umax_value.min(a.umax_value);
    (finish(na), finish(nb))
}

/// `a > b` signed
fn refine_sgt(a: &ScalarBounds, b: &ScalarBounds) -> (ScalarBounds, ScalarBounds) {
    if b.smin_value == i64::MAX || a.smax_value == i64::MIN {
        return (dead(*a), dead(*b));
    }
    let mut na = *a;
    let mut nb = *b;
    na.smin_value = na.smin_value.max(b.smin_value + 1);
    nb.smax_value = nb.smax_value.min(a.smax_value - 1);
    (finish(na), finish(nb))
}

/// `a >= b` signed
fn refine_sge(a: &ScalarBounds, b: &ScalarBounds) -> (ScalarBounds, ScalarBounds) {
    let mut na = *a;
    let mut nb = *b;
    na.smin_value = na.smin_value.max(b.smin_value);
    nb.smax_value = nb.smax_value.min(a.smax_value);
    (finish(na), finish(nb))
}

fn swap((x, y): (ScalarBounds, ScalarBounds)) -> (ScalarBounds, ScalarBounds) {
    (y, x)
}

/// Narrow `a` and `b` assuming `a op b` evaluates to `holds`
/// 在比较结果为 `holds` 的假设下细化操作数
fn refine(op: u8, a: &ScalarBounds, b: &ScalarBounds, holds: bool) -> (ScalarBounds, ScalarBounds) {
    match (op, holds) {
        (VM_JEQ, true) | (VM_JNE, false) => {
            let both = a.intersect(b);
            (both, both)
        }
        (VM_JEQ, false) | (VM_JNE, true) => {
            let na = match b.as_const() {
                Some(c) => exclude(a, c),
                None => *a,
            };
            let nb = match a.as_const() {
                Some(c) => exclude(b, c),
                None => *b,
            };
            (na, nb)
        }
        (VM_JSET, true) => {
            let mut na = *a;
            if let Some(c) = b.as_const() {
                if c.is_power_of_two() {
                    na.var_off = na.var_off.intersect(Tnum::new(c, !c));
                    na = finish(na);
                }
            }
            (na, *b)
        }
        (VM_JSET, false) => {
            let mut na = *a;
            if let Some(c) = b.as_const() {
                na.var_off = na.var_off.intersect(Tnum::new(0, !c));
                na = finish(na);
            }
            (na, *b)
        }
        (VM_JGT, true) | (VM_JLE, false) => refine_ugt(a, b),
        (VM_JGE, true) | (VM_JLT, false) => refine_uge(a, b),
        (VM_JLT, true) | (VM_JGE, false) => swap(refine_ugt(b, a)),
        (VM_JLE, true) | (VM_JGT, false) => swap(refine_uge(b, a)),
        (VM_JSGT, true) | (VM_JSLE, false) => refine_sgt(a, b),
        (VM_JSGE, true) | (VM_JSLT, false) => refine_sge(a, b),
        (VM_JSLT, true) | (VM_JSGE, false) => swap(refine_sgt(b, a)),
        (VM_JSLE, true) | (VM_JSGT, false) => swap(refine_sge(b, a)),
        _ => (*a, *b),
    }
}

/// Install narrowed bounds on the compared registers and on every value
/// sharing their ids
fn narrow(
    state: &mut VerifierState,
    dst: usize,
    src: Option<usize>,
    a: &ScalarBounds,
    b: &ScalarBounds,
) {
    set_scalar_bounds(state, dst, a);
    if let Some(src) = src {
        set_scalar_bounds(state, src, b);
    }
}

fn set_scalar_bounds(state: &mut VerifierState, regno: usize, bounds: &ScalarBounds) {
    let reg = &mut state.cur_frame_mut().regs[regno];
    if !reg.is_scalar() {
        return;
    }
    reg.bounds = *bounds;
    let id = reg.id;
    if id == 0 {
        return;
    }
    state.for_each_value_mut(|v| {
        if v.id == id && v.is_scalar() {
            v.bounds = *bounds;
        }
    });
}

/// Comparisons with at least one pointer operand
fn check_ptr_cmp<P: PlatformSpec>(
    env: &mut VerifierEnv<P>,
    state: &mut VerifierState,
    insn: &Insn,
    dst: &RegValue,
    src: &RegValue,
    is32: bool,
) -> Result<JumpDecision> {
    let op = insn.op();
    let is_zero = |v: &RegValue| v.const_value() == Some(0);

    if !is32 && matches!(op, VM_JEQ | VM_JNE) {
        let ptr_side = if dst.is_pointer() && is_zero(src) {
            Some((dst, insn.dst_reg))
        } else if src.is_pointer() && is_zero(dst) {
            Some((src, insn.src_reg))
        } else {
            None
        };
        if let Some((ptr, regno)) = ptr_side {
            let eq_is_taken = op == VM_JEQ;
            if !ptr.may_be_null() {
                // a checked pointer is never null
                return Ok(if eq_is_taken {
                    JumpDecision::FallThrough
                } else {
                    JumpDecision::Taken
                });
            }
            let mut taken = Box::new(state.clone());
            let (null_state, nonnull_state) = if eq_is_taken {
                (&mut *taken, &mut *state)
            } else {
                (&mut *state, &mut *taken)
            };
            mark_ptr_or_null(null_state, regno as usize, true);
            mark_ptr_or_null(nonnull_state, regno as usize, false);
            return Ok(JumpDecision::Both(taken));
        }
    }

    if !is32 && matches!(op, VM_JGT | VM_JGE | VM_JLT | VM_JLE) {
        let pkt_first = dst.reg_type.is_pkt_pointer() && src.reg_type == RegType::PtrToPacketEnd;
        let end_first = dst.reg_type == RegType::PtrToPacketEnd && src.reg_type.is_pkt_pointer();
        if pkt_first || end_first {
            let (pkt, proven_on_taken) = if pkt_first {
                (dst, matches!(op, VM_JLT | VM_JLE))
            } else {
                (src, matches!(op, VM_JGT | VM_JGE))
            };
            let mut taken = Box::new(state.clone());
            if proven_on_taken {
                find_good_pkt_pointers(&mut taken, pkt);
            } else {
                find_good_pkt_pointers(state, pkt);
            }
            return Ok(JumpDecision::Both(taken));
        }
    }

    if !env.config.allow_ptr_leaks {
        return Err(VerifierError::PointerLeak(format!(
            "R{} pointer comparison prohibited",
            if dst.is_pointer() { insn.dst_reg } else { insn.src_reg }
        )));
    }
    Ok(JumpDecision::Both(Box::new(state.clone())))
}

/// Resolve a null check on the register `regno` and all its aliases
/// 处理空指针检查
///
/// On the null side every alias becomes a known zero and the handle, if
/// any, is dropped. On the non-null side the aliases lose `MAYBE_NULL`; those
/// that are not references also lose their id.
fn mark_ptr_or_null(state: &mut VerifierState, regno: usize, is_null: bool) {
    let id = state.reg(regno).id;
    let is_ref = id != 0 && state.find_ref_frame(id).is_some();

    let resolve = |v: &mut RegValue| {
        if is_null {
            v.assign(&RegValue::known(0));
        } else {
            v.flags.remove(RegFlags::MAYBE_NULL);
            if !is_ref {
                v.id = 0;
            }
        }
    };

    if id == 0 {
        resolve(&mut state.cur_frame_mut().regs[regno]);
        return;
    }
    state.for_each_value_mut(|v| {
        if v.id == id && v.is_pointer() && v.may_be_null() {
            resolve(v);
        }
    });
    if is_null && is_ref {
        if let Some(f) = state.find_ref_frame(id) {
            state.frames[f].refs.release(id);
        }
    }
}

/// Extend the proven range of every packet pointer sharing `pkt`'s base
fn find_good_pkt_pointers(state: &mut VerifierState, pkt: &RegValue) {
    if pkt.off < 0 || pkt.off as u64 > MAX_PACKET_OFF {
        return;
    }
    let new_range = pkt.off as u32;
    let id = pkt.id;
    state.for_each_value_mut(|v| {
        if let RegType::PtrToPacket { range } = v.reg_type {
            if v.id == id {
                v.reg_type = RegType::PtrToPacket {
                    range: range.max(new_range),
                };
            }
        }
    });
}
