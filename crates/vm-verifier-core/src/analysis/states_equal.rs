// SPDX-License-Identifier: GPL-2.0

//! State comparison for pruning and loop detection
//! 用于剪枝和循环检测的状态比较
//!
//! [`CompareMode::Covered`] asks whether every concrete state described by
//! `cur` is also described by `old`, looking only at locations `old`'s
//! descendants actually read. If so, exploring `cur` cannot reach anything
//! that exploring `old` did not, and `cur` may be dropped.
//!
//! [`CompareMode::Exact`] asks whether the two states are identical, ignoring
//! liveness and parent links. An exact repeat of a state that is still on the
//! current path means the path can cycle forever.

use crate::core::types::*;
use crate::state::frame::Frame;
use crate::state::idmap::IdMap;
use crate::state::reg_state::RegValue;
use crate::state::stack_state::{SlotKind, StackSlot};
use crate::state::verifier_state::VerifierState;

/// How two states are compared
/// 状态比较模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompareMode {
    /// `cur` is subsumed by `old` on `old`'s live locations
    #[default]
    Covered,
    /// Identical apart from liveness bookkeeping
    Exact,
}

/// Compare `old` (a checkpoint) against `cur`
/// 比较检查点 `old` 与当前状态 `cur`
pub fn states_equal(old: &VerifierState, cur: &VerifierState, mode: CompareMode) -> bool {
    let mut idmap = IdMap::new();
    states_equal_with_idmap(old, cur, mode, &mut idmap)
}

/// Compare with a caller-supplied id map
pub fn states_equal_with_idmap(
    old: &VerifierState,
    cur: &VerifierState,
    mode: CompareMode,
    idmap: &mut IdMap,
) -> bool {
    if old.frames.len() != cur.frames.len() {
        return false;
    }
    let spec_ok = match mode {
        CompareMode::Covered => !old.speculative || cur.speculative,
        CompareMode::Exact => old.speculative == cur.speculative,
    };
    if !spec_ok {
        return false;
    }
    old.frames
        .iter()
        .zip(cur.frames.iter())
        .all(|(o, c)| func_states_equal(o, c, mode, idmap))
}

fn func_states_equal(old: &Frame, cur: &Frame, mode: CompareMode, idmap: &mut IdMap) -> bool {
    if old.callsite != cur.callsite || old.subprog != cur.subprog {
        return false;
    }
    if !refsafe(old, cur, idmap) {
        return false;
    }
    for (o, c) in old.regs.iter().zip(cur.regs.iter()) {
        if mode == CompareMode::Covered && !o.live.contains(Liveness::READ) {
            continue;
        }
        if !regsafe(o, c, mode, idmap) {
            return false;
        }
    }
    stacksafe(old, cur, mode, idmap)
}

fn refsafe(old: &Frame, cur: &Frame, idmap: &mut IdMap) -> bool {
    old.refs.len() == cur.refs.len()
        && old
            .refs
            .iter()
            .zip(cur.refs.iter())
            .all(|(o, c)| o.insn_idx == c.insn_idx && idmap.check_ids(o.id, c.id))
}

/// Whether `cur` is safe wherever `old` was, as a single value
/// 判断单个值 `cur` 是否被 `old` 覆盖
pub fn regsafe(old: &RegValue, cur: &RegValue, mode: CompareMode, idmap: &mut IdMap) -> bool {
    if mode == CompareMode::Exact {
        return old.reg_type == cur.reg_type
            && old.flags == cur.flags
            && old.off == cur.off
            && old.bounds == cur.bounds
            && idmap.check_ids(old.id, cur.id);
    }

    match old.reg_type {
        RegType::NotInit => true,
        RegType::Scalar => {
            cur.is_scalar()
                && old.bounds.contains(&cur.bounds)
                && idmap.check_scalar_ids(old.id, cur.id)
        }
        RegType::PtrToPacket { range: old_range } => match cur.reg_type {
            RegType::PtrToPacket { range } => {
                range >= old_range && pointer_fields_safe(old, cur, idmap)
            }
            _ => false,
        },
        _ => old.reg_type == cur.reg_type && pointer_fields_safe(old, cur, idmap),
    }
}

fn pointer_fields_safe(old: &RegValue, cur: &RegValue, idmap: &mut IdMap) -> bool {
    old.flags == cur.flags
        && old.off == cur.off
        && old.bounds.contains(&cur.bounds)
        && idmap.check_ids(old.id, cur.id)
}

fn stacksafe(old: &Frame, cur: &Frame, mode: CompareMode, idmap: &mut IdMap) -> bool {
    let empty = StackSlot::default();
    let n = match mode {
        CompareMode::Covered => old.stack.slots.len(),
        CompareMode::Exact => old.stack.slots.len().max(cur.stack.slots.len()),
    };
    for spi in 0..n {
        let o = old.stack.get(spi).unwrap_or(&empty);
        let c = cur.stack.get(spi).unwrap_or(&empty);
        let ok = match mode {
            CompareMode::Exact => {
                o.slot_type == c.slot_type
                    && (!o.is_spill() || regsafe(&o.spilled, &c.spilled, mode, idmap))
            }
            CompareMode::Covered => {
                !o.spilled.live.contains(Liveness::READ) || stackslot_safe(o, c, idmap)
            }
        };
        if !ok {
            return false;
        }
    }
    true
}

/// Whether stack slot `cur` covers everything readable from `old`
/// 判断栈槽 `cur` 是否覆盖 `old`
pub fn stackslot_safe(old: &StackSlot, cur: &StackSlot, idmap: &mut IdMap) -> bool {
    if !old.is_valid() {
        return true;
    }
    if old.is_spill() {
        return cur.is_spill() && regsafe(&old.spilled, &cur.spilled, CompareMode::Covered, idmap);
    }
    if cur.is_spill() {
        // A spilled scalar reads back as data; a spilled zero as zero bytes.
        let zero = cur.is_spilled_zero();
        if !cur.spilled.is_scalar() {
            return false;
        }
        return old
            .slot_type
            .iter()
            .all(|t| *t != SlotKind::Zero || zero);
    }
    old.slot_type
        .iter()
        .zip(cur.slot_type.iter())
        .all(|(o, c)| match o {
            SlotKind::Invalid => true,
            SlotKind::Misc => matches!(c, SlotKind::Misc | SlotKind::Zero),
            SlotKind::Zero => *c == SlotKind::Zero,
            SlotKind::Spill => false,
        })
}
