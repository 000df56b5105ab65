// SPDX-License-Identifier: GPL-2.0

//! 推测执行屏障插入
//!
//! Speculation barrier insertion.
//!
//! 验证通过后，本模块根据探索期间收集的标记改写指令流：
//! 在被标记的指令前插入屏障，在需要净化的栈写入后插入屏障，并重新计算跳转偏移。
//!
//! After a program is accepted the instruction stream is rewritten from the
//! marks collected during exploration:
//!
//! - a barrier goes in front of every instruction marked `nospec`
//! - a barrier goes after every store marked `sanitize_stack_spill`
//!
//! Jumps and subprogram calls are re-targeted through an index map. A jump to
//! a marked instruction lands on its leading barrier.

use crate::core::error::{Result, VerifierError};
use crate::core::insn::Insn;
use crate::stdlib::{format, Vec};
use crate::verifier::env::InsnAux;

/// Positions of one original instruction in the rewritten stream
#[derive(Debug, Clone, Copy, Default)]
struct Placement {
    /// First slot belonging to it (its leading barrier, if any)
    lead: usize,
    /// The instruction itself
    at: usize,
}

fn placements(insns: &[Insn], aux: &[InsnAux]) -> (Vec<Placement>, usize) {
    let mut out = Vec::with_capacity(insns.len() + 1);
    let mut pos = 0;
    for i in 0..insns.len() {
        let a = aux.get(i).copied().unwrap_or_default();
        let lead = pos;
        if a.nospec {
            pos += 1;
        }
        out.push(Placement { lead, at: pos });
        pos += 1;
        if a.sanitize_stack_spill {
            pos += 1;
        }
    }
    (out, pos)
}

fn new_offset(from: &Placement, to: &Placement) -> i64 {
    to.lead as i64 - from.at as i64 - 1
}

/// Rewrite `insns` with the barriers requested in `aux`
/// 按标记插入屏障并改写跳转
///
/// Returns `None` when nothing was marked. A displacement that no longer fits
/// its field is an internal error.
pub fn insert_barriers(insns: &[Insn], aux: &[InsnAux]) -> Result<Option<Vec<Insn>>> {
    if !aux.iter().any(|a| a.nospec || a.sanitize_stack_spill) {
        return Ok(None);
    }
    let (place, len) = placements(insns, aux);
    let mut out = Vec::with_capacity(len);

    for (i, insn) in insns.iter().enumerate() {
        let a = aux.get(i).copied().unwrap_or_default();
        if a.nospec {
            out.push(Insn::nospec());
        }
        let mut insn = *insn;
        if insn.is_pseudo_call() {
            let target = insn.call_target(i) as usize;
            let to = place
                .get(target)
                .ok_or_else(|| VerifierError::Internal(format!("call target {} out of range", target)))?;
            let imm = new_offset(&place[i], to);
            insn.imm = i32::try_from(imm).map_err(|_| {
                VerifierError::Internal(format!("call displacement {} at insn {} overflows", imm, i))
            })?;
        } else if insn.is_ja() || insn.is_cond_jmp() {
            let target = insn.jmp_target(i) as usize;
            let to = place
                .get(target)
                .ok_or_else(|| VerifierError::Internal(format!("jump target {} out of range", target)))?;
            let off = new_offset(&place[i], to);
            insn.off = i16::try_from(off).map_err(|_| {
                VerifierError::Internal(format!("jump displacement {} at insn {} overflows", off, i))
            })?;
        }
        out.push(insn);
        if a.sanitize_stack_spill {
            out.push(Insn::nospec());
        }
    }
    Ok(Some(out))
}
