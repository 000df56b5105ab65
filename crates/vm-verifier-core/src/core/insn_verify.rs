// SPDX-License-Identifier: GPL-2.0

//! Structural pre-pass
//! 结构预检查
//!
//! Validates opcodes, register numbers and jump targets before any path is
//! explored, splits the program into functions and computes the prune points
//! where the path explorer consults the equivalence cache.

use crate::core::error::{Result, VerifierError};
use crate::core::insn::*;
use crate::core::types::REG_FP;
use crate::stdlib::Vec;

/// Half-open instruction range of one function
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubprogRange {
    /// First instruction
    pub start: usize,
    /// One past the last instruction
    pub end: usize,
}

/// Result of the structural pass
/// 结构检查的结果
#[derive(Debug, Clone, Default)]
pub struct ProgramLayout {
    /// Functions ordered by start index; entry first
    pub subprogs: Vec<SubprogRange>,
    /// Per-instruction prune point marks
    pub prune_points: Vec<bool>,
}

impl ProgramLayout {
    /// Function containing `idx`
    pub fn subprog_of(&self, idx: usize) -> usize {
        match self.subprogs.binary_search_by(|s| s.start.cmp(&idx)) {
            Ok(i) => i,
            Err(i) => i.saturating_sub(1),
        }
    }

    /// Function starting exactly at `idx`
    pub fn subprog_starting_at(&self, idx: usize) -> Option<usize> {
        self.subprogs.binary_search_by(|s| s.start.cmp(&idx)).ok()
    }

    /// Whether the explorer should consult the cache at `idx`
    pub fn is_prune_point(&self, idx: usize) -> bool {
        self.prune_points.get(idx).copied().unwrap_or(false)
    }
}

fn check_reg(r: u8) -> Result<()> {
    if r as usize > REG_FP {
        return Err(VerifierError::InvalidRegister(r));
    }
    Ok(())
}

fn check_dst_writable(r: u8) -> Result<()> {
    check_reg(r)?;
    if r as usize == REG_FP {
        return Err(VerifierError::InvalidRegister(r));
    }
    Ok(())
}

fn check_alu(insn: &Insn, idx: usize) -> Result<()> {
    let op = insn.op();
    let bits: i64 = if insn.class() == VM_ALU64 { 64 } else { 32 };
    check_dst_writable(insn.dst_reg)?;
    match op {
        VM_NEG => {
            if insn.src_is_reg() || insn.src_reg != 0 {
                return Err(VerifierError::InvalidInstruction(idx));
            }
        }
        VM_END => {
            if insn.class() != VM_ALU || !matches!(insn.imm, 16 | 32 | 64) {
                return Err(VerifierError::InvalidInstruction(idx));
            }
        }
        VM_ADD | VM_SUB | VM_MUL | VM_DIV | VM_OR | VM_AND | VM_LSH | VM_RSH | VM_MOD
        | VM_XOR | VM_MOV | VM_ARSH => {
            if insn.src_is_reg() {
                check_reg(insn.src_reg)?;
            } else {
                if insn.src_reg != 0 {
                    return Err(VerifierError::InvalidInstruction(idx));
                }
                if matches!(op, VM_DIV | VM_MOD) && insn.imm == 0 {
                    return Err(VerifierError::InvalidInstruction(idx));
                }
                if matches!(op, VM_LSH | VM_RSH | VM_ARSH)
                    && (insn.imm < 0 || insn.imm as i64 >= bits)
                {
                    return Err(VerifierError::InvalidInstruction(idx));
                }
            }
        }
        _ => return Err(VerifierError::InvalidInstruction(idx)),
    }
    Ok(())
}

fn check_jmp(insn: &Insn, idx: usize) -> Result<()> {
    let is_jmp32 = insn.class() == VM_JMP32;
    match insn.op() {
        VM_JA | VM_EXIT if is_jmp32 => Err(VerifierError::InvalidInstruction(idx)),
        VM_JA | VM_EXIT => Ok(()),
        VM_CALL => {
            if is_jmp32 || insn.dst_reg != 0 || insn.off != 0 || insn.src_is_reg() {
                return Err(VerifierError::InvalidInstruction(idx));
            }
            if insn.src_reg != 0 && insn.src_reg != VM_PSEUDO_CALL {
                return Err(VerifierError::InvalidInstruction(idx));
            }
            Ok(())
        }
        VM_JEQ | VM_JGT | VM_JGE | VM_JSET | VM_JNE | VM_JSGT | VM_JSGE | VM_JLT | VM_JLE
        | VM_JSLT | VM_JSLE => {
            check_reg(insn.dst_reg)?;
            if insn.src_is_reg() {
                check_reg(insn.src_reg)
            } else if insn.src_reg != 0 {
                Err(VerifierError::InvalidInstruction(idx))
            } else {
                Ok(())
            }
        }
        _ => Err(VerifierError::InvalidInstruction(idx)),
    }
}

/// Run the structural pass over `insns`
///
/// `map_exists` resolves the map ids named by map-pointer loads.
pub fn check_structure<F>(insns: &[Insn], max_insns: usize, map_exists: F) -> Result<ProgramLayout>
where
    F: Fn(u32) -> bool,
{
    let len = insns.len();
    if len == 0 {
        return Err(VerifierError::EmptyProgram);
    }
    if len > max_insns {
        return Err(VerifierError::ProgramTooLarge(len));
    }

    // Pass 1: opcodes, registers and LD_IMM64 pairing
    let mut second_slot = crate::stdlib::vec![false; len];
    let mut idx = 0;
    while idx < len {
        let insn = &insns[idx];
        match insn.class() {
            VM_LD => {
                if !insn.is_ld_imm64() || idx + 1 >= len {
                    return Err(VerifierError::InvalidInstruction(idx));
                }
                check_dst_writable(insn.dst_reg)?;
                let next = &insns[idx + 1];
                if next.code != 0 || next.dst_reg != 0 || next.src_reg != 0 || next.off != 0 {
                    return Err(VerifierError::InvalidInstruction(idx + 1));
                }
                match insn.src_reg {
                    0 => {}
                    VM_PSEUDO_MAP_FD => {
                        if !map_exists(insn.imm as u32) {
                            return Err(VerifierError::UnknownMap(insn.imm as u32));
                        }
                    }
                    _ => return Err(VerifierError::InvalidInstruction(idx)),
                }
                second_slot[idx + 1] = true;
                idx += 2;
                continue;
            }
            VM_LDX => {
                if insn.mode() != VM_MEM {
                    return Err(VerifierError::InvalidInstruction(idx));
                }
                check_dst_writable(insn.dst_reg)?;
                check_reg(insn.src_reg)?;
            }
            VM_ST => {
                if !insn.is_nospec() {
                    if insn.mode() != VM_MEM || insn.src_reg != 0 {
                        return Err(VerifierError::InvalidInstruction(idx));
                    }
                    check_reg(insn.dst_reg)?;
                }
            }
            VM_STX => {
                if insn.mode() != VM_MEM {
                    return Err(VerifierError::InvalidInstruction(idx));
                }
                check_reg(insn.dst_reg)?;
                check_reg(insn.src_reg)?;
            }
            VM_ALU | VM_ALU64 => check_alu(insn, idx)?,
            VM_JMP | VM_JMP32 => check_jmp(insn, idx)?,
            _ => return Err(VerifierError::InvalidInstruction(idx)),
        }
        idx += 1;
    }

    // Pass 2: function boundaries from pseudo-call targets
    let mut starts = crate::stdlib::vec![0usize];
    for (idx, insn) in insns.iter().enumerate() {
        if second_slot[idx] || !insn.is_pseudo_call() {
            continue;
        }
        let target = insn.call_target(idx);
        if target < 0 || target as usize >= len {
            return Err(VerifierError::JumpOutOfRange { from: idx, target });
        }
        if second_slot[target as usize] {
            return Err(VerifierError::InvalidJumpTarget(target as usize));
        }
        starts.push(target as usize);
    }
    starts.sort_unstable();
    starts.dedup();
    let subprogs: Vec<SubprogRange> = starts
        .iter()
        .enumerate()
        .map(|(i, &start)| SubprogRange {
            start,
            end: starts.get(i + 1).copied().unwrap_or(len),
        })
        .collect();

    let mut layout = ProgramLayout {
        subprogs,
        prune_points: crate::stdlib::vec![false; len],
    };
    for sp in &layout.subprogs {
        layout.prune_points[sp.start] = true;
    }

    // Pass 3: jump targets and prune points
    for (idx, insn) in insns.iter().enumerate() {
        if second_slot[idx] || !insn.is_jmp_class() {
            continue;
        }
        if insn.is_exit() {
            continue;
        }
        if insn.is_pseudo_call() {
            if idx + 1 < len {
                layout.prune_points[idx + 1] = true;
            }
            continue;
        }
        if insn.is_helper_call() {
            continue;
        }
        let target = insn.jmp_target(idx);
        if target < 0 || target as usize >= len {
            return Err(VerifierError::JumpOutOfRange { from: idx, target });
        }
        let target = target as usize;
        if second_slot[target] || layout.subprog_of(target) != layout.subprog_of(idx) {
            return Err(VerifierError::InvalidJumpTarget(target));
        }
        layout.prune_points[target] = true;
        if insn.is_cond_jmp() && idx + 1 < len {
            layout.prune_points[idx + 1] = true;
        }
    }

    // Pass 4: every function must end in exit or an unconditional jump
    for sp in &layout.subprogs {
        let last = sp.end - 1;
        let insn = &insns[last];
        if second_slot[last] || !(insn.is_exit() || insn.is_ja()) {
            return Err(VerifierError::FallThroughExit(last));
        }
    }

    Ok(layout)
}
