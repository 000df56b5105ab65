// SPDX-License-Identifier: GPL-2.0

//! Function frame state
//! 函数栈帧状态
//!
//! One [`Frame`] per active call: the eleven registers, the frame's stack,
//! the call site it returns to and the handles it acquired.

use crate::core::types::*;
use crate::state::reference::RefTracker;
use crate::state::reg_state::RegValue;
use crate::state::stack_state::StackState;
use crate::state::verifier_state::StateId;

/// Register and stack context of one function call
/// 一次函数调用的寄存器与栈上下文
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// R0-R10
    pub regs: [RegValue; MAX_REG],
    /// Scratch stack below R10
    pub stack: StackState,
    /// Call instruction this frame returns to (unused for frame 0)
    pub callsite: usize,
    /// Depth in the call chain, 0 for the entry function
    pub frameno: u32,
    /// Function index in the program layout
    pub subprog: usize,
    /// Handles acquired by this frame and not yet released
    pub refs: RefTracker,
}

impl Frame {
    /// Fresh frame: every register uninitialized except the frame pointer
    pub fn new(callsite: usize, frameno: u32, subprog: usize) -> Self {
        let mut regs = [RegValue::not_init(); MAX_REG];
        regs[REG_FP] = RegValue::frame_pointer(frameno);
        Self {
            regs,
            stack: StackState::new(),
            callsite,
            frameno,
            subprog,
            refs: RefTracker::new(),
        }
    }

    /// Register `r`
    pub fn reg(&self, r: usize) -> &RegValue {
        &self.regs[r]
    }

    /// Overwrite register `r`, recording the write for liveness
    /// 覆写寄存器 `r` 并记录写入
    pub fn write_reg(&mut self, r: usize, value: &RegValue) {
        let reg = &mut self.regs[r];
        reg.assign(value);
        reg.live |= Liveness::WRITTEN;
    }

    /// Invalidate the caller-saved argument registers
    pub fn clobber_caller_saved(&mut self) {
        for r in CALLER_SAVED {
            self.write_reg(r, &RegValue::not_init());
        }
    }

    /// Point every register and slot at checkpoint `parent` and clear liveness
    pub fn reparent(&mut self, parent: StateId) {
        for reg in self.regs.iter_mut() {
            reg.parent = Some(parent);
            reg.live = Liveness::empty();
        }
        for slot in self.stack.slots.iter_mut() {
            slot.spilled.parent = Some(parent);
            slot.spilled.live = Liveness::empty();
        }
    }

    /// Registers and spilled slots, mutably
    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut RegValue> {
        self.regs.iter_mut().chain(
            self.stack
                .slots
                .iter_mut()
                .filter(|s| s.is_spill())
                .map(|s| &mut s.spilled),
        )
    }

    /// Registers and spilled slots
    pub fn values(&self) -> impl Iterator<Item = &RegValue> {
        self.regs.iter().chain(
            self.stack
                .slots
                .iter()
                .filter(|s| s.is_spill())
                .map(|s| &s.spilled),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_frame() {
        let f = Frame::new(0, 2, 1);
        assert!(!f.reg(0).is_init());
        assert_eq!(f.reg(REG_FP).stack_frameno(), Some(2));
        assert!(f.refs.is_empty());
    }

    #[test]
    fn test_write_marks_written() {
        let mut f = Frame::new(0, 0, 0);
        f.write_reg(3, &RegValue::known(1));
        assert!(f.reg(3).live.contains(Liveness::WRITTEN));
        f.clobber_caller_saved();
        assert!(!f.reg(3).is_init());
    }

    #[test]
    fn test_reparent_clears_liveness() {
        let mut f = Frame::new(0, 0, 0);
        f.write_reg(1, &RegValue::known(1));
        f.stack.spill(0, &RegValue::known(2));
        f.reparent(5);
        assert_eq!(f.reg(1).parent, Some(5));
        assert!(f.reg(1).live.is_empty());
        assert_eq!(f.stack.slots[0].spilled.parent, Some(5));
        assert_eq!(f.values().count(), MAX_REG + 1);
    }
}
