// SPDX-License-Identifier: GPL-2.0

//! Reference tracking
//! 引用跟踪
//!
//! Handles returned by acquiring helpers must be released on every path
//! before the acquiring frame returns. Each frame keeps its own list of
//! outstanding handles, keyed by a run-unique id.
//! 获取型辅助函数返回的句柄必须在每条路径上、在获取它的栈帧返回前释放。

use crate::core::error::{Result, VerifierError};
use crate::stdlib::Vec;

/// An outstanding handle
/// 一个未释放的句柄
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RefEntry {
    /// Reference id, shared with every register aliasing the handle
    pub id: u32,
    /// Instruction that acquired the handle
    pub insn_idx: usize,
}

/// Outstanding handles of one frame, in acquisition order
/// 单个栈帧中按获取顺序排列的未释放句柄
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RefTracker {
    refs: Vec<RefEntry>,
}

impl RefTracker {
    /// No outstanding handles
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a newly acquired handle
    pub fn acquire(&mut self, id: u32, insn_idx: usize) {
        self.refs.push(RefEntry { id, insn_idx });
    }

    /// Drop the handle with `id`; false if it is not held here
    pub fn release(&mut self, id: u32) -> bool {
        match self.refs.iter().position(|r| r.id == id) {
            Some(pos) => {
                self.refs.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Whether `id` is held here
    pub fn contains(&self, id: u32) -> bool {
        self.refs.iter().any(|r| r.id == id)
    }

    /// Number of outstanding handles
    pub fn len(&self) -> usize {
        self.refs.len()
    }

    /// No outstanding handles
    pub fn is_empty(&self) -> bool {
        self.refs.is_empty()
    }

    /// Outstanding handles in acquisition order
    pub fn iter(&self) -> impl Iterator<Item = &RefEntry> {
        self.refs.iter()
    }

    /// Fail with the oldest leaked handle, if any
    pub fn check_released(&self) -> Result<()> {
        match self.refs.first() {
            Some(r) => Err(VerifierError::UnreleasedReference {
                ref_id: r.id,
                acquired_at: r.insn_idx,
            }),
            None => Ok(()),
        }
    }
}
