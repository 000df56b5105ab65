// SPDX-License-Identifier: GPL-2.0

//! 验证统计模块
//!
//! Verification statistics.
//!
//! 本模块在程序验证期间跟踪统计信息，用于诊断和基准测试，不影响正确性。
//!
//! This module tracks counters during a verification run. They are for
//! diagnostics and benchmarking only and never influence the verdict.

use crate::stdlib::{format, String};

/// Statistics collected during verification
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerificationStats {
    /// Total number of instructions in the program
    pub insn_count: usize,
    /// Number of instructions processed during verification
    pub insns_processed: usize,
    /// Number of paths started (entry plus every pushed successor)
    pub total_states: usize,
    /// Peak number of states on the pending-work stack
    pub peak_pending: usize,
    /// Checkpoints created at prune points
    pub checkpoints: usize,
    /// Paths ended by a covering checkpoint
    pub prune_hits: usize,
    /// Comparisons against retired checkpoints that did not prune
    pub prune_misses: usize,
    /// Exact comparisons against unresolved checkpoints
    pub loop_checks: usize,
    /// Checkpoints dropped from candidate lists
    pub states_evicted: usize,
    /// Paths explored under mispredicted-branch semantics
    pub speculative_paths: usize,
    /// Maximum call stack depth reached
    pub max_call_depth: usize,
    /// Number of helper calls processed
    pub helper_calls: usize,
}

impl VerificationStats {
    /// Record the pending-stack depth after a push
    pub fn note_pending(&mut self, depth: usize) {
        self.peak_pending = self.peak_pending.max(depth);
    }

    /// Record the call depth reached by a path
    pub fn note_call_depth(&mut self, depth: usize) {
        self.max_call_depth = self.max_call_depth.max(depth);
    }

    /// Fraction of cache comparisons that pruned
    pub fn prune_ratio(&self) -> f64 {
        let total = self.prune_hits + self.prune_misses;
        if total == 0 {
            0.0
        } else {
            self.prune_hits as f64 / total as f64
        }
    }

    /// One-line summary in the style of the log
    /// 单行摘要
    pub fn summary(&self) -> String {
        format!(
            "processed {} insns, total_states {}, peak_pending {}, checkpoints {}, \
             prune_hits {}, prune_misses {}, speculative {}, max_depth {}",
            self.insns_processed,
            self.total_states,
            self.peak_pending,
            self.checkpoints,
            self.prune_hits,
            self.prune_misses,
            self.speculative_paths,
            self.max_call_depth,
        )
    }
}
