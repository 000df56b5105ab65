// SPDX-License-Identifier: GPL-2.0

//! Verifier environment.
//!
//! One [`VerifierEnv`] holds everything a single verification run owns: the
//! platform tables, the program, the configuration, the log, the checkpoint
//! arena and the per-instruction marks collected for rewriting. Nothing is
//! shared between runs.

use crate::core::insn::Insn;
use crate::core::insn_verify::ProgramLayout;
use crate::core::log::VerifierLog;
use crate::platform::PlatformSpec;
use crate::state::verifier_state::StateArena;
use crate::stdlib::{vec, Vec};
use crate::verifier::config::VerifierConfig;
use crate::verifier::stats::VerificationStats;

/// Per-instruction data collected during exploration
/// 每条指令的辅助数据
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InsnAux {
    /// Needs a speculation barrier in front of it
    pub nospec: bool,
    /// Stack store that needs a barrier after it
    pub sanitize_stack_spill: bool,
}

/// Verifier environment parameterized by platform.
///
/// # Example
///
/// ```ignore
/// let mut env = VerifierEnv::new(HostPlatform::new(), insns, VerifierConfig::default());
/// let outcome = MainVerifier::new(&mut env).verify();
/// ```
#[derive(Debug)]
pub struct VerifierEnv<P: PlatformSpec> {
    /// Platform specification
    pub platform: P,
    /// Program instructions
    pub insns: Vec<Insn>,
    /// Limits and mode switches
    pub config: VerifierConfig,
    /// Verifier log
    pub log: VerifierLog,
    /// Function boundaries and prune points, set by the structural pass
    pub layout: ProgramLayout,
    /// Per-instruction marks
    pub insn_aux: Vec<InsnAux>,
    /// Checkpoints for pruning and liveness
    pub arena: StateArena,
    /// Run statistics
    pub stats: VerificationStats,
    /// Deepest stack use seen per function, in bytes
    pub subprog_stack_depth: Vec<u32>,
    /// Caller/callee pairs seen at subprogram calls
    pub call_edges: Vec<(usize, usize)>,
    /// Last id handed out for sharing and references
    pub id_gen: u32,
}

impl<P: PlatformSpec> VerifierEnv<P> {
    /// Create a new environment for one run.
    pub fn new(platform: P, insns: Vec<Insn>, config: VerifierConfig) -> Self {
        let log = VerifierLog::with_max_size(config.log_level, config.log_size);
        let insn_aux = vec![InsnAux::default(); insns.len()];
        let stats = VerificationStats {
            insn_count: insns.len(),
            ..VerificationStats::default()
        };
        Self {
            platform,
            insns,
            config,
            log,
            layout: ProgramLayout::default(),
            insn_aux,
            arena: StateArena::new(),
            stats,
            subprog_stack_depth: Vec::new(),
            call_edges: Vec::new(),
            id_gen: 0,
        }
    }

    /// Allocate a fresh run-unique id
    pub fn new_id(&mut self) -> u32 {
        self.id_gen += 1;
        self.id_gen
    }

    /// Instruction at `idx`
    pub fn insn(&self, idx: usize) -> Option<&Insn> {
        self.insns.get(idx)
    }

    /// Mark `idx` as needing a leading barrier
    pub fn mark_nospec(&mut self, idx: usize) {
        if let Some(aux) = self.insn_aux.get_mut(idx) {
            aux.nospec = true;
        }
    }

    /// Mark the store at `idx` as needing a trailing barrier
    pub fn mark_stack_spill(&mut self, idx: usize) {
        if let Some(aux) = self.insn_aux.get_mut(idx) {
            aux.sanitize_stack_spill = true;
        }
    }

    /// Record that function `subprog` used `depth` bytes of stack
    pub fn update_stack_depth(&mut self, subprog: usize, depth: u32) {
        if self.subprog_stack_depth.len() <= subprog {
            self.subprog_stack_depth.resize(subprog + 1, 0);
        }
        let cur = &mut self.subprog_stack_depth[subprog];
        *cur = (*cur).max(depth);
    }

    /// Deepest stack use recorded for `subprog`
    pub fn stack_depth_of(&self, subprog: usize) -> u32 {
        self.subprog_stack_depth.get(subprog).copied().unwrap_or(0)
    }

    /// Record a call edge between two functions
    pub fn record_call(&mut self, caller: usize, callee: usize) {
        if !self.call_edges.contains(&(caller, callee)) {
            self.call_edges.push((caller, callee));
        }
    }
}
