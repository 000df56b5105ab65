// SPDX-License-Identifier: GPL-2.0

//! Verification limits and mode switches.
//!
//! Every budget that bounds a run lives here. Cancellation is driven only by
//! these counters, so the same program under the same configuration always
//! ends the same way.

use crate::core::log::{LogLevel, DEFAULT_LOG_SIZE};
use crate::core::types::{COMPLEXITY_LIMIT_JMP_SEQ, DEFAULT_STACK_BUDGET, MAX_CALL_FRAMES};

/// Default maximum number of instructions allowed.
pub const DEFAULT_MAX_INSNS: usize = 1_000_000;

/// Default instruction-processing budget.
pub const DEFAULT_INSN_BUDGET: usize = 1_000_000;

/// Default budget of paths started.
pub const DEFAULT_STATE_BUDGET: usize = 100_000;

/// Default maximum number of states per instruction.
pub const DEFAULT_MAX_STATES_PER_INSN: usize = 64;

/// Maximum program size in the unprivileged preset.
pub const UNPRIV_MAX_INSNS: usize = 4096;

/// Verifier configuration.
/// 验证器配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifierConfig {
    /// Maximum number of instructions in the program.
    pub max_insns: usize,
    /// Maximum instructions processed across all paths.
    pub insn_budget: usize,
    /// Maximum paths started across the run.
    pub state_budget: usize,
    /// Maximum checkpoints kept per instruction for pruning.
    pub max_states_per_insn: usize,
    /// Maximum call stack depth.
    pub max_call_depth: usize,
    /// Combined stack budget of a call chain, in bytes.
    pub stack_budget: u32,
    /// Maximum depth of the pending-work stack.
    pub max_pending: usize,
    /// Log verbosity.
    pub log_level: LogLevel,
    /// Log buffer capacity in bytes.
    pub log_size: usize,
    /// Compare against explored states at prune points.
    pub prune: bool,
    /// Privileged mode: pointers may flow into scalars and memory.
    pub allow_ptr_leaks: bool,
    /// Explore speculative paths and insert barriers.
    pub sanitize: bool,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            max_insns: DEFAULT_MAX_INSNS,
            insn_budget: DEFAULT_INSN_BUDGET,
            state_budget: DEFAULT_STATE_BUDGET,
            max_states_per_insn: DEFAULT_MAX_STATES_PER_INSN,
            max_call_depth: MAX_CALL_FRAMES,
            stack_budget: DEFAULT_STACK_BUDGET,
            max_pending: COMPLEXITY_LIMIT_JMP_SEQ,
            log_level: LogLevel::Off,
            log_size: DEFAULT_LOG_SIZE,
            prune: true,
            allow_ptr_leaks: false,
            sanitize: true,
        }
    }
}

impl VerifierConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Privileged loader: pointer leaks allowed, no speculative sanitizing.
    pub fn privileged() -> Self {
        Self {
            allow_ptr_leaks: true,
            sanitize: false,
            ..Self::default()
        }
    }

    /// Unprivileged loader: strict pointer rules, sanitizing, small programs.
    pub fn unprivileged() -> Self {
        Self {
            max_insns: UNPRIV_MAX_INSNS,
            allow_ptr_leaks: false,
            sanitize: true,
            ..Self::default()
        }
    }

    /// Set maximum instructions.
    pub fn with_max_insns(mut self, max: usize) -> Self {
        self.max_insns = max;
        self
    }

    /// Set the instruction-processing budget.
    pub fn with_insn_budget(mut self, budget: usize) -> Self {
        self.insn_budget = budget;
        self
    }

    /// Set the state budget.
    pub fn with_state_budget(mut self, budget: usize) -> Self {
        self.state_budget = budget;
        self
    }

    /// Set maximum checkpoints per instruction.
    pub fn with_max_states_per_insn(mut self, max: usize) -> Self {
        self.max_states_per_insn = max;
        self
    }

    /// Set maximum call depth.
    pub fn with_max_call_depth(mut self, max: usize) -> Self {
        self.max_call_depth = max;
        self
    }

    /// Set the combined stack budget.
    pub fn with_stack_budget(mut self, budget: u32) -> Self {
        self.stack_budget = budget;
        self
    }

    /// Set maximum pending-stack depth.
    pub fn with_max_pending(mut self, max: usize) -> Self {
        self.max_pending = max;
        self
    }

    /// Set log level.
    pub fn with_log_level(mut self, level: LogLevel) -> Self {
        self.log_level = level;
        self
    }

    /// Set log capacity.
    pub fn with_log_size(mut self, size: usize) -> Self {
        self.log_size = size;
        self
    }

    /// Enable or disable pruning.
    pub fn with_prune(mut self, prune: bool) -> Self {
        self.prune = prune;
        self
    }

    /// Enable or disable privileged pointer handling.
    pub fn with_allow_ptr_leaks(mut self, allow: bool) -> Self {
        self.allow_ptr_leaks = allow;
        self
    }

    /// Enable or disable speculative sanitizing.
    pub fn with_sanitize(mut self, sanitize: bool) -> Self {
        self.sanitize = sanitize;
        self
    }

    /// Speculative paths are explored only for unprivileged sanitizing runs
    pub fn explores_speculative(&self) -> bool {
        self.sanitize && !self.allow_ptr_leaks
    }
}
