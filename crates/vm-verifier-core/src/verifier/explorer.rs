// SPDX-License-Identifier: GPL-2.0

//! Path explorer
//! 路径探索器
//!
//! The explorer walks the program depth first. It keeps one current state and
//! a LIFO stack of deferred branch successors. Prune points consult the
//! checkpoint arena, every instruction is checked by the transfer functions in
//! [`crate::check`], and the run ends when the stack drains, a check fails or a
//! budget runs out.

use crate::analysis::prune::{is_state_visited, PruneParams, StateVisitResult};
use crate::check::{
    check_alu, check_cond_jmp, check_exit, check_helper_call, check_ld_imm64, check_load,
    check_store, check_subprog_call, ExitAction, JumpDecision,
};
use crate::core::error::{Result, VerifierError};
use crate::core::insn::*;
use crate::core::insn_verify::check_structure;
use crate::core::log::{
    fmt_state, log_call, log_checkpoint, log_error, log_insn, log_nospec, log_prune,
    log_state_pop, log_state_push,
};
use crate::platform::PlatformSpec;
use crate::sanitize::insert_barriers;
use crate::state::verifier_state::VerifierState;
use crate::stdlib::{format, String, ToString, Vec};
use crate::verifier::env::VerifierEnv;
use crate::verifier::result::{
    FailureInfo, SuccessInfo, VerificationOutcome, MSG_INSN_BUDGET, MSG_STATE_BUDGET,
    MSG_WORK_STACK,
};

/// Effect of one instruction on the current path
#[derive(Debug)]
enum InsnResult {
    /// Continue at this index
    Next(usize),
    /// The current path is finished
    PathEnd,
}

/// Depth-first explorer over one [`VerifierEnv`]
///
/// # Example
///
/// ```ignore
/// let mut env = VerifierEnv::new(platform, insns, VerifierConfig::default());
/// let outcome = MainVerifier::new(&mut env).verify();
/// assert!(outcome.is_success());
/// ```
pub struct MainVerifier<'a, P: PlatformSpec> {
    /// Verifier environment
    pub env: &'a mut VerifierEnv<P>,
    /// Deferred branch successors
    stack: Vec<VerifierState>,
}

impl<'a, P: PlatformSpec> MainVerifier<'a, P> {
    /// Create a verifier over `env`.
    pub fn new(env: &'a mut VerifierEnv<P>) -> Self {
        Self {
            env,
            stack: Vec::new(),
        }
    }

    /// Run verification to a verdict.
    ///
    /// 运行验证直到得出结论。
    pub fn verify(&mut self) -> VerificationOutcome {
        match self.run() {
            Ok(info) => VerificationOutcome::Success(info),
            Err(failure) => VerificationOutcome::from_error(
                failure.error,
                failure.insn_idx,
                failure.trace,
                self.env.stats.clone(),
            ),
        }
    }

    fn run(&mut self) -> core::result::Result<SuccessInfo, FailureInfo> {
        let platform = &self.env.platform;
        let layout = check_structure(&self.env.insns, self.env.config.max_insns, |id| {
            platform.lookup_map(id).is_some()
        })
        .map_err(|e| self.fail_static(e))?;
        self.env.layout = layout;

        self.do_check()?;

        self.check_call_chains().map_err(|e| self.fail_static(e))?;
        let rewritten = insert_barriers(&self.env.insns, &self.env.insn_aux)
            .map_err(|e| self.fail_static(e))?;
        let stack_depths = (0..self.env.layout.subprogs.len())
            .map(|i| self.env.stack_depth_of(i))
            .collect();

        let summary = self.env.stats.summary();
        self.env.log.info(&summary);
        Ok(SuccessInfo {
            stats: self.env.stats.clone(),
            rewritten,
            stack_depths,
        })
    }

    /// Failure raised outside path exploration
    fn fail_static(&mut self, error: VerifierError) -> FailureInfo {
        let insn_idx = match &error {
            VerifierError::InvalidInstruction(i)
            | VerifierError::InvalidJumpTarget(i)
            | VerifierError::FallThroughExit(i) => *i,
            VerifierError::JumpOutOfRange { from, .. } => *from,
            _ => 0,
        };
        log_error(&mut self.env.log, insn_idx, &error.to_string());
        FailureInfo {
            error,
            insn_idx,
            trace: String::new(),
        }
    }

    /// Main exploration loop.
    fn do_check(&mut self) -> core::result::Result<(), FailureInfo> {
        let mut cur = VerifierState::new_entry();
        self.env.stats.total_states = 1;

        loop {
            let idx = cur.insn_idx;
            let end = match self.do_check_insn(&mut cur) {
                Ok(InsnResult::Next(next)) => {
                    cur.insn_idx = next;
                    false
                }
                Ok(InsnResult::PathEnd) => true,
                Err(e) if cur.speculative && e.is_recoverable_with_nospec() => {
                    self.env.mark_nospec(idx);
                    log_nospec(&mut self.env.log, idx, &e.to_string());
                    true
                }
                Err(e) => {
                    log_error(&mut self.env.log, idx, &e.to_string());
                    return Err(FailureInfo {
                        error: e,
                        insn_idx: idx,
                        trace: fmt_state(&cur),
                    });
                }
            };
            if !end {
                continue;
            }

            self.env
                .arena
                .update_branch_counts(cur.parent)
                .map_err(|e| FailureInfo {
                    error: e,
                    insn_idx: idx,
                    trace: String::new(),
                })?;
            match self.stack.pop() {
                Some(next) => {
                    cur = next;
                    log_state_pop(&mut self.env.log, cur.insn_idx, self.stack.len());
                }
                None => return Ok(()),
            }
        }
    }

    /// Process the instruction `cur` is about to execute.
    fn do_check_insn(&mut self, cur: &mut VerifierState) -> Result<InsnResult> {
        let idx = cur.insn_idx;
        if self.env.stats.insns_processed >= self.env.config.insn_budget {
            return Err(VerifierError::TooComplex(MSG_INSN_BUDGET.to_string()));
        }
        self.env.stats.insns_processed += 1;

        let insn = *self
            .env
            .insn(idx)
            .ok_or_else(|| VerifierError::Internal(format!("insn {} out of range", idx)))?;

        if self.env.layout.is_prune_point(idx) {
            let params = PruneParams {
                prune: self.env.config.prune,
                max_states_per_insn: self.env.config.max_states_per_insn,
            };
            match is_state_visited(&mut self.env.arena, cur, params, &mut self.env.stats)? {
                StateVisitResult::Prune(id) => {
                    log_prune(&mut self.env.log, idx, id);
                    return Ok(InsnResult::PathEnd);
                }
                StateVisitResult::Explore(id) => log_checkpoint(&mut self.env.log, idx, id),
                StateVisitResult::ExploreNoCache => {}
            }
        }

        log_insn(&mut self.env.log, &insn, idx, cur);

        match insn.class() {
            VM_ALU | VM_ALU64 => {
                check_alu(self.env, cur, &insn, idx)?;
                Ok(InsnResult::Next(idx + 1))
            }
            VM_LDX => {
                check_load(self.env, cur, &insn, idx)?;
                Ok(InsnResult::Next(idx + 1))
            }
            VM_ST if insn.is_nospec() => Ok(InsnResult::Next(idx + 1)),
            VM_ST | VM_STX => {
                check_store(self.env, cur, &insn, idx)?;
                Ok(InsnResult::Next(idx + 1))
            }
            VM_LD => {
                let next = *self
                    .env
                    .insn(idx + 1)
                    .ok_or(VerifierError::InvalidInstruction(idx))?;
                check_ld_imm64(self.env, cur, &insn, &next)?;
                Ok(InsnResult::Next(idx + 2))
            }
            VM_JMP | VM_JMP32 => self.check_jmp(cur, &insn, idx),
            _ => Err(VerifierError::InvalidInstruction(idx)),
        }
    }

    fn check_jmp(&mut self, cur: &mut VerifierState, insn: &Insn, idx: usize) -> Result<InsnResult> {
        if insn.is_ja() {
            return Ok(InsnResult::Next(insn.jmp_target(idx) as usize));
        }
        if insn.is_helper_call() {
            log_call(&mut self.env.log, idx, insn, cur.frames.len());
            check_helper_call(self.env, cur, insn, idx)?;
            return Ok(InsnResult::Next(idx + 1));
        }
        if insn.is_pseudo_call() {
            let target = check_subprog_call(self.env, cur, insn, idx)?;
            return Ok(InsnResult::Next(target));
        }
        if insn.is_exit() {
            return Ok(match check_exit(self.env, cur, idx)? {
                ExitAction::PathEnd | ExitAction::ProgramExit => InsnResult::PathEnd,
                ExitAction::Return(next) => InsnResult::Next(next),
            });
        }

        let target = insn.jmp_target(idx) as usize;
        match check_cond_jmp(self.env, cur, insn, idx)? {
            JumpDecision::FallThrough => {
                if self.env.config.explores_speculative() && !cur.speculative {
                    self.push_speculative(cur, idx, target)?;
                }
                Ok(InsnResult::Next(idx + 1))
            }
            JumpDecision::Taken => {
                if self.env.config.explores_speculative() && !cur.speculative {
                    self.push_speculative(cur, idx, idx + 1)?;
                }
                Ok(InsnResult::Next(target))
            }
            JumpDecision::Both(mut taken) => {
                taken.insn_idx = target;
                self.push_stack(*taken, idx)?;
                Ok(InsnResult::Next(idx + 1))
            }
            JumpDecision::Infeasible => Ok(InsnResult::PathEnd),
        }
    }

    /// Defer the direction a known-outcome jump cannot take
    ///
    /// Only taken from architectural paths; a speculative path does not fork
    /// further speculative paths.
    fn push_speculative(&mut self, cur: &VerifierState, idx: usize, target: usize) -> Result<()> {
        let mut st = cur.clone();
        st.speculative = true;
        st.insn_idx = target;
        self.push_stack(st, idx)?;
        self.env.stats.speculative_paths += 1;
        Ok(())
    }

    /// Defer a branch successor.
    fn push_stack(&mut self, state: VerifierState, from: usize) -> Result<()> {
        if self.stack.len() >= self.env.config.max_pending {
            return Err(VerifierError::TooComplex(MSG_WORK_STACK.to_string()));
        }
        if self.env.stats.total_states >= self.env.config.state_budget {
            return Err(VerifierError::TooComplex(MSG_STATE_BUDGET.to_string()));
        }
        self.env.arena.add_branch(state.parent);
        self.env.stats.total_states += 1;
        let (target, speculative) = (state.insn_idx, state.speculative);
        self.stack.push(state);
        self.env.stats.note_pending(self.stack.len());
        log_state_push(&mut self.env.log, from, target, self.stack.len(), speculative);
        Ok(())
    }

    /// Re-check stack use along every recorded call chain
    /// 沿调用图重新检查栈深度
    ///
    /// Each function is charged the deepest stack it reached on any path,
    /// so chains that were never active together on one path are covered
    /// too.
    fn check_call_chains(&self) -> Result<()> {
        let budget = self.env.config.stack_budget;
        let mut on_path = Vec::new();
        let depth = self.chain_depth(0, &mut on_path);
        if depth > budget {
            return Err(VerifierError::StackBudgetExceeded { depth, budget });
        }
        Ok(())
    }

    fn chain_depth(&self, subprog: usize, on_path: &mut Vec<usize>) -> u32 {
        on_path.push(subprog);
        let deepest = self
            .env
            .call_edges
            .iter()
            .filter(|(caller, callee)| *caller == subprog && !on_path.contains(callee))
            .map(|&(_, callee)| callee)
            .collect::<Vec<_>>()
            .into_iter()
            .map(|callee| self.chain_depth(callee, on_path))
            .max()
            .unwrap_or(0);
        on_path.pop();
        self.env.stack_depth_of(subprog) + deepest
    }
}
