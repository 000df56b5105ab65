// SPDX-License-Identifier: GPL-2.0

//! State pruning at prune points
//! 剪枝点处的状态剪枝
//!
//! At every prune point the current state is first checked against the
//! checkpoints still on its own path (loop detection), then against retired
//! checkpoints (pruning). If neither applies, it becomes a new checkpoint
//! and the current state is re-linked below it.

use crate::analysis::liveness::propagate_liveness;
use crate::analysis::states_equal::{states_equal, CompareMode};
use crate::core::error::{Result, VerifierError};
use crate::state::verifier_state::{StateArena, StateId, VerifierState};
use crate::stdlib::Vec;
use crate::verifier::stats::VerificationStats;

/// Parameters that shape pruning
#[derive(Debug, Clone, Copy)]
pub struct PruneParams {
    /// Compare against retired checkpoints
    pub prune: bool,
    /// Candidate checkpoints kept per instruction
    pub max_states_per_insn: usize,
}

/// What happened at a prune point
/// 剪枝点的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateVisitResult {
    /// Covered by this retired checkpoint; the path ends here
    Prune(StateId),
    /// A new checkpoint was created; exploration continues below it
    Explore(StateId),
    /// Exploration continues without a new checkpoint
    ExploreNoCache,
}

/// Check `cur` at a prune point
/// 在剪枝点检查当前状态
///
/// Fails with [`VerifierError::InfiniteLoop`] when `cur` exactly repeats a
/// checkpoint whose paths are still being explored.
pub fn is_state_visited(
    arena: &mut StateArena,
    cur: &mut VerifierState,
    params: PruneParams,
    stats: &mut VerificationStats,
) -> Result<StateVisitResult> {
    let insn_idx = cur.insn_idx;
    let candidates: Vec<StateId> = arena.states_at(insn_idx).to_vec();

    for &id in &candidates {
        let Some(node) = arena.get(id) else { continue };
        if node.state.branches == 0 {
            continue;
        }
        stats.loop_checks += 1;
        if states_equal(&node.state, cur, CompareMode::Exact) {
            return Err(VerifierError::InfiniteLoop(insn_idx));
        }
    }

    if params.prune {
        let mut hit = None;
        for &id in &candidates {
            let Some(node) = arena.get_mut(id) else { continue };
            if node.state.branches > 0 {
                continue;
            }
            if states_equal(&node.state, cur, CompareMode::Covered) {
                node.hit_cnt += 1;
                hit = Some(id);
                break;
            }
            node.miss_cnt += 1;
            stats.prune_misses += 1;
        }
        if let Some(id) = hit {
            propagate_liveness(arena, id, cur);
            stats.prune_hits += 1;
            return Ok(StateVisitResult::Prune(id));
        }
        stats.states_evicted += arena.evict_useless(insn_idx);
    }

    if arena.states_at(insn_idx).len() >= params.max_states_per_insn {
        return Ok(StateVisitResult::ExploreNoCache);
    }

    let mut snapshot = cur.clone();
    snapshot.branches = 1;
    let id = arena.insert(snapshot);
    cur.reparent(id);
    stats.checkpoints += 1;
    Ok(StateVisitResult::Explore(id))
}
