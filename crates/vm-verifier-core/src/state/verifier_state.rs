// SPDX-License-Identifier: GPL-2.0

//! Verifier state and the checkpoint arena
//! 验证器状态与检查点竞技场
//!
//! A [`VerifierState`] is one point of one exploration path: the active call
//! frames plus bookkeeping that links it to the checkpoint it descends from.
//! Checkpoints live in a [`StateArena`] and are referred to by [`StateId`];
//! every `parent` link, in states and in register values alike, is an index
//! into that arena and always points toward the program entry.
//!
//! 检查点保存在 [`StateArena`] 中，所有 `parent` 链接都是指向竞技场的索引。

use crate::core::error::{Result, VerifierError};
use crate::core::types::*;
use crate::state::frame::Frame;
use crate::state::reg_state::RegValue;
use crate::stdlib::{BTreeMap, Vec};

/// Index of a checkpoint in the [`StateArena`]
pub type StateId = usize;

/// Abstract state of one exploration path
/// 单条探索路径的抽象状态
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifierState {
    /// Active call frames, entry function first
    pub frames: Vec<Frame>,
    /// Checkpoint this state descends from
    pub parent: Option<StateId>,
    /// Unfinished paths below this state (meaningful for checkpoints)
    pub branches: u32,
    /// Only reachable under branch misprediction
    pub speculative: bool,
    /// Instruction this state is about to execute
    pub insn_idx: usize,
}

impl VerifierState {
    /// Program entry: frame 0 with R1 pointing at the context
    /// 程序入口：栈帧 0，R1 指向上下文
    pub fn new_entry() -> Self {
        let mut frame = Frame::new(0, 0, 0);
        frame.regs[1] = RegValue::pointer(RegType::PtrToCtx, 0);
        Self {
            frames: crate::stdlib::vec![frame],
            parent: None,
            branches: 1,
            speculative: false,
            insn_idx: 0,
        }
    }

    /// Index of the innermost frame
    pub fn curframe(&self) -> usize {
        self.frames.len() - 1
    }

    /// Innermost frame
    pub fn cur_frame(&self) -> &Frame {
        &self.frames[self.curframe()]
    }

    /// Innermost frame, mutably
    pub fn cur_frame_mut(&mut self) -> &mut Frame {
        let idx = self.curframe();
        &mut self.frames[idx]
    }

    /// Register `r` of the innermost frame
    pub fn reg(&self, r: usize) -> &RegValue {
        self.cur_frame().reg(r)
    }

    /// Overwrite register `r` of the innermost frame
    pub fn write_reg(&mut self, r: usize, value: &RegValue) {
        self.cur_frame_mut().write_reg(r, value);
    }

    /// Apply `f` to every register and spilled slot in every frame
    pub fn for_each_value_mut(&mut self, mut f: impl FnMut(&mut RegValue)) {
        for frame in self.frames.iter_mut() {
            for value in frame.values_mut() {
                f(value);
            }
        }
    }

    /// Make checkpoint `id` the parent of this state and of all its values
    pub fn reparent(&mut self, id: StateId) {
        self.parent = Some(id);
        for frame in self.frames.iter_mut() {
            frame.reparent(id);
        }
    }

    /// Frame holding reference `id`, searching from the innermost outward
    pub fn find_ref_frame(&self, id: u32) -> Option<usize> {
        self.frames.iter().rposition(|f| f.refs.contains(id))
    }

    /// Outstanding references across all frames
    pub fn total_refs(&self) -> usize {
        self.frames.iter().map(|f| f.refs.len()).sum()
    }
}

/// A checkpoint kept for pruning and liveness
/// 用于剪枝和活跃性的检查点
#[derive(Debug, Clone)]
pub struct StateNode {
    /// Snapshot; `state.branches` counts unfinished descendant paths
    pub state: VerifierState,
    /// Times this checkpoint pruned a path
    pub hit_cnt: u32,
    /// Times it was compared and did not prune
    pub miss_cnt: u32,
}

/// Growable arena of checkpoints, indexed by [`StateId`]
/// 检查点竞技场
///
/// Nodes are never removed, so parent links stay valid for the whole run.
/// Eviction only drops a node from its instruction's candidate list.
#[derive(Debug, Default)]
pub struct StateArena {
    nodes: Vec<StateNode>,
    explored: BTreeMap<usize, Vec<StateId>>,
}

impl StateArena {
    /// Empty arena
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of checkpoints ever created
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// No checkpoints yet
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Checkpoint by id
    pub fn get(&self, id: StateId) -> Option<&StateNode> {
        self.nodes.get(id)
    }

    /// Checkpoint by id, mutably
    pub fn get_mut(&mut self, id: StateId) -> Option<&mut StateNode> {
        self.nodes.get_mut(id)
    }

    /// Store a checkpoint and list it as a candidate at its instruction
    pub fn insert(&mut self, state: VerifierState) -> StateId {
        let id = self.nodes.len();
        self.explored.entry(state.insn_idx).or_default().push(id);
        self.nodes.push(StateNode {
            state,
            hit_cnt: 0,
            miss_cnt: 0,
        });
        id
    }

    /// Candidate checkpoints at `insn_idx`, oldest first
    pub fn states_at(&self, insn_idx: usize) -> &[StateId] {
        self.explored
            .get(&insn_idx)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Record one more unfinished path below `id`
    pub fn add_branch(&mut self, id: Option<StateId>) {
        if let Some(node) = id.and_then(|id| self.nodes.get_mut(id)) {
            node.state.branches += 1;
        }
    }

    /// A path below `start` finished: decrement counts up the parent chain,
    /// stopping at the first checkpoint that still has unfinished paths
    /// 路径结束：沿父链递减分支计数
    pub fn update_branch_counts(&mut self, start: Option<StateId>) -> Result<()> {
        let mut cur = start;
        while let Some(id) = cur {
            let node = self
                .nodes
                .get_mut(id)
                .ok_or_else(|| VerifierError::Internal("dangling state parent".into()))?;
            if node.state.branches == 0 {
                return Err(VerifierError::Internal(
                    "branch count underflow".into(),
                ));
            }
            node.state.branches -= 1;
            if node.state.branches > 0 {
                break;
            }
            cur = node.state.parent;
        }
        Ok(())
    }

    /// Drop retired checkpoints at `insn_idx` that keep missing
    pub fn evict_useless(&mut self, insn_idx: usize) -> usize {
        let nodes = &self.nodes;
        let Some(list) = self.explored.get_mut(&insn_idx) else {
            return 0;
        };
        let before = list.len();
        list.retain(|&id| {
            let n = &nodes[id];
            n.state.branches > 0 || n.miss_cnt <= n.hit_cnt * 3 + 3
        });
        before - list.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_state() {
        let st = VerifierState::new_entry();
        assert_eq!(st.curframe(), 0);
        assert_eq!(st.reg(1).reg_type, RegType::PtrToCtx);
        assert_eq!(st.reg(REG_FP).stack_frameno(), Some(0));
        assert_eq!(st.branches, 1);
    }

    #[test]
    fn test_branch_counts_walk_up() {
        let mut arena = StateArena::new();
        let root = arena.insert(VerifierState::new_entry());
        let mut child_state = VerifierState::new_entry();
        child_state.insn_idx = 4;
        child_state.parent = Some(root);
        let child = arena.insert(child_state);

        // child forks once
        arena.add_branch(Some(child));
        arena.update_branch_counts(Some(child)).unwrap();
        assert_eq!(arena.get(child).unwrap().state.branches, 1);
        assert_eq!(arena.get(root).unwrap().state.branches, 1);

        arena.update_branch_counts(Some(child)).unwrap();
        assert_eq!(arena.get(child).unwrap().state.branches, 0);
        assert_eq!(arena.get(root).unwrap().state.branches, 0);

        assert!(arena.update_branch_counts(Some(root)).is_err());
    }

    #[test]
    fn test_eviction_keeps_nodes() {
        let mut arena = StateArena::new();
        let id = arena.insert(VerifierState::new_entry());
        arena.update_branch_counts(Some(id)).unwrap();
        arena.get_mut(id).unwrap().miss_cnt = 4;
        assert_eq!(arena.evict_useless(0), 1);
        assert!(arena.states_at(0).is_empty());
        assert!(arena.get(id).is_some());
    }

    #[test]
    fn test_find_ref_frame() {
        let mut st = VerifierState::new_entry();
        st.frames[0].refs.acquire(3, 1);
        st.frames.push(Frame::new(5, 1, 1));
        assert_eq!(st.find_ref_frame(3), Some(0));
        assert_eq!(st.find_ref_frame(4), None);
        assert_eq!(st.total_refs(), 1);
    }
}
