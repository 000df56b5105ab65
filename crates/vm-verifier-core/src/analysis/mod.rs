// SPDX-License-Identifier: GPL-2.0

//! Program analysis for the verifier.
//! 验证器的程序分析。
//!
//! This module contains liveness propagation, state equivalence checking
//! and the pruning step run at prune points.
//! 本模块包含活跃性传播、状态等价性检查以及剪枝点处的剪枝步骤。

pub mod liveness;
pub mod prune;
pub mod states_equal;

pub use liveness::*;
pub use prune::*;
pub use states_equal::{regsafe, stackslot_safe, states_equal, states_equal_with_idmap, CompareMode};
