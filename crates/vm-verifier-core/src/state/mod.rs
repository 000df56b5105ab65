// SPDX-License-Identifier: GPL-2.0

//! State representation for the verifier.
//!
//! This module contains register values, stack slots, call frames,
//! reference tracking, ID mapping and the checkpoint arena.

pub mod frame;
pub mod idmap;
pub mod reference;
pub mod reg_state;
pub mod stack_state;
pub mod verifier_state;

pub use frame::*;
pub use idmap::*;
pub use reference::*;
pub use reg_state::*;
pub use stack_state::*;
pub use verifier_state::*;
