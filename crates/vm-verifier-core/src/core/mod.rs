// SPDX-License-Identifier: GPL-2.0

//! Core types and constants for the verifier.
//! 验证器的核心类型和常量。
//!
//! This module contains the instruction encoding, value kinds, error
//! definitions and the bounded diagnostic log used throughout the verifier.

pub mod error;
pub mod insn;
pub mod insn_verify;
pub mod log;
pub mod types;

pub use error::*;
pub use insn::*;
pub use log::*;
pub use types::*;
