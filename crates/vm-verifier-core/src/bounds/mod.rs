// SPDX-License-Identifier: GPL-2.0

//! Numeric bounds tracking
//! 数值边界追踪
//!
//! [`tnum::Tnum`] tracks knowledge of individual bits, and
//! [`scalar::ScalarBounds`] combines it with signed and unsigned ranges.

pub mod scalar;
pub mod tnum;

pub use scalar::ScalarBounds;
pub use tnum::Tnum;
