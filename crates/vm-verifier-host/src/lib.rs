// SPDX-License-Identifier: GPL-2.0

//! # VM Verifier Host Platform
//!
//! Reference host platform for the verifier.
//!
//! This crate provides:
//! - the helper table (map access, time and randomness, sockets, ring buffers, tasks)
//! - a builder-configured map registry
//! - the object type table
//! - the context layout seen through R1
//!
//! ## Usage
//!
//! ```ignore
//! use vm_verifier_core::prelude::*;
//! use vm_verifier_host::HostPlatform;
//!
//! let platform = HostPlatform::new().with_map(MapDef::hash(1, 4, 8, 1024));
//! let output = verify_program(platform, insns, VerifierConfig::default());
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

extern crate alloc;

// Re-export core crate for convenience
pub use vm_verifier_core as core;

mod spec;

pub use spec::HostPlatform;

// Platform provider implementations
mod context;
mod helper_db;
mod map_types;
mod types;

pub use context::{HostContextProvider, CTX_SIZE};
pub use helper_db::{helper_ids, HostHelperProvider};
pub use map_types::HostMapProvider;
pub use types::{HostTypeProvider, TASK_TYPE_ID};
