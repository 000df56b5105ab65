// SPDX-License-Identifier: GPL-2.0

//! # VM Verifier
//! # 虚拟机验证器
//!
//! Convenience crate that re-exports the verifier core and the reference host platform.
//! 便捷库，重新导出验证器核心和参考宿主平台。
//!
//! This crate is a single dependency for verifying programs against the
//! reference host. For a custom host, depend on `vm-verifier-core` directly
//! and implement [`PlatformSpec`](vm_verifier_core::platform::PlatformSpec).
//! 此库为针对参考宿主进行验证提供了单一依赖。
//! 对于自定义宿主，请直接依赖 `vm-verifier-core`。
//!
//! ## Usage
//! ## 使用方法
//!
//! ```ignore
//! use vm_verifier::prelude::*;
//!
//! let platform = HostPlatform::new().with_map(MapDef::hash(1, 4, 8, 1024));
//! let insns = vec![
//!     Insn::new(VM_ALU64 | VM_MOV | VM_K, 0, 0, 0, 0),
//!     Insn::new(VM_JMP | VM_EXIT, 0, 0, 0, 0),
//! ];
//! let output = verify_program(platform, insns, VerifierConfig::default());
//! match output.outcome {
//!     VerificationOutcome::Success(info) => println!("{}", info.stats.summary()),
//!     other => println!("rejected: {:?}\n{}", other, output.log),
//! }
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub use vm_verifier_core::analysis;
pub use vm_verifier_core::bounds;
pub use vm_verifier_core::check;
pub use vm_verifier_core::platform;
pub use vm_verifier_core::sanitize;
pub use vm_verifier_core::state;
pub use vm_verifier_core::verifier;

// Re-export core crate
// 重新导出核心库
pub use vm_verifier_core as core;

// Re-export the host platform
// 重新导出宿主平台
#[cfg(feature = "host")]
pub use vm_verifier_host as host;

#[cfg(feature = "host")]
pub use vm_verifier_host::HostPlatform;

pub use vm_verifier_core::{Result, VerifierError};

/// Core prelude plus the host platform types
/// 核心预导入加上宿主平台类型
pub mod prelude {
    pub use vm_verifier_core::prelude::*;

    #[cfg(feature = "host")]
    pub use vm_verifier_host::{
        helper_ids, HostContextProvider, HostHelperProvider, HostMapProvider, HostPlatform,
        HostTypeProvider, CTX_SIZE, TASK_TYPE_ID,
    };
}
