// SPDX-License-Identifier: GPL-2.0

//! # VM Verifier Core
//! # 虚拟机验证器核心库
//!
//! Platform-agnostic static safety verifier for a restricted bytecode VM.
//! 平台无关的受限字节码虚拟机静态安全验证器。
//!
//! Before an untrusted program runs inside a privileged host, the verifier
//! explores every feasible path symbolically and proves that the program
//! cannot touch memory outside proven bounds, cannot leak pointers as
//! integers, cannot loop without bound, cannot call helpers with mistyped
//! arguments and cannot leave acquired handles unreleased.
//! 在不受信任的程序运行于特权宿主之前，验证器以符号方式探索每条可行路径并证明其安全。
//!
//! ## Module Structure
//! ## 模块结构
//!
//! - [`core`]: Instructions, value kinds, errors and the log buffer
//!   指令、值类型、错误和日志缓冲区
//! - [`bounds`]: Tristate numbers and scalar range tracking
//!   三态数和标量范围追踪
//! - [`state`]: Register values, stack slots, frames, references and the state arena
//!   寄存器值、栈槽、栈帧、引用和状态竞技场
//! - [`analysis`]: Liveness propagation, state comparison and pruning
//!   活跃性传播、状态比较和剪枝
//! - [`check`]: Per-instruction transfer functions
//!   逐指令传递函数
//! - [`sanitize`]: Speculation barrier insertion
//!   推测执行屏障插入
//! - [`verifier`]: Structural pass, path explorer, configuration and outcome
//!   结构检查、路径探索器、配置和结果
//! - [`platform`]: Helper, map, object-type and context tables supplied by the host
//!   由宿主提供的辅助函数、映射、对象类型和上下文表
//!
//! ## Usage
//! ## 使用方法
//!
//! ```ignore
//! use vm_verifier_core::prelude::*;
//!
//! let output = verify_program(platform, insns, VerifierConfig::default());
//! if let VerificationOutcome::Success(info) = &output.outcome {
//!     println!("accepted after {} insns", info.stats.insns_processed);
//! }
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

extern crate alloc;

// Re-export alloc types for internal use
// 为内部使用重新导出 alloc 类型
#[allow(unused_imports)]
pub(crate) mod stdlib {
    pub use alloc::boxed::Box;
    pub use alloc::collections::BTreeMap;
    pub use alloc::format;
    pub use alloc::string::{String, ToString};
    pub use alloc::vec;
    pub use alloc::vec::Vec;
}

/// Core types, error definitions, logging and instructions
/// 核心类型、错误定义、日志和指令
pub mod core;

/// Numeric bounds tracking
/// 数值边界追踪
pub mod bounds;

/// State tracking (registers, stack, frames, verifier state)
/// 状态追踪（寄存器、栈、栈帧、验证器状态）
pub mod state;

/// Liveness, state comparison and pruning
/// 活跃性、状态比较和剪枝
pub mod analysis;

/// Instruction checking
/// 指令检查
pub mod check;

/// Speculation barrier insertion
/// 推测屏障插入
pub mod sanitize;

/// Main verifier
/// 主验证器
pub mod verifier;

/// Platform abstraction layer
/// 平台抽象层
pub mod platform;

// ============================================================================
// Prelude - commonly used re-exports
// 预导入 - 常用的重新导出
// ============================================================================

/// Commonly used types and traits
/// 常用的类型和 trait
pub mod prelude {
    // Core types and errors
    // 核心类型和错误
    pub use crate::core::error::{ErrorKind, Result, VerifierError};
    pub use crate::core::insn::*;
    pub use crate::core::log::{LogLevel, VerifierLog};
    pub use crate::core::types::{
        ArgType, Liveness, MapInfo, RegFlags, RegType, RetType, MAX_CALL_FRAMES, MAX_REG,
        MAX_VAR_OFF, REG_SIZE,
    };

    // Bounds types
    // 边界类型
    pub use crate::bounds::scalar::ScalarBounds;
    pub use crate::bounds::tnum::Tnum;

    // State types
    // 状态类型
    pub use crate::state::frame::Frame;
    pub use crate::state::reference::{RefEntry, RefTracker};
    pub use crate::state::reg_state::RegValue;
    pub use crate::state::stack_state::{SlotKind, StackSlot, StackState};
    pub use crate::state::verifier_state::{StateArena, StateId, VerifierState};

    // Verifier
    // 验证器
    pub use crate::verifier::config::VerifierConfig;
    pub use crate::verifier::result::{
        AbortInfo, AbortReason, FailureInfo, SuccessInfo, VerificationOutcome,
    };
    pub use crate::verifier::stats::VerificationStats;
    pub use crate::verifier::{verify_program, MainVerifier, VerifierEnv, VerifierOutput};

    // Platform abstraction
    // 平台抽象
    pub use crate::platform::{
        ContextProvider, CtxField, CtxFieldKind, HelperDef, HelperFlags, HelperProvider, MapDef,
        MapProvider, MapType, NullPlatform, PlatformError, PlatformSpec, TypeDef, TypeProvider,
    };
}

pub use crate::core::error::{Result, VerifierError};
