// SPDX-License-Identifier: GPL-2.0

//! 验证器的平台抽象层
//!
//! Platform abstraction layer for the verifier.
//!
//! 本模块定义了平台无关的 trait，验证器通过它们查询宿主提供的表。
//!
//! This module defines the platform-agnostic traits through which the
//! verifier consults the tables a host supplies: helper signatures, map
//! shapes, object types and the context layout.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │              vm-verifier-core (this crate)              │
//! │  ┌─────────────────────────────────────────────────┐   │
//! │  │              PlatformSpec trait                  │   │
//! │  │  ├─ HelperProvider                              │   │
//! │  │  ├─ MapProvider                                 │   │
//! │  │  ├─ TypeProvider                                │   │
//! │  │  └─ ContextProvider                             │   │
//! │  └─────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────┘
//!                            ▲
//!                            │ implements
//!                 ┌──────────┴──────────┐
//!                 │                     │
//!        ┌────────┴───────┐    ┌────────┴───────┐
//!        │  HostPlatform  │    │  NullPlatform  │
//!        │ (vm-verifier-  │    │   (testing)    │
//!        │     host)      │    │                │
//!        └────────────────┘    └────────────────┘
//! ```

/// 平台规范 trait / Platform specification trait
pub mod spec;
/// 辅助函数提供者 / Helper function provider
mod helper;
/// 映射提供者 / Map provider
mod map;
/// 对象类型提供者 / Object type provider
mod object;
/// 上下文提供者定义 / Context provider definitions
pub mod context;
/// 平台无关的类型 / Platform-agnostic types
pub mod types;

// 重新导出所有 trait 和类型
// Re-export all traits and types
pub use context::{ContextProvider, CtxField, CtxFieldKind};
pub use helper::{HelperDef, HelperFlags, HelperProvider};
pub use map::{MapDef, MapProvider, MapType};
pub use object::{TypeDef, TypeProvider};
pub use spec::{
    NullContextProvider, NullHelperProvider, NullMapProvider, NullPlatform, NullTypeProvider,
    PlatformSpec,
};
pub use types::{PlatformError, PlatformResult};
