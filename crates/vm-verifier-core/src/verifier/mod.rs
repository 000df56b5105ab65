// SPDX-License-Identifier: GPL-2.0

//! 主验证器编排模块
//!
//! Main verifier orchestration.
//!
//! 本模块包含验证环境、路径探索主循环、配置、统计和结果报告。
//!
//! This module contains the verification environment, the path-exploration
//! loop, configuration, statistics and result reporting.

/// 配置模块 - 资源限制与模式开关
/// Config module - limits and mode switches
pub mod config;
/// 环境模块 - 单次验证拥有的全部数据
/// Environment module - everything one run owns
pub mod env;
/// 探索器模块 - 深度优先路径探索
/// Explorer module - depth-first path exploration
pub mod explorer;
/// 结果模块 - 验证结果报告
/// Result module - verification result reporting
pub mod result;
/// 统计模块 - 验证统计跟踪
/// Stats module - verification statistics tracking
pub mod stats;

pub use env::{InsnAux, VerifierEnv};
pub use explorer::MainVerifier;

use crate::core::insn::Insn;
use crate::platform::PlatformSpec;
use crate::stdlib::{String, Vec};
use config::VerifierConfig;
use result::VerificationOutcome;

/// Verdict of a run together with its log
#[derive(Debug, Clone)]
pub struct VerifierOutput {
    /// Accepted, rejected or aborted
    pub outcome: VerificationOutcome,
    /// Log text at the configured level
    pub log: String,
    /// Whether the log hit its size limit
    pub log_truncated: bool,
}

/// Verify `insns` against `platform` in one call
/// 一次调用完成验证
///
/// # Example
///
/// ```ignore
/// let output = verify_program(HostPlatform::new(), insns, VerifierConfig::default());
/// assert!(output.outcome.is_success(), "{}", output.log);
/// ```
pub fn verify_program<P: PlatformSpec>(
    platform: P,
    insns: Vec<Insn>,
    config: VerifierConfig,
) -> VerifierOutput {
    let mut env = VerifierEnv::new(platform, insns, config);
    let outcome = MainVerifier::new(&mut env).verify();
    VerifierOutput {
        outcome,
        log: env.log.take(),
        log_truncated: env.log.truncated,
    }
}
