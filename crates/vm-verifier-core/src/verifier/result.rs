// SPDX-License-Identifier: GPL-2.0

//! 验证结果模块
//!
//! Verification result reporting.
//!
//! # 结果类型 / Result Types
//!
//! - **成功 / Success**: 统计信息、改写后的程序、各函数栈深度
//! - **失败 / Failure**: 错误、失败指令、失败前的状态
//! - **中止 / Aborted**: 资源耗尽的原因

use crate::core::error::{ErrorKind, VerifierError};
use crate::core::insn::Insn;
use crate::stdlib::{String, Vec};
use crate::verifier::stats::VerificationStats;
use core::fmt;

/// Overall verification result
#[derive(Debug, Clone)]
pub enum VerificationOutcome {
    /// Program passed verification
    Success(SuccessInfo),
    /// Program failed verification
    Failure(FailureInfo),
    /// Verification ran out of budget
    Aborted(AbortInfo),
}

impl VerificationOutcome {
    /// Build the outcome for an error raised at `insn_idx`
    ///
    /// Budget errors become [`VerificationOutcome::Aborted`] and keep the
    /// statistics of the run; everything else is a plain failure.
    pub fn from_error(
        error: VerifierError,
        insn_idx: usize,
        trace: String,
        stats: VerificationStats,
    ) -> Self {
        let failure = FailureInfo {
            error,
            insn_idx,
            trace,
        };
        match AbortReason::classify(&failure.error) {
            Some(reason) => VerificationOutcome::Aborted(AbortInfo {
                reason,
                failure,
                stats,
            }),
            None => VerificationOutcome::Failure(failure),
        }
    }

    /// Check if verification succeeded
    pub fn is_success(&self) -> bool {
        matches!(self, VerificationOutcome::Success(_))
    }

    /// Check if verification failed
    pub fn is_failure(&self) -> bool {
        matches!(self, VerificationOutcome::Failure(_))
    }

    /// Check if verification was aborted
    pub fn is_aborted(&self) -> bool {
        matches!(self, VerificationOutcome::Aborted(_))
    }

    /// Get the error if this is a failure or abort
    pub fn error(&self) -> Option<&VerifierError> {
        self.failure().map(|f| &f.error)
    }

    /// Failure details of a rejected or aborted run
    pub fn failure(&self) -> Option<&FailureInfo> {
        match self {
            VerificationOutcome::Success(_) => None,
            VerificationOutcome::Failure(info) => Some(info),
            VerificationOutcome::Aborted(info) => Some(&info.failure),
        }
    }

    /// Coarse kind of the error, if any
    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error().map(VerifierError::kind)
    }
}

/// Information about successful verification
#[derive(Debug, Clone, Default)]
pub struct SuccessInfo {
    /// Verification statistics
    pub stats: VerificationStats,
    /// Program with speculation barriers, when any were inserted
    pub rewritten: Option<Vec<Insn>>,
    /// Maximum stack depth reached by each function, in bytes
    pub stack_depths: Vec<u32>,
}

/// Information about failed verification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureInfo {
    /// The error that caused the failure
    pub error: VerifierError,
    /// Instruction index where the error occurred
    pub insn_idx: usize,
    /// State immediately before the failing instruction
    pub trace: String,
}

/// Information about aborted verification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbortInfo {
    /// Reason for abort
    pub reason: AbortReason,
    /// Error and location where the budget ran out
    pub failure: FailureInfo,
    /// Counters at the point of abort
    pub stats: VerificationStats,
}

/// Reason verification was aborted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    /// Instruction-processing budget exhausted
    InsnBudget,
    /// Path budget exhausted
    StateBudget,
    /// A state repeated exactly on its own path
    Loop,
    /// Pending-work stack too deep
    WorkStack,
}

/// Messages carried by budget errors; matched when classifying
pub(crate) const MSG_INSN_BUDGET: &str = "instruction budget exhausted";
pub(crate) const MSG_STATE_BUDGET: &str = "state budget exhausted";
pub(crate) const MSG_WORK_STACK: &str = "jump sequence too long";

impl AbortReason {
    /// Abort reason for a resource-exhaustion error
    pub fn classify(error: &VerifierError) -> Option<Self> {
        match error {
            VerifierError::InfiniteLoop(_) => Some(AbortReason::Loop),
            VerifierError::TooComplex(msg) => Some(match msg.as_str() {
                MSG_STATE_BUDGET => AbortReason::StateBudget,
                MSG_WORK_STACK => AbortReason::WorkStack,
                _ => AbortReason::InsnBudget,
            }),
            _ => None,
        }
    }
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbortReason::InsnBudget => write!(f, "{}", MSG_INSN_BUDGET),
            AbortReason::StateBudget => write!(f, "{}", MSG_STATE_BUDGET),
            AbortReason::Loop => write!(f, "infinite loop"),
            AbortReason::WorkStack => write!(f, "{}", MSG_WORK_STACK),
        }
    }
}

impl fmt::Display for VerificationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerificationOutcome::Success(info) => {
                write!(f, "accepted: {}", info.stats.summary())
            }
            VerificationOutcome::Failure(info) => {
                write!(f, "rejected at insn {}: {}", info.insn_idx, info.error)
            }
            VerificationOutcome::Aborted(info) => write!(
                f,
                "aborted at insn {} ({}): {}",
                info.failure.insn_idx, info.reason, info.failure.error
            ),
        }
    }
}
