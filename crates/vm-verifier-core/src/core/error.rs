// SPDX-License-Identifier: GPL-2.0

//! Error types for the verifier
//! 验证器的错误类型

use crate::stdlib::String;

#[cfg(not(feature = "std"))]
use core::fmt;

#[cfg(feature = "std")]
use thiserror::Error;

/// Result type alias for verifier operations
pub type Result<T> = core::result::Result<T, VerifierError>;

/// Errors that can occur during program verification
/// 程序验证期间可能发生的错误
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(Error))]
pub enum VerifierError {
    #[cfg_attr(feature = "std", error("empty program"))]
    EmptyProgram,

    #[cfg_attr(feature = "std", error("program too large: {0} instructions"))]
    ProgramTooLarge(usize),

    #[cfg_attr(feature = "std", error("invalid instruction at index {0}"))]
    InvalidInstruction(usize),

    #[cfg_attr(feature = "std", error("invalid register {0}"))]
    InvalidRegister(u8),

    #[cfg_attr(feature = "std", error("jump out of range from insn {from} to {target}"))]
    JumpOutOfRange { from: usize, target: i64 },

    #[cfg_attr(feature = "std", error("invalid jump target {0}"))]
    InvalidJumpTarget(usize),

    #[cfg_attr(feature = "std", error("function ending at insn {0} falls through"))]
    FallThroughExit(usize),

    #[cfg_attr(feature = "std", error("map {0} is not known to the platform"))]
    UnknownMap(u32),

    #[cfg_attr(feature = "std", error("register {0} not initialized"))]
    UninitializedRegister(u8),

    #[cfg_attr(feature = "std", error("invalid memory access: {0}"))]
    InvalidMemoryAccess(String),

    #[cfg_attr(feature = "std", error("invalid stack access at offset {0}"))]
    StackOutOfBounds(i64),

    #[cfg_attr(feature = "std", error("invalid context access: {0}"))]
    InvalidContextAccess(String),

    #[cfg_attr(feature = "std", error("type mismatch: expected {expected}, got {got}"))]
    TypeMismatch { expected: String, got: String },

    #[cfg_attr(feature = "std", error("invalid pointer arithmetic: {0}"))]
    InvalidPointerArithmetic(String),

    #[cfg_attr(feature = "std", error("pointer leak: {0}"))]
    PointerLeak(String),

    #[cfg_attr(feature = "std", error("unreleased reference id={ref_id} acquired at insn {acquired_at}"))]
    UnreleasedReference { ref_id: u32, acquired_at: usize },

    #[cfg_attr(feature = "std", error("program too complex: {0}"))]
    TooComplex(String),

    #[cfg_attr(feature = "std", error("infinite loop detected at insn {0}"))]
    InfiniteLoop(usize),

    #[cfg_attr(feature = "std", error("invalid helper call: {0}"))]
    InvalidHelperCall(String),

    #[cfg_attr(feature = "std", error("unknown helper function {0}"))]
    UnknownHelper(u32),

    #[cfg_attr(feature = "std", error("release of unknown reference id={0}"))]
    InvalidReference(u32),

    #[cfg_attr(feature = "std", error("call stack too deep: {0} frames"))]
    CallStackOverflow(usize),

    #[cfg_attr(feature = "std", error("recursive call to function at insn {0}"))]
    RecursiveCall(usize),

    #[cfg_attr(feature = "std", error("invalid return: {0}"))]
    InvalidReturn(String),

    #[cfg_attr(feature = "std", error("combined stack size {depth} exceeds budget {budget}"))]
    StackBudgetExceeded { depth: u32, budget: u32 },

    #[cfg_attr(feature = "std", error("internal verifier error: {0}"))]
    Internal(String),
}

/// Coarse error taxonomy
/// 粗粒度错误分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorKind {
    /// Out-of-bounds, uninitialized or misaligned memory reference
    InvalidAccess,
    /// Operand kind invalid for the operation or helper signature
    TypeMismatch,
    /// Reference leak reaching a return
    UnreleasedResource,
    /// Analysis budget exhausted, including suspected unbounded loops
    TooComplex,
    /// Call depth, stack budget or calling convention violation
    InvalidCall,
    /// Rejected by the structural pass before exploration
    Malformed,
    /// Verifier bug
    Internal,
}

impl VerifierError {
    /// Map this error onto the coarse taxonomy
    pub fn kind(&self) -> ErrorKind {
        use VerifierError::*;
        match self {
            EmptyProgram
            | ProgramTooLarge(_)
            | InvalidInstruction(_)
            | InvalidRegister(_)
            | JumpOutOfRange { .. }
            | InvalidJumpTarget(_)
            | FallThroughExit(_)
            | UnknownMap(_) => ErrorKind::Malformed,
            UninitializedRegister(_)
            | InvalidMemoryAccess(_)
            | StackOutOfBounds(_)
            | InvalidContextAccess(_) => ErrorKind::InvalidAccess,
            TypeMismatch { .. } | InvalidPointerArithmetic(_) | PointerLeak(_) => {
                ErrorKind::TypeMismatch
            }
            UnreleasedReference { .. } => ErrorKind::UnreleasedResource,
            TooComplex(_) | InfiniteLoop(_) => ErrorKind::TooComplex,
            InvalidHelperCall(_)
            | UnknownHelper(_)
            | InvalidReference(_)
            | CallStackOverflow(_)
            | RecursiveCall(_)
            | InvalidReturn(_)
            | StackBudgetExceeded { .. } => ErrorKind::InvalidCall,
            Internal(_) => ErrorKind::Internal,
        }
    }

    /// Analysis ran out of budget rather than finding a defect
    pub fn is_resource_exhaustion(&self) -> bool {
        self.kind() == ErrorKind::TooComplex
    }

    /// Errors a speculative path may turn into a barrier instead of a rejection
    /// 推测路径可以通过插入屏障而非拒绝来处理的错误
    pub fn is_recoverable_with_nospec(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::InvalidAccess | ErrorKind::TypeMismatch
        )
    }
}

#[cfg(not(feature = "std"))]
impl fmt::Display for VerifierError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerifierError::EmptyProgram => write!(f, "empty program"),
            VerifierError::ProgramTooLarge(n) => write!(f, "program too large: {} instructions", n),
            VerifierError::InvalidInstruction(i) => write!(f, "invalid instruction at index {}", i),
            VerifierError::InvalidRegister(r) => write!(f, "invalid register {}", r),
            VerifierError::JumpOutOfRange { from, target } => {
                write!(f, "jump out of range from insn {} to {}", from, target)
            }
            VerifierError::InvalidJumpTarget(t) => write!(f, "invalid jump target {}", t),
            VerifierError::FallThroughExit(i) => write!(f, "function ending at insn {} falls through", i),
            VerifierError::UnknownMap(m) => write!(f, "map {} is not known to the platform", m),
            VerifierError::UninitializedRegister(r) => write!(f, "register {} not initialized", r),
            VerifierError::InvalidMemoryAccess(s) => write!(f, "invalid memory access: {}", s),
            VerifierError::StackOutOfBounds(o) => write!(f, "invalid stack access at offset {}", o),
            VerifierError::InvalidContextAccess(s) => write!(f, "invalid context access: {}", s),
            VerifierError::TypeMismatch { expected, got } => {
                write!(f, "type mismatch: expected {}, got {}", expected, got)
            }
            VerifierError::InvalidPointerArithmetic(s) => write!(f, "invalid pointer arithmetic: {}", s),
            VerifierError::PointerLeak(s) => write!(f, "pointer leak: {}", s),
            VerifierError::UnreleasedReference { ref_id, acquired_at } => write!(
                f,
                "unreleased reference id={} acquired at insn {}",
                ref_id, acquired_at
            ),
            VerifierError::TooComplex(s) => write!(f, "program too complex: {}", s),
            VerifierError::InfiniteLoop(i) => write!(f, "infinite loop detected at insn {}", i),
            VerifierError::InvalidHelperCall(s) => write!(f, "invalid helper call: {}", s),
            VerifierError::UnknownHelper(id) => write!(f, "unknown helper function {}", id),
            VerifierError::InvalidReference(id) => write!(f, "release of unknown reference id={}", id),
            VerifierError::CallStackOverflow(n) => write!(f, "call stack too deep: {} frames", n),
            VerifierError::RecursiveCall(i) => write!(f, "recursive call to function at insn {}", i),
            VerifierError::InvalidReturn(s) => write!(f, "invalid return: {}", s),
            VerifierError::StackBudgetExceeded { depth, budget } => {
                write!(f, "combined stack size {} exceeds budget {}", depth, budget)
            }
            VerifierError::Internal(s) => write!(f, "internal verifier error: {}", s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stdlib::ToString;

    #[test]
    fn test_kind_taxonomy() {
        assert_eq!(VerifierError::EmptyProgram.kind(), ErrorKind::Malformed);
        assert_eq!(
            VerifierError::InvalidMemoryAccess("x".to_string()).kind(),
            ErrorKind::InvalidAccess
        );
        assert_eq!(
            VerifierError::UnreleasedReference { ref_id: 1, acquired_at: 3 }.kind(),
            ErrorKind::UnreleasedResource
        );
        assert_eq!(VerifierError::InfiniteLoop(4).kind(), ErrorKind::TooComplex);
        assert_eq!(VerifierError::RecursiveCall(2).kind(), ErrorKind::InvalidCall);
    }

    #[test]
    fn test_resource_exhaustion_is_distinct() {
        assert!(VerifierError::TooComplex("budget".to_string()).is_resource_exhaustion());
        assert!(!VerifierError::StackOutOfBounds(-520).is_resource_exhaustion());
    }

    #[test]
    fn test_nospec_recoverable() {
        assert!(VerifierError::PointerLeak("r1".to_string()).is_recoverable_with_nospec());
        assert!(VerifierError::UninitializedRegister(3).is_recoverable_with_nospec());
        assert!(!VerifierError::InvalidReference(7).is_recoverable_with_nospec());
    }
}
