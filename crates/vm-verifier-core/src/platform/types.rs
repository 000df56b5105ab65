// SPDX-License-Identifier: GPL-2.0

//! Platform-agnostic type definitions.
//!
//! Errors raised while consulting the platform tables, and their mapping
//! onto verifier errors.

use crate::core::error::VerifierError;
use crate::stdlib::format;

/// Result type for platform operations
pub type PlatformResult<T> = core::result::Result<T, PlatformError>;

/// Platform-level errors
/// 平台层错误
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformError {
    /// Helper function not found
    HelperNotFound(u32),
    /// Map id not registered
    MapNotFound(u32),
    /// Object type id not registered
    TypeNotFound(u32),
    /// Helper cannot operate on this kind of map
    MapHelperMismatch {
        /// Map id
        map_id: u32,
        /// Helper id
        helper_id: u32,
    },
    /// No context field at this offset and size
    ContextFieldNotFound {
        /// Byte offset into the context
        offset: i64,
        /// Access size
        size: u32,
    },
    /// Field exists but the access mode is not allowed
    ContextAccessDenied {
        /// Field name
        field: &'static str,
    },
    /// Generic error with message
    Other(&'static str),
}

impl core::fmt::Display for PlatformError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::HelperNotFound(id) => write!(f, "helper function {} not found", id),
            Self::MapNotFound(id) => write!(f, "map {} not found", id),
            Self::TypeNotFound(id) => write!(f, "object type {} not found", id),
            Self::MapHelperMismatch { map_id, helper_id } => {
                write!(f, "helper {} cannot be used with map {}", helper_id, map_id)
            }
            Self::ContextFieldNotFound { offset, size } => {
                write!(f, "invalid ctx access off={} size={}", offset, size)
            }
            Self::ContextAccessDenied { field } => {
                write!(f, "ctx field {} is read-only", field)
            }
            Self::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl From<PlatformError> for VerifierError {
    fn from(err: PlatformError) -> Self {
        match err {
            PlatformError::HelperNotFound(id) => VerifierError::UnknownHelper(id),
            PlatformError::MapNotFound(id) => VerifierError::UnknownMap(id),
            PlatformError::ContextFieldNotFound { .. } | PlatformError::ContextAccessDenied { .. } => {
                VerifierError::InvalidContextAccess(format!("{}", err))
            }
            PlatformError::TypeNotFound(_)
            | PlatformError::MapHelperMismatch { .. }
            | PlatformError::Other(_) => VerifierError::InvalidHelperCall(format!("{}", err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ErrorKind;

    #[test]
    fn test_error_mapping() {
        let e: VerifierError = PlatformError::HelperNotFound(9).into();
        assert_eq!(e, VerifierError::UnknownHelper(9));
        let e: VerifierError = PlatformError::ContextFieldNotFound { offset: 2, size: 4 }.into();
        assert_eq!(e.kind(), ErrorKind::InvalidAccess);
    }
}
