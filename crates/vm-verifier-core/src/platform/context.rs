// SPDX-License-Identifier: GPL-2.0

//! Context provider trait and types.
//!
//! The context is the structure R1 points at on entry. The platform lists
//! its fields; the verifier allows only loads and stores that match one
//! field exactly, and gives the loaded register the field's kind.

use super::types::{PlatformError, PlatformResult};

/// What a context field holds
/// 上下文字段的内容类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CtxFieldKind {
    /// Plain integer
    Scalar,
    /// Start of packet data
    PacketStart,
    /// End of packet data
    PacketEnd,
}

/// One field of the context structure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CtxField {
    /// Offset from the context base
    pub offset: u32,
    /// Size in bytes
    pub size: u32,
    /// Human-readable field name
    pub name: &'static str,
    /// Register kind produced by a load
    pub kind: CtxFieldKind,
    /// Whether programs may store to it
    pub writable: bool,
}

impl CtxField {
    /// Read-only field
    pub const fn new(offset: u32, size: u32, name: &'static str, kind: CtxFieldKind) -> Self {
        Self {
            offset,
            size,
            name,
            kind,
            writable: false,
        }
    }

    /// Builder: allow stores
    pub const fn writable(mut self) -> Self {
        self.writable = true;
        self
    }
}

/// Provider trait for the context layout.
pub trait ContextProvider: Clone + Send + Sync {
    /// Size of the context structure in bytes
    fn ctx_size(&self) -> u32;

    /// All fields, in offset order
    fn fields(&self) -> &[CtxField];

    /// The field matched exactly by an access of `size` bytes at `offset`
    /// 查找与访问完全匹配的字段
    fn field_at(&self, offset: i64, size: u32) -> PlatformResult<&CtxField> {
        self.fields()
            .iter()
            .find(|f| f.offset as i64 == offset && f.size == size)
            .ok_or(PlatformError::ContextFieldNotFound { offset, size })
    }

    /// Validate an access and return the field it touches
    fn check_access(&self, offset: i64, size: u32, is_write: bool) -> PlatformResult<&CtxField> {
        let field = self.field_at(offset, size)?;
        if is_write && !(field.writable && field.kind == CtxFieldKind::Scalar) {
            return Err(PlatformError::ContextAccessDenied { field: field.name });
        }
        Ok(field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone)]
    struct TwoFields;

    static FIELDS: [CtxField; 2] = [
        CtxField::new(0, 4, "data", CtxFieldKind::PacketStart),
        CtxField::new(4, 4, "mark", CtxFieldKind::Scalar).writable(),
    ];

    impl ContextProvider for TwoFields {
        fn ctx_size(&self) -> u32 {
            8
        }

        fn fields(&self) -> &[CtxField] {
            &FIELDS
        }
    }

    #[test]
    fn test_exact_match_only() {
        assert_eq!(TwoFields.field_at(0, 4).unwrap().name, "data");
        assert!(TwoFields.field_at(0, 2).is_err());
        assert!(TwoFields.field_at(2, 4).is_err());
    }

    #[test]
    fn test_write_permission() {
        assert!(TwoFields.check_access(4, 4, true).is_ok());
        assert_eq!(
            TwoFields.check_access(0, 4, true).unwrap_err(),
            PlatformError::ContextAccessDenied { field: "data" }
        );
    }
}
