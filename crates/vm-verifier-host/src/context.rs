// SPDX-License-Identifier: GPL-2.0

//! Host 上下文结构定义模块
//!
//! Host context structure definition.
//!
//! 程序入口时 R1 指向该结构。
//!
//! R1 points at this structure on entry. Only `mark` may be written.
//!
//! | Offset | Size | Field      | Kind          |
//! |--------|------|------------|---------------|
//! | 0      | 4    | `data`     | packet start  |
//! | 4      | 4    | `data_end` | packet end    |
//! | 8      | 4    | `len`      | scalar        |
//! | 12     | 4    | `mark`     | scalar, rw    |
//! | 16     | 4    | `ifindex`  | scalar        |
//! | 24     | 8    | `cookie`   | scalar        |

use vm_verifier_core::platform::{ContextProvider, CtxField, CtxFieldKind};

/// Size of the context structure in bytes
pub const CTX_SIZE: u32 = 32;

/// Host context provider.
#[derive(Clone, Debug, Default)]
pub struct HostContextProvider;

impl HostContextProvider {
    /// Create a new host context provider.
    pub fn new() -> Self {
        Self
    }
}

impl ContextProvider for HostContextProvider {
    fn ctx_size(&self) -> u32 {
        CTX_SIZE
    }

    fn fields(&self) -> &[CtxField] {
        HOST_CTX_FIELDS
    }
}

static HOST_CTX_FIELDS: &[CtxField] = &[
    CtxField::new(0, 4, "data", CtxFieldKind::PacketStart),
    CtxField::new(4, 4, "data_end", CtxFieldKind::PacketEnd),
    CtxField::new(8, 4, "len", CtxFieldKind::Scalar),
    CtxField::new(12, 4, "mark", CtxFieldKind::Scalar).writable(),
    CtxField::new(16, 4, "ifindex", CtxFieldKind::Scalar),
    CtxField::new(24, 8, "cookie", CtxFieldKind::Scalar),
];
