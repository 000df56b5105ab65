// SPDX-License-Identifier: GPL-2.0

//! Opaque object-type registry.
//!
//! Some helpers return pointers to host objects the program may only read.
//! Each such object type is known by id and fixed size.

/// One registered object type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeDef {
    /// Type id used in helper return kinds
    pub type_id: u32,
    /// Human-readable name
    pub name: &'static str,
    /// Object size in bytes
    pub size: u32,
}

impl TypeDef {
    /// Create a type definition
    pub const fn new(type_id: u32, name: &'static str, size: u32) -> Self {
        Self { type_id, name, size }
    }
}

/// Provider trait for object types.
pub trait TypeProvider: Clone + Send + Sync {
    /// Look up a type by id
    fn lookup(&self, type_id: u32) -> Option<&TypeDef>;

    /// Iterate over all types
    fn iter(&self) -> impl Iterator<Item = &TypeDef>;

    /// Look up a type by name
    fn lookup_by_name(&self, name: &str) -> Option<&TypeDef> {
        self.iter().find(|t| t.name == name)
    }
}
