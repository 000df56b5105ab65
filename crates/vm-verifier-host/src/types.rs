// SPDX-License-Identifier: GPL-2.0

//! Host object types.

use vm_verifier_core::platform::{TypeDef, TypeProvider};

/// Type id of the task object
pub const TASK_TYPE_ID: u32 = 1;

static HOST_TYPES: &[TypeDef] = &[TypeDef::new(TASK_TYPE_ID, "task", 128)];

/// Host object type provider.
#[derive(Clone, Debug, Default)]
pub struct HostTypeProvider;

impl HostTypeProvider {
    /// Create a new host type provider.
    pub fn new() -> Self {
        Self
    }
}

impl TypeProvider for HostTypeProvider {
    fn lookup(&self, type_id: u32) -> Option<&TypeDef> {
        HOST_TYPES.iter().find(|t| t.type_id == type_id)
    }

    fn iter(&self) -> impl Iterator<Item = &TypeDef> {
        HOST_TYPES.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_type() {
        let types = HostTypeProvider::new();
        assert_eq!(types.lookup_by_name("task").map(|t| t.type_id), Some(TASK_TYPE_ID));
        assert!(types.lookup(2).is_none());
    }
}
