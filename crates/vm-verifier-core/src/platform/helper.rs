// SPDX-License-Identifier: GPL-2.0

//! 辅助函数表
//!
//! A host lists the privileged operations a program may call. Each entry
//! fixes the argument kinds, the return kind and whether the call acquires
//! or releases a handle.

use bitflags::bitflags;

use super::types::{PlatformError, PlatformResult};
use crate::core::types::{ArgType, RetType};

bitflags! {
    /// Handle effects of a helper call
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct HelperFlags: u8 {
        /// Return value carries a fresh handle that must be released
        const ACQUIRE = 1 << 0;
        /// One argument hands a handle back to the host
        const RELEASE = 1 << 1;
    }
}

/// Definition of a helper function.
/// 辅助函数定义
#[derive(Debug, Clone)]
pub struct HelperDef {
    /// Unique function ID
    pub func_id: u32,
    /// Human-readable function name
    pub name: &'static str,
    /// Return type
    pub ret_type: RetType,
    /// Argument types (up to 5 arguments)
    pub arg_types: [ArgType; 5],
    /// Behavioral flags
    pub flags: HelperFlags,
}

impl HelperDef {
    /// Create a new helper definition.
    pub const fn new(func_id: u32, name: &'static str, ret_type: RetType, arg_types: [ArgType; 5]) -> Self {
        Self {
            func_id,
            name,
            ret_type,
            arg_types,
            flags: HelperFlags::empty(),
        }
    }

    /// Builder: set flags
    pub const fn with_flags(mut self, flags: HelperFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Get the number of arguments this helper takes.
    pub fn arg_count(&self) -> usize {
        self.arg_types
            .iter()
            .position(|&t| t == ArgType::DontCare)
            .unwrap_or(5)
    }

    /// Whether a successful call hands out a new handle
    pub fn acquires_ref(&self) -> bool {
        self.flags.contains(HelperFlags::ACQUIRE)
    }

    /// Whether the call consumes a handle
    pub fn releases_ref(&self) -> bool {
        self.flags.contains(HelperFlags::RELEASE)
    }

    /// Index of the argument carrying the released reference
    pub fn release_arg(&self) -> Option<usize> {
        if !self.releases_ref() {
            return None;
        }
        self.arg_types.iter().position(|t| t.is_release_arg())
    }
}

/// Provider trait for helper functions.
///
/// # Example
///
/// ```ignore
/// impl HelperProvider for HostHelperProvider {
///     fn lookup(&self, func_id: u32) -> Option<&HelperDef> {
///         HOST_HELPERS.iter().find(|h| h.func_id == func_id)
///     }
///     fn count(&self) -> usize { HOST_HELPERS.len() }
///     fn iter(&self) -> impl Iterator<Item = &HelperDef> { HOST_HELPERS.iter() }
/// }
/// ```
pub trait HelperProvider: Clone + Send + Sync {
    /// Look up a helper function by its ID.
    fn lookup(&self, func_id: u32) -> Option<&HelperDef>;

    /// Get the total number of registered helpers.
    fn count(&self) -> usize;

    /// Iterate over all registered helper functions.
    fn iter(&self) -> impl Iterator<Item = &HelperDef>;

    /// Helper with the given name
    fn lookup_by_name(&self, name: &str) -> Option<&HelperDef> {
        self.iter().find(|h| h.name == name)
    }

    /// Look up a helper, failing if it does not exist
    fn validate_call(&self, func_id: u32) -> PlatformResult<&HelperDef> {
        self.lookup(func_id).ok_or(PlatformError::HelperNotFound(func_id))
    }
}

/// Define a static helper table.
///
/// # Example
///
/// ```ignore
/// static HELPERS: &[HelperDef] = define_helpers! {
///     map_lookup_elem(1) -> RetType::MapValueOrNull => {
///         args: [ConstMapPtr, PtrToMapKey],
///         flags: HelperFlags::empty(),
///     },
/// };
/// ```
#[macro_export]
macro_rules! define_helpers {
    (
        $(
            $name:ident($id:expr) -> $ret:expr => {
                args: [$($arg:ident),* $(,)?],
                flags: $flags:expr $(,)?
            }
        ),* $(,)?
    ) => {
        &[
            $(
                $crate::platform::HelperDef::new(
                    $id,
                    stringify!($name),
                    $ret,
                    $crate::_make_args!($($arg),*),
                ).with_flags($flags)
            ),*
        ]
    };
}

/// Internal macro for creating argument arrays
#[doc(hidden)]
#[macro_export]
macro_rules! _make_args {
    ($($arg:ident),*) => {{
        #[allow(unused_mut)]
        let mut args = [$crate::core::types::ArgType::DontCare; 5];
        let _list: &[$crate::core::types::ArgType] = &[$($crate::core::types::ArgType::$arg),*];
        let mut i = 0;
        while i < _list.len() {
            args[i] = _list[i];
            i += 1;
        }
        args
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_release_arg() {
        let def = HelperDef::new(
            86,
            "sk_release",
            RetType::Void,
            [ArgType::PtrToSocket, ArgType::DontCare, ArgType::DontCare, ArgType::DontCare, ArgType::DontCare],
        )
        .with_flags(HelperFlags::RELEASE);
        assert_eq!(def.arg_count(), 1);
        assert_eq!(def.release_arg(), Some(0));
        assert!(!def.acquires_ref());
    }

    #[test]
    fn test_make_args() {
        let args = crate::_make_args!(ConstMapPtr, PtrToMapKey);
        assert_eq!(args[0], ArgType::ConstMapPtr);
        assert_eq!(args[1], ArgType::PtrToMapKey);
        assert_eq!(args[2], ArgType::DontCare);
    }
}
