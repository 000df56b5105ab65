// SPDX-License-Identifier: GPL-2.0

//! Host helper function database.
//!
//! Signatures, return kinds and acquire/release flags of every helper the
//! host exposes.

use vm_verifier_core::core::types::RetType;
use vm_verifier_core::define_helpers;
use vm_verifier_core::platform::{HelperDef, HelperFlags, HelperProvider};

/// Helper ids
pub mod helper_ids {
    /// Look up a map element
    pub const MAP_LOOKUP_ELEM: u32 = 1;
    /// Insert or replace a map element
    pub const MAP_UPDATE_ELEM: u32 = 2;
    /// Delete a map element
    pub const MAP_DELETE_ELEM: u32 = 3;
    /// Monotonic time in nanoseconds
    pub const KTIME_GET_NS: u32 = 5;
    /// Pseudo-random number
    pub const GET_PRANDOM_U32: u32 = 7;
    /// Look up a TCP socket by tuple
    pub const SK_LOOKUP_TCP: u32 = 84;
    /// Release a socket handle
    pub const SK_RELEASE: u32 = 86;
    /// Reserve ring buffer space
    pub const RINGBUF_RESERVE: u32 = 131;
    /// Publish a reservation
    pub const RINGBUF_SUBMIT: u32 = 132;
    /// Drop a reservation
    pub const RINGBUF_DISCARD: u32 = 133;
    /// Current task object
    pub const GET_CURRENT_TASK: u32 = 158;
}

/// Host helper provider.
#[derive(Clone, Debug, Default)]
pub struct HostHelperProvider;

impl HostHelperProvider {
    /// Create a new host helper provider.
    pub fn new() -> Self {
        Self
    }
}

impl HelperProvider for HostHelperProvider {
    fn lookup(&self, func_id: u32) -> Option<&HelperDef> {
        HOST_HELPERS.iter().find(|h| h.func_id == func_id)
    }

    fn count(&self) -> usize {
        HOST_HELPERS.len()
    }

    fn iter(&self) -> impl Iterator<Item = &HelperDef> {
        HOST_HELPERS.iter()
    }
}

static HOST_HELPERS: &[HelperDef] = define_helpers! {
    map_lookup_elem(helper_ids::MAP_LOOKUP_ELEM) -> RetType::MapValueOrNull => {
        args: [ConstMapPtr, PtrToMapKey],
        flags: HelperFlags::empty(),
    },
    map_update_elem(helper_ids::MAP_UPDATE_ELEM) -> RetType::Integer => {
        args: [ConstMapPtr, PtrToMapKey, PtrToMapValue, Anything],
        flags: HelperFlags::empty(),
    },
    map_delete_elem(helper_ids::MAP_DELETE_ELEM) -> RetType::Integer => {
        args: [ConstMapPtr, PtrToMapKey],
        flags: HelperFlags::empty(),
    },
    ktime_get_ns(helper_ids::KTIME_GET_NS) -> RetType::Integer => {
        args: [],
        flags: HelperFlags::empty(),
    },
    get_prandom_u32(helper_ids::GET_PRANDOM_U32) -> RetType::Integer => {
        args: [],
        flags: HelperFlags::empty(),
    },
    sk_lookup_tcp(helper_ids::SK_LOOKUP_TCP) -> RetType::SocketOrNull => {
        args: [PtrToCtx, PtrToMem, ConstSize, Anything, Anything],
        flags: HelperFlags::ACQUIRE,
    },
    sk_release(helper_ids::SK_RELEASE) -> RetType::Integer => {
        args: [PtrToSocket],
        flags: HelperFlags::RELEASE,
    },
    ringbuf_reserve(helper_ids::RINGBUF_RESERVE) -> RetType::MemOrNull => {
        args: [ConstMapPtr, ConstAllocSize, Anything],
        flags: HelperFlags::ACQUIRE,
    },
    ringbuf_submit(helper_ids::RINGBUF_SUBMIT) -> RetType::Void => {
        args: [PtrToAllocMem, Anything],
        flags: HelperFlags::RELEASE,
    },
    ringbuf_discard(helper_ids::RINGBUF_DISCARD) -> RetType::Void => {
        args: [PtrToAllocMem, Anything],
        flags: HelperFlags::RELEASE,
    },
    get_current_task(helper_ids::GET_CURRENT_TASK) -> RetType::Object(crate::TASK_TYPE_ID) => {
        args: [],
        flags: HelperFlags::empty(),
    },
};

#[cfg(test)]
mod tests {
    use super::*;
    use vm_verifier_core::core::types::ArgType;

    #[test]
    fn test_signatures() {
        let p = HostHelperProvider::new();
        assert_eq!(p.count(), 11);
        let lookup = p.lookup(helper_ids::MAP_LOOKUP_ELEM).unwrap();
        assert_eq!(lookup.arg_count(), 2);
        assert_eq!(lookup.ret_type, RetType::MapValueOrNull);
        let release = p.lookup(helper_ids::RINGBUF_SUBMIT).unwrap();
        assert_eq!(release.release_arg(), Some(0));
        assert_eq!(release.arg_types[0], ArgType::PtrToAllocMem);
        assert!(p.lookup(helper_ids::SK_LOOKUP_TCP).unwrap().acquires_ref());
        assert_eq!(p.lookup(helper_ids::KTIME_GET_NS).unwrap().arg_count(), 0);
        assert!(p.lookup(4).is_none());
        assert_eq!(p.lookup_by_name("sk_release").map(|h| h.func_id), Some(86));
    }
}
