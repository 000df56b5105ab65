// SPDX-License-Identifier: GPL-2.0

//! Host map registry.
//!
//! Maps are registered per program before verification. Each helper that
//! takes a map pointer is restricted to the map kinds it can operate on.

use crate::helper_ids;
use alloc::vec::Vec;
use vm_verifier_core::platform::{MapDef, MapProvider, MapType, PlatformError, PlatformResult};

/// Host map provider.
#[derive(Clone, Debug, Default)]
pub struct HostMapProvider {
    maps: Vec<MapDef>,
}

impl HostMapProvider {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `map`, replacing any map with the same id
    pub fn insert(&mut self, map: MapDef) {
        match self.maps.iter_mut().find(|m| m.map_id == map.map_id) {
            Some(slot) => *slot = map,
            None => self.maps.push(map),
        }
    }
}

/// Helpers each map kind accepts
fn allowed_helpers(map_type: MapType) -> &'static [u32] {
    match map_type {
        MapType::Array => &[helper_ids::MAP_LOOKUP_ELEM, helper_ids::MAP_UPDATE_ELEM],
        MapType::Hash => &[
            helper_ids::MAP_LOOKUP_ELEM,
            helper_ids::MAP_UPDATE_ELEM,
            helper_ids::MAP_DELETE_ELEM,
        ],
        MapType::RingBuf => &[helper_ids::RINGBUF_RESERVE],
    }
}

impl MapProvider for HostMapProvider {
    fn get(&self, map_id: u32) -> Option<&MapDef> {
        self.maps.iter().find(|m| m.map_id == map_id)
    }

    fn iter(&self) -> impl Iterator<Item = &MapDef> {
        self.maps.iter()
    }

    fn check_map_helper(&self, map: &MapDef, func_id: u32) -> PlatformResult<()> {
        if allowed_helpers(map.map_type).contains(&func_id) {
            Ok(())
        } else {
            Err(PlatformError::MapHelperMismatch {
                map_id: map.map_id,
                helper_id: func_id,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry() {
        let mut maps = HostMapProvider::new();
        maps.insert(MapDef::array(1, 8, 4));
        maps.insert(MapDef::array(1, 16, 4));
        maps.insert(MapDef::ringbuf(2, 4096));
        assert_eq!(maps.count(), 2);
        assert_eq!(maps.get(1).map(|m| m.value_size), Some(16));
        assert!(maps.exists(2));
    }

    #[test]
    fn test_helper_compatibility() {
        let maps = HostMapProvider::new();
        let array = MapDef::array(1, 8, 4);
        let ring = MapDef::ringbuf(2, 4096);
        assert!(maps.check_map_helper(&array, helper_ids::MAP_LOOKUP_ELEM).is_ok());
        assert!(maps.check_map_helper(&array, helper_ids::MAP_DELETE_ELEM).is_err());
        assert!(maps.check_map_helper(&ring, helper_ids::MAP_LOOKUP_ELEM).is_err());
        assert!(maps.check_map_helper(&ring, helper_ids::RINGBUF_RESERVE).is_ok());
    }
}
