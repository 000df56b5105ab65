// SPDX-License-Identifier: GPL-2.0

//! Map provider trait and types.
//!
//! Maps are host-side key/value stores a program reaches through helpers.
//! The verifier only needs their identity and shape: which id names which
//! map, and the sizes that bound accesses to keys and values.

use super::types::PlatformResult;
use crate::core::types::MapInfo;

/// Kind of map
/// 映射类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MapType {
    /// Fixed-size array indexed by a u32 key
    Array,
    /// Hash table
    Hash,
    /// Ring buffer; accessed only through reserve/submit helpers
    RingBuf,
}

/// Definition of one map instance.
/// 单个映射实例的定义
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapDef {
    /// Id used by map-pointer loads
    pub map_id: u32,
    /// Map kind
    pub map_type: MapType,
    /// Key size in bytes
    pub key_size: u32,
    /// Value size in bytes
    pub value_size: u32,
    /// Capacity
    pub max_entries: u32,
}

impl MapDef {
    /// Array map with u32 keys
    pub const fn array(map_id: u32, value_size: u32, max_entries: u32) -> Self {
        Self {
            map_id,
            map_type: MapType::Array,
            key_size: 4,
            value_size,
            max_entries,
        }
    }

    /// Hash map
    pub const fn hash(map_id: u32, key_size: u32, value_size: u32, max_entries: u32) -> Self {
        Self {
            map_id,
            map_type: MapType::Hash,
            key_size,
            value_size,
            max_entries,
        }
    }

    /// Ring buffer of `size` bytes
    pub const fn ringbuf(map_id: u32, size: u32) -> Self {
        Self {
            map_id,
            map_type: MapType::RingBuf,
            key_size: 0,
            value_size: 0,
            max_entries: size,
        }
    }

    /// Identity carried by map pointers
    pub fn info(&self) -> MapInfo {
        MapInfo {
            map_id: self.map_id,
            key_size: self.key_size,
            value_size: self.value_size,
        }
    }
}

/// Provider trait for maps.
pub trait MapProvider: Clone + Send + Sync {
    /// Look up a map by id
    fn get(&self, map_id: u32) -> Option<&MapDef>;

    /// Iterate over all maps
    fn iter(&self) -> impl Iterator<Item = &MapDef>;

    /// Check that a map id exists
    fn exists(&self, map_id: u32) -> bool {
        self.get(map_id).is_some()
    }

    /// Number of registered maps
    fn count(&self) -> usize {
        self.iter().count()
    }

    /// Whether helper `func_id` may operate on `map`.
    ///
    /// Platforms override this to restrict helpers to compatible map kinds.
    fn check_map_helper(&self, _map: &MapDef, _func_id: u32) -> PlatformResult<()> {
        Ok(())
    }
}
