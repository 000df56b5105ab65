// SPDX-License-Identifier: GPL-2.0

//! ID mapping for state comparison
//! 状态比较中的 ID 映射
//!
//! Two states may name the same sharing relation with different ids. While
//! comparing them, every id seen in the old state is paired with the id in
//! the current state at the same position; the pairing must stay one-to-one
//! in both directions.

use crate::stdlib::Vec;

/// One-to-one pairing of old ids with current ids
/// 旧 ID 与当前 ID 的一一对应
#[derive(Debug, Clone, Default)]
pub struct IdMap {
    pairs: Vec<(u32, u32)>,
    tmp_id_gen: u32,
}

impl IdMap {
    /// Empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget all pairings
    pub fn reset(&mut self) {
        self.pairs.clear();
        self.tmp_id_gen = 0;
    }

    /// Both ids are zero, or both are nonzero and consistently paired
    pub fn check_ids(&mut self, old_id: u32, cur_id: u32) -> bool {
        if (old_id == 0) != (cur_id == 0) {
            return false;
        }
        if old_id == 0 {
            return true;
        }
        for &(old, cur) in &self.pairs {
            if old == old_id {
                return cur == cur_id;
            }
            if cur == cur_id {
                return false;
            }
        }
        self.pairs.push((old_id, cur_id));
        true
    }

    /// Scalar ids: an ungrouped old scalar places no constraint, and an
    /// ungrouped current scalar may stand in for at most one old group member
    /// 标量 ID 检查
    pub fn check_scalar_ids(&mut self, old_id: u32, cur_id: u32) -> bool {
        if old_id == 0 {
            return true;
        }
        let cur_id = if cur_id == 0 { self.tmp_id() } else { cur_id };
        self.check_ids(old_id, cur_id)
    }

    fn tmp_id(&mut self) -> u32 {
        // Temporary ids count down from the top so they never collide with
        // ids handed out during verification.
        self.tmp_id_gen += 1;
        u32::MAX - self.tmp_id_gen
    }

    /// Current id paired with `old_id`
    pub fn get_cur_id(&self, old_id: u32) -> Option<u32> {
        self.pairs
            .iter()
            .find(|(old, _)| *old == old_id)
            .map(|(_, cur)| *cur)
    }

    /// Number of pairings
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// No pairings
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_map_basic() {
        let mut map = IdMap::new();
        assert!(map.check_ids(1, 100));
        assert!(map.check_ids(1, 100));
        assert!(!map.check_ids(1, 200));
        assert_eq!(map.get_cur_id(1), Some(100));
    }

    #[test]
    fn test_id_map_is_bijective() {
        let mut map = IdMap::new();
        assert!(map.check_ids(1, 10));
        assert!(!map.check_ids(2, 10));
    }

    #[test]
    fn test_id_map_zero() {
        let mut map = IdMap::new();
        assert!(map.check_ids(0, 0));
        assert!(!map.check_ids(0, 1));
        assert!(!map.check_ids(1, 0));
    }

    #[test]
    fn test_scalar_ids() {
        let mut map = IdMap::new();
        assert!(map.check_scalar_ids(0, 0));
        assert!(map.check_scalar_ids(0, 100));

        // a single old group member may be ungrouped in cur
        assert!(map.check_scalar_ids(1, 0));
        // but not two of them
        assert!(!map.check_scalar_ids(1, 0));

        map.reset();
        assert!(map.check_scalar_ids(2, 7));
        assert!(map.check_scalar_ids(2, 7));
        assert!(!map.check_scalar_ids(2, 8));
    }
}
