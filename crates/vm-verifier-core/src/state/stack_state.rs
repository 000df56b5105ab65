// SPDX-License-Identifier: GPL-2.0

//! Stack state management
//! 栈状态管理
//!
//! The stack of a frame is a list of 8-byte slots, growing downward from the
//! frame pointer: slot `spi` covers offsets `[-(spi+1)*8, -spi*8)`. Each byte
//! carries its own [`SlotKind`]; a slot whose bytes are all [`SlotKind::Spill`]
//! holds a full register value in `spilled`.
//! 栈由 8 字节槽组成，从帧指针向下增长。

use crate::core::error::{Result, VerifierError};
use crate::core::types::*;
use crate::state::reg_state::RegValue;
use crate::stdlib::{format, Vec};

/// What a stack byte holds
/// 栈字节的内容类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SlotKind {
    /// Never written
    #[default]
    Invalid,
    /// Part of a spilled register
    Spill,
    /// Unstructured data
    Misc,
    /// Known zero
    Zero,
}

/// State of a single stack slot (8 bytes)
/// 单个栈槽的状态（8 字节）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StackSlot {
    /// Spilled value; also carries the slot's liveness and parent link
    pub spilled: RegValue,
    /// Kind of each byte, lowest address first
    pub slot_type: [SlotKind; REG_SIZE],
}

impl StackSlot {
    /// Whether the slot holds a full spilled register
    pub fn is_spill(&self) -> bool {
        self.slot_type[0] == SlotKind::Spill
    }

    /// Whether any byte was ever written
    pub fn is_valid(&self) -> bool {
        self.slot_type.iter().any(|t| *t != SlotKind::Invalid)
    }

    /// Whether the slot holds a spilled scalar known to be zero
    pub fn is_spilled_zero(&self) -> bool {
        self.is_spill() && self.spilled.is_scalar() && self.spilled.bounds.is_zero()
    }
}

/// Result of reading from a stack slot
/// 栈槽读取结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackRead {
    /// The full spilled register
    Spilled(RegValue),
    /// Every byte read is known zero
    Zero,
    /// Initialized bytes of unknown content
    Misc,
}

/// Stack of one frame
/// 单个栈帧的栈
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StackState {
    /// Allocated slots, slot 0 nearest the frame pointer
    pub slots: Vec<StackSlot>,
}

/// Slot index and byte position for a frame-pointer-relative offset
pub fn slot_of(off: i64) -> (usize, usize) {
    let spi = ((-off - 1) / REG_SIZE as i64) as usize;
    let byte = (off + ((spi as i64 + 1) * REG_SIZE as i64)) as usize;
    (spi, byte)
}

impl StackState {
    /// Empty stack
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes currently allocated
    pub fn allocated_stack(&self) -> usize {
        self.slots.len() * REG_SIZE
    }

    /// Grow so that `depth` bytes below the frame pointer are addressable
    pub fn grow(&mut self, depth: usize) {
        let need = depth.div_ceil(REG_SIZE);
        if need > self.slots.len() {
            self.slots.resize(need, StackSlot::default());
        }
    }

    /// Slot by index
    pub fn get(&self, spi: usize) -> Option<&StackSlot> {
        self.slots.get(spi)
    }

    /// Mutable slot by index
    pub fn get_mut(&mut self, spi: usize) -> Option<&mut StackSlot> {
        self.slots.get_mut(spi)
    }

    /// Spill a full register into slot `spi`
    /// 将完整寄存器溢出到槽 `spi`
    pub fn spill(&mut self, spi: usize, value: &RegValue) {
        self.grow((spi + 1) * REG_SIZE);
        let slot = &mut self.slots[spi];
        slot.spilled.assign(value);
        slot.spilled.live |= Liveness::WRITTEN;
        slot.slot_type = [SlotKind::Spill; REG_SIZE];
    }

    /// Write `size` bytes of non-register data at `off`
    ///
    /// A write covering the whole slot counts as a write for liveness; a
    /// partial write over a spilled register degrades it to unstructured data.
    pub fn write_bytes(&mut self, off: i64, size: usize, zero: bool) {
        let (spi, byte) = slot_of(off);
        self.grow((spi + 1) * REG_SIZE);
        let slot = &mut self.slots[spi];
        let kind = if zero { SlotKind::Zero } else { SlotKind::Misc };
        if size == REG_SIZE {
            slot.spilled.assign(&RegValue::not_init());
            slot.spilled.live |= Liveness::WRITTEN;
            slot.slot_type = [kind; REG_SIZE];
            return;
        }
        if slot.is_spill() {
            slot.spilled.assign(&RegValue::not_init());
            slot.slot_type = [SlotKind::Misc; REG_SIZE];
        }
        for t in &mut slot.slot_type[byte..byte + size] {
            *t = kind;
        }
    }

    /// Read `size` bytes at `off`
    pub fn read(&self, off: i64, size: usize) -> Result<StackRead> {
        let (spi, byte) = slot_of(off);
        let slot = self
            .slots
            .get(spi)
            .ok_or(VerifierError::StackOutOfBounds(off))?;
        if slot.is_spill() {
            if size == REG_SIZE {
                return Ok(StackRead::Spilled(slot.spilled));
            }
            if !slot.spilled.is_scalar() {
                return Err(VerifierError::InvalidMemoryAccess(format!(
                    "invalid size {} of register fill at fp{}",
                    size, off
                )));
            }
            return Ok(StackRead::Misc);
        }
        let bytes = &slot.slot_type[byte..byte + size];
        if bytes.iter().any(|t| *t == SlotKind::Invalid) {
            return Err(VerifierError::InvalidMemoryAccess(format!(
                "invalid read from stack off {} size {}",
                off, size
            )));
        }
        if bytes.iter().all(|t| *t == SlotKind::Zero) {
            Ok(StackRead::Zero)
        } else {
            Ok(StackRead::Misc)
        }
    }

    /// Whether every byte in `[off, off+size)` is initialized
    pub fn is_range_initialized(&self, off: i64, size: usize) -> bool {
        (0..size as i64).all(|i| {
            let (spi, byte) = slot_of(off + i);
            self.slots
                .get(spi)
                .is_some_and(|s| s.slot_type[byte] != SlotKind::Invalid)
        })
    }

    /// Distinct slots touched by `[off, off+size)`
    pub fn slots_in_range(off: i64, size: usize) -> impl Iterator<Item = usize> {
        let first = slot_of(off + size as i64 - 1).0;
        let last = slot_of(off).0;
        first..=last
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_of() {
        assert_eq!(slot_of(-8), (0, 0));
        assert_eq!(slot_of(-1), (0, 7));
        assert_eq!(slot_of(-16), (1, 0));
        assert_eq!(slot_of(-12), (1, 4));
    }

    #[test]
    fn test_spill_and_fill() {
        let mut stack = StackState::new();
        let value = RegValue::frame_pointer(0);
        stack.spill(1, &value);
        assert_eq!(stack.allocated_stack(), 16);
        match stack.read(-16, 8).unwrap() {
            StackRead::Spilled(v) => assert_eq!(v.reg_type, value.reg_type),
            other => panic!("unexpected {:?}", other),
        }
        assert!(stack.slots[1].spilled.live.contains(Liveness::WRITTEN));
    }

    #[test]
    fn test_partial_fill_of_pointer_rejected() {
        let mut stack = StackState::new();
        stack.spill(0, &RegValue::frame_pointer(0));
        assert!(stack.read(-8, 4).is_err());
    }

    #[test]
    fn test_partial_overwrite_degrades_spill() {
        let mut stack = StackState::new();
        stack.spill(0, &RegValue::frame_pointer(0));
        stack.write_bytes(-4, 4, false);
        assert!(!stack.slots[0].is_spill());
        assert_eq!(stack.read(-8, 8).unwrap(), StackRead::Misc);
    }

    #[test]
    fn test_zero_bytes() {
        let mut stack = StackState::new();
        stack.write_bytes(-8, 4, true);
        assert_eq!(stack.read(-8, 4).unwrap(), StackRead::Zero);
        assert!(stack.read(-4, 4).is_err());
        assert!(!stack.is_range_initialized(-8, 8));
        stack.write_bytes(-4, 4, false);
        assert_eq!(stack.read(-8, 8).unwrap(), StackRead::Misc);
        assert!(stack.is_range_initialized(-8, 8));
    }

    #[test]
    fn test_uninitialized_read() {
        let stack = StackState::new();
        assert!(matches!(stack.read(-8, 8), Err(VerifierError::StackOutOfBounds(-8))));
    }

    #[test]
    fn test_slots_in_range() {
        let spis: Vec<usize> = StackState::slots_in_range(-24, 16).collect();
        assert_eq!(spis, [1, 2]);
    }
}
