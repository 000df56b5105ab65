// SPDX-License-Identifier: GPL-2.0

//! Register value tracking
//! 寄存器值追踪
//!
//! A [`RegValue`] is the abstract value of one register (or one spilled stack
//! slot): its kind and payload, a fixed offset, a sharing id and the scalar
//! bounds of its variable part. For scalars the bounds describe the value
//! itself; for pointers they describe the variable offset added to `off`.

use crate::bounds::scalar::ScalarBounds;
use crate::core::types::*;
use crate::state::verifier_state::StateId;

/// Abstract value of a single register
/// 单个寄存器的抽象值
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegValue {
    /// Kind and kind-dependent payload
    pub reg_type: RegType,
    /// Kind qualifiers
    pub flags: RegFlags,
    /// Fixed offset from the pointer base
    pub off: i32,
    /// Sharing id; 0 means ungrouped. For acquired handles this is the reference id.
    pub id: u32,
    /// Range and bit knowledge of the scalar value or variable offset
    pub bounds: ScalarBounds,
    /// Liveness marks local to the owning state
    pub live: Liveness,
    /// Checkpoint this value was inherited from
    pub parent: Option<StateId>,
}

impl Default for RegValue {
    fn default() -> Self {
        Self::not_init()
    }
}

impl RegValue {
    /// Uninitialized register
    pub const fn not_init() -> Self {
        Self {
            reg_type: RegType::NotInit,
            flags: RegFlags::empty(),
            off: 0,
            id: 0,
            bounds: ScalarBounds::unknown(),
            live: Liveness::empty(),
            parent: None,
        }
    }

    /// Scalar with the given bounds
    pub fn scalar(bounds: ScalarBounds) -> Self {
        Self {
            reg_type: RegType::Scalar,
            bounds,
            ..Self::not_init()
        }
    }

    /// Scalar with no known bits
    pub fn unknown_scalar() -> Self {
        Self::scalar(ScalarBounds::unknown())
    }

    /// Scalar known to be exactly `value`
    pub fn known(value: u64) -> Self {
        Self::scalar(ScalarBounds::constant(value))
    }

    /// Pointer of the given kind with a zero variable part
    pub fn pointer(reg_type: RegType, off: i32) -> Self {
        Self {
            reg_type,
            off,
            bounds: ScalarBounds::constant(0),
            ..Self::not_init()
        }
    }

    /// Frame pointer of frame `frameno`
    pub fn frame_pointer(frameno: u32) -> Self {
        Self::pointer(RegType::PtrToStack { frameno }, 0)
    }

    /// Copy the value of `src` into `self`, keeping liveness and parent
    /// 将 `src` 的值复制到 `self`，保留活跃性和父链接
    pub fn assign(&mut self, src: &RegValue) {
        let live = self.live;
        let parent = self.parent;
        *self = *src;
        self.live = live;
        self.parent = parent;
    }

    /// Holds a value
    pub fn is_init(&self) -> bool {
        self.reg_type != RegType::NotInit
    }

    /// Holds a pointer
    pub fn is_pointer(&self) -> bool {
        self.reg_type.is_pointer()
    }

    /// Holds a scalar
    pub fn is_scalar(&self) -> bool {
        self.reg_type.is_scalar()
    }

    /// Scalar with a single known value
    pub fn is_const(&self) -> bool {
        self.is_scalar() && self.bounds.is_const()
    }

    /// Known value of a constant scalar
    pub fn const_value(&self) -> Option<u64> {
        if self.is_scalar() {
            self.bounds.as_const()
        } else {
            None
        }
    }

    /// Pointer that still needs a null check
    pub fn may_be_null(&self) -> bool {
        self.flags.contains(RegFlags::MAYBE_NULL)
    }

    /// Pointer whose variable part is exactly zero
    pub fn has_fixed_offset(&self) -> bool {
        self.bounds.is_zero()
    }

    /// Frame number of a stack pointer
    pub fn stack_frameno(&self) -> Option<u32> {
        match self.reg_type {
            RegType::PtrToStack { frameno } => Some(frameno),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors() {
        assert!(!RegValue::not_init().is_init());
        assert_eq!(RegValue::known(7).const_value(), Some(7));
        assert!(!RegValue::unknown_scalar().is_const());
        let fp = RegValue::frame_pointer(2);
        assert!(fp.is_pointer());
        assert_eq!(fp.stack_frameno(), Some(2));
        assert!(fp.has_fixed_offset());
        assert_eq!(fp.const_value(), None);
    }

    #[test]
    fn test_assign_keeps_liveness_and_parent() {
        let mut dst = RegValue::not_init();
        dst.live = Liveness::READ;
        dst.parent = Some(3);
        let mut src = RegValue::known(9);
        src.parent = Some(1);
        dst.assign(&src);
        assert_eq!(dst.const_value(), Some(9));
        assert_eq!(dst.parent, Some(3));
        assert_eq!(dst.live, Liveness::READ);
    }
}
