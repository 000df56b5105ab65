// SPDX-License-Identifier: GPL-2.0

//! Tristate numbers - per-bit knowledge of a 64-bit value
//! 三态数 - 对 64 位值的逐位认知
//!
//! A tnum pairs a `value` with a `mask`. A bit set in `mask` is unknown; a
//! clear bit in `mask` is known and equal to the same bit of `value`. The
//! concrete set described by a tnum is `{ x | x & !mask == value }`.
//! tnum 由 `value` 与 `mask` 组成，掩码置位表示该位未知。
//!
//! Every operation here over-approximates: the result describes at least all
//! concrete results of applying the operation to members of the inputs.

use core::ops::{BitAnd, BitOr, BitXor};

/// A tracked number with known and unknown bits
/// 具有已知位和未知位的跟踪数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Tnum {
    /// Known bit values (zero wherever `mask` is set)
    pub value: u64,
    /// Unknown bits
    pub mask: u64,
}

impl Tnum {
    /// Fully unknown value
    pub const UNKNOWN: Tnum = Tnum {
        value: 0,
        mask: u64::MAX,
    };

    /// Create a tnum, normalizing `value` under `mask`
    pub const fn new(value: u64, mask: u64) -> Self {
        Self {
            value: value & !mask,
            mask,
        }
    }

    /// Exactly known value
    pub const fn const_value(value: u64) -> Self {
        Self { value, mask: 0 }
    }

    /// Fully unknown value
    pub const fn unknown() -> Self {
        Self::UNKNOWN
    }

    /// Smallest tnum containing every value in `[min, max]`
    /// 包含 `[min, max]` 中所有值的最小 tnum
    pub fn range(min: u64, max: u64) -> Self {
        let chi = min ^ max;
        let bits = 64 - chi.leading_zeros();
        if bits > 63 {
            return Self::UNKNOWN;
        }
        let delta = (1u64 << bits) - 1;
        Self::new(min & !delta, delta)
    }

    /// All bits known
    pub fn is_const(&self) -> bool {
        self.mask == 0
    }

    /// No bits known
    pub fn is_unknown(&self) -> bool {
        self.mask == u64::MAX
    }

    /// Smallest member
    pub fn min(&self) -> u64 {
        self.value
    }

    /// Largest member
    pub fn max(&self) -> u64 {
        self.value | self.mask
    }

    /// Whether `x` is a member
    pub fn contains(&self, x: u64) -> bool {
        x & !self.mask == self.value
    }

    /// Whether every member of `self` is a member of `other`
    /// 判断 `self` 的每个成员是否都是 `other` 的成员
    pub fn is_subset_of(&self, other: &Tnum) -> bool {
        self.mask & !other.mask == 0 && self.value & !other.mask == other.value
    }

    /// Values described by both (callers guarantee a common member)
    pub fn intersect(self, other: Tnum) -> Self {
        let v = self.value | other.value;
        let mu = self.mask & other.mask;
        Self::new(v & !mu, mu)
    }

    /// Left shift by a constant amount
    pub fn lsh(self, shift: u32) -> Self {
        Self::new(self.value.wrapping_shl(shift), self.mask.wrapping_shl(shift))
    }

    /// Logical right shift by a constant amount
    pub fn rsh(self, shift: u32) -> Self {
        Self::new(self.value.wrapping_shr(shift), self.mask.wrapping_shr(shift))
    }

    /// Arithmetic right shift by a constant amount
    pub fn arsh(self, shift: u32) -> Self {
        Self::new(
            ((self.value as i64).wrapping_shr(shift)) as u64,
            ((self.mask as i64).wrapping_shr(shift)) as u64,
        )
    }

    /// Wrapping addition with carry tracking
    #[allow(clippy::should_implement_trait)]
    pub fn add(self, other: Tnum) -> Self {
        let sm = self.mask.wrapping_add(other.mask);
        let sv = self.value.wrapping_add(other.value);
        let sigma = sm.wrapping_add(sv);
        let chi = sigma ^ sv;
        let mu = chi | self.mask | other.mask;
        Self::new(sv & !mu, mu)
    }

    /// Wrapping subtraction with borrow tracking
    #[allow(clippy::should_implement_trait)]
    pub fn sub(self, other: Tnum) -> Self {
        let dv = self.value.wrapping_sub(other.value);
        let alpha = dv.wrapping_add(self.mask);
        let beta = dv.wrapping_sub(other.mask);
        let chi = alpha ^ beta;
        let mu = chi | self.mask | other.mask;
        Self::new(dv & !mu, mu)
    }

    /// Wrapping multiplication by shift-and-add over the known bits
    #[allow(clippy::should_implement_trait)]
    pub fn mul(self, other: Tnum) -> Self {
        let acc_v = self.value.wrapping_mul(other.value);
        let mut acc_m = Tnum::const_value(0);
        let mut a = self;
        let mut b = other;
        while a.value != 0 || a.mask != 0 {
            if a.value & 1 != 0 {
                acc_m = acc_m.add(Tnum::new(0, b.mask));
            } else if a.mask & 1 != 0 {
                acc_m = acc_m.add(Tnum::new(0, b.value | b.mask));
            }
            a = a.rsh(1);
            b = b.lsh(1);
        }
        Tnum::const_value(acc_v).add(acc_m)
    }

    /// Keep only the low 32 bits (zero-extended)
    pub fn cast_u32(self) -> Self {
        Self::new(self.value & 0xffff_ffff, self.mask & 0xffff_ffff)
    }

    /// Sign-extend the low 32 bits
    pub fn sext32(self) -> Self {
        Self::new(
            self.value as u32 as i32 as i64 as u64,
            self.mask as u32 as i32 as i64 as u64,
        )
    }

    /// Bitwise AND
    pub fn and(self, other: Tnum) -> Self {
        let alpha = self.value | self.mask;
        let beta = other.value | other.mask;
        let v = self.value & other.value;
        Self::new(v, alpha & beta & !v)
    }

    /// Bitwise OR
    pub fn or(self, other: Tnum) -> Self {
        let v = self.value | other.value;
        let mu = self.mask | other.mask;
        Self::new(v, mu & !v)
    }

    /// Bitwise XOR
    pub fn xor(self, other: Tnum) -> Self {
        let v = self.value ^ other.value;
        let mu = self.mask | other.mask;
        Self::new(v & !mu, mu)
    }
}

impl BitAnd for Tnum {
    type Output = Tnum;

    fn bitand(self, rhs: Tnum) -> Tnum {
        self.and(rhs)
    }
}

impl BitOr for Tnum {
    type Output = Tnum;

    fn bitor(self, rhs: Tnum) -> Tnum {
        self.or(rhs)
    }
}

impl BitXor for Tnum {
    type Output = Tnum;

    fn bitxor(self, rhs: Tnum) -> Tnum {
        self.xor(rhs)
    }
}
