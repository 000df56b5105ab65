// SPDX-License-Identifier: GPL-2.0

//! Scalar bounds tracking
//! 标量边界追踪
//!
//! A scalar is described three ways at once: a signed range, an unsigned
//! range and a tnum. Every constructor and operation finishes with
//! [`ScalarBounds::sync`], which lets each representation tighten the
//! others. Syncing only ever narrows, so no member of the described set is
//! lost.
//!
//! 标量同时由有符号范围、无符号范围和 tnum 描述，三者互相收紧且只会变窄。

use super::tnum::Tnum;

/// Combined range and bit-level knowledge of a 64-bit value
/// 64 位值的范围与位级认知
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScalarBounds {
    /// Bit-level knowledge
    pub var_off: Tnum,
    /// Minimum as signed
    pub smin_value: i64,
    /// Maximum as signed
    pub smax_value: i64,
    /// Minimum as unsigned
    pub umin_value: u64,
    /// Maximum as unsigned
    pub umax_value: u64,
}

impl Default for ScalarBounds {
    fn default() -> Self {
        Self::unknown()
    }
}

impl ScalarBounds {
    /// No knowledge at all
    pub const fn unknown() -> Self {
        Self {
            var_off: Tnum::UNKNOWN,
            smin_value: i64::MIN,
            smax_value: i64::MAX,
            umin_value: 0,
            umax_value: u64::MAX,
        }
    }

    /// Exactly `value`
    pub const fn constant(value: u64) -> Self {
        Self {
            var_off: Tnum::const_value(value),
            smin_value: value as i64,
            smax_value: value as i64,
            umin_value: value,
            umax_value: value,
        }
    }

    /// Any value in the unsigned range `[min, max]`
    pub fn from_urange(min: u64, max: u64) -> Self {
        let mut b = Self::unknown();
        b.umin_value = min;
        b.umax_value = max;
        b.sync();
        b
    }

    /// Any value representable in `bytes` bytes, zero-extended
    pub fn unknown_width(bytes: u32) -> Self {
        if bytes >= 8 {
            Self::unknown()
        } else {
            Self::from_urange(0, (1u64 << (bytes * 8)) - 1)
        }
    }

    /// Any member of `t`
    pub fn from_tnum(t: Tnum) -> Self {
        let mut b = Self::unknown();
        b.var_off = t;
        b.sync();
        b
    }

    /// Single known value
    pub fn is_const(&self) -> bool {
        self.var_off.is_const()
    }

    /// The known value, if any
    pub fn as_const(&self) -> Option<u64> {
        self.var_off.is_const().then_some(self.var_off.value)
    }

    /// Known to be exactly zero
    pub fn is_zero(&self) -> bool {
        self.as_const() == Some(0)
    }

    /// Whether `x` is a possible value
    pub fn contains_value(&self, x: u64) -> bool {
        self.var_off.contains(x)
            && x >= self.umin_value
            && x <= self.umax_value
            && (x as i64) >= self.smin_value
            && (x as i64) <= self.smax_value
    }

    /// Whether every value allowed by `other` is allowed by `self`
    /// 判断 `other` 允许的每个值是否都被 `self` 允许
    pub fn contains(&self, other: &ScalarBounds) -> bool {
        self.umin_value <= other.umin_value
            && self.umax_value >= other.umax_value
            && self.smin_value <= other.smin_value
            && self.smax_value >= other.smax_value
            && other.var_off.is_subset_of(&self.var_off)
    }

    /// The ranges and tnum still admit at least one value
    pub fn is_sane(&self) -> bool {
        self.umin_value <= self.umax_value
            && self.smin_value <= self.smax_value
            && self.var_off.min() <= self.umax_value
            && self.var_off.max() >= self.umin_value
    }

    // ========================================================================
    // Synchronization
    // 同步
    // ========================================================================

    fn update_from_tnum(&mut self) {
        let sign = 1u64 << 63;
        self.smin_value = self
            .smin_value
            .max((self.var_off.value | (self.var_off.mask & sign)) as i64);
        self.smax_value = self
            .smax_value
            .min((self.var_off.value | (self.var_off.mask & !sign)) as i64);
        self.umin_value = self.umin_value.max(self.var_off.min());
        self.umax_value = self.umax_value.min(self.var_off.max());
    }

    fn deduce_bounds(&mut self) {
        if self.smin_value >= 0 || self.smax_value < 0 {
            // Sign is known: both ranges describe the same half
            let lo = (self.smin_value as u64).max(self.umin_value);
            let hi = (self.smax_value as u64).min(self.umax_value);
            self.umin_value = lo;
            self.smin_value = lo as i64;
            self.umax_value = hi;
            self.smax_value = hi as i64;
            return;
        }
        if (self.umax_value as i64) >= 0 {
            self.smin_value = self.umin_value as i64;
            let hi = (self.smax_value as u64).min(self.umax_value);
            self.umax_value = hi;
            self.smax_value = hi as i64;
        } else if (self.umin_value as i64) < 0 {
            let lo = (self.smin_value as u64).max(self.umin_value);
            self.umin_value = lo;
            self.smin_value = lo as i64;
            self.smax_value = self.umax_value as i64;
        }
    }

    fn tnum_from_range(&mut self) {
        if self.umin_value <= self.umax_value {
            self.var_off = self
                .var_off
                .intersect(Tnum::range(self.umin_value, self.umax_value));
        }
    }

    /// Let every representation tighten the others
    pub fn sync(&mut self) {
        self.update_from_tnum();
        self.deduce_bounds();
        self.tnum_from_range();
        self.update_from_tnum();
    }

    // ========================================================================
    // 64-bit arithmetic
    // 64 位算术
    // ========================================================================

    /// `self + other`, wrapping
    pub fn add(&self, other: &ScalarBounds) -> Self {
        let mut r = Self::unknown();
        r.var_off = self.var_off.add(other.var_off);
        if let (Some(lo), Some(hi)) = (
            self.smin_value.checked_add(other.smin_value),
            self.smax_value.checked_add(other.smax_value),
        ) {
            r.smin_value = lo;
            r.smax_value = hi;
        }
        if let Some(hi) = self.umax_value.checked_add(other.umax_value) {
            r.umin_value = self.umin_value + other.umin_value;
            r.umax_value = hi;
        }
        r.sync();
        r
    }

    /// `self - other`, wrapping
    pub fn sub(&self, other: &ScalarBounds) -> Self {
        let mut r = Self::unknown();
        r.var_off = self.var_off.sub(other.var_off);
        if let (Some(lo), Some(hi)) = (
            self.smin_value.checked_sub(other.smax_value),
            self.smax_value.checked_sub(other.smin_value),
        ) {
            r.smin_value = lo;
            r.smax_value = hi;
        }
        if self.umin_value >= other.umax_value {
            r.umin_value = self.umin_value - other.umax_value;
            r.umax_value = self.umax_value - other.umin_value;
        }
        r.sync();
        r
    }

    /// `self * other`, wrapping
    pub fn mul(&self, other: &ScalarBounds) -> Self {
        let mut r = Self::unknown();
        r.var_off = self.var_off.mul(other.var_off);
        if let Some(hi) = self.umax_value.checked_mul(other.umax_value) {
            r.umin_value = self.umin_value * other.umin_value;
            r.umax_value = hi;
        }
        r.sync();
        r
    }

    /// Unsigned `self / other` with `x / 0 == 0`
    pub fn div(&self, other: &ScalarBounds) -> Self {
        if let (Some(a), Some(b)) = (self.as_const(), other.as_const()) {
            return Self::constant(a.checked_div(b).unwrap_or(0));
        }
        if other.umax_value == 0 {
            return Self::constant(0);
        }
        if other.umin_value > 0 {
            Self::from_urange(
                self.umin_value / other.umax_value,
                self.umax_value / other.umin_value,
            )
        } else {
            Self::from_urange(0, self.umax_value)
        }
    }

    /// Unsigned `self % other` with `x % 0 == x`
    pub fn modulo(&self, other: &ScalarBounds) -> Self {
        if let (Some(a), Some(b)) = (self.as_const(), other.as_const()) {
            return Self::constant(if b == 0 { a } else { a % b });
        }
        if other.umin_value > 0 {
            Self::from_urange(0, self.umax_value.min(other.umax_value - 1))
        } else {
            Self::from_urange(0, self.umax_value)
        }
    }

    fn signed_from_unsigned_if_nonneg(&mut self, a: &ScalarBounds, b: &ScalarBounds) {
        if a.smin_value >= 0 && b.smin_value >= 0 && (self.umax_value as i64) >= 0 {
            self.smin_value = self.umin_value as i64;
            self.smax_value = self.umax_value as i64;
        }
    }

    /// `self & other`
    pub fn and(&self, other: &ScalarBounds) -> Self {
        let mut r = Self::unknown();
        r.var_off = self.var_off.and(other.var_off);
        r.umin_value = r.var_off.min();
        r.umax_value = self.umax_value.min(other.umax_value);
        r.signed_from_unsigned_if_nonneg(self, other);
        r.sync();
        r
    }

    /// `self | other`
    pub fn or(&self, other: &ScalarBounds) -> Self {
        let mut r = Self::unknown();
        r.var_off = self.var_off.or(other.var_off);
        r.umin_value = self.umin_value.max(other.umin_value);
        r.umax_value = r.var_off.max();
        r.signed_from_unsigned_if_nonneg(self, other);
        r.sync();
        r
    }

    /// `self ^ other`
    pub fn xor(&self, other: &ScalarBounds) -> Self {
        let mut r = Self::unknown();
        r.var_off = self.var_off.xor(other.var_off);
        r.umin_value = r.var_off.min();
        r.umax_value = r.var_off.max();
        r.signed_from_unsigned_if_nonneg(self, other);
        r.sync();
        r
    }

    /// `self << shift` for a constant `shift < 64`
    pub fn lsh(&self, shift: u32) -> Self {
        let mut r = Self::unknown();
        r.var_off = self.var_off.lsh(shift);
        if shift == 0 || self.umax_value.leading_zeros() >= shift {
            r.umin_value = self.umin_value << shift;
            r.umax_value = self.umax_value << shift;
        }
        r.sync();
        r
    }

    /// Logical `self >> shift` for a constant `shift < 64`
    pub fn rsh(&self, shift: u32) -> Self {
        let mut r = Self::unknown();
        r.var_off = self.var_off.rsh(shift);
        r.umin_value = self.umin_value >> shift;
        r.umax_value = self.umax_value >> shift;
        r.sync();
        r
    }

    /// Arithmetic `self >> shift` for a constant `shift < 64`
    pub fn arsh(&self, shift: u32) -> Self {
        let mut r = Self::unknown();
        r.var_off = self.var_off.arsh(shift);
        r.smin_value = self.smin_value >> shift;
        r.smax_value = self.smax_value >> shift;
        r.sync();
        r
    }

    /// `-self`, wrapping
    pub fn neg(&self) -> Self {
        Self::constant(0).sub(self)
    }

    // ========================================================================
    // 32-bit views
    // 32 位视图
    // ========================================================================

    /// Truncate to the low 32 bits, zero-extended
    pub fn zext32(&self) -> Self {
        let mut r = Self::unknown();
        r.var_off = self.var_off.cast_u32();
        if self.umax_value <= u32::MAX as u64 {
            r.umin_value = self.umin_value;
            r.umax_value = self.umax_value;
        } else {
            r.umin_value = 0;
            r.umax_value = u32::MAX as u64;
        }
        r.sync();
        r
    }

    /// Truncate to the low 32 bits, sign-extended
    pub fn sext32(&self) -> Self {
        let low = self.zext32();
        let mut r = Self::from_tnum(low.var_off.sext32());
        if low.umax_value <= i32::MAX as u64 {
            r.umin_value = r.umin_value.max(low.umin_value);
            r.umax_value = r.umax_value.min(low.umax_value);
            r.sync();
        }
        r
    }

    /// Byte-swap or truncate to `bits`; `to_be` selects a real swap
    pub fn byte_swap(&self, bits: u32, to_be: bool) -> Self {
        let keep = if bits >= 64 { u64::MAX } else { (1u64 << bits) - 1 };
        match (self.as_const(), to_be) {
            (Some(v), true) => Self::constant(match bits {
                16 => (v as u16).swap_bytes() as u64,
                32 => (v as u32).swap_bytes() as u64,
                _ => v.swap_bytes(),
            }),
            (Some(v), false) => Self::constant(v & keep),
            (None, false) if self.umax_value <= keep => *self,
            _ => Self::from_urange(0, keep),
        }
    }

    // ========================================================================
    // Refinement
    // 细化
    // ========================================================================

    /// Narrow to values also allowed by `other`
    pub fn intersect(&self, other: &ScalarBounds) -> Self {
        let mut r = Self {
            var_off: self.var_off.intersect(other.var_off),
            smin_value: self.smin_value.max(other.smin_value),
            smax_value: self.smax_value.min(other.smax_value),
            umin_value: self.umin_value.max(other.umin_value),
            umax_value: self.umax_value.min(other.umax_value),
        };
        if r.is_sane() {
            r.sync();
        }
        r
    }

    /// Whether the two descriptions cannot share a value
    pub fn is_disjoint(&self, other: &ScalarBounds) -> bool {
        let known = !(self.var_off.mask | other.var_off.mask);
        self.umin_value > other.umax_value
            || self.umax_value < other.umin_value
            || self.smin_value > other.smax_value
            || self.smax_value < other.smin_value
            || (self.var_off.value ^ other.var_off.value) & known != 0
    }
}
