//! The per-bit tristate bitfield domain.
//!
//! Represented as two parallel bitstrings `zeros`/`ones`: bit *i* of
//! `zeros` set means "0 is possible at position *i*", similarly for `ones`.
//! `(1,0)` is definite-0, `(0,1)` is definite-1, `(1,1)` is top (either),
//! `(0,0)` is bottom (impossible) — any bottom bit makes the whole value
//! bottom.

use core::fmt;

use crate::common::diagnostics::Diagnostic;
use crate::common::{Environment, FloatSemantics, IntPredicate};
use crate::primitives::{float_ops, int_ops};

use super::float_interval::FloatInterval;
use super::interval::Interval;
use super::AbstractDomain;

/// A per-bit tristate integer abstraction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Bitfield {
    w: u32,
    zeros: u128,
    ones: u128,
}

impl Bitfield {
    /// The bottom value: every bit `(0,0)`.
    #[must_use]
    pub const fn bottom(w: u32) -> Self {
        Self { w, zeros: 0, ones: 0 }
    }

    /// The top value: every bit `(1,1)`.
    #[must_use]
    pub const fn top(w: u32) -> Self {
        let m = int_ops::mask(w);
        Self { w, zeros: m, ones: m }
    }

    /// A constant: every bit definite, matching `bits`.
    #[must_use]
    pub const fn constant(w: u32, bits: u128) -> Self {
        let m = int_ops::mask(w);
        let bits = bits & m;
        Self { w, zeros: (!bits) & m, ones: bits }
    }

    /// Bit width.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.w
    }

    /// True if any position is `(0,0)` — the whole value is then bottom.
    fn has_impossible_bit(&self) -> bool {
        (!self.zeros & !self.ones) & int_ops::mask(self.w) != 0
    }

    /// True if every bit is definite (no position is `(1,1)`), i.e. this
    /// value denotes exactly one concrete pattern, available via
    /// [`Bitfield::constant_bits`].
    #[must_use]
    pub fn is_constant(&self) -> bool {
        !self.has_impossible_bit() && (self.zeros & self.ones) & int_ops::mask(self.w) == 0
    }

    /// The single concrete bit pattern, if [`is_constant`](Self::is_constant).
    #[must_use]
    pub fn constant_bits(&self) -> Option<u128> {
        self.is_constant().then_some(self.ones & int_ops::mask(self.w))
    }

    fn require_same_width(&self, other: &Self, op: &'static str) {
        if self.w != other.w {
            crate::common::diagnostics::fail_precondition!(op, "width mismatch: {} vs {}", self.w, other.w);
        }
    }

    /// Join: bitwise OR of both bitstrings (more permissive).
    #[must_use]
    pub fn join(&self, other: &Self) -> Self {
        self.require_same_width(other, "Bitfield::join");
        Self { w: self.w, zeros: self.zeros | other.zeros, ones: self.ones | other.ones }
    }

    /// Meet: bitwise AND of both bitstrings (more restrictive).
    #[must_use]
    pub fn meet(&self, other: &Self) -> Self {
        self.require_same_width(other, "Bitfield::meet");
        Self { w: self.w, zeros: self.zeros & other.zeros, ones: self.ones & other.ones }
    }

    /// Bitwise AND: per-bit truth table.
    #[must_use]
    pub fn and(a: &Self, b: &Self) -> Self {
        a.require_same_width(b, "Bitfield::and");
        let w = a.w;
        let ones = a.ones & b.ones;
        let zeros = a.zeros | b.zeros;
        Self { w, zeros, ones }
    }

    /// Bitwise OR.
    #[must_use]
    pub fn or(a: &Self, b: &Self) -> Self {
        a.require_same_width(b, "Bitfield::or");
        let w = a.w;
        let ones = a.ones | b.ones;
        let zeros = a.zeros & b.zeros;
        Self { w, zeros, ones }
    }

    /// Bitwise XOR.
    #[must_use]
    pub fn xor(a: &Self, b: &Self) -> Self {
        a.require_same_width(b, "Bitfield::xor");
        let w = a.w;
        let a_def0 = a.zeros & !a.ones;
        let a_def1 = a.ones & !a.zeros;
        let b_def0 = b.zeros & !b.ones;
        let b_def1 = b.ones & !b.zeros;
        let def1 = (a_def0 & b_def1) | (a_def1 & b_def0);
        let def0 = (a_def0 & b_def0) | (a_def1 & b_def1);
        let unknown = int_ops::mask(w) & !(def0 | def1);
        Self { w, zeros: def0 | unknown, ones: def1 | unknown }
    }

    /// Shift left by a constant amount, rotating the representation in and
    /// filling with definite-0.
    #[must_use]
    pub fn shl_const(&self, amount: u32) -> Self {
        if amount >= self.w {
            return Self::constant(self.w, 0);
        }
        let m = int_ops::mask(self.w);
        let zeros = ((self.zeros << amount) | int_ops::mask(amount)) & m;
        let ones = (self.ones << amount) & m;
        Self { w: self.w, zeros, ones }
    }

    /// Shift left by every value the interval `shift` may take, joining the
    /// results; saturates to top if the shift range is too wide to be
    /// useful.
    #[must_use]
    pub fn shl_interval(&self, env: &Environment, shift_lo: u32, shift_hi: u32) -> Self {
        if shift_hi - shift_lo > env.config().set_threshold as u32 {
            Diagnostic::UnsupportedOperator { op: "shl (wide shift range)", domain: "Bitfield" }.emit();
            return Self::top(self.w);
        }
        let mut acc = Self::bottom(self.w);
        for amount in shift_lo..=shift_hi {
            acc = acc.join(&self.shl_const(amount));
        }
        acc
    }

    /// Logical shift right by a constant amount, filling high bits with
    /// definite-0.
    #[must_use]
    pub fn lshr_const(&self, amount: u32) -> Self {
        if amount >= self.w {
            return Self::constant(self.w, 0);
        }
        let m = int_ops::mask(self.w);
        let high_mask = (!int_ops::mask(self.w - amount)) & m;
        let zeros = ((self.zeros >> amount) | high_mask) & m;
        let ones = (self.ones >> amount) & m;
        Self { w: self.w, zeros, ones }
    }

    /// Arithmetic shift right by a constant amount, filling high bits with
    /// the sign bit's abstract value (replicated if it is itself
    /// undetermined).
    #[must_use]
    pub fn ashr_const(&self, amount: u32) -> Self {
        if amount >= self.w {
            let sign_zero = self.zeros & int_ops::sign_bit(self.w) != 0;
            let sign_one = self.ones & int_ops::sign_bit(self.w) != 0;
            let m = int_ops::mask(self.w);
            return Self {
                w: self.w,
                zeros: if sign_zero { m } else { 0 },
                ones: if sign_one { m } else { 0 },
            };
        }
        let m = int_ops::mask(self.w);
        let sign_zero = self.zeros & int_ops::sign_bit(self.w) != 0;
        let sign_one = self.ones & int_ops::sign_bit(self.w) != 0;
        let high_mask = (!int_ops::mask(self.w - amount)) & m;
        let zeros_fill = if sign_zero { high_mask } else { 0 };
        let ones_fill = if sign_one { high_mask } else { 0 };
        let zeros = ((self.zeros >> amount) & m) | zeros_fill;
        let ones = ((self.ones >> amount) & m) | ones_fill;
        Self { w: self.w, zeros, ones }
    }

    /// `a + b`, precise only when both operands are constants; otherwise
    /// top.
    #[must_use]
    pub fn add(a: &Self, b: &Self) -> Self {
        arithmetic_fallback(a, b, "add", |x, y, w| int_ops::uadd_overflowing(x, y, w).0)
    }

    /// `a - b`, precise only for constants.
    #[must_use]
    pub fn sub(a: &Self, b: &Self) -> Self {
        arithmetic_fallback(a, b, "sub", |x, y, w| int_ops::usub_overflowing(x, y, w).0)
    }

    /// `a * b`, precise only for constants.
    #[must_use]
    pub fn mul(a: &Self, b: &Self) -> Self {
        arithmetic_fallback(a, b, "mul", |x, y, w| int_ops::umul_overflowing(x, y, w).0)
    }

    /// Unsigned division, precise only for constants.
    #[must_use]
    pub fn udiv(a: &Self, b: &Self) -> Self {
        arithmetic_fallback_checked(a, b, "udiv", |x, y, w| int_ops::udiv(x, y, w))
    }

    /// Signed division, precise only for constants.
    #[must_use]
    pub fn sdiv(a: &Self, b: &Self) -> Self {
        arithmetic_fallback_checked(a, b, "sdiv", |x, y, w| int_ops::sdiv(x, y, w).map(|(v, _)| v))
    }

    /// Unsigned remainder, precise only for constants.
    #[must_use]
    pub fn urem(a: &Self, b: &Self) -> Self {
        arithmetic_fallback_checked(a, b, "urem", |x, y, w| int_ops::urem(x, y, w))
    }

    /// Signed remainder, precise only for constants.
    #[must_use]
    pub fn srem(a: &Self, b: &Self) -> Self {
        arithmetic_fallback_checked(a, b, "srem", |x, y, w| int_ops::srem(x, y, w))
    }

    /// Integer comparison.
    #[must_use]
    pub fn icmp(predicate: IntPredicate, a: &Self, b: &Self) -> Interval {
        a.require_same_width(b, "Bitfield::icmp");
        if a.has_impossible_bit() || b.has_impossible_bit() {
            return Interval::bottom(1);
        }
        match predicate {
            IntPredicate::Eq | IntPredicate::Ne => {
                let a_def0 = a.zeros & !a.ones;
                let a_def1 = a.ones & !a.zeros;
                let b_def0 = b.zeros & !b.ones;
                let b_def1 = b.ones & !b.zeros;
                let conflict = (a_def0 & b_def1) | (a_def1 & b_def0);
                if conflict & int_ops::mask(a.w) != 0 {
                    return Interval::constant(1, bit(predicate == IntPredicate::Ne));
                }
                let both_def = (a_def0 | a_def1) & (b_def0 | b_def1);
                if both_def & int_ops::mask(a.w) == int_ops::mask(a.w) {
                    return Interval::constant(1, bit(predicate == IntPredicate::Eq));
                }
                Interval::top(1)
            }
            _ => {
                let ia = a.as_interval();
                let ib = b.as_interval();
                Interval::icmp(&Environment::host64(), predicate, &ia, &ib)
            }
        }
    }

    /// Converts to the interval this bitfield's known bits support: a
    /// constant becomes a degenerate interval, otherwise top.
    pub(crate) fn as_interval(&self) -> Interval {
        self.constant_bits().map_or_else(|| Interval::top(self.w), |bits| Interval::constant(self.w, bits))
    }

    /// Truncates to the low `to_w` bits.
    #[must_use]
    pub fn trunc(&self, to_w: u32) -> Self {
        let m = int_ops::mask(to_w);
        Self { w: to_w, zeros: self.zeros & m, ones: self.ones & m }
    }

    /// Zero-extends, filling new high bits with definite-0.
    #[must_use]
    pub fn zext(&self, to_w: u32) -> Self {
        let m = int_ops::mask(to_w);
        let high = (!int_ops::mask(self.w)) & m;
        Self { w: to_w, zeros: (self.zeros | high) & m, ones: self.ones & m }
    }

    /// Sign-extends, filling new high bits with the sign bit's abstract
    /// triple.
    #[must_use]
    pub fn sext(&self, to_w: u32) -> Self {
        let m = int_ops::mask(to_w);
        let high = (!int_ops::mask(self.w)) & m;
        let sign_zero = self.zeros & int_ops::sign_bit(self.w) != 0;
        let sign_one = self.ones & int_ops::sign_bit(self.w) != 0;
        let zeros = (self.zeros & int_ops::mask(self.w)) | if sign_zero { high } else { 0 };
        let ones = (self.ones & int_ops::mask(self.w)) | if sign_one { high } else { 0 };
        Self { w: to_w, zeros, ones }
    }

    /// Converts a float interval to an unsigned bitfield, precise only when
    /// the float side is a single constant.
    #[must_use]
    pub fn fptoui(fi: &FloatInterval, to_w: u32) -> Self {
        match fi.bounds() {
            Some((lo, hi)) if lo == hi => match float_ops::fptoui(lo, to_w) {
                Some(v) => Self::constant(to_w, v),
                None => {
                    Diagnostic::ConcreteException { op: "fptoui", detail: "value out of range".into() }.emit();
                    Self::top(to_w)
                }
            },
            _ if fi.is_bottom() => Self::bottom(to_w),
            _ => {
                Diagnostic::UnsupportedOperator { op: "fptoui", domain: "Bitfield" }.emit();
                Self::top(to_w)
            }
        }
    }

    /// Converts a float interval to a signed bitfield, precise only when the
    /// float side is a single constant.
    #[must_use]
    pub fn fptosi(fi: &FloatInterval, to_w: u32) -> Self {
        match fi.bounds() {
            Some((lo, hi)) if lo == hi => match float_ops::fptosi(lo, to_w) {
                Some(v) => Self::constant(to_w, int_ops::from_signed(v, to_w)),
                None => {
                    Diagnostic::ConcreteException { op: "fptosi", detail: "value out of range".into() }.emit();
                    Self::top(to_w)
                }
            },
            _ if fi.is_bottom() => Self::bottom(to_w),
            _ => {
                Diagnostic::UnsupportedOperator { op: "fptosi", domain: "Bitfield" }.emit();
                Self::top(to_w)
            }
        }
    }

    /// Converts to a float interval, precise only when constant.
    #[must_use]
    pub fn uitofp(&self, to_s: FloatSemantics) -> FloatInterval {
        match self.constant_bits() {
            Some(v) => FloatInterval::constant(to_s, float_ops::uitofp(v, self.w)),
            None if self.is_bottom() => FloatInterval::bottom(to_s),
            None => {
                Diagnostic::UnsupportedOperator { op: "uitofp", domain: "Bitfield" }.emit();
                FloatInterval::top(to_s)
            }
        }
    }

    /// Converts to a float interval via the signed interpretation, precise
    /// only when constant.
    #[must_use]
    pub fn sitofp(&self, to_s: FloatSemantics) -> FloatInterval {
        match self.constant_bits() {
            Some(v) => FloatInterval::constant(to_s, float_ops::sitofp(int_ops::to_signed(v, self.w), self.w)),
            None if self.is_bottom() => FloatInterval::bottom(to_s),
            None => {
                Diagnostic::UnsupportedOperator { op: "sitofp", domain: "Bitfield" }.emit();
                FloatInterval::top(to_s)
            }
        }
    }
}

const fn bit(b: bool) -> u128 {
    if b { 1 } else { 0 }
}

fn arithmetic_fallback(a: &Bitfield, b: &Bitfield, op: &'static str, f: impl Fn(u128, u128, u32) -> u128) -> Bitfield {
    a.require_same_width(b, op);
    match (a.constant_bits(), b.constant_bits()) {
        (Some(x), Some(y)) => Bitfield::constant(a.w, f(x, y, a.w)),
        _ => {
            Diagnostic::UnsupportedOperator { op, domain: "Bitfield" }.emit();
            Bitfield::top(a.w)
        }
    }
}

fn arithmetic_fallback_checked(a: &Bitfield, b: &Bitfield, op: &'static str, f: impl Fn(u128, u128, u32) -> Option<u128>) -> Bitfield {
    a.require_same_width(b, op);
    match (a.constant_bits(), b.constant_bits()) {
        (Some(x), Some(y)) => match f(x, y, a.w) {
            Some(v) => Bitfield::constant(a.w, v),
            None => {
                Diagnostic::ConcreteException { op, detail: "division by zero".into() }.emit();
                Bitfield::top(a.w)
            }
        },
        _ => {
            Diagnostic::UnsupportedOperator { op, domain: "Bitfield" }.emit();
            Bitfield::top(a.w)
        }
    }
}

impl AbstractDomain for Bitfield {
    fn is_bottom(&self) -> bool {
        self.has_impossible_bit()
    }

    fn is_top(&self) -> bool {
        let m = int_ops::mask(self.w);
        self.zeros & m == m && self.ones & m == m
    }

    fn clone_cleaned(&self) -> Self {
        Self::bottom(self.w)
    }

    fn join(&self, _env: &Environment, other: &Self) -> Self {
        Bitfield::join(self, other)
    }

    fn meet(&self, _env: &Environment, other: &Self) -> Self {
        Bitfield::meet(self, other)
    }

    fn memory_usage(&self) -> usize {
        core::mem::size_of::<Self>()
    }

    fn accuracy(&self) -> f64 {
        if self.is_bottom() {
            return 1.0;
        }
        let m = int_ops::mask(self.w);
        let unknown = (self.zeros & self.ones & m).count_ones();
        let total = self.w.max(1);
        (1.0 - f64::from(unknown) / f64::from(total)).clamp(0.0, 1.0)
    }

    fn matches_string(&self, text: &str) -> (bool, String) {
        let Some(bits) = text.trim().strip_prefix("integerBitfield").map(str::trim_start) else {
            return (false, format!("`{text}` does not start with `integerBitfield`"));
        };
        if bits.len() != self.w as usize {
            return (false, format!("`{bits}` has {} character(s), expected {}", bits.len(), self.w));
        }
        let mut zeros = 0u128;
        let mut ones = 0u128;
        for (offset, c) in bits.chars().enumerate() {
            let i = self.w as usize - 1 - offset;
            match c {
                '0' => zeros |= 1u128 << i,
                '1' => ones |= 1u128 << i,
                'T' => {
                    zeros |= 1u128 << i;
                    ones |= 1u128 << i;
                }
                '_' => {}
                other => return (false, format!("`{other}` is not a valid bit marker (expected one of 0 1 T _)")),
            }
        }
        if zeros == self.zeros && ones == self.ones {
            (true, "parsed value matches".to_string())
        } else {
            (false, format!("`{text}` parses to a different bit pattern than this value"))
        }
    }
}

impl fmt::Display for Bitfield {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "integerBitfield ")?;
        for i in (0..self.w).rev() {
            let bit = 1u128 << i;
            let z = self.zeros & bit != 0;
            let o = self.ones & bit != 0;
            let c = match (z, o) {
                (true, false) => '0',
                (false, true) => '1',
                (true, true) => 'T',
                (false, false) => '_',
            };
            write!(f, "{c}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_4_bitfield_and_is_exact() {
        let a = Bitfield::constant(8, 0b0000_1111);
        let b = Bitfield::constant(8, 0b1111_0000);
        let r = Bitfield::and(&a, &b);
        assert_eq!(r.constant_bits(), Some(0));
    }

    #[test]
    fn no_bit_is_both_zero_and_one_unless_bottom() {
        let top = Bitfield::top(8);
        assert!(!top.has_impossible_bit());
        let bot = Bitfield::bottom(8);
        assert!(bot.is_bottom());
    }

    #[test]
    fn join_of_two_constants_agrees_where_they_agree() {
        let a = Bitfield::constant(4, 0b0011);
        let b = Bitfield::constant(4, 0b0101);
        let j = a.join(&b);
        // bit 0: both 1 -> definite 1; bit 1: differ -> top; bit 2: differ -> top; bit 3: both 0 -> definite 0
        assert_eq!(j.to_string(), "integerBitfield 0TT1");
    }

    #[test]
    fn meet_of_conflicting_constants_is_bottom() {
        let a = Bitfield::constant(4, 0b0011);
        let b = Bitfield::constant(4, 0b0101);
        let m = a.meet(&b);
        assert!(m.is_bottom());
    }

    #[test]
    fn round_trip_serialization() {
        let a = Bitfield::top(4);
        let text = a.to_string();
        assert_eq!(text, "integerBitfield TTTT");
        let (ok, _) = a.matches_string(&text);
        assert!(ok);
    }

    #[test]
    fn matches_string_tolerates_surrounding_whitespace() {
        let a = Bitfield::constant(4, 0b0101);
        let (ok, _) = a.matches_string("  integerBitfield   0101  ");
        assert!(ok);
    }

    #[test]
    fn matches_string_rejects_a_different_pattern() {
        let a = Bitfield::constant(4, 0b0101);
        let (ok, _) = a.matches_string("integerBitfield 0011");
        assert!(!ok);
    }

    #[test]
    fn sdiv_of_constants_is_exact() {
        let a = Bitfield::constant(8, int_ops::from_signed(-10, 8));
        let b = Bitfield::constant(8, int_ops::from_signed(-2, 8));
        let r = Bitfield::sdiv(&a, &b);
        assert_eq!(r.constant_bits(), Some(5));
    }

    #[test]
    fn urem_of_constants_is_exact() {
        let a = Bitfield::constant(8, 10);
        let b = Bitfield::constant(8, 3);
        let r = Bitfield::urem(&a, &b);
        assert_eq!(r.constant_bits(), Some(1));
    }

    #[test]
    fn srem_of_constants_is_exact() {
        let a = Bitfield::constant(8, int_ops::from_signed(-10, 8));
        let b = Bitfield::constant(8, 3);
        let r = Bitfield::srem(&a, &b);
        assert_eq!(r.constant_bits(), Some(int_ops::from_signed(-1, 8)));
    }

    #[test]
    fn non_constant_sdiv_falls_back_to_top() {
        let a = Bitfield::top(8);
        let b = Bitfield::constant(8, 2);
        let r = Bitfield::sdiv(&a, &b);
        assert!(!r.has_impossible_bit());
        assert!(r.constant_bits().is_none());
    }

    #[test]
    fn fptoui_then_uitofp_round_trips_a_constant() {
        let c = Bitfield::constant(8, 5);
        let f = c.uitofp(crate::common::FloatSemantics::Double);
        let back = Bitfield::fptoui(&f, 8);
        assert_eq!(back.constant_bits(), Some(5));
    }
}
