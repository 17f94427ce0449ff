//! The dual-range integer interval domain.
//!
//! Signed and unsigned bounds are tracked independently because the same
//! concrete set can be contiguous under one ordering and fragmented under
//! the other — `{-1, 0}` is signed-contiguous (`[-1, 0]`) but unsigned two
//! points apart (`{0, u32::MAX}`). The two sides are refined independently
//! by every operator and only reconciled when a caller asks a question that
//! needs both (e.g. "is this a known constant?").

use core::fmt;

use crate::common::diagnostics::Diagnostic;
use crate::common::{Environment, FloatSemantics, IntPredicate};
use crate::primitives::{float_ops, int_ops};

use super::float_interval::FloatInterval;
use super::AbstractDomain;

/// One side (signed or unsigned) of an [`Interval`]'s dual range.
///
/// A separate sum type per side (REDESIGN: no `mEmpty`/`mTop` flag pair to
/// keep consistent — the variant itself carries the state).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Side<T> {
    Bottom,
    Top,
    Value { lo: T, hi: T },
}

impl<T: Copy + Ord> Side<T> {
    const fn is_bottom(self) -> bool {
        matches!(self, Self::Bottom)
    }

    const fn is_top(self) -> bool {
        matches!(self, Self::Top)
    }

    fn join(self, other: Self) -> Self {
        match (self, other) {
            (Self::Bottom, x) | (x, Self::Bottom) => x,
            (Self::Top, _) | (_, Self::Top) => Self::Top,
            (Self::Value { lo: l1, hi: h1 }, Self::Value { lo: l2, hi: h2 }) => Self::Value {
                lo: l1.min(l2),
                hi: h1.max(h2),
            },
        }
    }

    fn meet(self, other: Self) -> Self {
        match (self, other) {
            (Self::Bottom, _) | (_, Self::Bottom) => Self::Bottom,
            (Self::Top, x) | (x, Self::Top) => x,
            (Self::Value { lo: l1, hi: h1 }, Self::Value { lo: l2, hi: h2 }) => {
                let lo = l1.max(l2);
                let hi = h1.min(h2);
                if lo > hi {
                    Self::Bottom
                } else {
                    Self::Value { lo, hi }
                }
            }
        }
    }

    fn is_leq(self, other: Self) -> bool {
        match (self, other) {
            (Self::Bottom, _) => true,
            (_, Self::Top) => true,
            (Self::Top, _) | (_, Self::Bottom) => false,
            (Self::Value { lo: l1, hi: h1 }, Self::Value { lo: l2, hi: h2 }) => l2 <= l1 && h1 <= h2,
        }
    }

    const fn as_value(self) -> Option<(T, T)> {
        match self {
            Self::Value { lo, hi } => Some((lo, hi)),
            Self::Bottom | Self::Top => None,
        }
    }
}

type SignedSide = Side<i128>;
type UnsignedSide = Side<u128>;

/// A dual-range integer interval of a fixed bit width.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Interval {
    w: u32,
    signed: SignedSide,
    unsigned: UnsignedSide,
}

impl Interval {
    /// The bottom value (no concrete values) at width `w`.
    #[must_use]
    pub const fn bottom(w: u32) -> Self {
        Self {
            w,
            signed: Side::Bottom,
            unsigned: Side::Bottom,
        }
    }

    /// The top value (any `w`-bit value) at width `w`.
    #[must_use]
    pub const fn top(w: u32) -> Self {
        Self {
            w,
            signed: Side::Top,
            unsigned: Side::Top,
        }
    }

    /// A single-valued (constant) interval.
    #[must_use]
    pub fn constant(w: u32, bits: u128) -> Self {
        let bits = int_ops::mask(w) & bits;
        let s = int_ops::to_signed(bits, w);
        Self {
            w,
            signed: Side::Value { lo: s, hi: s },
            unsigned: Side::Value { lo: bits, hi: bits },
        }
    }

    /// Builds an interval directly from signed bounds, with unsigned
    /// re-derived as top (callers needing both sides precise should build
    /// incrementally via `meet`/`join`, as the real algorithm does).
    #[must_use]
    pub const fn from_signed_range(w: u32, lo: i128, hi: i128) -> Self {
        Self {
            w,
            signed: Side::Value { lo, hi },
            unsigned: Side::Top,
        }
    }

    /// Builds an interval directly from unsigned bounds.
    #[must_use]
    pub const fn from_unsigned_range(w: u32, lo: u128, hi: u128) -> Self {
        Self {
            w,
            signed: Side::Top,
            unsigned: Side::Value { lo, hi },
        }
    }

    /// Builds a fully dual-ranged interval from both explicit sides.
    #[must_use]
    pub const fn from_ranges(w: u32, signed_lo: i128, signed_hi: i128, unsigned_lo: u128, unsigned_hi: u128) -> Self {
        Self {
            w,
            signed: Side::Value { lo: signed_lo, hi: signed_hi },
            unsigned: Side::Value { lo: unsigned_lo, hi: unsigned_hi },
        }
    }

    /// Bit width.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.w
    }

    /// True if the signed side is top.
    #[must_use]
    pub const fn signed_is_top(&self) -> bool {
        self.signed.is_top()
    }

    /// True if the unsigned side is top.
    #[must_use]
    pub const fn unsigned_is_top(&self) -> bool {
        self.unsigned.is_top()
    }

    /// The signed bounds, if the signed side is a concrete (non-top,
    /// non-bottom) range.
    #[must_use]
    pub const fn signed_bounds(&self) -> Option<(i128, i128)> {
        self.signed.as_value()
    }

    /// The unsigned bounds, if the unsigned side is a concrete range.
    #[must_use]
    pub const fn unsigned_bounds(&self) -> Option<(u128, u128)> {
        self.unsigned.as_value()
    }

    /// True if both sides are degenerate (`lo == hi`) and agree on the same
    /// concrete value, i.e. this interval denotes exactly one `w`-bit
    /// pattern.
    #[must_use]
    pub fn is_constant(&self) -> bool {
        match (self.signed, self.unsigned) {
            (Side::Value { lo: sl, hi: sh }, Side::Value { lo: ul, hi: uh }) => {
                sl == sh && ul == uh && int_ops::from_signed(sl, self.w) == ul
            }
            _ => false,
        }
    }

    /// The single concrete bit pattern this interval denotes, if [`is_constant`](Self::is_constant).
    #[must_use]
    pub fn constant_bits(&self) -> Option<u128> {
        self.is_constant().then(|| self.unsigned.as_value().map(|(lo, _)| lo)).flatten()
    }

    fn require_same_width(&self, other: &Self, op: &'static str) {
        if self.w != other.w {
            crate::common::diagnostics::fail_precondition!(
                op,
                "width mismatch: {} vs {}",
                self.w,
                other.w
            );
        }
    }

    /// Least upper bound.
    #[must_use]
    pub fn join(&self, other: &Self) -> Self {
        self.require_same_width(other, "Interval::join");
        Self {
            w: self.w,
            signed: self.signed.join(other.signed),
            unsigned: self.unsigned.join(other.unsigned),
        }
    }

    /// Greatest lower bound.
    #[must_use]
    pub fn meet(&self, other: &Self) -> Self {
        self.require_same_width(other, "Interval::meet");
        Self {
            w: self.w,
            signed: self.signed.meet(other.signed),
            unsigned: self.unsigned.meet(other.unsigned),
        }
    }

    /// Widens `self` (the accumulated value) against `other` (the newly
    /// computed join), jumping any side whose bound grew to `±infinity`.
    /// Called by the widening manager, never by `join` itself.
    #[must_use]
    pub fn widen(&self, other: &Self) -> Self {
        self.require_same_width(other, "Interval::widen");
        let signed = match (self.signed, other.signed) {
            (Side::Value { lo: l0, hi: h0 }, Side::Value { lo: l1, hi: h1 }) => {
                let lo = if l1 < l0 { signed_min(self.w) } else { l0 };
                let hi = if h1 > h0 { signed_max(self.w) } else { h0 };
                Side::Value { lo, hi }
            }
            _ => self.signed.join(other.signed),
        };
        let unsigned = match (self.unsigned, other.unsigned) {
            (Side::Value { lo: l0, hi: h0 }, Side::Value { lo: l1, hi: h1 }) => {
                let lo = if l1 < l0 { 0 } else { l0 };
                let hi = if h1 > h0 { int_ops::mask(self.w) } else { h0 };
                Side::Value { lo, hi }
            }
            _ => self.unsigned.join(other.unsigned),
        };
        Self { w: self.w, signed, unsigned }
    }

    /// `a + b`.
    #[must_use]
    pub fn add(env: &Environment, a: &Self, b: &Self) -> Self {
        a.require_same_width(b, "Interval::add");
        let w = a.w;
        let signed = side_binop(a.signed, b.signed, |x, y| {
            let (bits, ovf) = int_ops::sadd_overflowing(int_ops::from_signed(x, w), int_ops::from_signed(y, w), w);
            (int_ops::to_signed(bits, w), ovf)
        });
        let unsigned = side_binop(a.unsigned, b.unsigned, |x, y| int_ops::uadd_overflowing(x, y, w));
        let _ = env;
        Self { w, signed, unsigned }
    }

    /// `a - b`.
    #[must_use]
    pub fn sub(env: &Environment, a: &Self, b: &Self) -> Self {
        a.require_same_width(b, "Interval::sub");
        let w = a.w;
        let signed = match (a.signed, b.signed) {
            (Side::Bottom, _) | (_, Side::Bottom) => Side::Bottom,
            (Side::Value { lo: al, hi: ah }, Side::Value { lo: bl, hi: bh }) => {
                let (lo_bits, lo_ovf) = int_ops::ssub_overflowing(int_ops::from_signed(al, w), int_ops::from_signed(bh, w), w);
                let (hi_bits, hi_ovf) = int_ops::ssub_overflowing(int_ops::from_signed(ah, w), int_ops::from_signed(bl, w), w);
                if lo_ovf || hi_ovf {
                    Side::Top
                } else {
                    Side::Value { lo: int_ops::to_signed(lo_bits, w), hi: int_ops::to_signed(hi_bits, w) }
                }
            }
            _ => Side::Top,
        };
        let unsigned = match (a.unsigned, b.unsigned) {
            (Side::Value { lo: al, hi: ah }, Side::Value { lo: bl, hi: bh }) => {
                let (lo, lo_ovf) = int_ops::usub_overflowing(al, bh, w);
                let (hi, hi_ovf) = int_ops::usub_overflowing(ah, bl, w);
                if lo_ovf || hi_ovf { Side::Top } else { Side::Value { lo, hi } }
            }
            (Side::Bottom, _) | (_, Side::Bottom) => Side::Bottom,
            _ => Side::Top,
        };
        let _ = env;
        Self { w, signed, unsigned }
    }

    /// `a * b`.
    #[must_use]
    pub fn mul(env: &Environment, a: &Self, b: &Self) -> Self {
        a.require_same_width(b, "Interval::mul");
        let w = a.w;
        let signed = corner_mul_signed(a.signed, b.signed, w);
        let unsigned = corner_mul_unsigned(a.unsigned, b.unsigned, w);
        let _ = env;
        Self { w, signed, unsigned }
    }

    /// Unsigned division; the signed side is always top (division crosses
    /// the sign boundary unpredictably).
    #[must_use]
    pub fn udiv(env: &Environment, a: &Self, b: &Self) -> Self {
        a.require_same_width(b, "Interval::udiv");
        let w = a.w;
        let unsigned = unsigned_div(a.unsigned, b.unsigned, w, env, "udiv");
        let signed = if a.signed.is_bottom() || b.signed.is_bottom() { Side::Bottom } else { Side::Top };
        Self { w, signed, unsigned }
    }

    /// Signed division; the unsigned side is always top.
    #[must_use]
    pub fn sdiv(env: &Environment, a: &Self, b: &Self) -> Self {
        a.require_same_width(b, "Interval::sdiv");
        let w = a.w;
        let signed = signed_div(a.signed, b.signed, w, env);
        let unsigned = if a.unsigned.is_bottom() || b.unsigned.is_bottom() { Side::Bottom } else { Side::Top };
        Self { w, signed, unsigned }
    }

    /// Unsigned remainder.
    #[must_use]
    pub fn urem(env: &Environment, a: &Self, b: &Self) -> Self {
        a.require_same_width(b, "Interval::urem");
        let w = a.w;
        let unsigned = match (a.unsigned, b.unsigned) {
            (Side::Bottom, _) | (_, Side::Bottom) => Side::Bottom,
            (Side::Value { lo: al, hi: ah }, Side::Value { lo: bl, hi: bh }) if bl == bh && bl != 0 => {
                let d = bl;
                if ah - al < d {
                    Side::Value { lo: al % d, hi: ah % d }
                } else {
                    Side::Value { lo: 0, hi: d - 1 }
                }
            }
            (Side::Value { .. } | Side::Top, Side::Value { lo, .. }) if lo == 0 => {
                Diagnostic::ConcreteException { op: "urem", detail: "divisor may be zero".into() }.emit();
                Side::Top
            }
            _ => Side::Top,
        };
        let signed = if a.signed.is_bottom() || b.signed.is_bottom() { Side::Bottom } else { Side::Top };
        let _ = env;
        Self { w, signed, unsigned }
    }

    /// Signed remainder.
    #[must_use]
    pub fn srem(env: &Environment, a: &Self, b: &Self) -> Self {
        a.require_same_width(b, "Interval::srem");
        let w = a.w;
        let signed = match (a.signed, b.signed) {
            (Side::Bottom, _) | (_, Side::Bottom) => Side::Bottom,
            (Side::Value { lo: al, hi: ah }, Side::Value { lo: bl, hi: bh }) if bl == bh && bl != 0 => {
                let d = bl;
                let span = ah.abs_diff(al);
                if span < d.unsigned_abs() {
                    Side::Value { lo: al % d, hi: ah % d }
                } else {
                    let dmax = bl.unsigned_abs().max(bh.unsigned_abs()) as i128;
                    Side::Value { lo: -(dmax - 1), hi: dmax - 1 }
                }
            }
            _ => Side::Top,
        };
        let unsigned = if a.unsigned.is_bottom() || b.unsigned.is_bottom() { Side::Bottom } else { Side::Top };
        let _ = env;
        Self { w, signed, unsigned }
    }

    fn bitwise_widen(env: &Environment, a: &Self, b: &Self, op: &'static str) -> Self {
        a.require_same_width(b, op);
        let w = a.w;
        if a.signed.is_bottom() && a.unsigned.is_bottom() || b.signed.is_bottom() && b.unsigned.is_bottom() {
            return Self::bottom(w);
        }
        Diagnostic::UnsupportedOperator { op, domain: "Interval" }.emit();
        let _ = env;
        Self::top(w)
    }

    /// Shift left. The interval domain surrenders precision here
    /// unconditionally (§ open questions: not special-cased for
    /// power-of-two operands); the bitfield domain and reduced product
    /// recover precision.
    #[must_use]
    pub fn shl(env: &Environment, a: &Self, b: &Self) -> Self {
        Self::bitwise_widen(env, a, b, "shl")
    }

    /// Logical shift right.
    #[must_use]
    pub fn lshr(env: &Environment, a: &Self, b: &Self) -> Self {
        Self::bitwise_widen(env, a, b, "lshr")
    }

    /// Arithmetic shift right.
    #[must_use]
    pub fn ashr(env: &Environment, a: &Self, b: &Self) -> Self {
        Self::bitwise_widen(env, a, b, "ashr")
    }

    /// Bitwise AND.
    #[must_use]
    pub fn and(env: &Environment, a: &Self, b: &Self) -> Self {
        Self::bitwise_widen(env, a, b, "and")
    }

    /// Bitwise OR.
    #[must_use]
    pub fn or(env: &Environment, a: &Self, b: &Self) -> Self {
        Self::bitwise_widen(env, a, b, "or")
    }

    /// Bitwise XOR.
    #[must_use]
    pub fn xor(env: &Environment, a: &Self, b: &Self) -> Self {
        Self::bitwise_widen(env, a, b, "xor")
    }

    /// Integer comparison, producing a width-1 interval (bottom / `{0}` /
    /// `{1}` / top).
    #[must_use]
    pub fn icmp(env: &Environment, predicate: IntPredicate, a: &Self, b: &Self) -> Self {
        a.require_same_width(b, "Interval::icmp");
        if a.is_bottom() || b.is_bottom() {
            return Self::bottom(1);
        }
        let (lo_a, hi_a, lo_b, hi_b, lt, le): (i128, i128, i128, i128, fn(i128, i128) -> bool, fn(i128, i128) -> bool) =
            if predicate.is_signed() {
                match (a.signed, b.signed) {
                    (Side::Value { lo: la, hi: ha }, Side::Value { lo: lb, hi: hb }) => {
                        (la, ha, lb, hb, |x: i128, y: i128| x < y, |x: i128, y: i128| x <= y)
                    }
                    _ => return Self::top(1),
                }
            } else if predicate.is_unsigned() {
                match (a.unsigned, b.unsigned) {
                    (Side::Value { lo: la, hi: ha }, Side::Value { lo: lb, hi: hb }) => (
                        la as i128,
                        ha as i128,
                        lb as i128,
                        hb as i128,
                        |x: i128, y: i128| (x as u128) < (y as u128),
                        |x: i128, y: i128| (x as u128) <= (y as u128),
                    ),
                    _ => return Self::top(1),
                }
            } else {
                return icmp_eq_ne(predicate, a, b);
            };

        let definite_lt = lt(hi_a, lo_b);
        let definite_gt = lt(hi_b, lo_a);
        let definite_le = le(hi_a, lo_b);
        let definite_ge = le(hi_b, lo_a);

        let result = match predicate {
            IntPredicate::Slt | IntPredicate::Ult => tristate(definite_lt, definite_ge),
            IntPredicate::Sgt | IntPredicate::Ugt => tristate(definite_gt, definite_le),
            IntPredicate::Sle | IntPredicate::Ule => tristate(definite_le, definite_gt),
            IntPredicate::Sge | IntPredicate::Uge => tristate(definite_ge, definite_lt),
            IntPredicate::Eq | IntPredicate::Ne => unreachable!("handled above"),
        };
        let _ = env;
        result
    }

    /// Truncates to the low `to_w` bits. A side's endpoints truncate
    /// independently; if that flips their order (the high bits dropped
    /// carried the distinction keeping `lo <= hi`), the endpoints are
    /// swapped back into range order. A target width of 1 with differing
    /// endpoints can't preserve a two-valued answer, so it widens to top.
    #[must_use]
    pub fn trunc(&self, to_w: u32) -> Self {
        Self {
            w: to_w,
            signed: trunc_signed_side(self.signed, to_w),
            unsigned: trunc_unsigned_side(self.unsigned, to_w),
        }
    }

    /// Zero-extends to `to_w` bits. The unsigned side's values don't change
    /// (zero-padding is a no-op on the stored magnitude); the signed side
    /// becomes the same values, which are now known non-negative in the
    /// wider width.
    #[must_use]
    pub fn zext(&self, to_w: u32) -> Self {
        let unsigned = match self.unsigned {
            Side::Bottom => Side::Bottom,
            Side::Top => Side::Value { lo: 0, hi: int_ops::mask(self.w) },
            Side::Value { lo, hi } => Side::Value { lo, hi },
        };
        let signed = match unsigned {
            Side::Bottom => Side::Bottom,
            Side::Value { lo, hi } => Side::Value { lo: lo as i128, hi: hi as i128 },
            Side::Top => unreachable!("unsigned was just normalized away from Top"),
        };
        Self { w: to_w, signed, unsigned }
    }

    /// Sign-extends to `to_w` bits. The signed side's values are preserved
    /// as-is (sign extension doesn't change the represented integer); the
    /// unsigned side is their two's-complement reinterpretation at the new
    /// width, which becomes top if the signed range straddles zero (the
    /// reinterpretation would wrap instead of staying contiguous).
    #[must_use]
    pub fn sext(&self, to_w: u32) -> Self {
        let (lo, hi) = match self.signed {
            Side::Bottom => return Self { w: to_w, signed: Side::Bottom, unsigned: Side::Bottom },
            Side::Top => (signed_min(self.w), signed_max(self.w)),
            Side::Value { lo, hi } => (lo, hi),
        };
        let unsigned = if lo < 0 && hi >= 0 {
            Side::Top
        } else {
            let (a, b) = (int_ops::from_signed(lo, to_w), int_ops::from_signed(hi, to_w));
            if a <= b { Side::Value { lo: a, hi: b } } else { Side::Value { lo: b, hi: a } }
        };
        Self { w: to_w, signed: Side::Value { lo, hi }, unsigned }
    }

    /// Converts a float interval's endpoints through the IEEE→unsigned
    /// primitive. Any endpoint that's NaN or out of range forces top.
    #[must_use]
    pub fn fptoui(fi: &FloatInterval, to_w: u32) -> Self {
        if fi.is_bottom() {
            return Self::bottom(to_w);
        }
        let Some((lo, hi)) = fi.bounds() else {
            return Self::top(to_w);
        };
        match (float_ops::fptoui(lo, to_w), float_ops::fptoui(hi, to_w)) {
            (Some(l), Some(h)) if l <= h => Self::from_unsigned_range(to_w, l, h),
            _ => Self::top(to_w),
        }
    }

    /// Converts a float interval's endpoints through the IEEE→signed
    /// primitive. Any endpoint that's NaN or out of range forces top.
    #[must_use]
    pub fn fptosi(fi: &FloatInterval, to_w: u32) -> Self {
        if fi.is_bottom() {
            return Self::bottom(to_w);
        }
        let Some((lo, hi)) = fi.bounds() else {
            return Self::top(to_w);
        };
        match (float_ops::fptosi(lo, to_w), float_ops::fptosi(hi, to_w)) {
            (Some(l), Some(h)) if l <= h => Self::from_signed_range(to_w, l, h),
            _ => Self::top(to_w),
        }
    }

    /// Converts the unsigned side's endpoints to floats.
    #[must_use]
    pub fn uitofp(&self, to_s: FloatSemantics) -> FloatInterval {
        if self.is_bottom() {
            return FloatInterval::bottom(to_s);
        }
        match self.unsigned {
            Side::Value { lo, hi } => FloatInterval::range(to_s, float_ops::uitofp(lo, self.w), float_ops::uitofp(hi, self.w)),
            Side::Bottom | Side::Top => FloatInterval::top(to_s),
        }
    }

    /// Converts the signed side's endpoints to floats.
    #[must_use]
    pub fn sitofp(&self, to_s: FloatSemantics) -> FloatInterval {
        if self.is_bottom() {
            return FloatInterval::bottom(to_s);
        }
        match self.signed {
            Side::Value { lo, hi } => FloatInterval::range(to_s, float_ops::sitofp(lo, self.w), float_ops::sitofp(hi, self.w)),
            Side::Bottom | Side::Top => FloatInterval::top(to_s),
        }
    }
}

fn trunc_signed_side(side: SignedSide, to_w: u32) -> SignedSide {
    match side {
        Side::Bottom => Side::Bottom,
        Side::Top => Side::Top,
        Side::Value { lo, hi } => {
            if to_w == 1 && lo != hi {
                return Side::Top;
            }
            let lo_t = int_ops::to_signed(int_ops::from_signed(lo, to_w), to_w);
            let hi_t = int_ops::to_signed(int_ops::from_signed(hi, to_w), to_w);
            if lo_t <= hi_t { Side::Value { lo: lo_t, hi: hi_t } } else { Side::Value { lo: hi_t, hi: lo_t } }
        }
    }
}

fn trunc_unsigned_side(side: UnsignedSide, to_w: u32) -> UnsignedSide {
    match side {
        Side::Bottom => Side::Bottom,
        Side::Top => Side::Top,
        Side::Value { lo, hi } => {
            if to_w == 1 && lo != hi {
                return Side::Top;
            }
            let lo_t = int_ops::trunc(lo, to_w);
            let hi_t = int_ops::trunc(hi, to_w);
            if lo_t <= hi_t { Side::Value { lo: lo_t, hi: hi_t } } else { Side::Value { lo: hi_t, hi: lo_t } }
        }
    }
}

fn signed_min(w: u32) -> i128 {
    -(1i128 << (w - 1))
}

fn signed_max(w: u32) -> i128 {
    (1i128 << (w - 1)) - 1
}

fn side_binop<T: Copy, F: Fn(T, T) -> (T, bool)>(a: Side<T>, b: Side<T>, f: F) -> Side<T>
where
    T: Ord,
{
    match (a, b) {
        (Side::Bottom, _) | (_, Side::Bottom) => Side::Bottom,
        (Side::Top, _) | (_, Side::Top) => Side::Top,
        (Side::Value { lo: al, hi: ah }, Side::Value { lo: bl, hi: bh }) => {
            let (lo, lo_ovf) = f(al, bl);
            let (hi, hi_ovf) = f(ah, bh);
            if lo_ovf || hi_ovf {
                Side::Top
            } else {
                Side::Value { lo, hi }
            }
        }
    }
}

fn corner_mul_signed(a: Side<i128>, b: Side<i128>, w: u32) -> Side<i128> {
    match (a, b) {
        (Side::Bottom, _) | (_, Side::Bottom) => Side::Bottom,
        (Side::Top, _) | (_, Side::Top) => Side::Top,
        (Side::Value { lo: al, hi: ah }, Side::Value { lo: bl, hi: bh }) => {
            let mut lo = i128::MAX;
            let mut hi = i128::MIN;
            let mut any_ovf = false;
            for x in [al, ah] {
                for y in [bl, bh] {
                    let (bits, ovf) = int_ops::smul_overflowing(int_ops::from_signed(x, w), int_ops::from_signed(y, w), w);
                    if ovf {
                        any_ovf = true;
                    } else {
                        let v = int_ops::to_signed(bits, w);
                        lo = lo.min(v);
                        hi = hi.max(v);
                    }
                }
            }
            if any_ovf { Side::Top } else { Side::Value { lo, hi } }
        }
    }
}

fn corner_mul_unsigned(a: Side<u128>, b: Side<u128>, w: u32) -> Side<u128> {
    match (a, b) {
        (Side::Bottom, _) | (_, Side::Bottom) => Side::Bottom,
        (Side::Top, _) | (_, Side::Top) => Side::Top,
        (Side::Value { lo: al, hi: ah }, Side::Value { lo: bl, hi: bh }) => {
            let mut lo = u128::MAX;
            let mut hi = 0u128;
            let mut any_ovf = false;
            for x in [al, ah] {
                for y in [bl, bh] {
                    let (v, ovf) = int_ops::umul_overflowing(x, y, w);
                    if ovf {
                        any_ovf = true;
                    } else {
                        lo = lo.min(v);
                        hi = hi.max(v);
                    }
                }
            }
            if any_ovf { Side::Top } else { Side::Value { lo, hi } }
        }
    }
}

fn unsigned_div(a: UnsignedSide, b: UnsignedSide, w: u32, env: &Environment, op: &'static str) -> UnsignedSide {
    let _ = env;
    match (a, b) {
        (Side::Bottom, _) | (_, Side::Bottom) => Side::Bottom,
        (_, Side::Value { lo, hi }) if lo == 0 && hi == 0 => {
            Diagnostic::ConcreteException { op, detail: "division by zero".into() }.emit();
            Side::Top
        }
        (Side::Value { lo: al, hi: ah }, Side::Value { lo: bl, hi: bh }) => {
            let (bl, bh) = if bl == 0 { (1, bh) } else { (bl, bh) };
            if bl > bh {
                return Side::Top;
            }
            let candidates = [al / bl.max(1), al / bh.max(1), ah / bl.max(1), ah / bh.max(1)];
            let lo = *candidates.iter().min().unwrap_or(&0);
            let hi = *candidates.iter().max().unwrap_or(&0);
            let _ = w;
            Side::Value { lo, hi }
        }
        _ => Side::Top,
    }
}

fn signed_div(a: SignedSide, b: SignedSide, w: u32, env: &Environment) -> SignedSide {
    let _ = (env, w);
    match (a, b) {
        (Side::Bottom, _) | (_, Side::Bottom) => Side::Bottom,
        (_, Side::Value { lo, hi }) if lo == 0 && hi == 0 => {
            Diagnostic::ConcreteException { op: "sdiv", detail: "division by zero".into() }.emit();
            Side::Top
        }
        (Side::Value { lo: al, hi: ah }, Side::Value { lo: bl, hi: bh }) => {
            let divisors: Vec<i128> = if bl < 0 && bh > 0 {
                vec![-1, 1]
            } else if bl == 0 {
                vec![1.max(bl), bh]
            } else if bh == 0 {
                vec![bl, (-1).min(bh)]
            } else {
                vec![bl, bh]
            };
            let mut lo = i128::MAX;
            let mut hi = i128::MIN;
            for x in [al, ah] {
                for &y in &divisors {
                    if y == 0 {
                        continue;
                    }
                    let v = x.checked_div(y).unwrap_or(x);
                    lo = lo.min(v);
                    hi = hi.max(v);
                }
            }
            if lo > hi { Side::Top } else { Side::Value { lo, hi } }
        }
        _ => Side::Top,
    }
}

fn tristate(definite_true: bool, definite_false: bool) -> Interval {
    if definite_true {
        Interval::constant(1, 1)
    } else if definite_false {
        Interval::constant(1, 0)
    } else {
        Interval::top(1)
    }
}

fn icmp_eq_ne(predicate: IntPredicate, a: &Interval, b: &Interval) -> Interval {
    let want_true = match (a.signed, a.unsigned, b.signed, b.unsigned) {
        (Side::Value { lo: sl1, hi: sh1 }, Side::Value { lo: ul1, hi: uh1 }, Side::Value { lo: sl2, hi: sh2 }, Side::Value { lo: ul2, hi: uh2 }) => {
            if sl1 == sh1 && sl2 == sh2 && ul1 == uh1 && ul2 == uh2 {
                if sl1 == sl2 && ul1 == ul2 {
                    Some(true)
                } else {
                    Some(false)
                }
            } else {
                let signed_disjoint = sh1 < sl2 || sh2 < sl1;
                let unsigned_disjoint = uh1 < ul2 || uh2 < ul1;
                if signed_disjoint || unsigned_disjoint {
                    Some(false)
                } else {
                    None
                }
            }
        }
        _ => None,
    };
    match want_true {
        Some(true) => Interval::constant(1, if predicate == IntPredicate::Eq { 1 } else { 0 }),
        Some(false) => Interval::constant(1, if predicate == IntPredicate::Eq { 0 } else { 1 }),
        None => Interval::top(1),
    }
}

impl AbstractDomain for Interval {
    fn is_bottom(&self) -> bool {
        self.signed.is_bottom() && self.unsigned.is_bottom()
    }

    fn is_top(&self) -> bool {
        self.signed.is_top() && self.unsigned.is_top()
    }

    fn clone_cleaned(&self) -> Self {
        Self::bottom(self.w)
    }

    fn join(&self, _env: &Environment, other: &Self) -> Self {
        Interval::join(self, other)
    }

    fn meet(&self, _env: &Environment, other: &Self) -> Self {
        Interval::meet(self, other)
    }

    fn is_leq(&self, _env: &Environment, other: &Self) -> bool {
        self.w == other.w && self.signed.is_leq(other.signed) && self.unsigned.is_leq(other.unsigned)
    }

    fn memory_usage(&self) -> usize {
        core::mem::size_of::<Self>()
    }

    fn accuracy(&self) -> f64 {
        if self.is_bottom() {
            return 1.0;
        }
        if self.is_top() {
            return 0.0;
        }
        let span = self.unsigned.as_value().map_or(int_ops::mask(self.w), |(lo, hi)| hi - lo);
        let full = int_ops::mask(self.w);
        if full == 0 {
            1.0
        } else {
            (1.0 - (span as f64) / (full as f64)).clamp(0.0, 1.0)
        }
    }

    fn matches_string(&self, text: &str) -> (bool, String) {
        let Some(body) = text.trim().strip_prefix("integerInterval").map(str::trim_start) else {
            return (false, format!("`{text}` does not start with `integerInterval`"));
        };
        let Some(body) = body.strip_prefix('{').and_then(|rest| rest.strip_suffix('}')) else {
            return (false, format!("`{text}` is not wrapped in `{{ }}`"));
        };
        let tokens: Vec<&str> = body.split_whitespace().collect();
        let mut i = 0;

        if let Err(reason) = expect_signed_group(self.w, self.signed, &tokens, &mut i) {
            return (false, reason);
        }
        if let Err(reason) = expect_unsigned_group(self.w, self.unsigned, &tokens, &mut i) {
            return (false, reason);
        }
        if i != tokens.len() {
            return (false, format!("`{text}` has {} trailing token(s) past the expected ranges", tokens.len() - i));
        }
        (true, "parsed value matches".to_string())
    }
}

/// Consumes `lo to hi` and an optional `(top)`/`(empty)` marker starting at
/// `tokens[*i]`, advancing `*i` past what it consumed.
fn take_range_group<'a>(tokens: &[&'a str], i: &mut usize) -> Option<(&'a str, &'a str, Option<&'a str>)> {
    if tokens.len() < *i + 3 || tokens[*i + 1] != "to" {
        return None;
    }
    let (lo, hi) = (tokens[*i], tokens[*i + 2]);
    if tokens.len() > *i + 3 && matches!(tokens[*i + 3], "(top)" | "(empty)") {
        let marker = tokens[*i + 3];
        *i += 4;
        Some((lo, hi, Some(marker)))
    } else {
        *i += 3;
        Some((lo, hi, None))
    }
}

/// `Side::Bottom` is normally omitted entirely, but the grammar also allows
/// an explicit `lo to hi (empty)` rendering; tolerate either without
/// consuming tokens that belong to the next group.
fn skip_optional_empty_group(tokens: &[&str], i: &mut usize) {
    let mut probe = *i;
    if let Some((_, _, Some("(empty)"))) = take_range_group(tokens, &mut probe) {
        *i = probe;
    }
}

fn expect_signed_group(w: u32, side: SignedSide, tokens: &[&str], i: &mut usize) -> Result<(), String> {
    match side {
        Side::Bottom => {
            skip_optional_empty_group(tokens, i);
            Ok(())
        }
        Side::Top => match take_range_group(tokens, i) {
            Some((lo, hi, Some("(top)"))) if lo.parse().ok() == Some(signed_min(w)) && hi.parse().ok() == Some(signed_max(w)) => Ok(()),
            _ => Err(format!("expected a signed `{} to {} (top)` group", signed_min(w), signed_max(w))),
        },
        Side::Value { lo, hi } => match take_range_group(tokens, i) {
            Some((l, h, None)) if l.parse().ok() == Some(lo) && h.parse().ok() == Some(hi) => Ok(()),
            _ => Err(format!("expected a signed `{lo} to {hi}` group")),
        },
    }
}

fn expect_unsigned_group(w: u32, side: UnsignedSide, tokens: &[&str], i: &mut usize) -> Result<(), String> {
    match side {
        Side::Bottom => {
            skip_optional_empty_group(tokens, i);
            Ok(())
        }
        Side::Top => match take_range_group(tokens, i) {
            Some((lo, hi, Some("(top)"))) if lo.parse().ok() == Some(0u128) && hi.parse().ok() == Some(int_ops::mask(w)) => Ok(()),
            _ => Err(format!("expected an unsigned `0 to {} (top)` group", int_ops::mask(w))),
        },
        Side::Value { lo, hi } => match take_range_group(tokens, i) {
            Some((l, h, None)) if l.parse().ok() == Some(lo) && h.parse().ok() == Some(hi) => Ok(()),
            _ => Err(format!("expected an unsigned `{lo} to {hi}` group")),
        },
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "integerInterval {{")?;
        match self.signed {
            Side::Bottom => {}
            Side::Top => write!(f, " {} to {} (top)", signed_min(self.w), signed_max(self.w))?,
            Side::Value { lo, hi } => write!(f, " {lo} to {hi}")?,
        }
        match self.unsigned {
            Side::Bottom => {}
            Side::Top => write!(f, " {} to {} (top)", 0u128, int_ops::mask(self.w))?,
            Side::Value { lo, hi } => write!(f, " {lo} to {hi}")?,
        }
        write!(f, " }}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env() -> Environment {
        Environment::host64()
    }

    #[test]
    fn seed_1_interval_add_with_overflow() {
        let a = Interval::from_ranges(32, 2_147_483_640, 2_147_483_647, 2_147_483_640, 2_147_483_647);
        let b = Interval::constant(32, 10);
        let r = Interval::add(&env(), &a, &b);
        assert!(r.signed_is_top());
        assert_eq!(r.unsigned_bounds(), Some((2_147_483_650, 2_147_483_657)));
    }

    #[test]
    fn seed_2_interval_meet_with_bottom_side() {
        let ten = Interval::constant(32, 10);
        let a = Interval::sdiv(&env(), &ten, &ten);
        let b = Interval::udiv(&env(), &ten, &ten);
        let m = a.meet(&b);
        assert_eq!(m.signed_bounds(), Some((1, 1)));
        assert_eq!(m.unsigned_bounds(), Some((1, 1)));
    }

    #[test]
    fn join_is_commutative_and_idempotent() {
        let a = Interval::constant(8, 3);
        let b = Interval::from_unsigned_range(8, 1, 5);
        assert_eq!(a.join(&b), b.join(&a));
        assert_eq!(a.join(&a), a);
    }

    #[test]
    fn join_with_bottom_is_identity() {
        let a = Interval::from_unsigned_range(8, 1, 5);
        let bot = Interval::bottom(8);
        assert_eq!(a.join(&bot), a);
    }

    #[test]
    fn meet_with_top_is_identity() {
        let a = Interval::from_unsigned_range(8, 1, 5);
        let top = Interval::top(8);
        assert_eq!(a.meet(&top), a);
    }

    #[test]
    fn bitwise_ops_always_widen_even_for_power_of_two() {
        let a = Interval::constant(8, 16);
        let b = Interval::constant(8, 255);
        let r = Interval::and(&env(), &a, &b);
        assert!(r.is_top());
    }

    #[test]
    fn is_constant_requires_both_sides_degenerate() {
        let c = Interval::constant(8, 5);
        assert!(c.is_constant());
        let one_sided = Interval::from_unsigned_range(8, 5, 5);
        assert!(!one_sided.is_constant());
    }

    #[test]
    fn round_trip_matches_string() {
        let c = Interval::constant(8, 5);
        let text = c.to_string();
        let (ok, _) = c.matches_string(&text);
        assert!(ok);
    }

    #[test]
    fn trunc_narrows_a_constant_unchanged() {
        let c = Interval::constant(16, 200);
        let t = c.trunc(8);
        assert_eq!(t.unsigned_bounds(), Some((200, 200)));
    }

    #[test]
    fn trunc_to_one_bit_collapses_a_nondegenerate_range_to_top() {
        let a = Interval::from_unsigned_range(8, 1, 2);
        let t = a.trunc(1);
        assert!(t.is_top());
    }

    #[test]
    fn zext_keeps_unsigned_magnitude_and_clears_the_sign() {
        let a = Interval::from_unsigned_range(8, 200, 250);
        let z = a.zext(16);
        assert_eq!(z.unsigned_bounds(), Some((200, 250)));
        assert_eq!(z.signed_bounds(), Some((200, 250)));
    }

    #[test]
    fn sext_preserves_signed_value_and_widens_unsigned_for_a_negative_range() {
        let a = Interval::from_signed_range(8, -5, -1);
        let s = a.sext(16);
        assert_eq!(s.signed_bounds(), Some((-5, -1)));
        assert!(!s.unsigned_is_top());
    }

    #[test]
    fn sext_falls_back_to_top_on_the_unsigned_side_when_the_range_straddles_zero() {
        let a = Interval::from_signed_range(8, -1, 1);
        let s = a.sext(16);
        assert!(s.unsigned_is_top());
        assert_eq!(s.signed_bounds(), Some((-1, 1)));
    }

    #[test]
    fn uitofp_then_fptoui_round_trips_an_unsigned_constant() {
        let a = Interval::constant(8, 5);
        let f = a.uitofp(FloatSemantics::Double);
        let back = Interval::fptoui(&f, 8);
        assert_eq!(back.unsigned_bounds(), Some((5, 5)));
    }

    #[test]
    fn sitofp_then_fptosi_round_trips_a_negative_constant() {
        let a = Interval::from_signed_range(8, -5, -5);
        let f = a.sitofp(FloatSemantics::Double);
        let back = Interval::fptosi(&f, 8);
        assert_eq!(back.signed_bounds(), Some((-5, -5)));
    }

    #[test]
    fn fptoui_on_bottom_float_interval_is_bottom() {
        let bottom_float = FloatInterval::bottom(FloatSemantics::Double);
        let r = Interval::fptoui(&bottom_float, 8);
        assert!(r.is_bottom());
    }
}

#[cfg(test)]
mod proptests {
    use proptest::prelude::*;

    use super::*;

    fn ordered_pair() -> impl Strategy<Value = (u128, u128)> {
        (0u8..=255, 0u8..=255).prop_map(|(x, y)| (u128::from(x.min(y)), u128::from(x.max(y))))
    }

    proptest! {
        /// Every concrete unsigned sum within the operand ranges lies inside
        /// the abstract result's unsigned bounds, or the result is top.
        #[test]
        fn add_unsigned_side_is_sound((a_lo, a_hi) in ordered_pair(), (b_lo, b_hi) in ordered_pair()) {
            let env = Environment::host64();
            let a = Interval::from_unsigned_range(8, a_lo, a_hi);
            let b = Interval::from_unsigned_range(8, b_lo, b_hi);
            let r = Interval::add(&env, &a, &b);
            for x in a_lo..=a_hi {
                for y in b_lo..=b_hi {
                    let concrete = (x + y) & int_ops::mask(8);
                    let sound = r.unsigned_is_top() || r.unsigned_bounds().is_some_and(|(lo, hi)| lo <= concrete && concrete <= hi);
                    prop_assert!(sound, "concrete {x}+{y}={concrete} not covered by {r:?}");
                }
            }
        }

        /// Join is always an upper bound of both operands under `is_leq`.
        #[test]
        fn join_is_upper_bound((a_lo, a_hi) in ordered_pair(), (b_lo, b_hi) in ordered_pair()) {
            let env = Environment::host64();
            let a = Interval::from_unsigned_range(8, a_lo, a_hi);
            let b = Interval::from_unsigned_range(8, b_lo, b_hi);
            let joined = a.join(&b);
            prop_assert!(AbstractDomain::is_leq(&a, &env, &joined));
            prop_assert!(AbstractDomain::is_leq(&b, &env, &joined));
        }
    }
}
