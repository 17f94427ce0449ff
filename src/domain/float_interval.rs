//! The floating-point interval domain: an inclusive `[lo, hi]` range in a
//! given IEEE semantics, with explicit NaN handling.

use core::fmt;

use crate::common::{Environment, FloatPredicate, FloatSemantics};
use crate::primitives::float_ops;

use super::interval::Interval;
use super::AbstractDomain;

/// The result of [`FloatInterval::compare`]: `-1` is bottom (empty inputs),
/// `0` is definitely-false, `1` is definitely-true, `2` is top.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompareResult {
    /// No execution reaches this comparison (an operand was bottom).
    Bottom,
    /// The predicate is definitely false.
    False,
    /// The predicate is definitely true.
    True,
    /// The predicate could be either, depending on the concrete values.
    Top,
}

impl CompareResult {
    /// Translates into the width-1 integer encoding used by `fcmp`'s
    /// caller.
    #[must_use]
    pub fn into_width1(self) -> Interval {
        match self {
            Self::Bottom => Interval::bottom(1),
            Self::False => Interval::constant(1, 0),
            Self::True => Interval::constant(1, 1),
            Self::Top => Interval::top(1),
        }
    }
}

/// An inclusive floating-point range.
#[derive(Clone, Copy, Debug)]
pub struct FloatInterval {
    s: FloatSemantics,
    empty: bool,
    top: bool,
    lo: f64,
    hi: f64,
}

impl PartialEq for FloatInterval {
    fn eq(&self, other: &Self) -> bool {
        self.s == other.s
            && self.empty == other.empty
            && self.top == other.top
            && (self.empty || self.top || (self.lo.to_bits() == other.lo.to_bits() && self.hi.to_bits() == other.hi.to_bits()))
    }
}

impl FloatInterval {
    /// The bottom value (empty range).
    #[must_use]
    pub const fn bottom(s: FloatSemantics) -> Self {
        Self { s, empty: true, top: false, lo: 0.0, hi: 0.0 }
    }

    /// The top value (`-infinity to infinity`, and possibly NaN).
    #[must_use]
    pub const fn top(s: FloatSemantics) -> Self {
        Self { s, empty: false, top: true, lo: f64::NEG_INFINITY, hi: f64::INFINITY }
    }

    /// A concrete `[lo, hi]` range. `lo` must be `<= hi` under IEEE
    /// ordering; callers passing NaN endpoints get a range that is
    /// "possibly-NaN" for comparisons.
    #[must_use]
    pub const fn range(s: FloatSemantics, lo: f64, hi: f64) -> Self {
        Self { s, empty: false, top: false, lo, hi }
    }

    /// A single value.
    #[must_use]
    pub const fn constant(s: FloatSemantics, v: f64) -> Self {
        Self::range(s, v, v)
    }

    /// True if either endpoint is NaN.
    #[must_use]
    pub fn may_be_nan(&self) -> bool {
        !self.empty && (self.top || self.lo.is_nan() || self.hi.is_nan())
    }

    /// The semantics tag.
    #[must_use]
    pub const fn semantics(&self) -> FloatSemantics {
        self.s
    }

    /// The endpoints, if not empty/top.
    #[must_use]
    pub const fn bounds(&self) -> Option<(f64, f64)> {
        if self.empty || self.top {
            None
        } else {
            Some((self.lo, self.hi))
        }
    }

    fn require_same_semantics(&self, other: &Self, op: &'static str) {
        if self.s != other.s {
            crate::common::diagnostics::fail_precondition!(op, "semantics mismatch: {:?} vs {:?}", self.s, other.s);
        }
    }

    /// Least upper bound.
    #[must_use]
    pub fn join(&self, other: &Self) -> Self {
        self.require_same_semantics(other, "FloatInterval::join");
        if self.empty {
            return *other;
        }
        if other.empty {
            return *self;
        }
        if self.top || other.top {
            return Self::top(self.s);
        }
        Self::range(self.s, self.lo.min(other.lo), self.hi.max(other.hi))
    }

    /// Greatest lower bound.
    #[must_use]
    pub fn meet(&self, other: &Self) -> Self {
        self.require_same_semantics(other, "FloatInterval::meet");
        if self.empty || other.empty {
            return Self::bottom(self.s);
        }
        if self.top {
            return *other;
        }
        if other.top {
            return *self;
        }
        let lo = self.lo.max(other.lo);
        let hi = self.hi.min(other.hi);
        if lo > hi {
            Self::bottom(self.s)
        } else {
            Self::range(self.s, lo, hi)
        }
    }

    /// Widens to top on the endpoint(s) the widening manager determines are
    /// not yet stable (the interval domain's numeric infinity policy).
    #[must_use]
    pub fn widen(&self, other: &Self) -> Self {
        self.require_same_semantics(other, "FloatInterval::widen");
        let _ = other;
        Self::top(self.s)
    }

    fn corner_arith(a: &Self, b: &Self, f: impl Fn(f64, f64) -> (f64, float_ops::FpFlags)) -> Self {
        if a.empty || b.empty {
            return Self::bottom(a.s);
        }
        if a.top || b.top {
            return Self::top(a.s);
        }
        let corners = [f(a.lo, b.lo), f(a.lo, b.hi), f(a.hi, b.lo), f(a.hi, b.hi)];
        let mut lo = f64::INFINITY;
        let mut hi = f64::NEG_INFINITY;
        let mut any_nan = false;
        for (v, _flags) in corners {
            if v.is_nan() {
                any_nan = true;
            } else {
                lo = lo.min(v);
                hi = hi.max(v);
            }
        }
        if any_nan && lo > hi {
            // every corner was NaN
            return Self::range(a.s, f64::NAN, f64::NAN);
        }
        Self::range(a.s, lo, hi)
    }

    /// `a + b`, correctly rounded at each corner.
    #[must_use]
    pub fn fadd(a: &Self, b: &Self) -> Self {
        Self::corner_arith(a, b, float_ops::fadd)
    }

    /// `a - b`.
    #[must_use]
    pub fn fsub(a: &Self, b: &Self) -> Self {
        Self::corner_arith(a, b, float_ops::fsub)
    }

    /// `a * b`.
    #[must_use]
    pub fn fmul(a: &Self, b: &Self) -> Self {
        Self::corner_arith(a, b, float_ops::fmul)
    }

    /// `a / b`. A plain 4-corner min/max is wrong once the divisor spans
    /// zero: the corner at the zero endpoint doesn't bound the quotient,
    /// it's the point the quotient diverges from. When zero is exactly one
    /// endpoint of `b`, the finite bound comes from dividing by the other
    /// (nonzero) endpoint, and the endpoint touching zero is replaced by
    /// the correctly-signed infinity approached from that side (`+0.0`
    /// if `b` is bounded below by zero, `-0.0` if bounded above by it).
    /// Zero strictly interior to `b` makes the quotient unbounded both
    /// ways, and `b == {0}` makes it true for every sign.
    #[must_use]
    pub fn fdiv(a: &Self, b: &Self) -> Self {
        if a.empty || b.empty {
            return Self::bottom(a.s);
        }
        if a.top || b.top {
            return Self::top(a.s);
        }
        let divisor_spans_zero = b.lo <= 0.0 && b.hi >= 0.0;
        if !divisor_spans_zero {
            return Self::corner_arith(a, b, float_ops::fdiv);
        }
        if b.lo == 0.0 && b.hi == 0.0 {
            return Self::top(a.s);
        }
        if b.lo < 0.0 && b.hi > 0.0 {
            if a.lo == 0.0 && a.hi == 0.0 {
                return Self::constant(a.s, 0.0);
            }
            return Self::top(a.s);
        }
        let (finite_b, signed_zero) = if b.hi == 0.0 { (b.lo, -0.0_f64) } else { (b.hi, 0.0_f64) };
        let corners = [
            float_ops::fdiv(a.lo, finite_b).0,
            float_ops::fdiv(a.hi, finite_b).0,
            float_ops::fdiv(a.lo, signed_zero).0,
            float_ops::fdiv(a.hi, signed_zero).0,
        ];
        let mut lo = f64::INFINITY;
        let mut hi = f64::NEG_INFINITY;
        for v in corners {
            if !v.is_nan() {
                lo = lo.min(v);
                hi = hi.max(v);
            }
        }
        Self::range(a.s, lo, hi)
    }

    /// `a % b` (IEEE remainder), corner-wise.
    #[must_use]
    pub fn frem(a: &Self, b: &Self) -> Self {
        Self::corner_arith(a, b, float_ops::frem)
    }

    /// IEEE ordered/unordered comparison.
    ///
    /// `FCMP_UNO`/`FCMP_TRUE` return the definite-true answer before any
    /// endpoint inspection at all — preserved deliberately, not gated on
    /// whether the operands can actually be NaN.
    #[must_use]
    pub fn compare(predicate: FloatPredicate, a: &Self, b: &Self) -> CompareResult {
        if matches!(predicate, FloatPredicate::Uno | FloatPredicate::True) {
            return CompareResult::True;
        }
        if predicate == FloatPredicate::False {
            return CompareResult::False;
        }
        if a.empty || b.empty {
            return CompareResult::Bottom;
        }
        let either_nan = a.may_be_nan() || b.may_be_nan();
        if predicate.is_ordered() && either_nan {
            // Could still be false if both are actually NaN on some trace; cannot
            // assert the ordered predicate holds for every concrete pair.
            if a.top || b.top {
                return CompareResult::Top;
            }
        }
        if predicate == FloatPredicate::Ord {
            return if a.top || b.top || either_nan { CompareResult::Top } else { CompareResult::True };
        }
        if predicate == FloatPredicate::Une {
            let base = Self::compare(FloatPredicate::Oeq, a, b);
            return match base {
                CompareResult::True => CompareResult::False,
                CompareResult::False => CompareResult::True,
                other => other,
            };
        }

        match predicate {
            FloatPredicate::Oeq | FloatPredicate::Ueq => {
                if a.top || b.top {
                    return CompareResult::Top;
                }
                if a.lo == a.hi && b.lo == b.hi && a.lo == b.lo {
                    CompareResult::True
                } else if a.hi < b.lo || b.hi < a.lo {
                    CompareResult::False
                } else {
                    CompareResult::Top
                }
            }
            FloatPredicate::One => {
                let eq = Self::compare(FloatPredicate::Oeq, a, b);
                match eq {
                    CompareResult::True => CompareResult::False,
                    CompareResult::False => CompareResult::True,
                    other => other,
                }
            }
            FloatPredicate::Ogt | FloatPredicate::Ugt => order_compare(a, b, |al, bh| al > bh, |ah, bl| ah <= bl),
            FloatPredicate::Oge | FloatPredicate::Uge => order_compare(a, b, |al, bh| al >= bh, |ah, bl| ah < bl),
            FloatPredicate::Olt | FloatPredicate::Ult => order_compare(a, b, |al, bh| al < bh, |ah, bl| ah >= bl),
            FloatPredicate::Ole | FloatPredicate::Ule => order_compare(a, b, |al, bh| al <= bh, |ah, bl| ah > bl),
            FloatPredicate::Uno | FloatPredicate::True | FloatPredicate::False | FloatPredicate::Ord | FloatPredicate::Une => {
                unreachable!("handled above")
            }
        }
    }

    /// Narrows to a less precise format, rounding each endpoint.
    #[must_use]
    pub fn fptrunc(&self, to_s: FloatSemantics) -> Self {
        if self.empty {
            return Self::bottom(to_s);
        }
        if self.top {
            return Self::top(to_s);
        }
        Self::range(to_s, float_ops::fptrunc(self.lo, to_s), float_ops::fptrunc(self.hi, to_s))
    }

    /// Widens to a more precise format. Exact: nothing is lost going from a
    /// narrower format to a wider one.
    #[must_use]
    pub fn fpext(&self, to_s: FloatSemantics) -> Self {
        if self.empty {
            return Self::bottom(to_s);
        }
        if self.top {
            return Self::top(to_s);
        }
        Self::range(to_s, float_ops::fpext(self.lo, to_s), float_ops::fpext(self.hi, to_s))
    }

    /// `1 - (hi - lo) / (Max - Min)`, clamped; top is `0`, bottom is `1`.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        if self.empty {
            return 1.0;
        }
        if self.top {
            return 0.0;
        }
        let max = self.s.max_finite();
        let span = (self.hi - self.lo).abs().min(2.0 * max);
        (1.0 - span / (2.0 * max)).clamp(0.0, 1.0)
    }
}

fn order_compare(a: &FloatInterval, b: &FloatInterval, definite_true: impl Fn(f64, f64) -> bool, definite_false: impl Fn(f64, f64) -> bool) -> CompareResult {
    if a.top || b.top {
        return CompareResult::Top;
    }
    if definite_true(a.lo, b.hi) {
        CompareResult::True
    } else if definite_false(a.hi, b.lo) {
        CompareResult::False
    } else {
        CompareResult::Top
    }
}

impl AbstractDomain for FloatInterval {
    fn is_bottom(&self) -> bool {
        self.empty
    }

    fn is_top(&self) -> bool {
        self.top
    }

    fn clone_cleaned(&self) -> Self {
        Self::bottom(self.s)
    }

    fn join(&self, _env: &Environment, other: &Self) -> Self {
        FloatInterval::join(self, other)
    }

    fn meet(&self, _env: &Environment, other: &Self) -> Self {
        FloatInterval::meet(self, other)
    }

    fn memory_usage(&self) -> usize {
        core::mem::size_of::<Self>()
    }

    fn accuracy(&self) -> f64 {
        FloatInterval::accuracy(self)
    }

    fn matches_string(&self, text: &str) -> (bool, String) {
        let Some(rest) = text.trim().strip_prefix("floatInterval").map(str::trim_start) else {
            return (false, format!("`{text}` does not start with `floatInterval`"));
        };
        if self.empty {
            return if rest == "empty" {
                (true, "parsed value matches".to_string())
            } else {
                (false, format!("`{text}` is empty but does not read `floatInterval empty`"))
            };
        }
        let Some((lo_tok, hi_tok)) = rest.split_once(" to ") else {
            return (false, format!("`{rest}` is not a `lo to hi` range"));
        };
        let (Ok(lo), Ok(hi)) = (lo_tok.trim().parse::<f64>(), hi_tok.trim().parse::<f64>()) else {
            return (false, format!("`{rest}` has a non-numeric endpoint"));
        };
        let (want_lo, want_hi) = if self.top { (f64::NEG_INFINITY, f64::INFINITY) } else { (self.lo, self.hi) };
        let matches = (lo == want_lo || (lo.is_nan() && want_lo.is_nan())) && (hi == want_hi || (hi.is_nan() && want_hi.is_nan()));
        if matches {
            (true, "parsed value matches".to_string())
        } else {
            (false, format!("parsed range `{lo} to {hi}` does not match `{want_lo} to {want_hi}`"))
        }
    }
}

impl fmt::Display for FloatInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "floatInterval ")?;
        if self.empty {
            write!(f, "empty")
        } else if self.top || (self.lo == f64::NEG_INFINITY && self.hi == f64::INFINITY) {
            write!(f, "-infinity to infinity")
        } else {
            write!(f, "{} to {}", self.lo, self.hi)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_5_fdiv_by_interval_spanning_zero() {
        let a = FloatInterval::range(FloatSemantics::Double, 1.0, 2.0);
        let b = FloatInterval::range(FloatSemantics::Double, -1.0, 0.0);
        let r = FloatInterval::fdiv(&a, &b);
        let (lo, hi) = r.bounds().unwrap();
        assert_eq!(lo, f64::NEG_INFINITY);
        assert_eq!(hi, -1.0);
    }

    #[test]
    fn uno_and_true_short_circuit_before_endpoint_checks() {
        let a = FloatInterval::range(FloatSemantics::Double, 1.0, 1.0);
        let b = FloatInterval::range(FloatSemantics::Double, 1.0, 1.0);
        assert_eq!(FloatInterval::compare(FloatPredicate::Uno, &a, &b), CompareResult::True);
        assert_eq!(FloatInterval::compare(FloatPredicate::True, &a, &b), CompareResult::True);
    }

    #[test]
    fn oeq_definite_for_equal_singletons() {
        let a = FloatInterval::constant(FloatSemantics::Double, 3.0);
        let b = FloatInterval::constant(FloatSemantics::Double, 3.0);
        assert_eq!(FloatInterval::compare(FloatPredicate::Oeq, &a, &b), CompareResult::True);
    }

    #[test]
    fn oeq_false_for_disjoint_ranges() {
        let a = FloatInterval::range(FloatSemantics::Double, 1.0, 2.0);
        let b = FloatInterval::range(FloatSemantics::Double, 3.0, 4.0);
        assert_eq!(FloatInterval::compare(FloatPredicate::Oeq, &a, &b), CompareResult::False);
    }

    #[test]
    fn join_with_bottom_is_identity() {
        let a = FloatInterval::range(FloatSemantics::Double, 1.0, 2.0);
        let bot = FloatInterval::bottom(FloatSemantics::Double);
        assert_eq!(a.join(&bot), a);
    }

    #[test]
    fn round_trip_serialization() {
        let a = FloatInterval::range(FloatSemantics::Double, 1.5, 2.5);
        let text = a.to_string();
        let (ok, _) = a.matches_string(&text);
        assert!(ok);
    }

    #[test]
    fn matches_string_tolerates_surrounding_whitespace() {
        let a = FloatInterval::range(FloatSemantics::Double, 1.5, 2.5);
        let (ok, _) = a.matches_string("  floatInterval   1.5 to 2.5  ");
        assert!(ok);
    }

    #[test]
    fn matches_string_rejects_a_different_range() {
        let a = FloatInterval::range(FloatSemantics::Double, 1.5, 2.5);
        let (ok, _) = a.matches_string("floatInterval 1.5 to 9.0");
        assert!(!ok);
    }

    #[test]
    fn matches_string_round_trips_top() {
        let a = FloatInterval::top(FloatSemantics::Double);
        let text = a.to_string();
        let (ok, _) = a.matches_string(&text);
        assert!(ok);
    }

    #[test]
    fn fptrunc_to_single_then_fpext_back_is_lossless_for_a_representable_value() {
        let a = FloatInterval::constant(FloatSemantics::Double, 1.5);
        let narrowed = a.fptrunc(FloatSemantics::Single);
        let widened = narrowed.fpext(FloatSemantics::Double);
        assert_eq!(widened.bounds(), Some((1.5, 1.5)));
    }

    #[test]
    fn fptrunc_to_half_overflows_large_magnitudes_to_infinity() {
        let a = FloatInterval::constant(FloatSemantics::Double, 1.0e6);
        let narrowed = a.fptrunc(FloatSemantics::Half);
        let (lo, hi) = narrowed.bounds().unwrap();
        assert_eq!(lo, f64::INFINITY);
        assert_eq!(hi, f64::INFINITY);
    }
}
