//! The integer set domain: a bounded, explicit enumeration of concrete
//! `w`-bit values, ordered by unsigned comparison. Exceeding the configured
//! threshold collapses the set to top.

use core::fmt;

use itertools::Itertools;

use crate::common::diagnostics::Diagnostic;
use crate::common::{Environment, FloatSemantics, IntPredicate};
use crate::primitives::{float_ops, int_ops};

use super::float_interval::FloatInterval;
use super::AbstractDomain;

/// A bounded explicit enumeration of `w`-bit integers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IntegerSet {
    w: u32,
    top: bool,
    values: Vec<u128>,
}

impl IntegerSet {
    /// The bottom value (empty set, not top).
    #[must_use]
    pub const fn bottom(w: u32) -> Self {
        Self { w, top: false, values: Vec::new() }
    }

    /// The top value.
    #[must_use]
    pub const fn top(w: u32) -> Self {
        Self { w, top: true, values: Vec::new() }
    }

    /// Builds a set from explicit members, collapsing to top if it exceeds
    /// `threshold`.
    #[must_use]
    pub fn from_values(w: u32, threshold: usize, members: impl IntoIterator<Item = u128>) -> Self {
        let values: Vec<u128> = members.into_iter().map(|v| v & int_ops::mask(w)).sorted().dedup().collect();
        if values.len() > threshold {
            Self::top(w)
        } else {
            Self { w, top: false, values }
        }
    }

    /// Bit width.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.w
    }

    /// True if top.
    #[must_use]
    pub const fn is_top_flag(&self) -> bool {
        self.top
    }

    /// The set's members, ordered by unsigned comparison. Empty for bottom
    /// and top alike (callers must check [`AbstractDomain::is_top`]
    /// separately).
    #[must_use]
    pub fn values(&self) -> &[u128] {
        &self.values
    }

    fn require_same_width(&self, other: &Self, op: &'static str) {
        if self.w != other.w {
            crate::common::diagnostics::fail_precondition!(op, "width mismatch: {} vs {}", self.w, other.w);
        }
    }

    /// Union, collapsing to top past the configured threshold.
    #[must_use]
    pub fn join(&self, env: &Environment, other: &Self) -> Self {
        self.require_same_width(other, "IntegerSet::join");
        if self.top || other.top {
            return Self::top(self.w);
        }
        let mut merged = self.values.clone();
        merged.extend(other.values.iter().copied());
        Self::from_values(self.w, env.config().set_threshold, merged)
    }

    /// Intersection.
    #[must_use]
    pub fn meet(&self, other: &Self) -> Self {
        self.require_same_width(other, "IntegerSet::meet");
        if self.top {
            return other.clone();
        }
        if other.top {
            return self.clone();
        }
        let values: Vec<u128> = self.values.iter().copied().filter(|v| other.values.contains(v)).collect();
        Self { w: self.w, top: false, values }
    }

    fn cartesian<F: Fn(u128, u128) -> Option<u128>>(&self, env: &Environment, other: &Self, op: &'static str, f: F) -> Self {
        self.require_same_width(other, op);
        if self.top || other.top {
            Diagnostic::UnsupportedOperator { op, domain: "IntegerSet" }.emit();
            return Self::top(self.w);
        }
        let mut out = Vec::with_capacity(self.values.len() * other.values.len());
        for &x in &self.values {
            for &y in &other.values {
                match f(x, y) {
                    Some(v) => out.push(v),
                    None => return Self::top(self.w),
                }
                if out.len() > env.config().set_threshold {
                    return Self::top(self.w);
                }
            }
        }
        Self::from_values(self.w, env.config().set_threshold, out)
    }

    /// `a + b` over every pair of members.
    #[must_use]
    pub fn add(env: &Environment, a: &Self, b: &Self) -> Self {
        let w = a.w;
        a.cartesian(env, b, "add", move |x, y| Some(int_ops::uadd_overflowing(x, y, w).0))
    }

    /// `a - b` over every pair of members.
    #[must_use]
    pub fn sub(env: &Environment, a: &Self, b: &Self) -> Self {
        let w = a.w;
        a.cartesian(env, b, "sub", move |x, y| Some(int_ops::usub_overflowing(x, y, w).0))
    }

    /// `a * b`, collapsing to top on signed overflow of any pair.
    #[must_use]
    pub fn mul(env: &Environment, a: &Self, b: &Self) -> Self {
        let w = a.w;
        a.cartesian(env, b, "mul", move |x, y| {
            let (v, ovf) = int_ops::smul_overflowing(x, y, w);
            if ovf { None } else { Some(v) }
        })
    }

    /// Unsigned division; top if any divisor member is zero.
    #[must_use]
    pub fn udiv(env: &Environment, a: &Self, b: &Self) -> Self {
        let w = a.w;
        a.cartesian(env, b, "udiv", move |x, y| int_ops::udiv(x, y, w))
    }

    /// Signed division; top if any divisor member is zero.
    #[must_use]
    pub fn sdiv(env: &Environment, a: &Self, b: &Self) -> Self {
        let w = a.w;
        a.cartesian(env, b, "sdiv", move |x, y| int_ops::sdiv(x, y, w).map(|(v, _)| v))
    }

    /// Unsigned remainder.
    #[must_use]
    pub fn urem(env: &Environment, a: &Self, b: &Self) -> Self {
        let w = a.w;
        a.cartesian(env, b, "urem", move |x, y| int_ops::urem(x, y, w))
    }

    /// Signed remainder.
    #[must_use]
    pub fn srem(env: &Environment, a: &Self, b: &Self) -> Self {
        let w = a.w;
        a.cartesian(env, b, "srem", move |x, y| int_ops::srem(x, y, w))
    }

    /// Bitwise AND, exact.
    #[must_use]
    pub fn and(env: &Environment, a: &Self, b: &Self) -> Self {
        a.cartesian(env, b, "and", |x, y| Some(x & y))
    }

    /// Bitwise OR, exact.
    #[must_use]
    pub fn or(env: &Environment, a: &Self, b: &Self) -> Self {
        a.cartesian(env, b, "or", |x, y| Some(x | y))
    }

    /// Bitwise XOR, exact.
    #[must_use]
    pub fn xor(env: &Environment, a: &Self, b: &Self) -> Self {
        a.cartesian(env, b, "xor", |x, y| Some(x ^ y))
    }

    /// Shift left, exact (shift amounts are masked to width before use).
    #[must_use]
    pub fn shl(env: &Environment, a: &Self, b: &Self) -> Self {
        let w = a.w;
        a.cartesian(env, b, "shl", move |x, y| {
            if y >= u128::from(w) { Some(0) } else { Some((x << y) & int_ops::mask(w)) }
        })
    }

    /// Logical shift right, exact.
    #[must_use]
    pub fn lshr(env: &Environment, a: &Self, b: &Self) -> Self {
        let w = a.w;
        a.cartesian(env, b, "lshr", move |x, y| if y >= u128::from(w) { Some(0) } else { Some(x >> y) })
    }

    /// Arithmetic shift right, exact.
    #[must_use]
    pub fn ashr(env: &Environment, a: &Self, b: &Self) -> Self {
        let w = a.w;
        a.cartesian(env, b, "ashr", move |x, y| {
            let s = int_ops::to_signed(x, w);
            let shift = y.min(u128::from(w.saturating_sub(1))) as u32;
            Some(int_ops::from_signed(s >> shift, w))
        })
    }

    /// Integer comparison. Multi-element equal sets return top, not a
    /// definite answer — preserved deliberately (the sets are
    /// over-approximations, so `{1,2} == {1,2}` does not mean the two
    /// concrete values on some trace were actually equal).
    #[must_use]
    pub fn icmp(predicate: IntPredicate, a: &Self, b: &Self) -> super::interval::Interval {
        use super::interval::Interval;
        if a.top || b.top {
            return Interval::top(1);
        }
        if a.values.is_empty() || b.values.is_empty() {
            return Interval::bottom(1);
        }
        match predicate {
            IntPredicate::Eq | IntPredicate::Ne => {
                let want_eq = predicate == IntPredicate::Eq;
                if a.values.len() == 1 && b.values.len() == 1 {
                    let equal = a.values[0] == b.values[0];
                    Interval::constant(1, bit(equal == want_eq))
                } else {
                    let disjoint = a.values.iter().all(|v| !b.values.contains(v));
                    if disjoint {
                        Interval::constant(1, bit(!want_eq))
                    } else {
                        Interval::top(1)
                    }
                }
            }
            _ => {
                let signed = predicate.is_signed();
                let key = |v: u128| if signed { int_ops::to_signed(v, a.w) } else { v as i128 };
                let (a_min, a_max) = min_max(&a.values, key);
                let (b_min, b_max) = min_max(&b.values, key);
                let (lt, le) = (|x: i128, y: i128| x < y, |x: i128, y: i128| x <= y);
                let definite = match predicate {
                    IntPredicate::Slt | IntPredicate::Ult => lt(a_max, b_min).then_some(1).or_else(|| le(b_max, a_min).then_some(0)),
                    IntPredicate::Sgt | IntPredicate::Ugt => lt(b_max, a_min).then_some(1).or_else(|| le(a_max, b_min).then_some(0)),
                    IntPredicate::Sle | IntPredicate::Ule => le(a_max, b_min).then_some(1).or_else(|| lt(b_max, a_min).then_some(0)),
                    IntPredicate::Sge | IntPredicate::Uge => le(b_max, a_min).then_some(1).or_else(|| lt(a_max, b_min).then_some(0)),
                    IntPredicate::Eq | IntPredicate::Ne => unreachable!("handled above"),
                };
                match definite {
                    Some(v) => Interval::constant(1, v),
                    None => Interval::top(1),
                }
            }
        }
    }

    /// Applies a primitive bitwise-conversion op to every member,
    /// re-establishing uniqueness afterwards.
    #[must_use]
    pub fn trunc(&self, env: &Environment, to_w: u32) -> Self {
        let values: Vec<u128> = self.values.iter().map(|&v| int_ops::trunc(v, to_w)).collect();
        if self.top {
            return Self::top(to_w);
        }
        Self::from_values(to_w, env.config().set_threshold, values)
    }

    /// Zero-extends every member.
    #[must_use]
    pub fn zext(&self, env: &Environment, to_w: u32) -> Self {
        if self.top {
            return Self::top(to_w);
        }
        Self::from_values(to_w, env.config().set_threshold, self.values.iter().copied())
    }

    /// Sign-extends every member.
    #[must_use]
    pub fn sext(&self, env: &Environment, to_w: u32) -> Self {
        if self.top {
            return Self::top(to_w);
        }
        let from_w = self.w;
        let values: Vec<u128> = self.values.iter().map(|&v| int_ops::sext(v, from_w, to_w)).collect();
        Self::from_values(to_w, env.config().set_threshold, values)
    }

    /// Over-approximates to top; no attempt at precise float-to-set
    /// membership.
    #[must_use]
    pub fn fptoui(fi: &FloatInterval, to_w: u32) -> Self {
        if fi.is_bottom() {
            return Self::bottom(to_w);
        }
        Diagnostic::UnsupportedOperator { op: "fptoui", domain: "IntegerSet" }.emit();
        Self::top(to_w)
    }

    /// Over-approximates to top; no attempt at precise float-to-set
    /// membership.
    #[must_use]
    pub fn fptosi(fi: &FloatInterval, to_w: u32) -> Self {
        if fi.is_bottom() {
            return Self::bottom(to_w);
        }
        Diagnostic::UnsupportedOperator { op: "fptosi", domain: "IntegerSet" }.emit();
        Self::top(to_w)
    }

    /// Converts every member to a float and joins the results, since there's
    /// no float-set domain to hold a precise per-member answer.
    #[must_use]
    pub fn uitofp(&self, to_s: FloatSemantics) -> FloatInterval {
        if self.top {
            return FloatInterval::top(to_s);
        }
        if self.values.is_empty() {
            return FloatInterval::bottom(to_s);
        }
        let mut lo = f64::INFINITY;
        let mut hi = f64::NEG_INFINITY;
        for &v in &self.values {
            let f = float_ops::uitofp(v, self.w);
            lo = lo.min(f);
            hi = hi.max(f);
        }
        FloatInterval::range(to_s, lo, hi)
    }

    /// Converts every member to a float via the signed interpretation and
    /// joins the results.
    #[must_use]
    pub fn sitofp(&self, to_s: FloatSemantics) -> FloatInterval {
        if self.top {
            return FloatInterval::top(to_s);
        }
        if self.values.is_empty() {
            return FloatInterval::bottom(to_s);
        }
        let mut lo = f64::INFINITY;
        let mut hi = f64::NEG_INFINITY;
        for &v in &self.values {
            let f = float_ops::sitofp(int_ops::to_signed(v, self.w), self.w);
            lo = lo.min(f);
            hi = hi.max(f);
        }
        FloatInterval::range(to_s, lo, hi)
    }
}

const fn bit(b: bool) -> u128 {
    if b { 1 } else { 0 }
}

fn min_max(values: &[u128], key: impl Fn(u128) -> i128) -> (i128, i128) {
    let mut lo = i128::MAX;
    let mut hi = i128::MIN;
    for &v in values {
        let k = key(v);
        lo = lo.min(k);
        hi = hi.max(k);
    }
    (lo, hi)
}

impl AbstractDomain for IntegerSet {
    fn is_bottom(&self) -> bool {
        !self.top && self.values.is_empty()
    }

    fn is_top(&self) -> bool {
        self.top
    }

    fn clone_cleaned(&self) -> Self {
        Self::bottom(self.w)
    }

    fn join(&self, env: &Environment, other: &Self) -> Self {
        IntegerSet::join(self, env, other)
    }

    fn meet(&self, _env: &Environment, other: &Self) -> Self {
        IntegerSet::meet(self, other)
    }

    fn memory_usage(&self) -> usize {
        core::mem::size_of::<Self>() + self.values.len() * core::mem::size_of::<u128>()
    }

    fn accuracy(&self) -> f64 {
        if self.is_bottom() {
            1.0
        } else if self.top {
            0.0
        } else {
            (1.0 / self.values.len() as f64).clamp(0.0, 1.0)
        }
    }

    fn matches_string(&self, text: &str) -> (bool, String) {
        let Some(rest) = text.trim_start().strip_prefix("enumeration") else {
            return (false, format!("`{text}` does not start with `enumeration`"));
        };
        let rest = rest.trim_start();
        if self.top {
            return if rest == "top" {
                (true, "parsed value matches".to_string())
            } else {
                (false, format!("`{text}` is top but does not read `enumeration top`"))
            };
        }
        if self.values.is_empty() {
            return if rest == "empty" {
                (true, "parsed value matches".to_string())
            } else {
                (false, format!("`{text}` is empty but does not read `enumeration empty`"))
            };
        }
        let mut parsed: Vec<u128> = Vec::with_capacity(self.values.len());
        for line in rest.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match line.parse::<u128>() {
                Ok(v) => parsed.push(v & int_ops::mask(self.w)),
                Err(_) => return (false, format!("`{line}` is not a decimal member")),
            }
        }
        parsed.sort_unstable();
        parsed.dedup();
        if parsed == self.values {
            (true, "parsed value matches".to_string())
        } else {
            (false, format!("parsed members {parsed:?} do not match the set's members {:?}", self.values))
        }
    }
}

impl fmt::Display for IntegerSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "enumeration")?;
        if self.top {
            write!(f, " top")
        } else if self.values.is_empty() {
            write!(f, " empty")
        } else {
            for v in &self.values {
                write!(f, "\n    {v}")?;
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env() -> Environment {
        Environment::host64()
    }

    #[test]
    fn seed_3_icmp_ult_top_then_definite() {
        let a = IntegerSet::from_values(32, 40, [0, 2]);
        let b = IntegerSet::from_values(32, 40, [1, 3]);
        let r = IntegerSet::icmp(IntPredicate::Ult, &a, &b);
        assert!(r.is_top());

        let b2 = IntegerSet::from_values(32, 40, [5, 7]);
        let r2 = IntegerSet::icmp(IntPredicate::Ult, &a, &b2);
        assert_eq!(r2.constant_bits(), Some(1));
    }

    #[test]
    fn multi_element_equal_sets_return_top_not_definite() {
        let a = IntegerSet::from_values(32, 40, [1, 2]);
        let b = IntegerSet::from_values(32, 40, [1, 2]);
        let r = IntegerSet::icmp(IntPredicate::Eq, &a, &b);
        assert!(r.is_top(), "preserved open-question behavior: multi-element equal sets are top");
    }

    #[test]
    fn single_element_equal_sets_are_definite() {
        let a = IntegerSet::from_values(32, 40, [7]);
        let b = IntegerSet::from_values(32, 40, [7]);
        let r = IntegerSet::icmp(IntPredicate::Eq, &a, &b);
        assert_eq!(r.constant_bits(), Some(1));
    }

    #[test]
    fn join_past_threshold_collapses_to_top() {
        let a = IntegerSet::from_values(8, 2, [1, 2]);
        let b = IntegerSet::from_values(8, 2, [3, 4]);
        let r = a.join(&env(), &b);
        assert!(r.is_top());
    }

    #[test]
    fn bitwise_and_is_exact() {
        let a = IntegerSet::from_values(8, 40, [0b0000_1111]);
        let b = IntegerSet::from_values(8, 40, [0b1111_0000]);
        let r = IntegerSet::and(&env(), &a, &b);
        assert_eq!(r.values(), &[0]);
    }

    #[test]
    fn matches_string_tolerates_reordered_members() {
        let a = IntegerSet::from_values(8, 40, [1, 2, 3]);
        let (ok, _) = a.matches_string("enumeration\n3\n1\n2");
        assert!(ok);
    }

    #[test]
    fn matches_string_rejects_a_different_member_set() {
        let a = IntegerSet::from_values(8, 40, [1, 2, 3]);
        let (ok, _) = a.matches_string("enumeration\n1\n2\n4");
        assert!(!ok);
    }

    #[test]
    fn matches_string_round_trips_top() {
        let a = IntegerSet::top(8);
        let text = a.to_string();
        let (ok, _) = a.matches_string(&text);
        assert!(ok);
    }

    #[test]
    fn sitofp_then_fptosi_round_trips_a_negative_member() {
        let a = IntegerSet::from_values(8, 40, [int_ops::from_signed(-3, 8)]);
        let f = a.sitofp(crate::common::FloatSemantics::Double);
        let back = IntegerSet::fptosi(&f, 8);
        assert!(back.is_top() || back.values().contains(&int_ops::from_signed(-3, 8)));
    }
}
