//! The abstract domains: [`Interval`](interval::Interval),
//! [`IntegerSet`](set::IntegerSet), [`Bitfield`](bitfield::Bitfield),
//! [`FloatInterval`](float_interval::FloatInterval), and the
//! [`ProductVector`](product::ProductVector) that combines the integer
//! domains via reduced-product refinement, and the top-level
//! [`Domain`](value::Domain) tagged union the driver actually stores one of
//! per IR value.
//!
//! Every domain implements [`AbstractDomain`] for the operations uniform
//! across all of them (lattice structure, memory accounting, accuracy,
//! string round-trip); arithmetic/compare/conversion operators are inherent
//! methods per domain, since their signatures differ (integer domains take
//! [`IntPredicate`](crate::common::IntPredicate), the float domain takes
//! [`FloatPredicate`](crate::common::FloatPredicate)). Dispatch from the
//! driver is static: the driver knows which concrete domain(s) back each IR
//! value.

pub mod bitfield;
pub mod float_interval;
pub mod interval;
pub mod product;
pub mod set;
pub mod value;

/// Operations uniform across every abstract domain in this crate.
///
/// Binary lattice operators are pure: they take two read-only operands and
/// return a freshly built value rather than writing through a receiver, so
/// aliasing the two operands together is always safe.
pub trait AbstractDomain: Clone + PartialEq + core::fmt::Debug {
    /// True if this value denotes the empty set of concrete values.
    fn is_bottom(&self) -> bool;

    /// True if this value denotes every possible concrete value of its
    /// width/semantics.
    fn is_top(&self) -> bool;

    /// A fresh bottom value of the same shape (width/semantics) as `self`,
    /// without duplicating any of `self`'s range/set/bit state.
    #[must_use]
    fn clone_cleaned(&self) -> Self;

    /// Least upper bound. Takes the shared [`Environment`](crate::common::Environment)
    /// because some domains (the integer set) need its configured
    /// thresholds to decide when to collapse to top.
    #[must_use]
    fn join(&self, env: &crate::common::Environment, other: &Self) -> Self;

    /// Greatest lower bound.
    #[must_use]
    fn meet(&self, env: &crate::common::Environment, other: &Self) -> Self;

    /// Lattice order: `self ≤ other`, i.e. `self.join(env, other) == *other`.
    #[must_use]
    fn is_leq(&self, env: &crate::common::Environment, other: &Self) -> bool {
        &self.join(env, other) == other
    }

    /// Rough estimate, in bytes, of this value's heap + inline footprint.
    #[must_use]
    fn memory_usage(&self) -> usize;

    /// How precise this value is, in `[0.0, 1.0]`; `1.0` for bottom (no
    /// concrete values, maximally precise), `0.0` for top.
    #[must_use]
    fn accuracy(&self) -> f64;

    /// Parses `text` in this domain's serialization format and reports
    /// whether it denotes the same value as `self`, with a rationale for
    /// any mismatch.
    #[must_use]
    fn matches_string(&self, text: &str) -> (bool, String);
}
