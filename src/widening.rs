//! The widening manager: forces termination of fixed-point iteration over
//! loops by replacing `join` with a non-monotone widening operator once a
//! join point has been visited enough times.
//!
//! The iteration counter lives in a side-map owned by the manager, keyed by
//! `(widening-point identity, slot identity)` — never attached to the
//! abstract value itself, so two structurally-equal values reaching two
//! different widening points (or two different slots at the same point)
//! are tracked independently. This mirrors the branch predictor's BTB:
//! state keyed by an opaque identity (there, a PC; here, a join-point/slot
//! pair), trained on each visit, consulted before the next one.

use std::collections::HashMap;

use crate::common::diagnostics::fail_precondition;
use crate::common::{Config, Environment};
use crate::domain::bitfield::Bitfield;
use crate::domain::float_interval::FloatInterval;
use crate::domain::interval::Interval;
use crate::domain::product::{Facet, ProductVector};
use crate::domain::set::IntegerSet;
use crate::domain::value::Domain;

/// Identifies one widening counter: which join point, and which value slot
/// at that point (e.g. which variable in the block's abstract state).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WideningKey {
    /// Opaque identity of the join point (typically a block or loop-header id).
    pub point: usize,
    /// Opaque identity of the slot being joined at that point.
    pub slot: usize,
}

impl WideningKey {
    /// Builds a key from a join-point id and a slot id.
    #[must_use]
    pub const fn new(point: usize, slot: usize) -> Self {
        Self { point, slot }
    }
}

/// A domain capable of being widened once its join-point counter saturates.
///
/// `join` stays monotone and precise; `widen_once` is the non-monotone
/// operator the manager substitutes in once the threshold is reached.
pub trait Widen: Sized {
    /// Ordinary join, used while the counter has not yet reached the
    /// threshold.
    #[must_use]
    fn widening_join(&self, env: &Environment, other: &Self) -> Self;

    /// The termination-forcing operator: jumps the non-stable part of the
    /// value to top (interval/float-interval widen their unstable endpoint
    /// to infinity; set/bitfield collapse outright).
    #[must_use]
    fn widen_once(&self, other: &Self) -> Self;
}

impl Widen for Interval {
    fn widening_join(&self, _env: &Environment, other: &Self) -> Self {
        self.join(other)
    }

    fn widen_once(&self, other: &Self) -> Self {
        Interval::widen(self, other)
    }
}

impl Widen for FloatInterval {
    fn widening_join(&self, _env: &Environment, other: &Self) -> Self {
        FloatInterval::join(self, other)
    }

    fn widen_once(&self, other: &Self) -> Self {
        FloatInterval::widen(self, other)
    }
}

impl Widen for IntegerSet {
    fn widening_join(&self, env: &Environment, other: &Self) -> Self {
        self.join(env, other)
    }

    fn widen_once(&self, other: &Self) -> Self {
        let _ = other;
        IntegerSet::top(self.width())
    }
}

impl Widen for Bitfield {
    fn widening_join(&self, _env: &Environment, other: &Self) -> Self {
        self.join(other)
    }

    fn widen_once(&self, other: &Self) -> Self {
        let _ = other;
        Bitfield::top(self.width())
    }
}

impl Widen for Facet {
    fn widening_join(&self, env: &Environment, other: &Self) -> Self {
        match (self, other) {
            (Self::Interval(a), Self::Interval(b)) => Self::Interval(a.widening_join(env, b)),
            (Self::Set(a), Self::Set(b)) => Self::Set(a.widening_join(env, b)),
            (Self::Bitfield(a), Self::Bitfield(b)) => Self::Bitfield(a.widening_join(env, b)),
            _ => fail_precondition!("Facet::widening_join", "facet kind mismatch"),
        }
    }

    fn widen_once(&self, other: &Self) -> Self {
        match (self, other) {
            (Self::Interval(a), Self::Interval(b)) => Self::Interval(a.widen_once(b)),
            (Self::Set(a), Self::Set(b)) => Self::Set(a.widen_once(b)),
            (Self::Bitfield(a), Self::Bitfield(b)) => Self::Bitfield(a.widen_once(b)),
            _ => fail_precondition!("Facet::widen_once", "facet kind mismatch"),
        }
    }
}

impl Widen for ProductVector {
    fn widening_join(&self, env: &Environment, other: &Self) -> Self {
        let facets = self
            .facets()
            .iter()
            .zip(other.facets())
            .map(|(a, b)| a.widening_join(env, b))
            .collect();
        ProductVector::new(facets)
    }

    fn widen_once(&self, other: &Self) -> Self {
        let facets = self.facets().iter().zip(other.facets()).map(|(a, b)| a.widen_once(b)).collect();
        ProductVector::new(facets)
    }
}

impl Widen for Domain {
    fn widening_join(&self, env: &Environment, other: &Self) -> Self {
        match (self, other) {
            (Self::Interval(a), Self::Interval(b)) => Self::Interval(a.widening_join(env, b)),
            (Self::Set(a), Self::Set(b)) => Self::Set(a.widening_join(env, b)),
            (Self::Bitfield(a), Self::Bitfield(b)) => Self::Bitfield(a.widening_join(env, b)),
            (Self::FloatInterval(a), Self::FloatInterval(b)) => Self::FloatInterval(a.widening_join(env, b)),
            (Self::Product(a), Self::Product(b)) => Self::Product(a.widening_join(env, b)),
            _ => fail_precondition!("Domain::widening_join", "domain kind mismatch"),
        }
    }

    fn widen_once(&self, other: &Self) -> Self {
        match (self, other) {
            (Self::Interval(a), Self::Interval(b)) => Self::Interval(a.widen_once(b)),
            (Self::Set(a), Self::Set(b)) => Self::Set(a.widen_once(b)),
            (Self::Bitfield(a), Self::Bitfield(b)) => Self::Bitfield(a.widen_once(b)),
            (Self::FloatInterval(a), Self::FloatInterval(b)) => Self::FloatInterval(a.widen_once(b)),
            (Self::Product(a), Self::Product(b)) => Self::Product(a.widen_once(b)),
            _ => fail_precondition!("Domain::widen_once", "domain kind mismatch"),
        }
    }
}

/// Tracks per-`(point, slot)` iteration counts and decides, on each join,
/// whether to use the ordinary join or the widening operator.
#[derive(Debug, Default)]
pub struct WideningManager {
    threshold: u32,
    counters: HashMap<WideningKey, u32>,
}

impl WideningManager {
    /// Builds a manager reading its threshold from `config`.
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self {
            threshold: config.widening_threshold,
            counters: HashMap::new(),
        }
    }

    /// Joins `receiver` with `other` at `key`, incrementing that key's
    /// counter and substituting widening once the threshold is reached.
    pub fn widen<T: Widen>(&mut self, env: &Environment, key: WideningKey, receiver: &T, other: &T) -> T {
        let count = self.counters.entry(key).or_insert(0);
        *count += 1;
        if *count > self.threshold {
            receiver.widen_once(other)
        } else {
            receiver.widening_join(env, other)
        }
    }

    /// The current iteration count at `key`, for diagnostics/tests.
    #[must_use]
    pub fn count_at(&self, key: WideningKey) -> u32 {
        self.counters.get(&key).copied().unwrap_or(0)
    }

    /// Forgets every counter, as if the manager had just been created.
    pub fn reset(&mut self) {
        self.counters.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_6_widens_upper_bound_to_top_after_threshold_joins() {
        let cfg = Config { widening_threshold: 3, ..Config::default() };
        let env = Environment::new(64, 1, cfg);
        let mut mgr = WideningManager::new(cfg);
        let key = WideningKey::new(1, 0);

        let mut acc = Interval::constant(32, 0);
        for k in 1..=3u128 {
            let next = Interval::from_unsigned_range(32, 0, k);
            acc = mgr.widen(&env, key, &acc, &next);
            assert!(!acc.unsigned_is_top(), "should not widen before the threshold, k={k}");
        }

        let fourth = Interval::from_unsigned_range(32, 0, 4);
        acc = mgr.widen(&env, key, &acc, &fourth);
        assert!(acc.unsigned_is_top(), "fourth join at the same point must widen");
    }

    #[test]
    fn two_widening_points_track_independent_counters() {
        let env = Environment::host64();
        let mut mgr = WideningManager::new(Config::default());
        let a = WideningKey::new(1, 0);
        let b = WideningKey::new(2, 0);

        let v = Interval::constant(32, 7);
        let _ = mgr.widen(&env, a, &v, &v);
        let _ = mgr.widen(&env, a, &v, &v);

        assert_eq!(mgr.count_at(a), 2);
        assert_eq!(mgr.count_at(b), 0);
    }

    #[test]
    fn product_vector_widens_each_facet_independently() {
        let env = Environment::host64();
        let mut mgr = WideningManager::new(Config { widening_threshold: 0, ..Config::default() });
        let key = WideningKey::new(9, 0);

        let a = ProductVector::new(vec![
            Facet::Interval(Interval::constant(8, 1)),
            Facet::Set(IntegerSet::from_values(8, env.config().set_threshold, [1])),
        ]);
        let b = ProductVector::new(vec![
            Facet::Interval(Interval::constant(8, 2)),
            Facet::Set(IntegerSet::from_values(8, env.config().set_threshold, [2])),
        ]);

        let widened = mgr.widen(&env, key, &a, &b);
        match &widened.facets()[0] {
            Facet::Interval(i) => assert!(i.unsigned_is_top()),
            _ => unreachable!(),
        }
        match &widened.facets()[1] {
            Facet::Set(s) => assert!(s.is_top_flag()),
            _ => unreachable!(),
        }
    }

    #[test]
    fn set_and_bitfield_collapse_outright_once_widened() {
        let env = crate::common::Environment::host64();
        let mut mgr = WideningManager::new(Config { widening_threshold: 1, ..Config::default() });
        let key = WideningKey::new(5, 0);

        let a = IntegerSet::from_values(8, env.config().set_threshold, [1]);
        let b = IntegerSet::from_values(8, env.config().set_threshold, [2]);
        let _ = mgr.widen(&env, key, &a, &b);
        let widened = mgr.widen(&env, key, &a, &b);
        assert!(widened.is_top_flag());
    }
}
