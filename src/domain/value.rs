//! The closed tagged union the interpreter driver actually holds one of per
//! IR value, replacing a virtual-dispatch domain hierarchy.
//!
//! Dispatch is static: every operation matches on the variant pair and
//! either delegates to the matching concrete domain or raises a
//! precondition violation for a mismatched pair (callers are expected to
//! route operands of the same declared shape together; a mismatch is a
//! programming error in the driver, not a recoverable condition here).

use crate::common::diagnostics::fail_precondition;
use crate::common::{Environment, FloatPredicate, FloatSemantics, IntPredicate, IrType};

use super::bitfield::Bitfield;
use super::float_interval::FloatInterval;
use super::interval::Interval;
use super::product::{Facet, ProductVector};
use super::set::IntegerSet;
use super::AbstractDomain;

/// One abstract value, in whichever concrete domain (or product of domains)
/// the driver configured for its IR type.
#[derive(Clone, Debug, PartialEq)]
pub enum Domain {
    /// A bare interval, used when only the interval domain is configured.
    Interval(Interval),
    /// A bare integer set.
    Set(IntegerSet),
    /// A bare bitfield.
    Bitfield(Bitfield),
    /// A floating-point interval.
    FloatInterval(FloatInterval),
    /// The reduced product of the integer domains.
    Product(ProductVector),
}

impl Domain {
    /// Builds the freshly-bottom abstract value of the configured product
    /// shape for `ty`: integers get all three integer domains (Interval,
    /// Set, Bitfield) combined via [`ProductVector`]; floats get a bare
    /// [`FloatInterval`].
    #[must_use]
    pub fn bottom(_env: &Environment, ty: IrType) -> Self {
        match ty {
            IrType::Integer(w) => Self::Product(ProductVector::new(vec![
                Facet::Interval(Interval::bottom(w)),
                Facet::Set(IntegerSet::bottom(w)),
                Facet::Bitfield(Bitfield::bottom(w)),
            ])),
            IrType::Float(s) => Self::FloatInterval(FloatInterval::bottom(s)),
        }
    }

    fn kind_name(&self) -> &'static str {
        match self {
            Self::Interval(_) => "Interval",
            Self::Set(_) => "Set",
            Self::Bitfield(_) => "Bitfield",
            Self::FloatInterval(_) => "FloatInterval",
            Self::Product(_) => "Product",
        }
    }
}

/// Builds one integer arithmetic/bitwise dispatch method on [`Domain`] that
/// routes to the matching concrete domain (or [`ProductVector`] for the
/// `Product` case), aborting on a domain kind mismatch.
macro_rules! domain_binop {
    ($name:ident, $interval_fn:expr, $set_fn:expr, $bitfield_fn:expr) => {
        #[doc = concat!("`", stringify!($name), "`, dispatched per concrete integer domain.")]
        #[must_use]
        pub fn $name(env: &Environment, a: &Self, b: &Self) -> Self {
            match (a, b) {
                (Self::Interval(x), Self::Interval(y)) => Self::Interval($interval_fn(env, x, y)),
                (Self::Set(x), Self::Set(y)) => Self::Set($set_fn(env, x, y)),
                (Self::Bitfield(x), Self::Bitfield(y)) => Self::Bitfield($bitfield_fn(x, y)),
                (Self::Product(x), Self::Product(y)) => Self::Product(ProductVector::$name(env, x, y)),
                _ => fail_precondition!(
                    concat!("Domain::", stringify!($name)),
                    "domain kind mismatch: {} vs {}",
                    a.kind_name(),
                    b.kind_name()
                ),
            }
        }
    };
}

impl Domain {
    domain_binop!(add, Interval::add, IntegerSet::add, Bitfield::add);
    domain_binop!(sub, Interval::sub, IntegerSet::sub, Bitfield::sub);
    domain_binop!(mul, Interval::mul, IntegerSet::mul, Bitfield::mul);
    domain_binop!(udiv, Interval::udiv, IntegerSet::udiv, Bitfield::udiv);
    domain_binop!(sdiv, Interval::sdiv, IntegerSet::sdiv, Bitfield::sdiv);
    domain_binop!(urem, Interval::urem, IntegerSet::urem, Bitfield::urem);
    domain_binop!(srem, Interval::srem, IntegerSet::srem, Bitfield::srem);
    domain_binop!(and, Interval::and, IntegerSet::and, Bitfield::and);
    domain_binop!(or, Interval::or, IntegerSet::or, Bitfield::or);
    domain_binop!(xor, Interval::xor, IntegerSet::xor, Bitfield::xor);

    /// `a + b` for the floating-point domain.
    #[must_use]
    pub fn fadd(a: &Self, b: &Self) -> Self {
        match (a, b) {
            (Self::FloatInterval(x), Self::FloatInterval(y)) => Self::FloatInterval(FloatInterval::fadd(x, y)),
            _ => fail_precondition!("Domain::fadd", "domain kind mismatch: {} vs {}", a.kind_name(), b.kind_name()),
        }
    }

    /// `a - b` for the floating-point domain.
    #[must_use]
    pub fn fsub(a: &Self, b: &Self) -> Self {
        match (a, b) {
            (Self::FloatInterval(x), Self::FloatInterval(y)) => Self::FloatInterval(FloatInterval::fsub(x, y)),
            _ => fail_precondition!("Domain::fsub", "domain kind mismatch: {} vs {}", a.kind_name(), b.kind_name()),
        }
    }

    /// `a * b` for the floating-point domain.
    #[must_use]
    pub fn fmul(a: &Self, b: &Self) -> Self {
        match (a, b) {
            (Self::FloatInterval(x), Self::FloatInterval(y)) => Self::FloatInterval(FloatInterval::fmul(x, y)),
            _ => fail_precondition!("Domain::fmul", "domain kind mismatch: {} vs {}", a.kind_name(), b.kind_name()),
        }
    }

    /// `a / b` for the floating-point domain.
    #[must_use]
    pub fn fdiv(a: &Self, b: &Self) -> Self {
        match (a, b) {
            (Self::FloatInterval(x), Self::FloatInterval(y)) => Self::FloatInterval(FloatInterval::fdiv(x, y)),
            _ => fail_precondition!("Domain::fdiv", "domain kind mismatch: {} vs {}", a.kind_name(), b.kind_name()),
        }
    }

    /// `a % b` for the floating-point domain.
    #[must_use]
    pub fn frem(a: &Self, b: &Self) -> Self {
        match (a, b) {
            (Self::FloatInterval(x), Self::FloatInterval(y)) => Self::FloatInterval(FloatInterval::frem(x, y)),
            _ => fail_precondition!("Domain::frem", "domain kind mismatch: {} vs {}", a.kind_name(), b.kind_name()),
        }
    }

    /// Integer comparison, dispatched per concrete domain; every arm
    /// produces a width-1 [`Interval`] wrapped back up as a `Domain`.
    #[must_use]
    pub fn icmp(env: &Environment, predicate: IntPredicate, a: &Self, b: &Self) -> Self {
        let result = match (a, b) {
            (Self::Interval(x), Self::Interval(y)) => Interval::icmp(env, predicate, x, y),
            (Self::Set(x), Self::Set(y)) => IntegerSet::icmp(predicate, x, y),
            (Self::Bitfield(x), Self::Bitfield(y)) => Bitfield::icmp(predicate, x, y),
            (Self::Product(x), Self::Product(y)) => ProductVector::icmp(env, predicate, x, y),
            _ => fail_precondition!("Domain::icmp", "domain kind mismatch: {} vs {}", a.kind_name(), b.kind_name()),
        };
        Self::Interval(result)
    }

    /// Float comparison, producing the width-1 integer encoding.
    #[must_use]
    pub fn fcmp(predicate: FloatPredicate, a: &Self, b: &Self) -> Self {
        match (a, b) {
            (Self::FloatInterval(x), Self::FloatInterval(y)) => Self::Interval(FloatInterval::compare(predicate, x, y).into_width1()),
            _ => fail_precondition!("Domain::fcmp", "domain kind mismatch: {} vs {}", a.kind_name(), b.kind_name()),
        }
    }

    /// Truncates to `to_w` bits, dispatched per concrete domain.
    #[must_use]
    pub fn trunc(&self, env: &Environment, to_w: u32) -> Self {
        match self {
            Self::Interval(i) => Self::Interval(i.trunc(to_w)),
            Self::Set(s) => Self::Set(s.trunc(env, to_w)),
            Self::Bitfield(b) => Self::Bitfield(b.trunc(to_w)),
            Self::Product(p) => Self::Product(p.trunc(env, to_w)),
            Self::FloatInterval(_) => fail_precondition!("Domain::trunc", "{} has no integer width to truncate", self.kind_name()),
        }
    }

    /// Zero-extends to `to_w` bits, dispatched per concrete domain.
    #[must_use]
    pub fn zext(&self, env: &Environment, to_w: u32) -> Self {
        match self {
            Self::Interval(i) => Self::Interval(i.zext(to_w)),
            Self::Set(s) => Self::Set(s.zext(env, to_w)),
            Self::Bitfield(b) => Self::Bitfield(b.zext(to_w)),
            Self::Product(p) => Self::Product(p.zext(env, to_w)),
            Self::FloatInterval(_) => fail_precondition!("Domain::zext", "{} has no integer width to extend", self.kind_name()),
        }
    }

    /// Sign-extends to `to_w` bits, dispatched per concrete domain.
    #[must_use]
    pub fn sext(&self, env: &Environment, to_w: u32) -> Self {
        match self {
            Self::Interval(i) => Self::Interval(i.sext(to_w)),
            Self::Set(s) => Self::Set(s.sext(env, to_w)),
            Self::Bitfield(b) => Self::Bitfield(b.sext(to_w)),
            Self::Product(p) => Self::Product(p.sext(env, to_w)),
            Self::FloatInterval(_) => fail_precondition!("Domain::sext", "{} has no integer width to extend", self.kind_name()),
        }
    }

    /// Narrows a float domain to a less precise format.
    #[must_use]
    pub fn fptrunc(&self, to_s: FloatSemantics) -> Self {
        match self {
            Self::FloatInterval(f) => Self::FloatInterval(f.fptrunc(to_s)),
            _ => fail_precondition!("Domain::fptrunc", "{} is not a float domain", self.kind_name()),
        }
    }

    /// Widens a float domain to a more precise format.
    #[must_use]
    pub fn fpext(&self, to_s: FloatSemantics) -> Self {
        match self {
            Self::FloatInterval(f) => Self::FloatInterval(f.fpext(to_s)),
            _ => fail_precondition!("Domain::fpext", "{} is not a float domain", self.kind_name()),
        }
    }

    /// Converts a float domain to `self`'s own integer shape via the
    /// unsigned primitive (`self` supplies the target domain/product shape;
    /// its value is discarded).
    #[must_use]
    pub fn fptoui(&self, env: &Environment, from: &Self, to_w: u32) -> Self {
        let Self::FloatInterval(fi) = from else {
            fail_precondition!("Domain::fptoui", "{} is not a float domain", from.kind_name());
        };
        match self {
            Self::Interval(_) => Self::Interval(Interval::fptoui(fi, to_w)),
            Self::Set(_) => Self::Set(IntegerSet::fptoui(fi, to_w)),
            Self::Bitfield(_) => Self::Bitfield(Bitfield::fptoui(fi, to_w)),
            Self::Product(p) => Self::Product(p.fptoui(env, fi, to_w)),
            Self::FloatInterval(_) => fail_precondition!("Domain::fptoui", "target shape must be an integer domain"),
        }
    }

    /// Converts a float domain to `self`'s own integer shape via the signed
    /// primitive.
    #[must_use]
    pub fn fptosi(&self, env: &Environment, from: &Self, to_w: u32) -> Self {
        let Self::FloatInterval(fi) = from else {
            fail_precondition!("Domain::fptosi", "{} is not a float domain", from.kind_name());
        };
        match self {
            Self::Interval(_) => Self::Interval(Interval::fptosi(fi, to_w)),
            Self::Set(_) => Self::Set(IntegerSet::fptosi(fi, to_w)),
            Self::Bitfield(_) => Self::Bitfield(Bitfield::fptosi(fi, to_w)),
            Self::Product(p) => Self::Product(p.fptosi(env, fi, to_w)),
            Self::FloatInterval(_) => fail_precondition!("Domain::fptosi", "target shape must be an integer domain"),
        }
    }

    /// Converts an integer domain to a float domain via the unsigned
    /// interpretation.
    #[must_use]
    pub fn uitofp(&self, to_s: FloatSemantics) -> Self {
        match self {
            Self::Interval(i) => Self::FloatInterval(i.uitofp(to_s)),
            Self::Set(s) => Self::FloatInterval(s.uitofp(to_s)),
            Self::Bitfield(b) => Self::FloatInterval(b.uitofp(to_s)),
            Self::Product(p) => Self::FloatInterval(p.uitofp(to_s)),
            Self::FloatInterval(_) => fail_precondition!("Domain::uitofp", "source must be an integer domain"),
        }
    }

    /// Converts an integer domain to a float domain via the signed
    /// interpretation.
    #[must_use]
    pub fn sitofp(&self, to_s: FloatSemantics) -> Self {
        match self {
            Self::Interval(i) => Self::FloatInterval(i.sitofp(to_s)),
            Self::Set(s) => Self::FloatInterval(s.sitofp(to_s)),
            Self::Bitfield(b) => Self::FloatInterval(b.sitofp(to_s)),
            Self::Product(p) => Self::FloatInterval(p.sitofp(to_s)),
            Self::FloatInterval(_) => fail_precondition!("Domain::sitofp", "source must be an integer domain"),
        }
    }
}

impl AbstractDomain for Domain {
    fn is_bottom(&self) -> bool {
        match self {
            Self::Interval(i) => i.is_bottom(),
            Self::Set(s) => s.is_bottom(),
            Self::Bitfield(b) => b.is_bottom(),
            Self::FloatInterval(f) => f.is_bottom(),
            Self::Product(p) => p.is_bottom(),
        }
    }

    fn is_top(&self) -> bool {
        match self {
            Self::Interval(i) => i.is_top(),
            Self::Set(s) => s.is_top(),
            Self::Bitfield(b) => b.is_top(),
            Self::FloatInterval(f) => f.is_top(),
            Self::Product(p) => p.facets().iter().all(|facet| match facet {
                Facet::Interval(i) => i.is_top(),
                Facet::Set(s) => s.is_top(),
                Facet::Bitfield(b) => b.is_top(),
            }),
        }
    }

    fn clone_cleaned(&self) -> Self {
        match self {
            Self::Interval(i) => Self::Interval(i.clone_cleaned()),
            Self::Set(s) => Self::Set(s.clone_cleaned()),
            Self::Bitfield(b) => Self::Bitfield(b.clone_cleaned()),
            Self::FloatInterval(f) => Self::FloatInterval(f.clone_cleaned()),
            Self::Product(p) => Self::Product(ProductVector::new(
                p.facets()
                    .iter()
                    .map(|facet| match facet {
                        Facet::Interval(i) => Facet::Interval(i.clone_cleaned()),
                        Facet::Set(s) => Facet::Set(s.clone_cleaned()),
                        Facet::Bitfield(b) => Facet::Bitfield(b.clone_cleaned()),
                    })
                    .collect(),
            )),
        }
    }

    fn join(&self, env: &Environment, other: &Self) -> Self {
        match (self, other) {
            (Self::Interval(a), Self::Interval(b)) => Self::Interval(a.join(env, b)),
            (Self::Set(a), Self::Set(b)) => Self::Set(a.join(env, b)),
            (Self::Bitfield(a), Self::Bitfield(b)) => Self::Bitfield(a.join(env, b)),
            (Self::FloatInterval(a), Self::FloatInterval(b)) => Self::FloatInterval(a.join(env, b)),
            (Self::Product(a), Self::Product(b)) => Self::Product(ProductVector::new(
                a.facets()
                    .iter()
                    .zip(b.facets())
                    .map(|(fa, fb)| match (fa, fb) {
                        (Facet::Interval(x), Facet::Interval(y)) => Facet::Interval(x.join(y)),
                        (Facet::Set(x), Facet::Set(y)) => Facet::Set(x.join(env, y)),
                        (Facet::Bitfield(x), Facet::Bitfield(y)) => Facet::Bitfield(x.join(y)),
                        _ => fail_precondition!("Domain::join", "facet kind mismatch"),
                    })
                    .collect(),
            )),
            _ => fail_precondition!(
                "Domain::join",
                "domain kind mismatch: {} vs {}",
                self.kind_name(),
                other.kind_name()
            ),
        }
    }

    fn meet(&self, env: &Environment, other: &Self) -> Self {
        match (self, other) {
            (Self::Interval(a), Self::Interval(b)) => Self::Interval(a.meet(env, b)),
            (Self::Set(a), Self::Set(b)) => Self::Set(a.meet(env, b)),
            (Self::Bitfield(a), Self::Bitfield(b)) => Self::Bitfield(a.meet(env, b)),
            (Self::FloatInterval(a), Self::FloatInterval(b)) => Self::FloatInterval(a.meet(env, b)),
            (Self::Product(a), Self::Product(b)) => Self::Product(ProductVector::new(
                a.facets()
                    .iter()
                    .zip(b.facets())
                    .map(|(fa, fb)| match (fa, fb) {
                        (Facet::Interval(x), Facet::Interval(y)) => Facet::Interval(x.meet(y)),
                        (Facet::Set(x), Facet::Set(y)) => Facet::Set(x.meet(y)),
                        (Facet::Bitfield(x), Facet::Bitfield(y)) => Facet::Bitfield(x.meet(y)),
                        _ => fail_precondition!("Domain::meet", "facet kind mismatch"),
                    })
                    .collect(),
            )),
            _ => fail_precondition!(
                "Domain::meet",
                "domain kind mismatch: {} vs {}",
                self.kind_name(),
                other.kind_name()
            ),
        }
    }

    fn memory_usage(&self) -> usize {
        match self {
            Self::Interval(i) => i.memory_usage(),
            Self::Set(s) => s.memory_usage(),
            Self::Bitfield(b) => b.memory_usage(),
            Self::FloatInterval(f) => f.memory_usage(),
            Self::Product(p) => p
                .facets()
                .iter()
                .map(|facet| match facet {
                    Facet::Interval(i) => i.memory_usage(),
                    Facet::Set(s) => s.memory_usage(),
                    Facet::Bitfield(b) => b.memory_usage(),
                })
                .sum(),
        }
    }

    fn accuracy(&self) -> f64 {
        match self {
            Self::Interval(i) => i.accuracy(),
            Self::Set(s) => s.accuracy(),
            Self::Bitfield(b) => b.accuracy(),
            Self::FloatInterval(f) => f.accuracy(),
            Self::Product(p) => {
                let accuracies: Vec<f64> = p
                    .facets()
                    .iter()
                    .map(|facet| match facet {
                        Facet::Interval(i) => i.accuracy(),
                        Facet::Set(s) => s.accuracy(),
                        Facet::Bitfield(b) => b.accuracy(),
                    })
                    .collect();
                accuracies.iter().copied().fold(0.0, f64::max)
            }
        }
    }

    fn matches_string(&self, text: &str) -> (bool, String) {
        match self {
            Self::Interval(i) => i.matches_string(text),
            Self::Set(s) => s.matches_string(text),
            Self::Bitfield(b) => b.matches_string(text),
            Self::FloatInterval(f) => f.matches_string(text),
            Self::Product(p) => {
                let rendered = p
                    .facets()
                    .iter()
                    .map(|facet| match facet {
                        Facet::Interval(i) => i.to_string(),
                        Facet::Set(s) => s.to_string(),
                        Facet::Bitfield(b) => b.to_string(),
                    })
                    .collect::<Vec<_>>()
                    .join(" ; ");
                if rendered == text {
                    (true, "exact match".to_string())
                } else {
                    (false, format!("expected `{rendered}`, got `{text}`"))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bottom_for_integer_builds_a_three_facet_product() {
        let env = Environment::host64();
        let v = Domain::bottom(&env, IrType::Integer(8));
        match v {
            Domain::Product(p) => assert_eq!(p.facets().len(), 3),
            _ => unreachable!("integer IR type must build a product"),
        }
    }

    #[test]
    fn bottom_for_float_builds_a_bare_float_interval() {
        let env = Environment::host64();
        let v = Domain::bottom(&env, IrType::Float(crate::common::FloatSemantics::Double));
        assert!(matches!(v, Domain::FloatInterval(_)));
        assert!(v.is_bottom());
    }

    #[test]
    fn mismatched_join_aborts() {
        let env = Environment::host64();
        let a = Domain::Interval(Interval::constant(8, 1));
        let b = Domain::Bitfield(Bitfield::constant(8, 1));
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| a.join(&env, &b)));
        assert!(result.is_err());
    }

    #[test]
    fn add_dispatches_through_interval_facet() {
        let env = Environment::host64();
        let a = Domain::Interval(Interval::constant(8, 3));
        let b = Domain::Interval(Interval::constant(8, 4));
        let sum = Domain::add(&env, &a, &b);
        match sum {
            Domain::Interval(i) => assert_eq!(i, Interval::constant(8, 7)),
            _ => unreachable!("interval + interval must stay an interval"),
        }
    }

    #[test]
    fn icmp_on_product_meets_each_facets_own_answer() {
        let env = Environment::host64();
        let two = |w: u32| {
            ProductVector::new(vec![
                Facet::Interval(Interval::constant(w, 2)),
                Facet::Set(IntegerSet::from_values(w, 4, [2])),
                Facet::Bitfield(Bitfield::constant(w, 2)),
            ])
        };
        let a = Domain::Product(two(8));
        let b = Domain::Product(two(8));
        let result = Domain::icmp(&env, IntPredicate::Eq, &a, &b);
        assert!(matches!(result, Domain::Interval(_)));
    }

    #[test]
    fn uitofp_then_fptoui_round_trips_a_constant() {
        let env = Environment::host64();
        let i = Domain::Interval(Interval::constant(8, 5));
        let f = i.uitofp(crate::common::FloatSemantics::Double);
        let back = i.fptoui(&env, &f, 8);
        match back {
            Domain::Interval(v) => assert_eq!(v, Interval::constant(8, 5)),
            _ => unreachable!("fptoui into an interval shape must stay an interval"),
        }
    }

    #[test]
    fn fptoui_rejects_a_non_float_source() {
        let env = Environment::host64();
        let i = Domain::Interval(Interval::constant(8, 5));
        let not_float = Domain::Interval(Interval::constant(8, 1));
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| i.fptoui(&env, &not_float, 8)));
        assert!(result.is_err());
    }
}
