//! The reduced-product combinator: holds several abstract values for the
//! same IR value side by side and refines each from the others' published
//! facts.
//!
//! Messages are an enum-indexed record rather than a heterogeneous keyed
//! map, since the kind set is closed and small — one field per
//! [`FieldKind`] variant, no downcast at `refine` time.

use crate::common::diagnostics::fail_precondition;
use crate::common::{Environment, FloatSemantics, IntPredicate};

use super::bitfield::Bitfield;
use super::float_interval::FloatInterval;
use super::interval::Interval;
use super::set::IntegerSet;
use super::AbstractDomain;

/// The closed set of publishable fact kinds a domain can contribute to a
/// reduction round.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// A joint signed/unsigned range, as carried by [`Interval`].
    MinMax,
}

/// A single published fact.
#[derive(Clone, Debug, PartialEq)]
pub enum Field {
    /// A range constraint.
    MinMax(Interval),
}

impl Field {
    const fn kind(&self) -> FieldKind {
        match self {
            Self::MinMax(_) => FieldKind::MinMax,
        }
    }
}

/// The facts one domain publishes (or absorbs) during one reduction round.
///
/// One `Option<Field>` slot per [`FieldKind`] variant; absent means "no
/// constraint from this side".
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Message {
    min_max: Option<Field>,
}

impl Message {
    /// An empty message (no constraints).
    #[must_use]
    pub const fn empty() -> Self {
        Self { min_max: None }
    }

    /// Inserts (or replaces) a field, keyed by its own kind.
    pub fn set(&mut self, field: Field) {
        match field.kind() {
            FieldKind::MinMax => self.min_max = Some(field),
        }
    }

    /// The `MinMax` field, if published.
    #[must_use]
    pub const fn min_max(&self) -> Option<&Field> {
        self.min_max.as_ref()
    }

    /// Field-wise meet: both sides' intervals meet if both carry a
    /// `MinMax`, clone whichever side carries it if only one does, and
    /// stay absent if neither does.
    #[must_use]
    pub fn meet(&self, other: &Self) -> Self {
        let min_max = match (&self.min_max, &other.min_max) {
            (Some(Field::MinMax(a)), Some(Field::MinMax(b))) => Some(Field::MinMax(a.meet(b))),
            (Some(a), None) | (None, Some(a)) => Some(a.clone()),
            (None, None) => None,
        };
        Self { min_max }
    }
}

/// One domain's slot inside a [`ProductVector`].
#[derive(Clone, Debug, PartialEq)]
pub enum Facet {
    /// The interval domain.
    Interval(Interval),
    /// The integer set domain.
    Set(IntegerSet),
    /// The bitfield domain.
    Bitfield(Bitfield),
}

impl Facet {
    /// Extracts this facet's publishable message: Interval publishes its
    /// own range; Bitfield publishes a single-point range only if it is
    /// constant; Set publishes nothing.
    #[must_use]
    pub fn extract(&self) -> Message {
        let mut msg = Message::empty();
        match self {
            Self::Interval(i) => msg.set(Field::MinMax(i.clone())),
            Self::Bitfield(b) => {
                if b.is_constant() {
                    msg.set(Field::MinMax(b.as_interval()));
                }
            }
            Self::Set(_) => {}
        }
        msg
    }

    /// Tightens this facet using the meet of every other facet's message.
    #[must_use]
    pub fn refine(&self, env: &Environment, merged: &Message) -> Self {
        match (self, merged.min_max()) {
            (Self::Interval(i), Some(Field::MinMax(m))) => Self::Interval(i.meet(m)),
            (Self::Bitfield(b), Some(Field::MinMax(m))) => {
                if let Some(bits) = m.constant_bits() {
                    Self::Bitfield(b.meet(&Bitfield::constant(b.width(), bits)))
                } else {
                    Self::Bitfield(b.clone())
                }
            }
            (Self::Set(s), Some(Field::MinMax(m))) => {
                if let Some(bits) = m.constant_bits() {
                    Self::Set(s.meet(&IntegerSet::from_values(s.width(), env.config().set_threshold, [bits])))
                } else {
                    Self::Set(s.clone())
                }
            }
            _ => self.clone(),
        }
    }

    fn require_same_kind(a: &Self, b: &Self, op: &'static str) {
        let same = matches!(
            (a, b),
            (Self::Interval(_), Self::Interval(_)) | (Self::Set(_), Self::Set(_)) | (Self::Bitfield(_), Self::Bitfield(_))
        );
        if !same {
            fail_precondition!(op, "facet kind mismatch");
        }
    }
}

/// Builds one arithmetic/bitwise dispatch method on [`Facet`] that applies
/// the named operator to each concrete domain, aborting on a facet kind
/// mismatch between `a` and `b`.
macro_rules! facet_binop {
    ($name:ident, $op:literal, $interval_fn:expr, $set_fn:expr, $bitfield_fn:expr) => {
        #[doc = concat!("`", $op, "` across matching facet kinds.")]
        #[must_use]
        pub fn $name(env: &Environment, a: &Self, b: &Self) -> Self {
            Self::require_same_kind(a, b, concat!("Facet::", $op));
            match (a, b) {
                (Self::Interval(x), Self::Interval(y)) => Self::Interval($interval_fn(env, x, y)),
                (Self::Set(x), Self::Set(y)) => Self::Set($set_fn(env, x, y)),
                (Self::Bitfield(x), Self::Bitfield(y)) => Self::Bitfield($bitfield_fn(x, y)),
                _ => unreachable!("require_same_kind already checked"),
            }
        }
    };
}

impl Facet {
    facet_binop!(add, "add", Interval::add, IntegerSet::add, Bitfield::add);
    facet_binop!(sub, "sub", Interval::sub, IntegerSet::sub, Bitfield::sub);
    facet_binop!(mul, "mul", Interval::mul, IntegerSet::mul, Bitfield::mul);
    facet_binop!(udiv, "udiv", Interval::udiv, IntegerSet::udiv, Bitfield::udiv);
    facet_binop!(sdiv, "sdiv", Interval::sdiv, IntegerSet::sdiv, Bitfield::sdiv);
    facet_binop!(urem, "urem", Interval::urem, IntegerSet::urem, Bitfield::urem);
    facet_binop!(srem, "srem", Interval::srem, IntegerSet::srem, Bitfield::srem);
    facet_binop!(and, "and", Interval::and, IntegerSet::and, Bitfield::and);
    facet_binop!(or, "or", Interval::or, IntegerSet::or, Bitfield::or);
    facet_binop!(xor, "xor", Interval::xor, IntegerSet::xor, Bitfield::xor);

    /// Integer comparison, dispatched per concrete domain; every domain's
    /// `icmp` already returns a width-1 [`Interval`].
    #[must_use]
    pub fn icmp(env: &Environment, predicate: IntPredicate, a: &Self, b: &Self) -> Interval {
        Self::require_same_kind(a, b, "Facet::icmp");
        match (a, b) {
            (Self::Interval(x), Self::Interval(y)) => Interval::icmp(env, predicate, x, y),
            (Self::Set(x), Self::Set(y)) => IntegerSet::icmp(predicate, x, y),
            (Self::Bitfield(x), Self::Bitfield(y)) => Bitfield::icmp(predicate, x, y),
            _ => unreachable!("require_same_kind already checked"),
        }
    }

    /// Truncates to `to_w` bits.
    #[must_use]
    pub fn trunc(&self, env: &Environment, to_w: u32) -> Self {
        match self {
            Self::Interval(i) => Self::Interval(i.trunc(to_w)),
            Self::Set(s) => Self::Set(s.trunc(env, to_w)),
            Self::Bitfield(b) => Self::Bitfield(b.trunc(to_w)),
        }
    }

    /// Zero-extends to `to_w` bits.
    #[must_use]
    pub fn zext(&self, env: &Environment, to_w: u32) -> Self {
        match self {
            Self::Interval(i) => Self::Interval(i.zext(to_w)),
            Self::Set(s) => Self::Set(s.zext(env, to_w)),
            Self::Bitfield(b) => Self::Bitfield(b.zext(to_w)),
        }
    }

    /// Sign-extends to `to_w` bits.
    #[must_use]
    pub fn sext(&self, env: &Environment, to_w: u32) -> Self {
        match self {
            Self::Interval(i) => Self::Interval(i.sext(to_w)),
            Self::Set(s) => Self::Set(s.sext(env, to_w)),
            Self::Bitfield(b) => Self::Bitfield(b.sext(to_w)),
        }
    }

    /// Converts a float interval to this facet's own kind via the unsigned
    /// primitive.
    #[must_use]
    pub fn fptoui(&self, fi: &FloatInterval, to_w: u32) -> Self {
        match self {
            Self::Interval(_) => Self::Interval(Interval::fptoui(fi, to_w)),
            Self::Set(_) => Self::Set(IntegerSet::fptoui(fi, to_w)),
            Self::Bitfield(_) => Self::Bitfield(Bitfield::fptoui(fi, to_w)),
        }
    }

    /// Converts a float interval to this facet's own kind via the signed
    /// primitive.
    #[must_use]
    pub fn fptosi(&self, fi: &FloatInterval, to_w: u32) -> Self {
        match self {
            Self::Interval(_) => Self::Interval(Interval::fptosi(fi, to_w)),
            Self::Set(_) => Self::Set(IntegerSet::fptosi(fi, to_w)),
            Self::Bitfield(_) => Self::Bitfield(Bitfield::fptosi(fi, to_w)),
        }
    }

    /// Converts this facet to a float interval via the unsigned
    /// interpretation.
    #[must_use]
    pub fn uitofp(&self, to_s: FloatSemantics) -> FloatInterval {
        match self {
            Self::Interval(i) => i.uitofp(to_s),
            Self::Set(s) => s.uitofp(to_s),
            Self::Bitfield(b) => b.uitofp(to_s),
        }
    }

    /// Converts this facet to a float interval via the signed
    /// interpretation.
    #[must_use]
    pub fn sitofp(&self, to_s: FloatSemantics) -> FloatInterval {
        match self {
            Self::Interval(i) => i.sitofp(to_s),
            Self::Set(s) => s.sitofp(to_s),
            Self::Bitfield(b) => b.sitofp(to_s),
        }
    }
}

/// An ordered tuple of abstract values co-describing the same IR value,
/// one per configured domain.
#[derive(Clone, Debug, PartialEq)]
pub struct ProductVector {
    facets: Vec<Facet>,
}

impl ProductVector {
    /// Builds a vector from facets in the given (fixed) order.
    #[must_use]
    pub const fn new(facets: Vec<Facet>) -> Self {
        Self { facets }
    }

    /// The facets, in declared order.
    #[must_use]
    pub fn facets(&self) -> &[Facet] {
        &self.facets
    }

    /// Runs one reduction pass: each domain extracts a message, then each
    /// domain refines itself using the meet of every *other* domain's
    /// message. One linear pass, no fixpoint iteration.
    #[must_use]
    pub fn reduce(&self, env: &Environment) -> Self {
        let messages: Vec<Message> = self.facets.iter().map(Facet::extract).collect();
        let facets = self
            .facets
            .iter()
            .enumerate()
            .map(|(i, facet)| {
                let merged = messages
                    .iter()
                    .enumerate()
                    .filter(|(j, _)| *j != i)
                    .fold(Message::empty(), |acc, (_, m)| acc.meet(m));
                facet.refine(env, &merged)
            })
            .collect();
        Self { facets }
    }

    /// True if any facet is bottom (the vector denotes no concrete values).
    #[must_use]
    pub fn is_bottom(&self) -> bool {
        self.facets.iter().any(|f| match f {
            Facet::Interval(i) => i.is_bottom(),
            Facet::Set(s) => s.is_bottom(),
            Facet::Bitfield(b) => b.is_bottom(),
        })
    }

    fn zip_with(env: &Environment, a: &Self, b: &Self, f: impl Fn(&Facet, &Facet) -> Facet) -> Self {
        let facets = a.facets.iter().zip(&b.facets).map(|(x, y)| f(x, y)).collect();
        Self { facets }.reduce(env)
    }
}

/// Builds one `ProductVector`-level arithmetic/bitwise dispatch method that
/// applies `Facet::$name` across every facet pair, then reduces.
macro_rules! vector_binop {
    ($name:ident) => {
        #[doc = concat!("`", stringify!($name), "` across every facet, reduced afterward.")]
        #[must_use]
        pub fn $name(env: &Environment, a: &Self, b: &Self) -> Self {
            Self::zip_with(env, a, b, |x, y| Facet::$name(env, x, y))
        }
    };
}

impl ProductVector {
    vector_binop!(add);
    vector_binop!(sub);
    vector_binop!(mul);
    vector_binop!(udiv);
    vector_binop!(sdiv);
    vector_binop!(urem);
    vector_binop!(srem);
    vector_binop!(and);
    vector_binop!(or);
    vector_binop!(xor);

    /// Integer comparison: each facet's own `icmp` answer meets with the
    /// others'. A contradiction among facets (one says definite-true,
    /// another definite-false) meets to bottom, correctly flagging the
    /// comparison as unreachable rather than picking one facet's answer
    /// arbitrarily.
    #[must_use]
    pub fn icmp(env: &Environment, predicate: IntPredicate, a: &Self, b: &Self) -> Interval {
        a.facets
            .iter()
            .zip(&b.facets)
            .map(|(x, y)| Facet::icmp(env, predicate, x, y))
            .reduce(|acc, r| acc.meet(&r))
            .unwrap_or_else(|| Interval::top(1))
    }

    /// Truncates every facet to `to_w` bits, then reduces.
    #[must_use]
    pub fn trunc(&self, env: &Environment, to_w: u32) -> Self {
        let facets = self.facets.iter().map(|f| f.trunc(env, to_w)).collect();
        Self { facets }.reduce(env)
    }

    /// Zero-extends every facet to `to_w` bits, then reduces.
    #[must_use]
    pub fn zext(&self, env: &Environment, to_w: u32) -> Self {
        let facets = self.facets.iter().map(|f| f.zext(env, to_w)).collect();
        Self { facets }.reduce(env)
    }

    /// Sign-extends every facet to `to_w` bits, then reduces.
    #[must_use]
    pub fn sext(&self, env: &Environment, to_w: u32) -> Self {
        let facets = self.facets.iter().map(|f| f.sext(env, to_w)).collect();
        Self { facets }.reduce(env)
    }

    /// Converts a float interval into a fresh product, one facet at a time
    /// via the unsigned primitive, then reduces so each facet can sharpen
    /// the others.
    #[must_use]
    pub fn fptoui(&self, env: &Environment, fi: &FloatInterval, to_w: u32) -> Self {
        let facets = self.facets.iter().map(|f| f.fptoui(fi, to_w)).collect();
        Self { facets }.reduce(env)
    }

    /// Converts a float interval into a fresh product via the signed
    /// primitive, then reduces.
    #[must_use]
    pub fn fptosi(&self, env: &Environment, fi: &FloatInterval, to_w: u32) -> Self {
        let facets = self.facets.iter().map(|f| f.fptosi(fi, to_w)).collect();
        Self { facets }.reduce(env)
    }

    /// Converts to a float interval via the unsigned interpretation,
    /// meeting every facet's independent answer into the tightest sound
    /// range.
    #[must_use]
    pub fn uitofp(&self, to_s: FloatSemantics) -> FloatInterval {
        self.facets
            .iter()
            .map(|f| f.uitofp(to_s))
            .reduce(|acc, r| acc.meet(&r))
            .unwrap_or_else(|| FloatInterval::top(to_s))
    }

    /// Converts to a float interval via the signed interpretation, meeting
    /// every facet's independent answer.
    #[must_use]
    pub fn sitofp(&self, to_s: FloatSemantics) -> FloatInterval {
        self.facets
            .iter()
            .map(|f| f.sitofp(to_s))
            .reduce(|acc, r| acc.meet(&r))
            .unwrap_or_else(|| FloatInterval::top(to_s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_4_bitfield_constant_tightens_interval_through_reduction() {
        let env = Environment::host64();
        let a_bits = Bitfield::constant(8, 0b0000_1111);
        let b_bits = Bitfield::constant(8, 0b1111_0000);
        let bitfield_and = Bitfield::and(&a_bits, &b_bits);
        assert_eq!(bitfield_and.constant_bits(), Some(0));

        let a_iv = Interval::constant(8, 0b0000_1111);
        let b_iv = Interval::constant(8, 0b1111_0000);
        let interval_and = Interval::and(&env, &a_iv, &b_iv);
        assert!(interval_and.is_top());

        let vector = ProductVector::new(vec![Facet::Interval(interval_and), Facet::Bitfield(bitfield_and)]);
        let reduced = vector.reduce(&env);
        match &reduced.facets()[0] {
            Facet::Interval(i) => assert_eq!(i.constant_bits(), Some(0)),
            _ => unreachable!(),
        }
    }

    #[test]
    fn message_meet_is_absent_when_neither_side_publishes() {
        let merged = Message::empty().meet(&Message::empty());
        assert!(merged.min_max().is_none());
    }

    #[test]
    fn message_meet_clones_the_lone_publisher() {
        let published = {
            let mut m = Message::empty();
            m.set(Field::MinMax(Interval::constant(8, 3)));
            m
        };
        let merged = published.meet(&Message::empty());
        assert_eq!(merged.min_max(), published.min_max());
    }

    #[test]
    fn reduce_is_a_no_op_on_an_already_consistent_vector() {
        let env = Environment::host64();
        let vector = ProductVector::new(vec![
            Facet::Interval(Interval::constant(8, 5)),
            Facet::Set(IntegerSet::from_values(8, env.config().set_threshold, [5])),
        ]);
        let reduced = vector.reduce(&env);
        assert_eq!(reduced, vector);
    }
}
