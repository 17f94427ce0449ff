//! Comparison-predicate enumerations consumed by `icmp`/`fcmp`.
//!
//! These are isomorphic to the integer and IEEE floating-point ordered
//! comparison predicates the interpreter driver dispatches on; the numeric
//! values are not significant, only the distinct variants are.

use strum_macros::{EnumCount, EnumIter};

/// The ten standard signed/unsigned integer comparison predicates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, EnumCount, EnumIter)]
pub enum IntPredicate {
    /// `a == b`
    Eq,
    /// `a != b`
    Ne,
    /// unsigned `a > b`
    Ugt,
    /// unsigned `a >= b`
    Uge,
    /// unsigned `a < b`
    Ult,
    /// unsigned `a <= b`
    Ule,
    /// signed `a > b`
    Sgt,
    /// signed `a >= b`
    Sge,
    /// signed `a < b`
    Slt,
    /// signed `a <= b`
    Sle,
}

impl IntPredicate {
    /// True for the four predicates that compare under signed ordering.
    #[must_use]
    pub const fn is_signed(self) -> bool {
        matches!(self, Self::Sgt | Self::Sge | Self::Slt | Self::Sle)
    }

    /// True for the four predicates that compare under unsigned ordering.
    #[must_use]
    pub const fn is_unsigned(self) -> bool {
        matches!(self, Self::Ugt | Self::Uge | Self::Ult | Self::Ule)
    }

    /// The reflexive answer when both operands are known to be the same value,
    /// for non-empty inputs (e.g. `a.icmp(Eq, a)` is always `{1}`).
    #[must_use]
    pub const fn reflexive_answer(self) -> bool {
        matches!(
            self,
            Self::Eq | Self::Sle | Self::Sge | Self::Ule | Self::Uge
        )
    }
}

/// The IEEE-754 ordered/unordered floating-point comparison predicates,
/// including the degenerate `False`/`True` predicates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, EnumCount, EnumIter)]
pub enum FloatPredicate {
    /// Always false.
    False,
    /// Ordered and equal.
    Oeq,
    /// Ordered and greater-than.
    Ogt,
    /// Ordered and greater-than-or-equal.
    Oge,
    /// Ordered and less-than.
    Olt,
    /// Ordered and less-than-or-equal.
    Ole,
    /// Ordered and not-equal.
    One,
    /// Ordered (neither operand is NaN).
    Ord,
    /// Unordered or equal.
    Ueq,
    /// Unordered or greater-than.
    Ugt,
    /// Unordered or greater-than-or-equal.
    Uge,
    /// Unordered or less-than.
    Ult,
    /// Unordered or less-than-or-equal.
    Ule,
    /// Unordered or not-equal.
    Une,
    /// Unordered (at least one operand is NaN).
    Uno,
    /// Always true.
    True,
}

impl FloatPredicate {
    /// Ordered predicates are false whenever either operand may be NaN.
    #[must_use]
    pub const fn is_ordered(self) -> bool {
        matches!(
            self,
            Self::Oeq | Self::Ogt | Self::Oge | Self::Olt | Self::Ole | Self::One | Self::Ord
        )
    }
}

/// IEEE-754 format tags. Analogous to integer bit width for floats.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, EnumCount, EnumIter)]
pub enum FloatSemantics {
    /// IEEE binary16.
    Half,
    /// IEEE binary32.
    Single,
    /// IEEE binary64.
    Double,
    /// IEEE binary128.
    Quad,
    /// x87 80-bit extended precision.
    X87Fp80,
    /// PowerPC double-double.
    PpcDoubleDouble,
}

impl FloatSemantics {
    /// The largest finite magnitude representable in this format, as an `f64`.
    #[must_use]
    pub const fn max_finite(self) -> f64 {
        match self {
            Self::Half => 65504.0,
            Self::Single => f32::MAX as f64,
            Self::Double | Self::X87Fp80 | Self::PpcDoubleDouble | Self::Quad => f64::MAX,
        }
    }
}
