//! The small slice of IR type information the core needs from the driver:
//! enough to build a freshly-bottom abstract value of the right shape.

use super::predicate::FloatSemantics;

/// The IR type of a value the driver is requesting an abstract value for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IrType {
    /// An integer of the given bit width.
    Integer(u32),
    /// A floating-point value of the given IEEE semantics.
    Float(FloatSemantics),
}

impl IrType {
    /// The bit width of an integer type, or `None` for floats.
    #[must_use]
    pub const fn integer_width(self) -> Option<u32> {
        match self {
            Self::Integer(w) => Some(w),
            Self::Float(_) => None,
        }
    }
}
