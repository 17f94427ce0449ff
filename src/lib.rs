//! Numeric abstract-domain algebra for static analysis by abstract
//! interpretation.
//!
//! This crate implements the numeric side of an abstract interpreter's
//! value domain with the following pieces:
//! 1. **Domain:** [`Interval`](domain::interval::Interval) (dual
//!    signed/unsigned range), [`IntegerSet`](domain::set::IntegerSet)
//!    (bounded explicit enumeration), [`Bitfield`](domain::bitfield::Bitfield)
//!    (per-bit tristate), [`FloatInterval`](domain::float_interval::FloatInterval),
//!    and [`ProductVector`](domain::product::ProductVector) (reduced-product
//!    combination with message-passing refinement), all reachable through the
//!    closed [`Domain`](domain::value::Domain) tagged union a driver actually
//!    stores one of per IR value.
//! 2. **Primitives:** width-tagged overflow-detecting integer arithmetic and
//!    host-FPU-backed floating-point corner arithmetic.
//! 3. **Widening:** a [`WideningManager`](widening::WideningManager) that
//!    forces termination of fixed-point iteration over loops.
//! 4. **Common:** shared [`Environment`](common::Environment)/[`Config`](common::Config),
//!    comparison-predicate enums, and [`Diagnostic`](common::Diagnostic) error
//!    reporting.

/// Shared environment, configuration, predicates, and diagnostics.
pub mod common;
/// The abstract domains and the reduced-product combinator.
pub mod domain;
/// Width-tagged integer and host-FPU-backed float arithmetic primitives.
pub mod primitives;
/// The widening manager that forces fixed-point termination at loop heads.
pub mod widening;

/// Shared, read-only analysis context; construct once and pass by reference.
pub use crate::common::Environment;
/// Process-wide thresholds (set-size, widening count); deserializable with
/// documented defaults.
pub use crate::common::Config;
/// The three diagnostic categories an operator can raise.
pub use crate::common::Diagnostic;
/// Dual-range interval domain.
pub use crate::domain::interval::Interval;
/// Bounded explicit-enumeration domain.
pub use crate::domain::set::IntegerSet;
/// Per-bit tristate domain.
pub use crate::domain::bitfield::Bitfield;
/// Floating-point interval domain.
pub use crate::domain::float_interval::FloatInterval;
/// Reduced-product combination of several domains over the same value.
pub use crate::domain::product::ProductVector;
/// The closed tagged union the interpreter driver holds one of per IR value;
/// its [`Domain::bottom`](crate::domain::value::Domain::bottom) is the
/// constructor entry point from `(&Environment, IrType)`.
pub use crate::domain::value::Domain;
/// The IR type tag a driver passes to [`Domain::bottom`].
pub use crate::common::IrType;
/// Termination-forcing join replacement at loop heads.
pub use crate::widening::WideningManager;
