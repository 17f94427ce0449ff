//! Shared context, configuration, diagnostics, and enumerations consumed
//! across every abstract domain.

pub mod config;
pub mod diagnostics;
pub mod env;
pub mod ir_type;
pub mod predicate;

pub use config::Config;
pub use diagnostics::Diagnostic;
pub use env::Environment;
pub use ir_type::IrType;
pub use predicate::{FloatPredicate, FloatSemantics, IntPredicate};
