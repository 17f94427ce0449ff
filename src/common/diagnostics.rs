//! The three error categories the domains can raise.
//!
//! Precondition violations are programming errors and abort the process;
//! concrete runtime exceptions (division by zero, overflow, invalid float
//! ops) are absorbed silently into a widened result; unsupported operators
//! are logged and the domain returns top. None of these is ever returned as
//! a `Result` from an operator — the lattice itself carries "no
//! information" (top) and "unreachable" (bottom).

use thiserror::Error;

/// A diagnostic event raised by a domain operator.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// A programming error: width mismatch, wrong domain subtype, or an
    /// unsupported predicate reaching an operator that requires one of the
    /// known ones. The caller must abort.
    #[error("precondition violation in `{op}`: {detail}")]
    Precondition {
        /// Name of the operator where the violation was detected.
        op: &'static str,
        /// Human-readable explanation, including operand shapes.
        detail: String,
    },

    /// A concrete runtime exception (division by zero, overflow, invalid
    /// float operation) that the operator absorbed by widening its result.
    #[error("absorbed exception in `{op}`: {detail}")]
    ConcreteException {
        /// Name of the operator that absorbed the exception.
        op: &'static str,
        /// Human-readable explanation.
        detail: String,
    },

    /// The operator has no precise implementation for this domain; the
    /// domain returned top for this call.
    #[error("`{op}` is not implemented for the {domain} domain; returning top")]
    UnsupportedOperator {
        /// Name of the operator.
        op: &'static str,
        /// Name of the domain that does not implement it.
        domain: &'static str,
    },
}

impl Diagnostic {
    /// Logs this diagnostic at the severity appropriate to its category.
    /// Does not abort; callers that need to abort on [`Diagnostic::Precondition`]
    /// should use [`abort_on_precondition`].
    pub fn emit(&self) {
        match self {
            Self::Precondition { op, detail } => {
                tracing::error!(op, detail, "precondition violation");
            }
            Self::ConcreteException { op, detail } => {
                tracing::debug!(op, detail, "absorbed concrete exception");
            }
            Self::UnsupportedOperator { op, domain } => {
                tracing::warn!(op, domain, "unsupported operator, returning top");
            }
        }
    }
}

/// Logs and aborts the process for a precondition violation.
///
/// # Panics
///
/// Always panics; this is the only sanctioned way a domain operator aborts.
pub fn abort_on_precondition(diagnostic: &Diagnostic) -> ! {
    diagnostic.emit();
    panic!("{diagnostic}");
}

/// Builds and aborts on a [`Diagnostic::Precondition`] in one call.
macro_rules! fail_precondition {
    ($op:expr, $($detail:tt)*) => {{
        let diagnostic = $crate::common::diagnostics::Diagnostic::Precondition {
            op: $op,
            detail: format!($($detail)*),
        };
        $crate::common::diagnostics::abort_on_precondition(&diagnostic)
    }};
}

pub(crate) use fail_precondition;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_operator_does_not_panic_on_emit() {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
        let diag = Diagnostic::UnsupportedOperator {
            op: "shl",
            domain: "Interval",
        };
        diag.emit();
    }

    #[test]
    fn display_text_names_the_operator() {
        let diag = Diagnostic::ConcreteException {
            op: "sdiv",
            detail: "division by zero".to_string(),
        };
        assert!(diag.to_string().contains("sdiv"));
    }

    #[test]
    #[should_panic(expected = "width mismatch")]
    fn fail_precondition_panics() {
        fail_precondition!("add", "width mismatch: {} vs {}", 32, 64);
    }
}
