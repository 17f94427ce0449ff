//! Process-wide, immutable thresholds for the numeric domains.
//!
//! Mirrors the hierarchical `Deserialize`-with-defaults pattern used
//! elsewhere for simulator configuration: each field has a private default
//! constant, `Default` and `Deserialize` are kept in sync by construction,
//! and the resulting value is threaded through constructors rather than
//! read from a mutable global.

use serde::Deserialize;

mod defaults {
    pub const SET_THRESHOLD: usize = 40;
    pub const WIDENING_THRESHOLD: u32 = 3;
}

/// Immutable configuration shared by every abstract value via the
/// [`Environment`](super::env::Environment).
///
/// ```
/// use numeric_domains::common::config::Config;
///
/// let cfg = Config::default();
/// assert_eq!(cfg.set_threshold, 40);
/// assert_eq!(cfg.widening_threshold, 3);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Config {
    /// Maximum cardinality of an [`IntegerSet`](crate::domain::set::IntegerSet)
    /// before it collapses to top.
    #[serde(default = "default_set_threshold")]
    pub set_threshold: usize,

    /// Number of `join`s at the same widening point before the next `join`
    /// is replaced by widening.
    #[serde(default = "default_widening_threshold")]
    pub widening_threshold: u32,
}

const fn default_set_threshold() -> usize {
    defaults::SET_THRESHOLD
}

const fn default_widening_threshold() -> u32 {
    defaults::WIDENING_THRESHOLD
}

impl Default for Config {
    fn default() -> Self {
        Self {
            set_threshold: defaults::SET_THRESHOLD,
            widening_threshold: defaults::WIDENING_THRESHOLD,
        }
    }
}

impl Config {
    /// Parses a `Config` from a JSON document, filling any missing fields
    /// from [`Config::default`].
    ///
    /// # Errors
    ///
    /// Returns the underlying `serde_json` error on malformed input. This is
    /// an ordinary parse failure, not one of the diagnostic categories the
    /// domains themselves raise.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_documented_values() {
        let cfg = Config::default();
        assert_eq!(cfg.set_threshold, 40);
        assert_eq!(cfg.widening_threshold, 3);
    }

    #[test]
    fn partial_json_fills_remaining_fields_from_default() {
        let cfg = Config::from_json(r#"{"set_threshold": 12}"#).unwrap();
        assert_eq!(cfg.set_threshold, 12);
        assert_eq!(cfg.widening_threshold, 3);
    }

    #[test]
    fn empty_json_object_is_full_default() {
        let cfg = Config::from_json("{}").unwrap();
        assert_eq!(cfg, Config::default());
    }
}
