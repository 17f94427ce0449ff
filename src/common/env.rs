//! The process-wide context every abstract value is built and operated
//! against: target pointer width, address space, and the shared
//! [`Config`](super::config::Config). Created once, referenced (never
//! owned) by every abstract value.

use super::config::Config;

/// Shared, read-only context for the analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Environment {
    /// Bit width of a target pointer (e.g. 64 for a 64-bit target).
    pointer_width: u32,
    /// Number of distinct address spaces the target's IR distinguishes.
    address_spaces: u32,
    /// Shared thresholds (set size, widening count).
    config: Config,
}

impl Environment {
    /// Builds an environment for a target with the given pointer width and
    /// address-space count, using the given configuration.
    #[must_use]
    pub const fn new(pointer_width: u32, address_spaces: u32, config: Config) -> Self {
        Self {
            pointer_width,
            address_spaces,
            config,
        }
    }

    /// Builds an environment for a typical 64-bit target with default
    /// configuration.
    #[must_use]
    pub fn host64() -> Self {
        Self::new(64, 1, Config::default())
    }

    /// The target's pointer width in bits.
    #[must_use]
    pub const fn pointer_width(&self) -> u32 {
        self.pointer_width
    }

    /// The number of address spaces the target's IR distinguishes.
    #[must_use]
    pub const fn address_spaces(&self) -> u32 {
        self.address_spaces
    }

    /// The shared configuration (set-size and widening thresholds).
    #[must_use]
    pub const fn config(&self) -> Config {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host64_has_sane_defaults() {
        let env = Environment::host64();
        assert_eq!(env.pointer_width(), 64);
        assert_eq!(env.config(), Config::default());
    }
}
