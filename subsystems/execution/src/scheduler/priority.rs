//! # Priority Management
//!
//! Priorities are small integers; a higher number runs first. Priority 0 is
//! the idle level. The upper bound is a kernel configuration value, so range
//! checks happen at registration, not here.

use core::fmt;

/// Execution context priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Priority(u8);

impl Priority {
    /// Create a priority
    pub const fn new(level: u8) -> Self {
        Self(level)
    }

    /// Get the raw level
    pub const fn level(self) -> u8 {
        self.0
    }
}

impl From<u8> for Priority {
    fn from(level: u8) -> Self {
        Self(level)
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
