//! # Digital Output
//!
//! A single named output line.

use crate::HalResult;

/// Logic level of a digital line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Level {
    /// Driven low
    Low,
    /// Driven high
    High,
}

impl Level {
    /// The opposite level
    pub const fn toggled(self) -> Self {
        match self {
            Level::Low => Level::High,
            Level::High => Level::Low,
        }
    }
}

impl From<bool> for Level {
    fn from(high: bool) -> Self {
        if high {
            Level::High
        } else {
            Level::Low
        }
    }
}

/// Digital output line
pub trait DigitalOutput: Send + Sync {
    /// Line name, e.g. `LED_BUILTIN`
    fn name(&self) -> &str;

    /// Drive the line to `level`
    fn set(&self, level: Level) -> HalResult<()>;
}
