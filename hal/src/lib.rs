//! # Kestrel HAL - Hardware Abstraction Layer
//!
//! The kernel consumes three external collaborators, each through a narrow
//! trait:
//!
//! - [`console::OutputSink`]: human-readable status output (serial port)
//! - [`gpio::DigitalOutput`]: a named digital output line (LED)
//! - [`rtc::RtcSource`]: battery-backed real-time clock
//!
//! None of them sits on the scheduling-critical path. Host implementations
//! live in [`host`] and double as test fakes.

#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]

pub mod console;
pub mod gpio;
pub mod rtc;

#[cfg(feature = "host")]
pub mod host;

use core::fmt;

pub use console::OutputSink;
pub use gpio::{DigitalOutput, Level};
pub use rtc::RtcSource;

/// Result type for HAL operations
pub type HalResult<T> = Result<T, HalError>;

/// Errors that can occur in HAL operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HalError {
    /// The operation is not supported by this device
    NotSupported,
    /// Invalid parameter provided
    InvalidParameter,
    /// Hardware reported an error
    HardwareError,
    /// Resource is not available
    ResourceBusy,
    /// Operation timed out
    Timeout,
    /// Feature not initialized
    NotInitialized,
}

impl fmt::Display for HalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            HalError::NotSupported => "operation not supported",
            HalError::InvalidParameter => "invalid parameter",
            HalError::HardwareError => "hardware error",
            HalError::ResourceBusy => "resource busy",
            HalError::Timeout => "operation timed out",
            HalError::NotInitialized => "device not initialized",
        };
        f.write_str(text)
    }
}

impl std::error::Error for HalError {}
