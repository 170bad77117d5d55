//! # Real-Time Clock
//!
//! Battery-backed wall clock with one-second resolution.

use crate::HalResult;

/// Real-time clock source
///
/// Reads can fail (no battery, oscillator not running); callers treat that
/// as a degraded but non-fatal condition.
pub trait RtcSource: Send + Sync {
    /// Current wall-clock time in seconds since the Unix epoch
    fn read(&self) -> HalResult<u64>;

    /// Set the wall-clock time in seconds since the Unix epoch
    fn set(&self, epoch_seconds: u64) -> HalResult<()>;
}
