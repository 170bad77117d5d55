//! # Host Implementations
//!
//! Collaborators backed by the host operating system or by memory. Used by
//! the host profile and by tests across the workspace.

use crate::{DigitalOutput, HalError, HalResult, Level, OutputSink, RtcSource};
use core::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use spin::Mutex;
use std::io::Write;
use std::time::{SystemTime, UNIX_EPOCH};

// =============================================================================
// Console
// =============================================================================

/// Console on the host's standard output
#[derive(Debug, Default)]
pub struct StdoutSink;

impl StdoutSink {
    /// Create a new stdout sink
    pub const fn new() -> Self {
        Self
    }
}

impl OutputSink for StdoutSink {
    fn write(&self, text: &str) -> HalResult<()> {
        std::io::stdout()
            .lock()
            .write_all(text.as_bytes())
            .map_err(|_| HalError::HardwareError)
    }

    fn flush(&self) -> HalResult<()> {
        std::io::stdout().flush().map_err(|_| HalError::HardwareError)
    }
}

/// Console that captures everything in memory
#[derive(Debug, Default)]
pub struct BufferSink {
    buffer: Mutex<String>,
    flushes: AtomicU64,
}

impl BufferSink {
    /// Create an empty buffer sink
    pub const fn new() -> Self {
        Self {
            buffer: Mutex::new(String::new()),
            flushes: AtomicU64::new(0),
        }
    }

    /// Everything written so far
    pub fn contents(&self) -> String {
        self.buffer.lock().clone()
    }

    /// Written text split into lines, terminators stripped
    pub fn lines(&self) -> Vec<String> {
        self.buffer
            .lock()
            .lines()
            .map(|line| line.trim_end_matches('\r').to_string())
            .collect()
    }

    /// Number of flush calls
    pub fn flush_count(&self) -> u64 {
        self.flushes.load(Ordering::Relaxed)
    }
}

impl OutputSink for BufferSink {
    fn write(&self, text: &str) -> HalResult<()> {
        self.buffer.lock().push_str(text);
        Ok(())
    }

    fn flush(&self) -> HalResult<()> {
        self.flushes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

// =============================================================================
// GPIO
// =============================================================================

/// Output line that records every level it is driven to
#[derive(Debug)]
pub struct RecordingPin {
    name: String,
    history: Mutex<Vec<Level>>,
}

impl RecordingPin {
    /// Create a pin with the given line name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            history: Mutex::new(Vec::new()),
        }
    }

    /// Every level written, oldest first
    pub fn history(&self) -> Vec<Level> {
        self.history.lock().clone()
    }

    /// Last level written
    pub fn level(&self) -> Option<Level> {
        self.history.lock().last().copied()
    }

    /// Number of low-to-high or high-to-low changes
    pub fn transitions(&self) -> usize {
        self.history
            .lock()
            .windows(2)
            .filter(|pair| pair[0] != pair[1])
            .count()
    }
}

impl DigitalOutput for RecordingPin {
    fn name(&self) -> &str {
        &self.name
    }

    fn set(&self, level: Level) -> HalResult<()> {
        log::trace!("{} -> {:?}", self.name, level);
        self.history.lock().push(level);
        Ok(())
    }
}

/// Output line that only traces level changes
#[derive(Debug)]
pub struct LogPin {
    name: String,
    level: Mutex<Option<Level>>,
}

impl LogPin {
    /// Create a pin with the given line name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            level: Mutex::new(None),
        }
    }

    /// Last level written
    pub fn level(&self) -> Option<Level> {
        *self.level.lock()
    }
}

impl DigitalOutput for LogPin {
    fn name(&self) -> &str {
        &self.name
    }

    fn set(&self, level: Level) -> HalResult<()> {
        let previous = self.level.lock().replace(level);
        if previous != Some(level) {
            log::debug!("{} -> {:?}", self.name, level);
        }
        Ok(())
    }
}

// =============================================================================
// RTC
// =============================================================================

/// Software RTC with failure injection
#[derive(Debug)]
pub struct SoftRtc {
    epoch: AtomicU64,
    failing: AtomicBool,
}

impl SoftRtc {
    /// Create an RTC holding `epoch_seconds`
    pub const fn new(epoch_seconds: u64) -> Self {
        Self {
            epoch: AtomicU64::new(epoch_seconds),
            failing: AtomicBool::new(false),
        }
    }

    /// Create an RTC initialised from the host wall clock
    pub fn from_system_time() -> Self {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Self::new(now)
    }

    /// Make subsequent reads and writes fail with [`HalError::HardwareError`]
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl RtcSource for SoftRtc {
    fn read(&self) -> HalResult<u64> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(HalError::HardwareError);
        }
        Ok(self.epoch.load(Ordering::SeqCst))
    }

    fn set(&self, epoch_seconds: u64) -> HalResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(HalError::HardwareError);
        }
        self.epoch.store(epoch_seconds, Ordering::SeqCst);
        Ok(())
    }
}
