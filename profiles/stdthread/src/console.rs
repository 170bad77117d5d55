//! # Serial Console
//!
//! Line-oriented console on top of an output sink, the `log` backend that
//! writes through it, and the wall-clock printout.

use chrono::{DateTime, Utc};
use kestrel_execution::Kernel;
use kestrel_hal::OutputSink;
use core::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Serial console
///
/// Writes never fail from the caller's point of view; lost writes are
/// counted.
#[derive(Clone)]
pub struct Console {
    sink: Arc<dyn OutputSink>,
    lost: Arc<AtomicU64>,
}

impl Console {
    /// Create a console writing to `sink`
    pub fn new(sink: Arc<dyn OutputSink>) -> Self {
        Self {
            sink,
            lost: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Write `text` without a terminator
    pub fn print(&self, text: &str) {
        if self.sink.write(text).is_err() {
            self.lost.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Write `text` followed by CR LF
    pub fn println(&self, text: &str) {
        if self.sink.write_line(text).is_err() {
            self.lost.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Drain buffered output
    pub fn flush(&self) {
        if self.sink.flush().is_err() {
            self.lost.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Writes that did not reach the sink
    pub fn lost_writes(&self) -> u64 {
        self.lost.load(Ordering::Relaxed)
    }
}

impl core::fmt::Debug for Console {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Console").field("lost", &self.lost_writes()).finish()
    }
}

/// Format seconds since the epoch the way the demo prints them
pub fn format_time(epoch: u64) -> Option<String> {
    let secs = i64::try_from(epoch).ok()?;
    let time = DateTime::<Utc>::from_timestamp(secs, 0)?;
    Some(time.format("%c UTC").to_string())
}

/// Print the current wall-clock time
///
/// Returns `false`, printing nothing, while the clock is unsynchronised.
pub fn print_time(console: &Console, kernel: &Kernel) -> bool {
    match kernel.epoch_seconds().and_then(format_time) {
        Some(text) => {
            console.println(&text);
            true
        }
        None => false,
    }
}

/// `log` backend writing to the console
#[derive(Debug)]
pub struct SinkLogger {
    console: Console,
    level: log::LevelFilter,
}

impl SinkLogger {
    /// Create a logger passing records up to `level`
    pub fn new(console: Console, level: log::LevelFilter) -> Self {
        Self { console, level }
    }

    /// Install as the global logger
    ///
    /// Fails if another logger is already installed.
    pub fn install(self) -> Result<(), log::SetLoggerError> {
        let level = self.level;
        log::set_logger(Box::leak(Box::new(self)))?;
        log::set_max_level(level);
        Ok(())
    }
}

impl log::Log for SinkLogger {
    fn enabled(&self, metadata: &log::Metadata<'_>) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &log::Record<'_>) {
        if self.enabled(record.metadata()) {
            self.console
                .println(&format!("[{:<5} {}] {}", record.level(), record.target(), record.args()));
        }
    }

    fn flush(&self) {
        self.console.flush();
    }
}
