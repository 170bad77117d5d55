//! # Console Output
//!
//! Byte-oriented status output, typically a UART or USB serial port.

use crate::HalResult;

/// Output sink for human-readable text
///
/// Writes may be buffered; [`OutputSink::flush`] blocks until everything
/// written so far has left the device.
pub trait OutputSink: Send + Sync {
    /// Write text without a line terminator
    fn write(&self, text: &str) -> HalResult<()>;

    /// Drain any buffered output
    fn flush(&self) -> HalResult<()>;

    /// Write text followed by `\r\n`
    fn write_line(&self, text: &str) -> HalResult<()> {
        self.write(text)?;
        self.write("\r\n")
    }
}
