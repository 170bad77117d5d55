//! # Kernel Configuration

use crate::{ExecError, ExecResult};
use core::time::Duration;
use static_assertions::const_assert;

/// Configuration for the kernel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelConfig {
    /// Timer tick frequency
    pub tick_rate_hz: u32,
    /// Number of priority levels; valid priorities are `0..max_priorities`
    pub max_priorities: u8,
    /// Maximum number of live execution contexts
    pub max_tasks: usize,
    /// Bytes available for context stacks and control blocks
    pub heap_capacity: usize,
    /// Bookkeeping cost charged per context on top of its stack
    pub task_overhead_bytes: usize,
    /// Smallest stack budget accepted at registration
    pub min_stack_bytes: usize,
    /// Stack budget of contexts created for threads and async futures
    pub thread_stack_bytes: usize,
    /// Rotate equal-priority contexts on every tick
    pub time_slicing: bool,
    /// Minimum host thread stack backing a context
    pub host_stack_floor: usize,
}

impl KernelConfig {
    /// Default tick rate: 1 kHz
    pub const DEFAULT_TICK_RATE_HZ: u32 = 1_000;
    /// Default priority levels
    pub const DEFAULT_MAX_PRIORITIES: u8 = 10;
    /// Default context table size
    pub const DEFAULT_MAX_TASKS: usize = 32;
    /// Default heap: 256 KiB
    pub const DEFAULT_HEAP_CAPACITY: usize = 256 * 1024;
    /// Control block size charged per context
    pub const DEFAULT_TASK_OVERHEAD: usize = 160;
    /// Minimum stack: 256 bytes
    pub const DEFAULT_MIN_STACK: usize = 256;
    /// Thread stack: 8 KiB
    pub const DEFAULT_THREAD_STACK: usize = 8 * 1024;
    /// Host threads get at least 256 KiB regardless of the modelled budget
    pub const DEFAULT_HOST_STACK_FLOOR: usize = 256 * 1024;

    /// Create default configuration
    pub fn new() -> Self {
        Self {
            tick_rate_hz: Self::DEFAULT_TICK_RATE_HZ,
            max_priorities: Self::DEFAULT_MAX_PRIORITIES,
            max_tasks: Self::DEFAULT_MAX_TASKS,
            heap_capacity: Self::DEFAULT_HEAP_CAPACITY,
            task_overhead_bytes: Self::DEFAULT_TASK_OVERHEAD,
            min_stack_bytes: Self::DEFAULT_MIN_STACK,
            thread_stack_bytes: Self::DEFAULT_THREAD_STACK,
            time_slicing: true,
            host_stack_floor: Self::DEFAULT_HOST_STACK_FLOOR,
        }
    }

    /// Create a small configuration (16 KiB heap, 8 contexts)
    pub fn minimal() -> Self {
        Self {
            max_tasks: 8,
            heap_capacity: 16 * 1024,
            thread_stack_bytes: 2 * 1024,
            ..Self::new()
        }
    }

    /// Configuration matching a Teensy 4.x build of the kernel
    pub fn teensy() -> Self {
        Self {
            max_tasks: 16,
            heap_capacity: 384 * 1024,
            ..Self::new()
        }
    }

    /// Highest valid priority
    pub fn max_priority(&self) -> u8 {
        self.max_priorities.saturating_sub(1)
    }

    /// Duration of one tick
    pub fn tick_period(&self) -> Duration {
        Duration::from_nanos(1_000_000_000 / u64::from(self.tick_rate_hz.max(1)))
    }

    /// Convert a duration to ticks, rounding up
    ///
    /// Rounding up means a delay never resumes earlier than requested.
    pub fn ticks_for(&self, duration: Duration) -> u64 {
        let rate = u128::from(self.tick_rate_hz.max(1));
        let ticks = (duration.as_nanos() * rate).div_ceil(1_000_000_000);
        u64::try_from(ticks).unwrap_or(u64::MAX)
    }

    /// Convert ticks to a duration
    pub fn duration_of(&self, ticks: u64) -> Duration {
        let nanos = u128::from(ticks) * 1_000_000_000 / u128::from(self.tick_rate_hz.max(1));
        Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
    }

    /// Heap cost of a context with the given stack budget
    pub fn task_cost(&self, stack_bytes: usize) -> usize {
        stack_bytes.saturating_add(self.task_overhead_bytes)
    }

    /// Check the configuration for internal consistency
    pub fn validate(&self) -> ExecResult<()> {
        if self.tick_rate_hz == 0 || self.tick_rate_hz > 1_000_000 {
            return Err(ExecError::InvalidArgument);
        }
        if self.max_priorities < 2 {
            return Err(ExecError::InvalidArgument);
        }
        if self.max_tasks == 0 {
            return Err(ExecError::InvalidArgument);
        }
        if self.thread_stack_bytes < self.min_stack_bytes {
            return Err(ExecError::InvalidArgument);
        }
        if self.task_cost(self.min_stack_bytes) > self.heap_capacity {
            return Err(ExecError::InvalidArgument);
        }
        Ok(())
    }
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self::new()
    }
}

const_assert!(KernelConfig::DEFAULT_MAX_PRIORITIES >= 2);
const_assert!(KernelConfig::DEFAULT_THREAD_STACK >= KernelConfig::DEFAULT_MIN_STACK);
const_assert!(KernelConfig::DEFAULT_HEAP_CAPACITY > KernelConfig::DEFAULT_THREAD_STACK);
const_assert!(1_000_000_000 % KernelConfig::DEFAULT_TICK_RATE_HZ == 0);
