//! # Kestrel Execution Subsystem
//!
//! The execution subsystem provides:
//! - A priority-preemptive kernel owning a fixed set of execution contexts
//! - Thread handles mapped onto on-demand execution contexts
//! - Futures, promises and packaged tasks carrying results between contexts
//! - Virtual tick time with tickless idle
//!
//! ## Key Principle
//!
//! There is no ambient kernel. A [`Kernel`] is created explicitly and every
//! task body receives a [`TaskContext`] naming the kernel and the running
//! context. All blocking operations take that context.
//!
//! ## Host port
//!
//! Each execution context runs on its own host thread, but the kernel hands
//! a single CPU token around so that exactly one context executes at any
//! moment. Switches happen only at the documented scheduling points.

#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]

pub mod clock;
pub mod config;
pub mod context;
pub mod fault;
pub mod future;
pub mod heap;
pub mod scheduler;
pub mod task;
pub mod thread;

#[cfg(test)]
mod tests;

use core::fmt;
use core::sync::atomic::{AtomicU64, Ordering};

pub use clock::SystemClock;
pub use config::KernelConfig;
pub use context::TaskContext;
pub use fault::{BlinkCode, Fault};
pub use future::{spawn_async, Future, Launch, PackagedTask, Promise};
pub use heap::HeapStats;
pub use scheduler::{HaltReason, Kernel, Priority, RunReport};
pub use task::{TaskBody, TaskInfo, TaskState};
pub use thread::{ThreadBuilder, ThreadHandle};

/// Unique identifier for execution contexts
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(u64);

impl TaskId {
    /// Allocate a new task ID
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Execution result type
pub type ExecResult<T> = Result<T, ExecError>;

/// Execution errors
///
/// Every variant is a synchronous, local contract violation reported at the
/// call that caused it. None of them is transient; there is nothing to
/// retry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecError {
    /// Heap budget or context table exhausted at registration
    ResourceExhausted,
    /// A thread tried to join itself
    DeadlockDetected,
    /// A thread handle was discarded without join or detach
    UnjoinedThread,
    /// The value of a deferred result was already retrieved
    ResultAlreadyConsumed,
    /// The value of a deferred result was already set
    ResultAlreadyProduced,
    /// The future of a promise or packaged task was already handed out
    FutureAlreadyRetrieved,
    /// The producer went away without ever setting a value
    BrokenPromise,
    /// The producer panicked; carries the panic message
    ProducerPanicked(String),
    /// A context with this name is already registered
    AlreadyExists,
    /// Priority outside `0..max_priorities`
    InvalidPriority,
    /// Invalid argument (stack budget, configuration value)
    InvalidArgument,
    /// No context with this ID
    TaskNotFound,
    /// Top-level registration attempted after the scheduler started
    SchedulerStarted,
    /// The scheduler was already started
    AlreadyStarted,
}

impl fmt::Display for ExecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecError::ResourceExhausted => f.write_str("resources exhausted"),
            ExecError::DeadlockDetected => f.write_str("thread attempted to join itself"),
            ExecError::UnjoinedThread => f.write_str("thread handle dropped without join or detach"),
            ExecError::ResultAlreadyConsumed => f.write_str("result already consumed"),
            ExecError::ResultAlreadyProduced => f.write_str("result already produced"),
            ExecError::FutureAlreadyRetrieved => f.write_str("future already retrieved"),
            ExecError::BrokenPromise => f.write_str("broken promise"),
            ExecError::ProducerPanicked(message) => write!(f, "producer panicked: {message}"),
            ExecError::AlreadyExists => f.write_str("context name already registered"),
            ExecError::InvalidPriority => f.write_str("priority out of range"),
            ExecError::InvalidArgument => f.write_str("invalid argument"),
            ExecError::TaskNotFound => f.write_str("no such context"),
            ExecError::SchedulerStarted => f.write_str("scheduler already running"),
            ExecError::AlreadyStarted => f.write_str("scheduler already started"),
        }
    }
}

impl std::error::Error for ExecError {}
