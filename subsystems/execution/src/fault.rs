//! # Faults
//!
//! Failures that have no caller to return to: a discarded joinable thread
//! handle, a panicking task body. They are logged and appended to the
//! kernel fault log. Fatal errors on the bootstrap path are signalled with
//! an LED blink code.

use crate::{ExecError, TaskId};
use core::any::Any;
use core::fmt;
use core::time::Duration;
use kestrel_hal::{DigitalOutput, HalResult, Level};

/// Fault recorded by the kernel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    /// A joinable thread handle was dropped
    UnjoinedThread {
        /// Context behind the handle
        task: TaskId,
    },
    /// A task body panicked
    TaskPanicked {
        /// Context whose body panicked
        task: TaskId,
        /// Panic message
        message: String,
    },
}

impl Fault {
    /// Context the fault belongs to
    pub fn task(&self) -> TaskId {
        match self {
            Fault::UnjoinedThread { task } | Fault::TaskPanicked { task, .. } => *task,
        }
    }

    /// Error equivalent of the fault
    pub fn error(&self) -> ExecError {
        match self {
            Fault::UnjoinedThread { .. } => ExecError::UnjoinedThread,
            Fault::TaskPanicked { message, .. } => ExecError::ProducerPanicked(message.clone()),
        }
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fault::UnjoinedThread { task } => write!(f, "thread {} dropped while joinable", task),
            Fault::TaskPanicked { task, message } => write!(f, "context {} panicked: {}", task, message),
        }
    }
}

/// Extract the message from a panic payload
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        String::from("non-string panic payload")
    }
}

/// LED error blink code
///
/// `pulses` short flashes followed by a long pause, repeated forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlinkCode {
    /// Flashes per cycle
    pub pulses: u8,
}

impl BlinkCode {
    /// LED on time of one flash
    pub const PULSE: Duration = Duration::from_millis(200);
    /// LED off time between flashes
    pub const GAP: Duration = Duration::from_millis(200);
    /// Pause after the last flash of a cycle
    pub const PAUSE: Duration = Duration::from_secs(2);

    /// Create a code with the given number of flashes
    pub const fn new(pulses: u8) -> Self {
        Self { pulses }
    }

    /// One cycle as (level, hold time) steps
    pub fn pattern(&self) -> Vec<(Level, Duration)> {
        let mut steps = Vec::with_capacity(usize::from(self.pulses) * 2);
        for _ in 0..self.pulses {
            steps.push((Level::High, Self::PULSE));
            steps.push((Level::Low, Self::GAP));
        }
        if let Some(last) = steps.last_mut() {
            last.1 = Self::PAUSE;
        }
        steps
    }

    /// Total length of one cycle
    pub fn cycle_time(&self) -> Duration {
        self.pattern().iter().map(|&(_, hold)| hold).sum()
    }

    /// Play one cycle on `pin`, holding each step with `delay`
    pub fn play(&self, pin: &dyn DigitalOutput, mut delay: impl FnMut(Duration)) -> HalResult<()> {
        for (level, hold) in self.pattern() {
            pin.set(level)?;
            delay(hold);
        }
        Ok(())
    }
}

impl ExecError {
    /// Blink code signalling this error on the fatal path
    pub fn blink_code(&self) -> BlinkCode {
        let pulses = match self {
            ExecError::ResourceExhausted => 2,
            ExecError::DeadlockDetected => 3,
            ExecError::UnjoinedThread => 4,
            ExecError::ResultAlreadyConsumed
            | ExecError::ResultAlreadyProduced
            | ExecError::FutureAlreadyRetrieved => 5,
            ExecError::BrokenPromise | ExecError::ProducerPanicked(_) => 6,
            ExecError::AlreadyExists
            | ExecError::InvalidPriority
            | ExecError::InvalidArgument
            | ExecError::TaskNotFound
            | ExecError::SchedulerStarted
            | ExecError::AlreadyStarted => 1,
        };
        BlinkCode::new(pulses)
    }
}
