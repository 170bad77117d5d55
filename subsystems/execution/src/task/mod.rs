//! # Execution Contexts
//!
//! Task bodies, task state and the kernel-side control block.

pub(crate) mod control;
pub(crate) mod registry;
pub mod states;

pub use control::TaskFlags;
pub use states::{BlockReason, TaskState};

use crate::scheduler::Priority;
use crate::{TaskContext, TaskId};
use core::fmt;
use core::time::Duration;

/// Body of an execution context
///
/// Long-running contexts never return on their own; making the shape
/// explicit lets the kernel and tests reason about them.
pub enum TaskBody {
    /// Run to completion, then terminate
    RunOnce(Box<dyn FnOnce(&TaskContext) + Send>),
    /// Run `step`, sleep for `period`, repeat forever
    Periodic {
        /// Delay after every step
        period: Duration,
        /// Work done on each activation
        step: Box<dyn FnMut(&TaskContext) + Send>,
    },
    /// Run `setup`, then suspend forever
    ///
    /// Used by contexts that only host nested threads.
    ParkForever(Box<dyn FnOnce(&TaskContext) + Send>),
}

impl TaskBody {
    /// Body that runs once
    pub fn run_once(f: impl FnOnce(&TaskContext) + Send + 'static) -> Self {
        TaskBody::RunOnce(Box::new(f))
    }

    /// Body that repeats `step` every `period`
    pub fn periodic(period: Duration, step: impl FnMut(&TaskContext) + Send + 'static) -> Self {
        TaskBody::Periodic {
            period,
            step: Box::new(step),
        }
    }

    /// Body that runs `setup` and parks
    pub fn park_forever(setup: impl FnOnce(&TaskContext) + Send + 'static) -> Self {
        TaskBody::ParkForever(Box::new(setup))
    }

    /// Execute the body on the calling context
    pub(crate) fn run(self, ctx: &TaskContext) {
        match self {
            TaskBody::RunOnce(f) => f(ctx),
            TaskBody::Periodic { period, mut step } => loop {
                step(ctx);
                ctx.sleep_for(period);
            },
            TaskBody::ParkForever(setup) => {
                setup(ctx);
                ctx.suspend_forever()
            }
        }
    }

    /// Short name of the variant
    pub fn kind(&self) -> &'static str {
        match self {
            TaskBody::RunOnce(_) => "run-once",
            TaskBody::Periodic { .. } => "periodic",
            TaskBody::ParkForever(_) => "park-forever",
        }
    }
}

impl fmt::Debug for TaskBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskBody::Periodic { period, .. } => {
                f.debug_struct("Periodic").field("period", period).finish_non_exhaustive()
            }
            other => f.write_str(other.kind()),
        }
    }
}

/// Snapshot of one execution context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskInfo {
    /// Context ID
    pub id: TaskId,
    /// Context name
    pub name: String,
    /// Current priority
    pub priority: Priority,
    /// Current state
    pub state: TaskState,
    /// Stack budget in bytes
    pub stack_budget: usize,
    /// Flags
    pub flags: TaskFlags,
    /// Context that spawned this one
    pub parent: Option<TaskId>,
    /// Ticks executed while holding the CPU
    pub run_ticks: u64,
    /// Tick at registration
    pub created_at: u64,
}
