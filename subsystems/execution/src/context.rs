//! # Task Context
//!
//! Handle passed to every task body. It names the kernel and the running
//! execution context, and is the only way to reach a scheduling point.

use crate::scheduler::{Disposition, Kernel, Priority, TaskSpec};
use crate::task::control::TaskFlags;
use crate::task::TaskBody;
use crate::{ExecResult, TaskId};
use core::fmt;
use core::marker::PhantomData;
use core::time::Duration;

/// The running execution context
///
/// Not `Send`: a context is only meaningful on the host thread backing it.
pub struct TaskContext {
    kernel: Kernel,
    id: TaskId,
    _not_send: PhantomData<*const ()>,
}

impl TaskContext {
    pub(crate) fn new(kernel: Kernel, id: TaskId) -> Self {
        Self {
            kernel,
            id,
            _not_send: PhantomData,
        }
    }

    /// ID of the running context
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Kernel running this context
    pub fn kernel(&self) -> &Kernel {
        &self.kernel
    }

    /// Name of the running context
    pub fn name(&self) -> String {
        self.kernel.task_info(self.id).map(|t| t.name).unwrap_or_default()
    }

    /// Current priority
    pub fn priority(&self) -> Priority {
        self.kernel.priority_of(self.id).unwrap_or_default()
    }

    /// Change the own priority; takes effect immediately
    pub fn set_priority(&self, priority: Priority) -> ExecResult<()> {
        self.kernel.set_priority(self.id, priority)
    }

    /// Current tick count
    pub fn now(&self) -> u64 {
        self.kernel.tick_count()
    }

    /// Virtual time since power-on
    pub fn uptime(&self) -> Duration {
        self.kernel.uptime()
    }

    /// Give up the CPU for at least `duration`
    ///
    /// The delay is rounded up to whole ticks. A zero delay is a plain
    /// yield: equal-priority contexts get to run, lower ones do not.
    pub fn yield_for(&self, duration: Duration) {
        let ticks = self.kernel.config().ticks_for(duration);
        self.kernel.reschedule(self.id, Disposition::Delay(ticks));
    }

    /// Same as [`TaskContext::yield_for`]
    pub fn sleep_for(&self, duration: Duration) {
        self.yield_for(duration);
    }

    /// Move to the tail of the own priority level
    pub fn yield_now(&self) {
        self.kernel.reschedule(self.id, Disposition::Yield);
    }

    /// Keep the CPU busy for `duration`
    ///
    /// Virtual time only advances while a context sleeps or works, so this
    /// is how a body models computation. Every tick is a preemption point.
    pub fn work_for(&self, duration: Duration) {
        for _ in 0..self.kernel.config().ticks_for(duration) {
            self.kernel.reschedule(self.id, Disposition::Tick);
        }
    }

    /// Suspend the running context forever
    pub fn suspend_forever(&self) -> ! {
        log::debug!("{} suspends forever", self.id);
        loop {
            self.kernel.reschedule(self.id, Disposition::Suspend);
        }
    }

    /// Run `hook` after the body has returned, before joiners are released
    pub fn on_exit(&self, hook: impl FnOnce() + Send + 'static) {
        self.kernel.add_exit_hook(self.id, Box::new(hook));
    }

    /// Register a named, detached execution context from a running one
    ///
    /// The new context is reclaimed when its body returns. If it outranks
    /// the caller it runs before this returns.
    pub fn spawn_task(
        &self,
        name: &str,
        priority: Priority,
        stack_budget: usize,
        body: TaskBody,
    ) -> ExecResult<TaskId> {
        self.kernel.create_task(
            TaskSpec {
                name: name.to_string(),
                priority,
                stack_budget,
                body,
                flags: TaskFlags::DETACHED,
            },
            Some(self.id),
        )
    }

    /// Wait for an event wake-up
    ///
    /// Returns at once if a wake-up arrived since the last block.
    pub(crate) fn block(&self) {
        self.kernel.reschedule(self.id, Disposition::Block);
    }

    /// Token that wakes this context from [`TaskContext::block`]
    pub(crate) fn waiter(&self) -> Waiter {
        Waiter {
            kernel: self.kernel.clone(),
            task: self.id,
        }
    }
}

impl fmt::Debug for TaskContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskContext").field("id", &self.id).finish_non_exhaustive()
    }
}

/// A blocked context waiting for an event
pub(crate) struct Waiter {
    kernel: Kernel,
    task: TaskId,
}

impl Waiter {
    /// Make the waiting context ready again
    pub(crate) fn wake(self) {
        self.kernel.unblock(self.task);
    }
}
