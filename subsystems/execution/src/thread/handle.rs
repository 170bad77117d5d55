//! # Thread Handle
//!
//! A joinable handle to a thread body running in its own execution
//! context.

use crate::future::slot::Slot;
use crate::scheduler::{Kernel, Priority, TaskSpec};
use crate::task::control::TaskFlags;
use crate::task::TaskBody;
use crate::{ExecError, ExecResult, Fault, TaskContext, TaskId};
use std::sync::Arc;

/// Thread configuration
///
/// Unset fields fall back to a `thread-<n>` name, the spawning context's
/// priority and the configured default thread stack.
#[derive(Debug, Clone, Default)]
pub struct ThreadBuilder {
    name: Option<String>,
    priority: Option<Priority>,
    stack_size: Option<usize>,
}

impl ThreadBuilder {
    /// Create a builder with all defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the context name
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the priority
    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Set the stack budget in bytes
    pub fn stack_size(mut self, bytes: usize) -> Self {
        self.stack_size = Some(bytes);
        self
    }

    /// Spawn `f` as a new thread of the kernel running `ctx`
    pub fn spawn<F>(self, ctx: &TaskContext, f: F) -> ExecResult<ThreadHandle>
    where
        F: FnOnce(&TaskContext) + Send + 'static,
    {
        let kernel = ctx.kernel().clone();
        let name = self.name.unwrap_or_else(|| kernel.next_thread_name());
        let priority = self.priority.unwrap_or_else(|| ctx.priority());
        let stack_budget = self.stack_size.unwrap_or(kernel.config().thread_stack_bytes);

        let task = kernel.create_task(
            TaskSpec {
                name: name.clone(),
                priority,
                stack_budget,
                body: TaskBody::run_once(f),
                flags: TaskFlags::THREAD,
            },
            Some(ctx.id()),
        )?;
        let completion = kernel.completion_of(task)?;
        Ok(ThreadHandle {
            kernel,
            task,
            name,
            completion,
            released: false,
        })
    }
}

/// Owned handle to a running thread
///
/// Exactly one of [`ThreadHandle::join`] or [`ThreadHandle::detach`] is
/// expected. Dropping a joinable handle records an `UnjoinedThread` fault
/// and detaches the thread.
#[derive(Debug)]
pub struct ThreadHandle {
    kernel: Kernel,
    task: TaskId,
    name: String,
    completion: Arc<Slot<()>>,
    released: bool,
}

impl ThreadHandle {
    /// Spawn `f` with default settings
    pub fn spawn<F>(ctx: &TaskContext, f: F) -> ExecResult<Self>
    where
        F: FnOnce(&TaskContext) + Send + 'static,
    {
        ThreadBuilder::new().spawn(ctx, f)
    }

    /// Spawn `f` with explicit settings
    pub fn spawn_with<F>(ctx: &TaskContext, builder: ThreadBuilder, f: F) -> ExecResult<Self>
    where
        F: FnOnce(&TaskContext) + Send + 'static,
    {
        builder.spawn(ctx, f)
    }

    /// Context ID of the thread
    pub fn id(&self) -> TaskId {
        self.task
    }

    /// Context name of the thread
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Check if the body has returned
    pub fn is_finished(&self) -> bool {
        self.completion.is_ready()
    }

    /// Block `ctx` until the thread body has returned
    ///
    /// Returns immediately if it already has. A body that panicked is
    /// reported as `ProducerPanicked`. Joining from the thread itself fails
    /// with `DeadlockDetected` and detaches the thread.
    pub fn join(mut self, ctx: &TaskContext) -> ExecResult<()> {
        self.released = true;
        if ctx.id() == self.task {
            log::error!("thread '{}' attempted to join itself", self.name);
            self.kernel.detach(self.task);
            return Err(ExecError::DeadlockDetected);
        }
        let joined = self.completion.get(ctx);
        self.kernel.reap(self.task);
        joined
    }

    /// Let the thread run on and reclaim itself when done
    pub fn detach(mut self) {
        self.released = true;
        self.kernel.detach(self.task);
    }
}

impl Drop for ThreadHandle {
    fn drop(&mut self) {
        if !self.released {
            log::error!("thread '{}' ({}) dropped while joinable", self.name, self.task);
            self.kernel.record_fault(Fault::UnjoinedThread { task: self.task });
            self.kernel.detach(self.task);
        }
    }
}
