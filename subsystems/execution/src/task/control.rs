//! # Task Control Block
//!
//! Per-context record owned by the kernel.

use super::{BlockReason, TaskInfo, TaskState};
use crate::future::slot::Slot;
use crate::scheduler::gate::Gate;
use crate::scheduler::Priority;
use crate::TaskId;
use core::fmt;
use std::sync::Arc;

/// Task flags
pub mod flags {
    use bitflags::bitflags;

    bitflags! {
        /// Task flags
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct TaskFlags: u32 {
            /// Registered by the bootstrap sequence
            const TOP_LEVEL = 1 << 0;
            /// Hosts a thread handle body
            const THREAD = 1 << 1;
            /// Reclaimed by the kernel as soon as the body returns
            const DETACHED = 1 << 2;
            /// Body ended in a panic
            const PANICKED = 1 << 3;
        }
    }
}

pub use flags::TaskFlags;

/// Teardown hook run after the body has returned
pub(crate) type ExitHook = Box<dyn FnOnce() + Send>;

/// Task control block
pub(crate) struct TaskControlBlock {
    pub(crate) id: TaskId,
    pub(crate) name: String,
    pub(crate) priority: Priority,
    pub(crate) stack_budget: usize,
    /// Bytes reserved from the heap budget, returned at termination
    pub(crate) heap_cost: usize,
    pub(crate) state: TaskState,
    pub(crate) block: Option<BlockReason>,
    pub(crate) flags: TaskFlags,
    pub(crate) parent: Option<TaskId>,
    pub(crate) gate: Arc<Gate>,
    /// Set when an event wake-up arrives before the context blocked
    pub(crate) wake_pending: bool,
    pub(crate) exit_hooks: Vec<ExitHook>,
    /// Completed after the exit hooks ran
    pub(crate) completion: Arc<Slot<()>>,
    pub(crate) run_ticks: u64,
    pub(crate) created_at: u64,
}

impl TaskControlBlock {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        id: TaskId,
        name: String,
        priority: Priority,
        stack_budget: usize,
        heap_cost: usize,
        flags: TaskFlags,
        parent: Option<TaskId>,
        created_at: u64,
    ) -> Self {
        Self {
            id,
            name,
            priority,
            stack_budget,
            heap_cost,
            state: TaskState::Created,
            block: None,
            flags,
            parent,
            gate: Arc::new(Gate::new()),
            wake_pending: false,
            exit_hooks: Vec::new(),
            completion: Arc::new(Slot::new()),
            run_ticks: 0,
            created_at,
        }
    }

    /// Move to `state`, checking the transition in debug builds
    pub(crate) fn set_state(&mut self, state: TaskState) {
        debug_assert!(
            self.state.can_become(state),
            "{}: invalid transition {:?} -> {:?}",
            self.name,
            self.state,
            state
        );
        self.state = state;
        if state != TaskState::Blocked {
            self.block = None;
        }
    }

    pub(crate) fn info(&self) -> TaskInfo {
        TaskInfo {
            id: self.id,
            name: self.name.clone(),
            priority: self.priority,
            state: self.state,
            stack_budget: self.stack_budget,
            flags: self.flags,
            parent: self.parent,
            run_ticks: self.run_ticks,
            created_at: self.created_at,
        }
    }
}

impl fmt::Debug for TaskControlBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskControlBlock")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("priority", &self.priority)
            .field("state", &self.state)
            .field("block", &self.block)
            .field("flags", &self.flags)
            .field("exit_hooks", &self.exit_hooks.len())
            .finish_non_exhaustive()
    }
}
