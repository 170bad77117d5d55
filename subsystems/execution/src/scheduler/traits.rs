//! # Scheduler Traits

use super::Priority;
use crate::TaskId;

/// Run queue trait
///
/// The ready-list discipline the dispatcher relies on: strict priority
/// across levels, FIFO within a level. [`super::queue::ReadyLists`] is the
/// kernel's implementation.
pub trait RunQueue: Send {
    /// Add a context at the tail of its priority level
    fn enqueue(&mut self, id: TaskId, priority: Priority);

    /// Remove and return the next context to run
    fn dequeue(&mut self) -> Option<TaskId>;

    /// Priority of the context [`RunQueue::dequeue`] would return
    fn highest_priority(&self) -> Option<Priority>;
}
