//! # Task States
//!
//! Execution context state machine.

/// Execution context state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskState {
    /// Registered, host thread not yet dispatched
    Created,
    /// Waiting in a ready list
    Ready,
    /// Holds the CPU
    Running,
    /// Waiting for a tick or an event
    Blocked,
    /// Parked until explicitly resumed (never, in practice)
    Suspended,
    /// Body returned; waiting to be reclaimed
    Terminated,
}

/// Reason for blocking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockReason {
    /// Sleeping until a tick
    Delay,
    /// Waiting for a join or a deferred result
    Event,
}

impl TaskState {
    /// Check if the body has finished
    pub fn is_terminated(&self) -> bool {
        matches!(self, TaskState::Terminated)
    }

    /// Valid transitions from this state
    pub fn valid_transitions(&self) -> &'static [TaskState] {
        match self {
            TaskState::Created => &[TaskState::Ready],
            TaskState::Ready => &[TaskState::Running],
            TaskState::Running => &[
                TaskState::Ready,
                TaskState::Blocked,
                TaskState::Suspended,
                TaskState::Terminated,
            ],
            TaskState::Blocked => &[TaskState::Ready],
            TaskState::Suspended => &[TaskState::Ready],
            TaskState::Terminated => &[],
        }
    }

    /// Check a transition against [`TaskState::valid_transitions`]
    pub fn can_become(&self, next: TaskState) -> bool {
        *self == next || self.valid_transitions().contains(&next)
    }
}

impl Default for TaskState {
    fn default() -> Self {
        TaskState::Created
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminated_is_final() {
        assert!(TaskState::Terminated.valid_transitions().is_empty());
        assert!(!TaskState::Terminated.can_become(TaskState::Ready));
        assert!(TaskState::Running.can_become(TaskState::Terminated));
        assert!(!TaskState::Blocked.can_become(TaskState::Running));
    }
}
