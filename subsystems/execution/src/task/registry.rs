//! # Task Registry
//!
//! All live execution contexts of one kernel, by ID and by name.

use super::control::TaskControlBlock;
use super::TaskInfo;
use crate::{ExecError, ExecResult, TaskId};
use std::collections::BTreeMap;

/// Task registry
#[derive(Debug, Default)]
pub(crate) struct TaskRegistry {
    /// All contexts by ID
    tasks: BTreeMap<TaskId, TaskControlBlock>,
    /// Name index; names are unique among live contexts
    by_name: BTreeMap<String, TaskId>,
}

impl TaskRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Register a new context
    pub(crate) fn insert(&mut self, tcb: TaskControlBlock) -> ExecResult<()> {
        if self.tasks.contains_key(&tcb.id) || self.by_name.contains_key(&tcb.name) {
            return Err(ExecError::AlreadyExists);
        }
        self.by_name.insert(tcb.name.clone(), tcb.id);
        self.tasks.insert(tcb.id, tcb);
        Ok(())
    }

    /// Unregister a context
    pub(crate) fn remove(&mut self, id: TaskId) -> ExecResult<TaskControlBlock> {
        let tcb = self.tasks.remove(&id).ok_or(ExecError::TaskNotFound)?;
        self.by_name.remove(&tcb.name);
        Ok(tcb)
    }

    pub(crate) fn contains_name(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub(crate) fn get(&self, id: TaskId) -> Option<&TaskControlBlock> {
        self.tasks.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: TaskId) -> Option<&mut TaskControlBlock> {
        self.tasks.get_mut(&id)
    }

    pub(crate) fn by_name(&self, name: &str) -> Option<&TaskControlBlock> {
        self.by_name.get(name).and_then(|id| self.tasks.get(id))
    }

    pub(crate) fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Snapshot of every context, in creation order
    pub(crate) fn snapshot(&self) -> Vec<TaskInfo> {
        self.tasks.values().map(TaskControlBlock::info).collect()
    }
}
