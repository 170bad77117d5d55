//! # Scheduler Queues
//!
//! Ready lists (one FIFO per priority level) and the delayed list ordered by
//! wake-up tick.

use super::traits::RunQueue;
use super::Priority;
use crate::TaskId;
use core::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, VecDeque};

/// Per-priority ready lists
///
/// Dequeue takes the head of the highest non-empty level, so equal
/// priorities are served in readiness order and re-enqueueing at the tail
/// gives round robin.
#[derive(Debug)]
pub struct ReadyLists {
    /// Lists indexed by priority level
    levels: Vec<VecDeque<TaskId>>,
}

impl ReadyLists {
    /// Create ready lists for `num_levels` priorities
    pub fn new(num_levels: usize) -> Self {
        Self {
            levels: (0..num_levels.max(1)).map(|_| VecDeque::new()).collect(),
        }
    }

    fn level_of(&self, priority: Priority) -> usize {
        usize::from(priority.level()).min(self.levels.len() - 1)
    }
}

impl RunQueue for ReadyLists {
    fn enqueue(&mut self, id: TaskId, priority: Priority) {
        let level = self.level_of(priority);
        self.levels[level].push_back(id);
    }

    fn dequeue(&mut self) -> Option<TaskId> {
        self.levels.iter_mut().rev().find_map(VecDeque::pop_front)
    }

    fn highest_priority(&self) -> Option<Priority> {
        self.levels
            .iter()
            .rposition(|l| !l.is_empty())
            .and_then(|level| u8::try_from(level).ok())
            .map(Priority::new)
    }
}

/// Entry in the delayed list
#[derive(Debug, Clone, Copy)]
struct DelayEntry {
    /// Tick at which the context becomes ready
    wake_tick: u64,
    /// Insertion order, breaks ties between equal wake ticks
    seq: u64,
    id: TaskId,
}

impl PartialEq for DelayEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for DelayEntry {}

impl PartialOrd for DelayEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DelayEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.wake_tick, self.seq).cmp(&(other.wake_tick, other.seq))
    }
}

/// Contexts sleeping until a tick
#[derive(Debug, Default)]
pub struct DelayQueue {
    heap: BinaryHeap<Reverse<DelayEntry>>,
    seq: u64,
}

impl DelayQueue {
    /// Create an empty delayed list
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep `id` until `wake_tick`
    pub fn push(&mut self, id: TaskId, wake_tick: u64) {
        self.seq += 1;
        self.heap.push(Reverse(DelayEntry {
            wake_tick,
            seq: self.seq,
            id,
        }));
    }

    /// Earliest wake-up tick
    pub fn next_wake(&self) -> Option<u64> {
        self.heap.peek().map(|Reverse(e)| e.wake_tick)
    }

    /// Remove and return the earliest context if it is due at `now`
    pub fn pop_due(&mut self, now: u64) -> Option<TaskId> {
        match self.heap.peek() {
            Some(Reverse(e)) if e.wake_tick <= now => self.heap.pop().map(|Reverse(e)| e.id),
            _ => None,
        }
    }
}
