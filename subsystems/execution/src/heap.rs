//! # Context Heap Accounting
//!
//! Stacks and control blocks are carved out of a fixed heap. The budget is
//! bookkeeping only: nothing here allocates, but registration fails exactly
//! where the target's allocator would.

use crate::{ExecError, ExecResult};

/// Snapshot of heap usage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HeapStats {
    /// Total bytes available
    pub capacity: usize,
    /// Bytes currently reserved
    pub used: usize,
    /// Largest `used` ever observed
    pub high_water: usize,
    /// Live reservations
    pub allocations: usize,
    /// Reservations refused
    pub failed: usize,
}

impl HeapStats {
    /// Bytes still available
    pub fn free(&self) -> usize {
        self.capacity - self.used
    }
}

/// Fixed-capacity heap budget
#[derive(Debug)]
pub(crate) struct HeapBudget {
    stats: HeapStats,
}

impl HeapBudget {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            stats: HeapStats {
                capacity,
                ..HeapStats::default()
            },
        }
    }

    /// Reserve `bytes`, failing with `ResourceExhausted` when they do not fit
    pub(crate) fn reserve(&mut self, bytes: usize) -> ExecResult<()> {
        if bytes > self.stats.free() {
            self.stats.failed += 1;
            log::warn!(
                "heap: cannot reserve {} bytes ({} of {} free)",
                bytes,
                self.stats.free(),
                self.stats.capacity
            );
            return Err(ExecError::ResourceExhausted);
        }
        self.stats.used += bytes;
        self.stats.allocations += 1;
        self.stats.high_water = self.stats.high_water.max(self.stats.used);
        Ok(())
    }

    /// Return a reservation made with [`HeapBudget::reserve`]
    pub(crate) fn release(&mut self, bytes: usize) {
        debug_assert!(bytes <= self.stats.used);
        self.stats.used = self.stats.used.saturating_sub(bytes);
        self.stats.allocations = self.stats.allocations.saturating_sub(1);
    }

    pub(crate) fn stats(&self) -> HeapStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserve_and_release() {
        let mut heap = HeapBudget::new(1_000);
        heap.reserve(600).unwrap();
        heap.reserve(300).unwrap();
        assert_eq!(heap.stats().free(), 100);
        assert_eq!(heap.stats().allocations, 2);

        heap.release(600);
        assert_eq!(heap.stats().used, 300);
        assert_eq!(heap.stats().high_water, 900);
    }

    #[test]
    fn test_exhaustion() {
        let mut heap = HeapBudget::new(512);
        heap.reserve(500).unwrap();
        assert_eq!(heap.reserve(13), Err(ExecError::ResourceExhausted));
        assert_eq!(heap.stats().failed, 1);
        heap.reserve(12).unwrap();
        assert_eq!(heap.stats().free(), 0);
    }
}
