//! # Scheduler Metrics
//!
//! Event counters bumped by the dispatcher while it holds the kernel lock,
//! readable from anywhere without it.

use core::fmt;
use core::sync::atomic::{AtomicU64, Ordering};

/// Dispatcher event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Counter {
    /// The CPU moved to a different context
    ContextSwitch,
    /// A tick executed by a working context
    BusyTick,
    /// A tick skipped while nothing was ready
    IdleTick,
    /// Delay, yield or block
    Yield,
    /// Displaced by a higher-priority context
    Preemption,
    /// Rotated out by an equal-priority context at a tick
    TimeSlice,
}

impl Counter {
    /// Every counter, in report order
    pub const ALL: [Counter; 6] = [
        Counter::ContextSwitch,
        Counter::BusyTick,
        Counter::IdleTick,
        Counter::Yield,
        Counter::Preemption,
        Counter::TimeSlice,
    ];

    const fn index(self) -> usize {
        self as usize
    }

    /// Short label used in reports
    pub fn label(self) -> &'static str {
        match self {
            Counter::ContextSwitch => "switches",
            Counter::BusyTick => "busy",
            Counter::IdleTick => "idle",
            Counter::Yield => "yields",
            Counter::Preemption => "preemptions",
            Counter::TimeSlice => "slices",
        }
    }
}

/// Dispatcher counters of one kernel
#[derive(Debug)]
pub struct SchedulerMetrics {
    counters: [AtomicU64; Counter::ALL.len()],
}

impl SchedulerMetrics {
    /// All counters at zero
    pub const fn new() -> Self {
        Self {
            counters: [
                AtomicU64::new(0),
                AtomicU64::new(0),
                AtomicU64::new(0),
                AtomicU64::new(0),
                AtomicU64::new(0),
                AtomicU64::new(0),
            ],
        }
    }

    /// Count one event
    pub fn bump(&self, counter: Counter) {
        self.add(counter, 1);
    }

    /// Count `n` events at once
    pub fn add(&self, counter: Counter, n: u64) {
        self.counters[counter.index()].fetch_add(n, Ordering::Relaxed);
    }

    /// Current value of one counter
    pub fn get(&self, counter: Counter) -> u64 {
        self.counters[counter.index()].load(Ordering::Relaxed)
    }

    /// Copy every counter out
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            context_switches: self.get(Counter::ContextSwitch),
            busy_ticks: self.get(Counter::BusyTick),
            idle_ticks: self.get(Counter::IdleTick),
            yields: self.get(Counter::Yield),
            preemptions: self.get(Counter::Preemption),
            time_slices: self.get(Counter::TimeSlice),
        }
    }
}

impl Default for SchedulerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of [`SchedulerMetrics`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    /// CPU moved to a different context
    pub context_switches: u64,
    /// Ticks executed by working contexts
    pub busy_ticks: u64,
    /// Ticks skipped while idle
    pub idle_ticks: u64,
    /// Delays, yields and blocks
    pub yields: u64,
    /// Higher-priority displacements
    pub preemptions: u64,
    /// Equal-priority rotations at a tick
    pub time_slices: u64,
}

impl MetricsSnapshot {
    /// Value of one counter
    pub fn value(&self, counter: Counter) -> u64 {
        match counter {
            Counter::ContextSwitch => self.context_switches,
            Counter::BusyTick => self.busy_ticks,
            Counter::IdleTick => self.idle_ticks,
            Counter::Yield => self.yields,
            Counter::Preemption => self.preemptions,
            Counter::TimeSlice => self.time_slices,
        }
    }

    /// Share of elapsed ticks spent working, in percent
    pub fn cpu_utilization(&self) -> u8 {
        let total = self.busy_ticks + self.idle_ticks;
        if total == 0 {
            return 0;
        }
        u8::try_from(self.busy_ticks * 100 / total).unwrap_or(100)
    }
}

impl fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, counter) in Counter::ALL.into_iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{} {}", self.value(counter), counter.label())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_are_independent() {
        let metrics = SchedulerMetrics::new();
        metrics.bump(Counter::Preemption);
        metrics.add(Counter::IdleTick, 300);
        metrics.add(Counter::BusyTick, 100);

        let snap = metrics.snapshot();
        assert_eq!(snap.preemptions, 1);
        assert_eq!(snap.context_switches, 0);
        assert_eq!(snap.cpu_utilization(), 25);
        assert_eq!(MetricsSnapshot::default().cpu_utilization(), 0);
        assert_eq!(
            snap.to_string(),
            "0 switches, 100 busy, 300 idle, 0 yields, 1 preemptions, 0 slices"
        );
    }

    #[test]
    fn test_labels_are_unique() {
        let mut labels: Vec<_> = Counter::ALL.iter().map(|c| c.label()).collect();
        labels.sort_unstable();
        labels.dedup();
        assert_eq!(labels.len(), Counter::ALL.len());
    }
}
