//! # Scheduler
//!
//! The kernel owns every execution context and decides which one holds the
//! CPU. Policy:
//!
//! - Strict priority: the highest-priority ready context runs.
//! - Equal priorities rotate round robin, at every yield and (with time
//!   slicing) at every tick.
//! - A preempted context goes to the tail of its priority level.
//! - When nothing is ready the dispatcher skips virtual time forward to the
//!   next wake-up (tickless idle).
//!
//! Scheduling points are registration of a context, blocking, unblocking
//! through a subsequent tick or yield, timed delays, self-suspension and
//! simulated work ticks. Nothing else switches.

pub(crate) mod gate;
pub mod metrics;
pub mod priority;
pub mod queue;
pub mod traits;

pub use metrics::{Counter, MetricsSnapshot, SchedulerMetrics};
pub use priority::Priority;
pub use traits::RunQueue;

use crate::clock::SystemClock;
use crate::config::KernelConfig;
use crate::fault::{panic_message, Fault};
use crate::heap::{HeapBudget, HeapStats};
use crate::task::control::{ExitHook, TaskControlBlock, TaskFlags};
use crate::task::registry::TaskRegistry;
use crate::task::{BlockReason, TaskBody, TaskInfo, TaskState};
use crate::future::slot::Slot;
use crate::{ExecError, ExecResult, TaskContext, TaskId};
use core::convert::Infallible;
use core::fmt;
use core::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use core::time::Duration;
use gate::Gate;
use kestrel_hal::{HalResult, RtcSource};
use queue::{DelayQueue, ReadyLists};
use spin::Mutex;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;

/// Why the dispatcher stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HaltReason {
    /// The observation window passed to [`Kernel::run_for`] elapsed
    WindowElapsed,
    /// Nothing is ready and nothing is sleeping; no context can ever run again
    Quiescent,
}

/// Summary produced when the dispatcher halts
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Why the run ended
    pub reason: HaltReason,
    /// Tick count at halt
    pub ticks: u64,
    /// Virtual uptime at halt
    pub uptime: Duration,
    /// Context switches performed
    pub context_switches: u64,
    /// Preemptions by a higher-priority context
    pub preemptions: u64,
    /// Ticks skipped while idle
    pub idle_ticks: u64,
    /// Every live context
    pub tasks: Vec<TaskInfo>,
    /// Heap usage at halt
    pub heap: HeapStats,
}

impl RunReport {
    /// Look up a context by name
    pub fn task(&self, name: &str) -> Option<&TaskInfo> {
        self.tasks.iter().find(|t| t.name == name)
    }
}

/// What the running context does with the CPU at a scheduling point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Disposition {
    /// Go to the tail of the own priority level
    Yield,
    /// Give up the CPU only if a higher-priority context is ready
    Preempt,
    /// Sleep for a number of ticks
    Delay(u64),
    /// Wait for an event wake-up
    Block,
    /// Park forever
    Suspend,
    /// Execute one tick of simulated work
    Tick,
    /// Body returned
    Exit,
}

/// Outcome of applying a disposition
enum Step {
    Stay,
    Switch,
    Halt(HaltReason),
}

/// Outcome of a dispatch decision
enum Dispatch {
    Run(TaskId),
    Halt(HaltReason),
}

/// Context registration request
pub(crate) struct TaskSpec {
    pub(crate) name: String,
    pub(crate) priority: Priority,
    pub(crate) stack_budget: usize,
    pub(crate) body: TaskBody,
    pub(crate) flags: TaskFlags,
}

/// Mutable kernel state, guarded by one lock
///
/// The lock is the kernel critical section. It is never held across a
/// handoff or while user code runs.
#[derive(Debug)]
struct KernelState {
    registry: TaskRegistry,
    ready: ReadyLists,
    delayed: DelayQueue,
    current: Option<TaskId>,
    tick: u64,
    /// Tick at which a bounded run halts
    deadline: Option<u64>,
    heap: HeapBudget,
    halted: Option<HaltReason>,
}

impl KernelState {
    fn new(config: &KernelConfig) -> Self {
        Self {
            registry: TaskRegistry::new(),
            ready: ReadyLists::new(usize::from(config.max_priorities)),
            delayed: DelayQueue::new(),
            current: None,
            tick: 0,
            deadline: None,
            heap: HeapBudget::new(config.heap_capacity),
            halted: None,
        }
    }

    fn make_ready(&mut self, id: TaskId) {
        if let Some(tcb) = self.registry.get_mut(id) {
            tcb.set_state(TaskState::Ready);
            self.ready.enqueue(id, tcb.priority);
        }
    }

    /// Move every sleeper whose wake-up tick has passed to its ready list
    fn wake_due(&mut self) {
        while let Some(id) = self.delayed.pop_due(self.tick) {
            let sleeping = self
                .registry
                .get(id)
                .is_some_and(|t| t.state == TaskState::Blocked && t.block == Some(BlockReason::Delay));
            if sleeping {
                self.make_ready(id);
            }
        }
    }

    /// Apply `how` to the running context `me`
    fn park_current(
        &mut self,
        me: TaskId,
        how: Disposition,
        config: &KernelConfig,
        metrics: &SchedulerMetrics,
    ) -> Step {
        let Some(tcb) = self.registry.get_mut(me) else {
            return Step::Stay;
        };
        let priority = tcb.priority;

        match how {
            Disposition::Yield | Disposition::Delay(0) => {
                metrics.bump(Counter::Yield);
                self.make_ready(me);
                Step::Switch
            }
            Disposition::Preempt => {
                if self.ready.highest_priority().is_some_and(|p| p > priority) {
                    metrics.bump(Counter::Preemption);
                    self.make_ready(me);
                    Step::Switch
                } else {
                    Step::Stay
                }
            }
            Disposition::Delay(ticks) => {
                tcb.set_state(TaskState::Blocked);
                tcb.block = Some(BlockReason::Delay);
                metrics.bump(Counter::Yield);
                let wake = self.tick.saturating_add(ticks);
                self.delayed.push(me, wake);
                Step::Switch
            }
            Disposition::Block => {
                if tcb.wake_pending {
                    tcb.wake_pending = false;
                    return Step::Stay;
                }
                tcb.set_state(TaskState::Blocked);
                tcb.block = Some(BlockReason::Event);
                metrics.bump(Counter::Yield);
                Step::Switch
            }
            Disposition::Suspend => {
                tcb.set_state(TaskState::Suspended);
                Step::Switch
            }
            Disposition::Exit => {
                tcb.set_state(TaskState::Terminated);
                let cost = core::mem::take(&mut tcb.heap_cost);
                let detached = tcb.flags.contains(TaskFlags::DETACHED);
                self.heap.release(cost);
                if detached {
                    let _ = self.registry.remove(me);
                }
                Step::Switch
            }
            Disposition::Tick => {
                if self.deadline.is_some_and(|limit| self.tick >= limit) {
                    return Step::Halt(HaltReason::WindowElapsed);
                }
                tcb.run_ticks += 1;
                self.tick += 1;
                metrics.bump(Counter::BusyTick);
                self.wake_due();

                match self.ready.highest_priority() {
                    Some(p) if p > priority => {
                        metrics.bump(Counter::Preemption);
                        self.make_ready(me);
                        Step::Switch
                    }
                    Some(p) if p == priority && config.time_slicing => {
                        metrics.bump(Counter::TimeSlice);
                        self.make_ready(me);
                        Step::Switch
                    }
                    _ => Step::Stay,
                }
            }
        }
    }

    /// Pick the next context, idling forward through virtual time if needed
    fn dispatch(&mut self, metrics: &SchedulerMetrics) -> Dispatch {
        loop {
            if let Some(id) = self.ready.dequeue() {
                return Dispatch::Run(id);
            }
            let Some(wake) = self.delayed.next_wake() else {
                return Dispatch::Halt(HaltReason::Quiescent);
            };
            if let Some(limit) = self.deadline.filter(|&limit| wake > limit) {
                metrics.add(Counter::IdleTick, limit.saturating_sub(self.tick));
                self.tick = self.tick.max(limit);
                return Dispatch::Halt(HaltReason::WindowElapsed);
            }
            if wake > self.tick {
                metrics.add(Counter::IdleTick, wake - self.tick);
                self.tick = wake;
            }
            self.wake_due();
        }
    }

    /// Give the CPU to `id` and return its gate
    fn run(&mut self, id: TaskId, metrics: &SchedulerMetrics) -> Option<Arc<Gate>> {
        let tcb = self.registry.get_mut(id)?;
        tcb.set_state(TaskState::Running);
        if self.current != Some(id) {
            metrics.bump(Counter::ContextSwitch);
            log::trace!("switch to '{}' ({}) at tick {}", tcb.name, id, self.tick);
        }
        self.current = Some(id);
        Some(tcb.gate.clone())
    }
}

/// Wakes the kernel-side observer when the dispatcher halts
#[derive(Debug, Default)]
struct Observer {
    report: Mutex<Option<RunReport>>,
    gate: Gate,
}

impl Observer {
    fn publish(&self, report: RunReport) {
        *self.report.lock() = Some(report);
        self.gate.grant();
    }

    fn wait(&self) -> RunReport {
        loop {
            self.gate.wait();
            if let Some(report) = self.report.lock().take() {
                return report;
            }
        }
    }
}

struct KernelInner {
    config: KernelConfig,
    state: Mutex<KernelState>,
    metrics: SchedulerMetrics,
    clock: SystemClock,
    faults: Mutex<Vec<Fault>>,
    started: AtomicBool,
    observer: Observer,
    thread_seq: AtomicU64,
}

/// Handle to a kernel instance
///
/// Cheap to clone; all clones refer to the same scheduler. The kernel has
/// no teardown path: once started it runs until the process ends.
#[derive(Clone)]
pub struct Kernel {
    inner: Arc<KernelInner>,
}

impl Kernel {
    /// Create a kernel with the given configuration
    pub fn new(config: KernelConfig) -> ExecResult<Self> {
        config.validate()?;
        log::info!(
            "kernel: {} priorities, {:?} tick, {} byte heap, {} contexts max",
            config.max_priorities,
            config.tick_period(),
            config.heap_capacity,
            config.max_tasks
        );
        Ok(Self {
            inner: Arc::new(KernelInner {
                state: Mutex::new(KernelState::new(&config)),
                config,
                metrics: SchedulerMetrics::new(),
                clock: SystemClock::new(),
                faults: Mutex::new(Vec::new()),
                started: AtomicBool::new(false),
                observer: Observer::default(),
                thread_seq: AtomicU64::new(1),
            }),
        })
    }

    /// Kernel configuration
    pub fn config(&self) -> &KernelConfig {
        &self.inner.config
    }

    /// Scheduler metrics
    pub fn metrics(&self) -> &SchedulerMetrics {
        &self.inner.metrics
    }

    /// Wall clock derived from the tick counter
    pub fn clock(&self) -> &SystemClock {
        &self.inner.clock
    }

    /// Check if the scheduler has been started
    pub fn is_started(&self) -> bool {
        self.inner.started.load(Ordering::SeqCst)
    }

    /// Current tick count
    pub fn tick_count(&self) -> u64 {
        self.inner.state.lock().tick
    }

    /// Virtual time since power-on
    pub fn uptime(&self) -> Duration {
        self.inner.config.duration_of(self.tick_count())
    }

    /// Uptime in milliseconds
    pub fn uptime_ms(&self) -> u64 {
        u64::try_from(self.uptime().as_millis()).unwrap_or(u64::MAX)
    }

    /// Uptime in microseconds
    pub fn uptime_us(&self) -> u64 {
        u64::try_from(self.uptime().as_micros()).unwrap_or(u64::MAX)
    }

    /// Heap usage
    pub fn heap_stats(&self) -> HeapStats {
        self.inner.state.lock().heap.stats()
    }

    /// Snapshot of every live context
    pub fn tasks(&self) -> Vec<TaskInfo> {
        self.inner.state.lock().registry.snapshot()
    }

    /// Snapshot of one context
    pub fn task_info(&self, id: TaskId) -> Option<TaskInfo> {
        self.inner.state.lock().registry.get(id).map(TaskControlBlock::info)
    }

    /// Snapshot of a context by name
    pub fn task_by_name(&self, name: &str) -> Option<TaskInfo> {
        self.inner.state.lock().registry.by_name(name).map(TaskControlBlock::info)
    }

    /// State of a context; `None` once it has been reclaimed
    pub fn task_state(&self, id: TaskId) -> Option<TaskState> {
        self.inner.state.lock().registry.get(id).map(|t| t.state)
    }

    /// Context holding the CPU
    pub fn current(&self) -> Option<TaskId> {
        self.inner.state.lock().current
    }

    /// Faults recorded so far
    pub fn faults(&self) -> Vec<Fault> {
        self.inner.faults.lock().clone()
    }

    /// Register a top-level execution context
    ///
    /// Only valid before [`Kernel::start`]; running contexts create nested
    /// contexts through their [`TaskContext`].
    pub fn register(
        &self,
        name: &str,
        priority: Priority,
        stack_budget: usize,
        body: TaskBody,
    ) -> ExecResult<TaskId> {
        if self.is_started() {
            log::warn!("register '{}': scheduler already started", name);
            return Err(ExecError::SchedulerStarted);
        }
        self.create_task(
            TaskSpec {
                name: name.to_string(),
                priority,
                stack_budget,
                body,
                flags: TaskFlags::TOP_LEVEL | TaskFlags::DETACHED,
            },
            None,
        )
    }

    /// Busy-wait before the scheduler runs until uptime reaches `uptime`
    pub fn spin_until(&self, uptime: Duration) -> ExecResult<()> {
        if self.is_started() {
            return Err(ExecError::SchedulerStarted);
        }
        let target = self.inner.config.ticks_for(uptime);
        let mut state = self.inner.state.lock();
        if state.tick < target {
            self.inner.metrics.add(Counter::IdleTick, target - state.tick);
            state.tick = target;
        }
        Ok(())
    }

    /// Synchronise the wall clock with an RTC
    pub fn sync_rtc(&self, rtc: &dyn RtcSource) -> HalResult<u64> {
        let tick = self.tick_count();
        self.inner.clock.sync_rtc(rtc, tick, &self.inner.config)
    }

    /// Wall-clock time in seconds since the Unix epoch, if synchronised
    pub fn epoch_seconds(&self) -> Option<u64> {
        let tick = self.tick_count();
        self.inner.clock.now_epoch(tick, &self.inner.config)
    }

    /// Start the scheduler; control does not come back
    ///
    /// Returns only if the scheduler could not be started. If every context
    /// ends up blocked forever the calling thread idles forever.
    pub fn start(&self) -> ExecResult<Infallible> {
        self.launch(None)?;
        let report = self.inner.observer.wait();
        log::warn!(
            "scheduler idle forever ({:?}) after {} ticks",
            report.reason,
            report.ticks
        );
        loop {
            thread::park();
        }
    }

    /// Start the scheduler and observe it for `window` of virtual time
    ///
    /// Returns when the window has elapsed or no context can run anymore.
    /// The kernel stays halted afterwards; contexts are frozen where they
    /// stood.
    pub fn run_for(&self, window: Duration) -> ExecResult<RunReport> {
        let window = self.inner.config.ticks_for(window);
        self.launch(Some(window))?;
        Ok(self.inner.observer.wait())
    }

    fn launch(&self, window: Option<u64>) -> ExecResult<()> {
        if self.inner.started.swap(true, Ordering::SeqCst) {
            return Err(ExecError::AlreadyStarted);
        }
        let metrics = &self.inner.metrics;
        let (next, report) = {
            let mut guard = self.inner.state.lock();
            let state = &mut *guard;
            state.deadline = window.map(|w| state.tick.saturating_add(w));
            log::info!(
                "starting scheduler with {} contexts at tick {}",
                state.registry.len(),
                state.tick
            );
            match state.dispatch(metrics) {
                Dispatch::Run(id) => (state.run(id, metrics), None),
                Dispatch::Halt(reason) => (None, Some(self.halt(state, reason))),
            }
        };
        if let Some(gate) = next {
            gate.grant();
        }
        if let Some(report) = report {
            self.inner.observer.publish(report);
        }
        Ok(())
    }

    fn halt(&self, state: &mut KernelState, reason: HaltReason) -> RunReport {
        state.halted = Some(reason);
        state.current = None;
        let metrics = self.inner.metrics.snapshot();
        log::info!("scheduler halted at tick {}: {:?} ({})", state.tick, reason, metrics);
        RunReport {
            reason,
            ticks: state.tick,
            uptime: self.inner.config.duration_of(state.tick),
            context_switches: metrics.context_switches,
            preemptions: metrics.preemptions,
            idle_ticks: metrics.idle_ticks,
            tasks: state.registry.snapshot(),
            heap: state.heap.stats(),
        }
    }

    pub(crate) fn record_fault(&self, fault: Fault) {
        log::error!("fault: {}", fault);
        self.inner.faults.lock().push(fault);
    }

    pub(crate) fn next_thread_name(&self) -> String {
        format!("thread-{}", self.inner.thread_seq.fetch_add(1, Ordering::Relaxed))
    }

    /// Create a context and make it ready
    ///
    /// With a `parent`, the parent is the running context and is preempted
    /// right away if the new context outranks it.
    pub(crate) fn create_task(&self, spec: TaskSpec, parent: Option<TaskId>) -> ExecResult<TaskId> {
        let config = &self.inner.config;
        if spec.priority.level() >= config.max_priorities {
            return Err(ExecError::InvalidPriority);
        }
        if spec.stack_budget < config.min_stack_bytes {
            return Err(ExecError::InvalidArgument);
        }

        let id = TaskId::new();
        let cost = config.task_cost(spec.stack_budget);
        let gate = {
            let mut guard = self.inner.state.lock();
            let state = &mut *guard;
            if state.registry.contains_name(&spec.name) {
                return Err(ExecError::AlreadyExists);
            }
            if state.registry.len() >= config.max_tasks {
                log::warn!("'{}': context table full ({})", spec.name, config.max_tasks);
                return Err(ExecError::ResourceExhausted);
            }
            state.heap.reserve(cost)?;
            let tcb = TaskControlBlock::new(
                id,
                spec.name.clone(),
                spec.priority,
                spec.stack_budget,
                cost,
                spec.flags,
                parent,
                state.tick,
            );
            let gate = tcb.gate.clone();
            if let Err(err) = state.registry.insert(tcb) {
                state.heap.release(cost);
                return Err(err);
            }
            gate
        };

        let kernel = self.clone();
        let body = spec.body;
        let spawned = thread::Builder::new()
            .name(spec.name.clone())
            .stack_size(config.host_stack_floor.max(spec.stack_budget))
            .spawn(move || task_main(kernel, id, gate, body));
        if let Err(err) = spawned {
            log::error!("'{}': host thread spawn failed: {}", spec.name, err);
            let mut state = self.inner.state.lock();
            if let Ok(tcb) = state.registry.remove(id) {
                state.heap.release(tcb.heap_cost);
            }
            return Err(ExecError::ResourceExhausted);
        }

        self.inner.state.lock().make_ready(id);
        log::debug!(
            "registered '{}' ({}) priority {} stack {} bytes",
            spec.name,
            id,
            spec.priority,
            spec.stack_budget
        );

        if let Some(parent) = parent {
            self.reschedule(parent, Disposition::Preempt);
        }
        Ok(id)
    }

    /// Scheduling point for the running context `me`
    ///
    /// Returns once `me` holds the CPU again. With [`Disposition::Exit`] it
    /// returns right after handing the CPU on.
    pub(crate) fn reschedule(&self, me: TaskId, how: Disposition) {
        let metrics = &self.inner.metrics;
        let (next, own, report) = {
            let mut guard = self.inner.state.lock();
            let state = &mut *guard;
            let Some(own) = state.registry.get(me).map(|t| t.gate.clone()) else {
                return;
            };
            debug_assert!(
                state.current == Some(me) || state.halted.is_some(),
                "scheduling point outside the running context"
            );
            let step = state.park_current(me, how, &self.inner.config, metrics);
            match step {
                Step::Stay => return,
                Step::Halt(reason) => (None, own, Some(self.halt(state, reason))),
                Step::Switch => match state.dispatch(metrics) {
                    Dispatch::Run(id) if id == me => {
                        state.run(id, metrics);
                        return;
                    }
                    Dispatch::Run(id) => (state.run(id, metrics), own, None),
                    Dispatch::Halt(reason) => (None, own, Some(self.halt(state, reason))),
                },
            }
        };

        if let Some(gate) = next {
            gate.grant();
        }
        if let Some(report) = report {
            self.inner.observer.publish(report);
        }
        if how != Disposition::Exit {
            own.wait();
        }
    }

    /// Deliver an event wake-up to a blocked context
    ///
    /// The woken context runs at the next scheduling point that favours it;
    /// the caller is not preempted here.
    pub(crate) fn unblock(&self, id: TaskId) {
        let mut guard = self.inner.state.lock();
        let state = &mut *guard;
        let Some(tcb) = state.registry.get_mut(id) else {
            return;
        };
        match (tcb.state, tcb.block) {
            (TaskState::Blocked, Some(BlockReason::Event)) => state.make_ready(id),
            (TaskState::Running | TaskState::Ready | TaskState::Created, _) => {
                tcb.wake_pending = true;
            }
            _ => {}
        }
    }

    pub(crate) fn add_exit_hook(&self, id: TaskId, hook: ExitHook) {
        if let Some(tcb) = self.inner.state.lock().registry.get_mut(id) {
            tcb.exit_hooks.push(hook);
        }
    }

    pub(crate) fn set_priority(&self, me: TaskId, priority: Priority) -> ExecResult<()> {
        if priority.level() >= self.inner.config.max_priorities {
            return Err(ExecError::InvalidPriority);
        }
        {
            let mut state = self.inner.state.lock();
            let tcb = state.registry.get_mut(me).ok_or(ExecError::TaskNotFound)?;
            log::debug!("'{}': priority {} -> {}", tcb.name, tcb.priority, priority);
            tcb.priority = priority;
        }
        self.reschedule(me, Disposition::Preempt);
        Ok(())
    }

    pub(crate) fn priority_of(&self, id: TaskId) -> Option<Priority> {
        self.inner.state.lock().registry.get(id).map(|t| t.priority)
    }

    pub(crate) fn completion_of(&self, id: TaskId) -> ExecResult<Arc<Slot<()>>> {
        self.inner
            .state
            .lock()
            .registry
            .get(id)
            .map(|t| t.completion.clone())
            .ok_or(ExecError::TaskNotFound)
    }

    /// Let a context reclaim itself when its body returns
    pub(crate) fn detach(&self, id: TaskId) {
        let mut state = self.inner.state.lock();
        match state.registry.get_mut(id) {
            Some(tcb) if tcb.state.is_terminated() => {
                let _ = state.registry.remove(id);
            }
            Some(tcb) => tcb.flags.insert(TaskFlags::DETACHED),
            None => {}
        }
    }

    /// Reclaim a terminated context
    pub(crate) fn reap(&self, id: TaskId) {
        let mut state = self.inner.state.lock();
        if state.registry.get(id).is_some_and(|t| t.state.is_terminated()) {
            let _ = state.registry.remove(id);
        }
    }

    /// Tear down the running context after its body returned
    ///
    /// Order matters: the context is marked terminated first, then the exit
    /// hooks commit deferred values, then joiners are released, and only
    /// then is the CPU handed on. Nothing woken here can run before the
    /// handoff.
    ///
    /// A panicking hook is recorded as a fault; the remaining hooks and the
    /// handoff still run. `outcome` is what joiners see.
    fn exit_current(&self, me: TaskId, outcome: ExecResult<()>) {
        let (hooks, completion) = {
            let mut state = self.inner.state.lock();
            let Some(tcb) = state.registry.get_mut(me) else {
                return;
            };
            tcb.set_state(TaskState::Terminated);
            log::debug!("'{}' ({}) terminated after {} ticks", tcb.name, me, tcb.run_ticks);
            (core::mem::take(&mut tcb.exit_hooks), tcb.completion.clone())
        };
        for hook in hooks {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(hook)) {
                let message = panic_message(payload.as_ref());
                self.mark_panicked(me);
                self.record_fault(Fault::TaskPanicked { task: me, message });
            }
        }
        let _ = completion.fulfil(outcome);
        self.reschedule(me, Disposition::Exit);
    }

    fn mark_panicked(&self, id: TaskId) {
        if let Some(tcb) = self.inner.state.lock().registry.get_mut(id) {
            tcb.flags.insert(TaskFlags::PANICKED);
        }
    }
}

impl fmt::Debug for Kernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Kernel")
            .field("started", &self.is_started())
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

/// Host thread body backing one execution context
fn task_main(kernel: Kernel, id: TaskId, gate: Arc<Gate>, body: TaskBody) {
    gate.wait();
    let ctx = TaskContext::new(kernel.clone(), id);
    let outcome = match panic::catch_unwind(AssertUnwindSafe(move || body.run(&ctx))) {
        Ok(()) => Ok(()),
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            kernel.mark_panicked(id);
            kernel.record_fault(Fault::TaskPanicked {
                task: id,
                message: message.clone(),
            });
            Err(ExecError::ProducerPanicked(message))
        }
    };
    kernel.exit_current(id, outcome);
}
