//! # Kestrel Execution - Scenario Tests
//!
//! Whole-kernel scenarios driven through `Kernel::run_for`.

use crate::scheduler::Counter;
use crate::task::TaskFlags;
use crate::*;
use core::time::Duration;
use kestrel_hal::host::SoftRtc;
use spin::Mutex;
use std::sync::Arc;

const STACK: usize = 1024;

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

fn kernel() -> Kernel {
    Kernel::new(KernelConfig::new()).unwrap()
}

fn shared<T>() -> Arc<Mutex<Vec<T>>> {
    Arc::new(Mutex::new(Vec::new()))
}

// =========================================================================
// Scheduling
// =========================================================================

#[test]
fn test_every_registered_context_runs() {
    let k = kernel();
    let log = shared();
    for (name, prio) in [("a", 1), ("b", 5), ("c", 3)] {
        let log = log.clone();
        k.register(
            name,
            Priority::new(prio),
            STACK,
            TaskBody::run_once(move |ctx| log.lock().push(ctx.name())),
        )
        .unwrap();
    }
    assert_eq!(k.tasks().len(), 3);

    let report = k.run_for(Duration::from_secs(1)).unwrap();
    assert_eq!(report.reason, HaltReason::Quiescent);
    assert_eq!(*log.lock(), vec!["b", "c", "a"]);
    assert!(report.tasks.is_empty());
    assert_eq!(report.heap.used, 0);
    assert_eq!(report.heap.high_water, 3 * k.config().task_cost(STACK));
}

#[test]
fn test_higher_priority_preempts_within_one_tick() {
    let k = kernel();
    let log = shared();

    let high = log.clone();
    k.register(
        "high",
        Priority::new(5),
        STACK,
        TaskBody::run_once(move |ctx| {
            ctx.sleep_for(ms(3));
            high.lock().push(("high", ctx.now()));
        }),
    )
    .unwrap();

    let low = log.clone();
    k.register(
        "low",
        Priority::new(1),
        STACK,
        TaskBody::run_once(move |ctx| {
            for _ in 0..6 {
                ctx.work_for(ms(1));
                low.lock().push(("low", ctx.now()));
            }
        }),
    )
    .unwrap();

    let report = k.run_for(Duration::from_secs(1)).unwrap();
    assert_eq!(
        *log.lock(),
        vec![
            ("low", 1),
            ("low", 2),
            ("high", 3),
            ("low", 3),
            ("low", 4),
            ("low", 5),
            ("low", 6),
        ]
    );
    assert_eq!(report.reason, HaltReason::Quiescent);
    assert_eq!(report.ticks, 6);
    assert_eq!(report.preemptions, 1);
}

#[test]
fn test_equal_priority_round_robin_on_yield() {
    let k = kernel();
    let log = shared();
    for name in ["a", "b"] {
        let log = log.clone();
        k.register(
            name,
            Priority::new(2),
            STACK,
            TaskBody::run_once(move |ctx| {
                for _ in 0..3 {
                    log.lock().push(ctx.name());
                    ctx.yield_now();
                }
            }),
        )
        .unwrap();
    }

    k.run_for(Duration::from_secs(1)).unwrap();
    assert_eq!(*log.lock(), vec!["a", "b", "a", "b", "a", "b"]);
}

#[test]
fn test_time_slicing_rotates_equal_priorities() {
    let k = kernel();
    let log = shared();
    for name in ["a", "b"] {
        let log = log.clone();
        k.register(
            name,
            Priority::new(2),
            STACK,
            TaskBody::run_once(move |ctx| {
                for _ in 0..3 {
                    ctx.work_for(ms(1));
                    log.lock().push(ctx.name());
                }
            }),
        )
        .unwrap();
    }

    k.run_for(Duration::from_secs(1)).unwrap();
    assert_eq!(*log.lock(), vec!["a", "b", "a", "b", "a", "b"]);
    assert!(k.metrics().get(Counter::TimeSlice) >= 5);
    assert_eq!(k.metrics().get(Counter::BusyTick), 6);
}

#[test]
fn test_without_time_slicing_work_runs_to_completion() {
    let config = KernelConfig {
        time_slicing: false,
        ..KernelConfig::new()
    };
    let k = Kernel::new(config).unwrap();
    let log = shared();
    for name in ["a", "b"] {
        let log = log.clone();
        k.register(
            name,
            Priority::new(2),
            STACK,
            TaskBody::run_once(move |ctx| {
                for _ in 0..3 {
                    ctx.work_for(ms(1));
                    log.lock().push(ctx.name());
                }
            }),
        )
        .unwrap();
    }

    k.run_for(Duration::from_secs(1)).unwrap();
    assert_eq!(*log.lock(), vec!["a", "a", "a", "b", "b", "b"]);
    assert_eq!(k.metrics().get(Counter::TimeSlice), 0);
}

#[test]
fn test_sleep_rounds_up_and_idles_forward() {
    let k = kernel();
    let woke = shared();
    let w = woke.clone();
    k.register(
        "sleeper",
        Priority::new(1),
        STACK,
        TaskBody::run_once(move |ctx| {
            ctx.sleep_for(Duration::from_micros(2_500));
            w.lock().push(ctx.now());
            ctx.sleep_for(Duration::ZERO);
            w.lock().push(ctx.now());
        }),
    )
    .unwrap();

    let report = k.run_for(Duration::from_secs(1)).unwrap();
    assert_eq!(*woke.lock(), vec![3, 3]);
    assert_eq!(report.idle_ticks, 3);
    assert_eq!(k.metrics().snapshot().cpu_utilization(), 0);
}

#[test]
fn test_window_elapses_with_periodic_context() {
    let k = kernel();
    let count = Arc::new(Mutex::new(0_u32));
    let c = count.clone();
    k.register(
        "blink",
        Priority::new(2),
        STACK,
        TaskBody::periodic(ms(100), move |_| *c.lock() += 1),
    )
    .unwrap();

    let report = k.run_for(Duration::from_secs(1)).unwrap();
    assert_eq!(report.reason, HaltReason::WindowElapsed);
    assert_eq!(report.ticks, 1_000);
    assert_eq!(report.uptime, Duration::from_secs(1));
    assert_eq!(*count.lock(), 11);
    assert_eq!(report.task("blink").map(|t| t.state), Some(TaskState::Blocked));
}

#[test]
fn test_nested_higher_priority_context_runs_first() {
    let k = kernel();
    let log = shared();
    let l = log.clone();
    k.register(
        "parent",
        Priority::new(1),
        STACK,
        TaskBody::run_once(move |ctx| {
            let inner = l.clone();
            ctx.spawn_task(
                "worker",
                Priority::new(5),
                STACK,
                TaskBody::run_once(move |_| inner.lock().push("worker")),
            )
            .unwrap();
            l.lock().push("parent");
        }),
    )
    .unwrap();

    k.run_for(Duration::from_secs(1)).unwrap();
    assert_eq!(*log.lock(), vec!["worker", "parent"]);
}

#[test]
fn test_set_priority_preempts_immediately() {
    let k = kernel();
    let log = shared();

    let l = log.clone();
    k.register(
        "lowering",
        Priority::new(5),
        STACK,
        TaskBody::run_once(move |ctx| {
            l.lock().push("before");
            ctx.set_priority(Priority::new(1)).unwrap();
            l.lock().push("after");
            assert_eq!(ctx.set_priority(Priority::new(10)), Err(ExecError::InvalidPriority));
        }),
    )
    .unwrap();

    let l = log.clone();
    k.register(
        "middle",
        Priority::new(3),
        STACK,
        TaskBody::run_once(move |_| l.lock().push("middle")),
    )
    .unwrap();

    k.run_for(Duration::from_secs(1)).unwrap();
    assert_eq!(*log.lock(), vec!["before", "middle", "after"]);
}

// =========================================================================
// Registration
// =========================================================================

#[test]
fn test_register_validation() {
    let k = kernel();
    let body = || TaskBody::run_once(|_| {});

    assert_eq!(
        k.register("p", Priority::new(10), STACK, body()),
        Err(ExecError::InvalidPriority)
    );
    assert_eq!(
        k.register("s", Priority::new(1), 16, body()),
        Err(ExecError::InvalidArgument)
    );
    k.register("dup", Priority::new(1), STACK, body()).unwrap();
    assert_eq!(
        k.register("dup", Priority::new(1), STACK, body()),
        Err(ExecError::AlreadyExists)
    );
    assert_eq!(k.tasks().len(), 1);
    assert!(k.task_by_name("dup").unwrap().flags.contains(TaskFlags::TOP_LEVEL));
}

#[test]
fn test_register_exhausts_heap_and_table() {
    let k = Kernel::new(KernelConfig::minimal()).unwrap();

    assert_eq!(
        k.register("huge", Priority::new(1), 20 * 1024, TaskBody::run_once(|_| {})),
        Err(ExecError::ResourceExhausted)
    );
    assert_eq!(k.heap_stats().failed, 1);
    assert_eq!(k.heap_stats().used, 0);

    for i in 0..k.config().max_tasks {
        k.register(&format!("t{}", i), Priority::new(1), 512, TaskBody::run_once(|_| {}))
            .unwrap();
    }
    assert_eq!(
        k.register("extra", Priority::new(1), 512, TaskBody::run_once(|_| {})),
        Err(ExecError::ResourceExhausted)
    );
}

#[test]
fn test_register_after_start_and_double_start() {
    let k = kernel();
    let seen = shared();
    let s = seen.clone();
    k.register(
        "main",
        Priority::new(1),
        STACK,
        TaskBody::run_once(move |ctx| {
            let late = ctx.kernel().register("late", Priority::new(1), STACK, TaskBody::run_once(|_| {}));
            s.lock().push(late.map(|_| ()));
            s.lock().push(ctx.kernel().spin_until(Duration::from_secs(5)));
        }),
    )
    .unwrap();

    k.run_for(Duration::from_secs(1)).unwrap();
    assert_eq!(
        *seen.lock(),
        vec![Err(ExecError::SchedulerStarted), Err(ExecError::SchedulerStarted)]
    );
    assert!(k.is_started());
    assert!(matches!(k.run_for(ms(1)), Err(ExecError::AlreadyStarted)));
    assert!(matches!(k.start(), Err(ExecError::AlreadyStarted)));
}

#[test]
fn test_empty_kernel_is_quiescent() {
    let k = kernel();
    let report = k.run_for(Duration::from_secs(1)).unwrap();
    assert_eq!(report.reason, HaltReason::Quiescent);
    assert_eq!(report.ticks, 0);
}

// =========================================================================
// Clock
// =========================================================================

#[test]
fn test_power_on_wait_and_rtc_sync() {
    let k = kernel();
    k.spin_until(Duration::from_secs(2)).unwrap();
    assert_eq!(k.tick_count(), 2_000);
    assert_eq!(k.uptime_ms(), 2_000);
    assert_eq!(k.epoch_seconds(), None);

    let rtc = SoftRtc::new(1_000);
    assert_eq!(k.sync_rtc(&rtc), Ok(1_000));

    let seen = shared();
    let s = seen.clone();
    k.register(
        "clock",
        Priority::new(1),
        STACK,
        TaskBody::run_once(move |ctx| {
            ctx.sleep_for(Duration::from_secs(3));
            s.lock().push(ctx.kernel().epoch_seconds());
        }),
    )
    .unwrap();

    k.run_for(Duration::from_secs(10)).unwrap();
    assert_eq!(*seen.lock(), vec![Some(1_003)]);
    assert_eq!(k.uptime_us(), 5_000_000);
}

// =========================================================================
// Threads
// =========================================================================

#[test]
fn test_join_of_completed_thread_returns_at_once() {
    let k = kernel();
    let seen = shared();
    let s = seen.clone();
    k.register(
        "parent",
        Priority::new(3),
        STACK,
        TaskBody::run_once(move |ctx| {
            let builder = ThreadBuilder::new().name("child").priority(Priority::new(5));
            let child = ThreadHandle::spawn_with(ctx, builder, |ctx| ctx.work_for(ms(2))).unwrap();
            let id = child.id();
            assert!(child.is_finished());
            assert_eq!(ctx.kernel().task_state(id), Some(TaskState::Terminated));

            let before = (ctx.now(), ctx.kernel().metrics().get(Counter::ContextSwitch));
            child.join(ctx).unwrap();
            let after = (ctx.now(), ctx.kernel().metrics().get(Counter::ContextSwitch));
            s.lock().push((before == after, ctx.kernel().task_state(id)));
        }),
    )
    .unwrap();

    k.run_for(Duration::from_secs(1)).unwrap();
    assert_eq!(*seen.lock(), vec![(true, None)]);
}

#[test]
fn test_join_waits_for_thread() {
    let k = kernel();
    let seen = shared();
    let s = seen.clone();
    k.register(
        "parent",
        Priority::new(3),
        STACK,
        TaskBody::run_once(move |ctx| {
            let child = ThreadHandle::spawn(ctx, |ctx| ctx.sleep_for(ms(40))).unwrap();
            assert_eq!(child.name(), "thread-1");
            assert_eq!(ctx.kernel().task_info(child.id()).map(|t| t.priority), Some(Priority::new(3)));
            child.join(ctx).unwrap();
            s.lock().push(ctx.now());
        }),
    )
    .unwrap();

    let report = k.run_for(Duration::from_secs(1)).unwrap();
    assert_eq!(*seen.lock(), vec![40]);
    assert_eq!(report.heap.used, 0);
}

#[test]
fn test_self_join_is_deadlock() {
    let k = kernel();
    let seen = shared();
    let s = seen.clone();
    k.register(
        "parent",
        Priority::new(3),
        STACK,
        TaskBody::run_once(move |ctx| {
            let cell: Arc<Mutex<Option<ThreadHandle>>> = Arc::new(Mutex::new(None));
            let own = cell.clone();
            let handle = ThreadHandle::spawn(ctx, move |ctx| {
                let handle = own.lock().take();
                if let Some(handle) = handle {
                    s.lock().push(handle.join(ctx));
                }
            })
            .unwrap();
            *cell.lock() = Some(handle);
            ctx.sleep_for(ms(1));
        }),
    )
    .unwrap();

    let report = k.run_for(Duration::from_secs(1)).unwrap();
    assert_eq!(*seen.lock(), vec![Err(ExecError::DeadlockDetected)]);
    assert!(k.faults().is_empty());
    assert!(report.tasks.is_empty());
}

#[test]
fn test_unjoined_drop_records_fault() {
    let k = kernel();
    let ran = shared();
    let r = ran.clone();
    k.register(
        "parent",
        Priority::new(3),
        STACK,
        TaskBody::run_once(move |ctx| {
            let handle = ThreadHandle::spawn(ctx, move |_| r.lock().push("thread")).unwrap();
            drop(handle);
            ctx.sleep_for(ms(1));
        }),
    )
    .unwrap();

    let report = k.run_for(Duration::from_secs(1)).unwrap();
    assert_eq!(*ran.lock(), vec!["thread"]);
    let faults = k.faults();
    assert_eq!(faults.len(), 1);
    assert!(matches!(faults[0], Fault::UnjoinedThread { .. }));
    assert_eq!(faults[0].error(), ExecError::UnjoinedThread);
    assert!(report.tasks.is_empty());
}

#[test]
fn test_spawn_exhaustion_surfaces_at_spawn() {
    let k = Kernel::new(KernelConfig::minimal()).unwrap();
    let seen = shared();
    let s = seen.clone();
    k.register(
        "parent",
        Priority::new(3),
        STACK,
        TaskBody::run_once(move |ctx| {
            let spawned = ThreadBuilder::new().stack_size(64 * 1024).spawn(ctx, |_| {});
            s.lock().push(spawned.map(|h| h.detach()));
            let eager = spawn_async(ctx, Launch::Async, |_| 1_u32);
            s.lock().push(eager.map(|_| ()));
        }),
    )
    .unwrap();

    k.run_for(Duration::from_secs(1)).unwrap();
    assert_eq!(*seen.lock(), vec![Err(ExecError::ResourceExhausted), Ok(())]);
}

#[test]
fn test_panicking_body_is_contained() {
    let k = kernel();
    let ran = shared();
    k.register(
        "doomed",
        Priority::new(5),
        STACK,
        TaskBody::run_once(|_| panic!("stack smashed")),
    )
    .unwrap();
    let r = ran.clone();
    k.register(
        "survivor",
        Priority::new(1),
        STACK,
        TaskBody::run_once(move |_| r.lock().push("survivor")),
    )
    .unwrap();

    let report = k.run_for(Duration::from_secs(1)).unwrap();
    assert_eq!(*ran.lock(), vec!["survivor"]);
    assert_eq!(report.reason, HaltReason::Quiescent);
    let faults = k.faults();
    assert_eq!(faults.len(), 1);
    assert!(matches!(&faults[0], Fault::TaskPanicked { message, .. } if message == "stack smashed"));
}

#[test]
fn test_panicking_exit_hook_does_not_stall_kernel() {
    let k = kernel();
    let ran = shared();
    let r = ran.clone();
    k.register(
        "a",
        Priority::new(3),
        STACK,
        TaskBody::run_once(move |ctx| {
            ctx.on_exit(|| panic!("hook boom"));
            ctx.on_exit(move || r.lock().push("second hook"));
        }),
    )
    .unwrap();
    let r = ran.clone();
    k.register(
        "b",
        Priority::new(1),
        STACK,
        TaskBody::run_once(move |_| r.lock().push("b")),
    )
    .unwrap();

    let report = k.run_for(Duration::from_secs(1)).unwrap();
    assert_eq!(report.reason, HaltReason::Quiescent);
    assert_eq!(*ran.lock(), vec!["second hook", "b"]);
    let faults = k.faults();
    assert_eq!(faults.len(), 1);
    assert!(matches!(&faults[0], Fault::TaskPanicked { message, .. } if message == "hook boom"));
    assert_eq!(report.heap.used, 0);
}

#[test]
fn test_exit_hook_runs_after_body_panic() {
    let k = kernel();
    let ran = shared();
    let r = ran.clone();
    k.register(
        "doomed",
        Priority::new(3),
        STACK,
        TaskBody::run_once(move |ctx| {
            ctx.on_exit(move || r.lock().push("hook"));
            panic!("body down");
        }),
    )
    .unwrap();

    let report = k.run_for(Duration::from_secs(1)).unwrap();
    assert_eq!(report.reason, HaltReason::Quiescent);
    assert_eq!(*ran.lock(), vec!["hook"]);
    assert_eq!(k.faults().len(), 1);
}

#[test]
fn test_join_of_panicked_thread_reports_panic() {
    let k = kernel();
    let seen = shared();
    let s = seen.clone();
    k.register(
        "parent",
        Priority::new(3),
        STACK,
        TaskBody::run_once(move |ctx| {
            let worker = ThreadBuilder::new()
                .name("worker")
                .priority(Priority::new(5))
                .spawn(ctx, |_| panic!("worker down"))
                .unwrap();
            assert!(worker.is_finished());
            let flags = ctx.kernel().task_info(worker.id()).map(|t| t.flags);
            s.lock().push((worker.join(ctx), flags.map(|f| f.contains(TaskFlags::PANICKED))));
        }),
    )
    .unwrap();

    let report = k.run_for(Duration::from_secs(1)).unwrap();
    assert_eq!(
        *seen.lock(),
        vec![(Err(ExecError::ProducerPanicked(String::from("worker down"))), Some(true))]
    );
    let faults = k.faults();
    assert_eq!(faults.len(), 1);
    assert!(matches!(faults[0], Fault::TaskPanicked { .. }));
    assert!(report.tasks.is_empty());
}

// =========================================================================
// Deferred Results
// =========================================================================

#[test]
fn test_eager_sum_independent_of_completion_order() {
    for delays in [[30, 10, 0], [0, 0, 0], [5, 25, 15], [10, 10, 10]] {
        let k = kernel();
        let seen = shared();
        let s = seen.clone();
        k.register(
            "consumer",
            Priority::new(3),
            STACK,
            TaskBody::run_once(move |ctx| {
                let consumer = ctx.id();
                let [d1, d2, d3] = delays;
                let mut f1 = spawn_async(ctx, Launch::Async, move |ctx| {
                    ctx.sleep_for(ms(d1));
                    2
                })
                .unwrap();
                let mut f2 = spawn_async(ctx, Launch::Async, move |ctx| {
                    ctx.work_for(ms(d2));
                    3
                })
                .unwrap();
                let mut f3 = spawn_async(ctx, Launch::Deferred, move |ctx| {
                    ctx.sleep_for(ms(d3));
                    (5, ctx.id())
                })
                .unwrap();
                assert!(f3.is_deferred());

                let a = f1.get(ctx).unwrap();
                let b = f2.get(ctx).unwrap();
                let (c, ran_on) = f3.get(ctx).unwrap();
                s.lock().push((a + b + c, ran_on == consumer));
            }),
        )
        .unwrap();

        let report = k.run_for(Duration::from_secs(1)).unwrap();
        assert_eq!(*seen.lock(), vec![(10, true)], "delays {:?}", delays);
        assert_eq!(report.reason, HaltReason::Quiescent);
        assert!(report.tasks.is_empty());
    }
}

#[test]
fn test_set_value_at_exit_after_termination() {
    for delay in [0, 1, 20] {
        let k = kernel();
        let seen = shared();
        let s = seen.clone();
        k.register(
            "consumer",
            Priority::new(3),
            STACK,
            TaskBody::run_once(move |ctx| {
                let consumer = ctx.id();
                let mut promise = Promise::new();
                let mut fut = promise.get_future().unwrap();
                let producer = ThreadHandle::spawn(ctx, move |ctx| {
                    ctx.sleep_for(ms(delay));
                    promise.set_value_at_exit(ctx, 9).unwrap();
                    ctx.work_for(ms(2));
                    assert_eq!(ctx.kernel().task_state(consumer), Some(TaskState::Blocked));
                })
                .unwrap();
                let id = producer.id();
                producer.detach();

                let value = fut.get(ctx).unwrap();
                let state = ctx.kernel().task_state(id);
                s.lock().push((value, state.map_or(true, |st| st.is_terminated())));
            }),
        )
        .unwrap();

        k.run_for(Duration::from_secs(1)).unwrap();
        assert_eq!(*seen.lock(), vec![(9, true)], "delay {}", delay);
        assert!(k.faults().is_empty());
    }
}

#[test]
fn test_packaged_task_matches_eager_dispatch() {
    let k = kernel();
    let seen = shared();
    let s = seen.clone();
    k.register(
        "consumer",
        Priority::new(3),
        STACK,
        TaskBody::run_once(move |ctx| {
            let mut task = PackagedTask::new(|_: &TaskContext| 7 + 8 + 9);
            let mut packaged = task.get_future().unwrap();
            assert_eq!(task.get_future().err(), Some(ExecError::FutureAlreadyRetrieved));
            let worker = ThreadHandle::spawn(ctx, move |ctx| task.invoke(ctx).unwrap()).unwrap();
            let mut eager = spawn_async(ctx, Launch::Async, |_| 7 + 8 + 9).unwrap();

            worker.join(ctx).unwrap();
            assert!(packaged.is_ready());
            s.lock().push((packaged.get(ctx).unwrap(), eager.get(ctx).unwrap()));
        }),
    )
    .unwrap();

    k.run_for(Duration::from_secs(1)).unwrap();
    assert_eq!(*seen.lock(), vec![(24, 24)]);
}

#[test]
fn test_result_contract_violations() {
    let k = kernel();
    let seen = shared();
    let s = seen.clone();
    k.register(
        "consumer",
        Priority::new(3),
        STACK,
        TaskBody::run_once(move |ctx| {
            let mut deferred = spawn_async(ctx, Launch::Deferred, |_| 1_u32).unwrap();
            deferred.wait(ctx).unwrap();
            assert!(deferred.is_ready());
            s.lock().push(deferred.get(ctx).map(|_| ()));
            s.lock().push(deferred.get(ctx).map(|_| ()));
            assert!(!deferred.is_valid());

            let mut promise = Promise::new();
            let mut fut = promise.get_future().unwrap();
            s.lock().push(promise.get_future().map(|_| ()));
            promise.set_value(4_u32).unwrap();
            s.lock().push(promise.set_value(5));
            s.lock().push(fut.get(ctx).map(|_| ()));

            let mut orphan = {
                let mut promise = Promise::<u32>::new();
                promise.get_future().unwrap()
            };
            s.lock().push(orphan.get(ctx).map(|_| ()));

            let mut unrun = {
                let mut task = PackagedTask::new(|_: &TaskContext| 1_u32);
                task.get_future().unwrap()
            };
            s.lock().push(unrun.get(ctx).map(|_| ()));
        }),
    )
    .unwrap();

    k.run_for(Duration::from_secs(1)).unwrap();
    assert_eq!(
        *seen.lock(),
        vec![
            Ok(()),
            Err(ExecError::ResultAlreadyConsumed),
            Err(ExecError::FutureAlreadyRetrieved),
            Err(ExecError::ResultAlreadyProduced),
            Ok(()),
            Err(ExecError::BrokenPromise),
            Err(ExecError::BrokenPromise),
        ]
    );
}

#[test]
fn test_set_error_and_second_set_at_exit() {
    let k = kernel();
    let seen = shared();
    let s = seen.clone();
    k.register(
        "consumer",
        Priority::new(3),
        STACK,
        TaskBody::run_once(move |ctx| {
            let mut promise = Promise::<u32>::new();
            let mut fut = promise.get_future().unwrap();
            promise.set_error(ExecError::InvalidArgument).unwrap();
            s.lock().push(promise.set_value_at_exit(ctx, 3));
            s.lock().push(fut.get(ctx).map(|_| ()));
        }),
    )
    .unwrap();

    k.run_for(Duration::from_secs(1)).unwrap();
    assert_eq!(
        *seen.lock(),
        vec![Err(ExecError::ResultAlreadyProduced), Err(ExecError::InvalidArgument)]
    );
}

#[test]
fn test_producer_panic_reaches_consumer() {
    let k = kernel();
    let seen = shared();
    let s = seen.clone();
    k.register(
        "consumer",
        Priority::new(3),
        STACK,
        TaskBody::run_once(move |ctx| {
            let mut eager = spawn_async(ctx, Launch::Async, |_| -> u32 { panic!("bad input") }).unwrap();
            s.lock().push(eager.get(ctx));
            let mut lazy = spawn_async(ctx, Launch::Deferred, |_| -> u32 { panic!("lazy") }).unwrap();
            s.lock().push(lazy.get(ctx));
        }),
    )
    .unwrap();

    k.run_for(Duration::from_secs(1)).unwrap();
    assert_eq!(
        *seen.lock(),
        vec![
            Err(ExecError::ProducerPanicked(String::from("bad input"))),
            Err(ExecError::ProducerPanicked(String::from("lazy"))),
        ]
    );
    assert!(k.faults().is_empty());
}

// =========================================================================
// Starvation
// =========================================================================

#[test]
fn test_three_context_scenario_starves_nobody() {
    let k = kernel();
    let max = Priority::new(k.config().max_priority());
    let blinks = Arc::new(Mutex::new(0_u32));
    let ticks = Arc::new(Mutex::new(0_u32));
    let results = shared();

    let b = blinks.clone();
    k.register(
        "task1",
        Priority::new(2),
        STACK,
        TaskBody::periodic(ms(500), move |_| *b.lock() += 1),
    )
    .unwrap();

    let t = ticks.clone();
    k.register(
        "task2",
        max,
        STACK,
        TaskBody::park_forever(move |ctx| {
            let t = t.clone();
            let ticker = ThreadHandle::spawn(ctx, move |ctx| {
                ctx.set_priority(Priority::new(3)).unwrap();
                loop {
                    *t.lock() += 1;
                    ctx.sleep_for(Duration::from_secs(1));
                }
            })
            .unwrap();
            ticker.detach();
        }),
    )
    .unwrap();

    let r = results.clone();
    k.register(
        "task3",
        Priority::new(3),
        STACK,
        TaskBody::run_once(move |ctx| {
            ctx.sleep_for(ms(500));
            let mut sum = 0;
            for v in [2, 3, 5] {
                sum += spawn_async(ctx, Launch::Async, move |_| v).unwrap().get(ctx).unwrap();
            }
            r.lock().push(sum);
        }),
    )
    .unwrap();

    let report = k.run_for(Duration::from_secs(5)).unwrap();
    assert_eq!(report.reason, HaltReason::WindowElapsed);
    assert_eq!(report.ticks, 5_000);
    assert_eq!(*blinks.lock(), 11);
    assert_eq!(*ticks.lock(), 6);
    assert_eq!(*results.lock(), vec![10]);
    assert_eq!(report.task("task2").map(|t| t.state), Some(TaskState::Suspended));
    assert_eq!(report.task("task1").map(|t| t.state), Some(TaskState::Blocked));
    assert!(report.task("task3").is_none());
}
