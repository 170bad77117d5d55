//! # Demo Tasks
//!
//! The three top-level execution contexts of the demo:
//!
//! - `task1` blinks the LED.
//! - `task2` hosts a ticking thread that lowers its own priority, then
//!   suspends itself.
//! - `task3` exercises futures, promises and packaged tasks.

use crate::console::{print_time, Console};
use kestrel_execution::{
    spawn_async, ExecResult, Future, Launch, PackagedTask, Priority, Promise, TaskBody,
    TaskContext, ThreadHandle,
};
use kestrel_hal::{DigitalOutput, Level};
use core::time::Duration;
use std::sync::Arc;

/// LED half period
pub const BLINK_HALF_PERIOD: Duration = Duration::from_millis(250);
/// Priority the ticking thread drops to
pub const TICKER_PRIORITY: Priority = Priority::new(3);

/// `task1`: toggle the LED forever
pub fn blink(led: Arc<dyn DigitalOutput>) -> TaskBody {
    let mut level = Level::Low;
    TaskBody::periodic(BLINK_HALF_PERIOD, move |_| {
        if let Err(err) = led.set(level) {
            log::warn!("{}: {}", led.name(), err);
        }
        level = level.toggled();
    })
}

/// `task2`: start the ticking thread, then suspend
pub fn ticker_host(console: Console) -> TaskBody {
    TaskBody::park_forever(move |ctx| {
        match ThreadHandle::spawn(ctx, move |ctx| tick_tock(ctx, &console)) {
            Ok(ticker) => ticker.detach(),
            Err(err) => log::error!("task2: cannot start ticker: {}", err),
        }
    })
}

fn tick_tock(ctx: &TaskContext, console: &Console) {
    if let Err(err) = ctx.set_priority(TICKER_PRIORITY) {
        log::warn!("ticker: {}", err);
    }
    loop {
        console.println("TICK");
        ctx.sleep_for(Duration::from_millis(500));

        console.print("TOCK\tnow: ");
        if !print_time(console, ctx.kernel()) {
            console.println("");
        }
        ctx.sleep_for(Duration::from_millis(500));
    }
}

/// `task3`: futures demo, then suspend
pub fn futures_demo(console: Console) -> TaskBody {
    TaskBody::park_forever(move |ctx| {
        console.println("task3:");
        console.flush();

        ctx.sleep_for(Duration::from_secs(5));

        console.println("task3: creating futures...");
        console.flush();

        match eager_and_deferred(ctx) {
            Ok(r) => {
                console.println(&format!("r={}", r));
                assert_eq!(2 + 3 + 5, r);
            }
            Err(err) => log::error!("task3: futures failed: {}", err),
        }

        match producers(ctx, &console) {
            Ok((r1, r2, r3)) => {
                console.println("Done!");
                console.println(&format!("Results are: {} {} {}", r1, r2, r3));
                console.flush();
                assert_eq!(7 + 8 + 9, r1 + r2 + r3);
            }
            Err(err) => log::error!("task3: producers failed: {}", err),
        }
    })
}

fn eager_and_deferred(ctx: &TaskContext) -> ExecResult<i32> {
    let mut result0 = spawn_async(ctx, Launch::default(), |_| 2)?;
    let mut result1 = spawn_async(ctx, Launch::Async, |_| 3)?;
    let mut result2 = spawn_async(ctx, Launch::Deferred, |_| 5)?;

    Ok(result0.get(ctx)? + result1.get(ctx)? + result2.get(ctx)?)
}

fn producers(ctx: &TaskContext, console: &Console) -> ExecResult<(i32, i32, i32)> {
    // packaged task on a thread
    let mut task = PackagedTask::new(|_: &TaskContext| 7);
    let mut f1 = task.get_future()?;
    let t2 = ThreadHandle::spawn(ctx, move |ctx| {
        if let Err(err) = task.invoke(ctx) {
            log::error!("packaged task: {}", err);
        }
    })?;

    // t2 is joined on every path
    let results = collect(ctx, console, &mut f1);
    let joined = t2.join(ctx);
    let results = results?;
    joined?;
    Ok(results)
}

fn collect(ctx: &TaskContext, console: &Console, f1: &mut Future<i32>) -> ExecResult<(i32, i32, i32)> {
    let mut f2 = spawn_async(ctx, Launch::Async, |_| 8)?;

    // promise set when its thread has gone
    let mut p = Promise::new();
    let mut f3 = p.get_future()?;
    ThreadHandle::spawn(ctx, move |ctx| {
        if let Err(err) = p.set_value_at_exit(ctx, 9) {
            log::error!("promise: {}", err);
        }
    })?
    .detach();

    console.println("Waiting...");
    console.flush();
    f1.wait(ctx)?;
    f2.wait(ctx)?;
    f3.wait(ctx)?;
    Ok((f1.get(ctx)?, f2.get(ctx)?, f3.get(ctx)?))
}
