//! # Deferred Results
//!
//! A [`Future`] is the consuming end of a write-once, read-once result. The
//! producing end is one of:
//!
//! - [`spawn_async`] with [`Launch::Async`]: the callable runs on a new
//!   detached thread.
//! - [`spawn_async`] with [`Launch::Deferred`]: the callable runs on the
//!   first context that waits for the result.
//! - [`Promise`]: the value is set explicitly, now or at thread exit.
//! - [`PackagedTask`]: a callable invoked wherever the owner chooses.
//!
//! Retrieval blocks the calling context, not the whole system.

pub mod packaged;
pub mod promise;
pub(crate) mod slot;

pub use packaged::PackagedTask;
pub use promise::Promise;

use crate::fault::panic_message;
use crate::thread::ThreadHandle;
use crate::{ExecError, ExecResult, TaskContext};
use core::fmt;
use core::mem;
use slot::Slot;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// Dispatch policy for [`spawn_async`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Launch {
    /// Run on a new thread right away
    #[default]
    Async,
    /// Run lazily on the first waiter
    ///
    /// Never concurrent: the callable executes inside `wait`/`get` on the
    /// caller's context.
    Deferred,
}

type DeferredFn<T> = Box<dyn FnOnce(&TaskContext) -> T + Send>;

enum Source<T> {
    Shared(Arc<Slot<T>>),
    Deferred(DeferredFn<T>),
    Local(ExecResult<T>),
    Consumed,
}

/// Consuming end of a deferred result
pub struct Future<T> {
    source: Source<T>,
}

impl<T: Send + 'static> Future<T> {
    pub(crate) fn shared(slot: Arc<Slot<T>>) -> Self {
        Self {
            source: Source::Shared(slot),
        }
    }

    fn deferred(f: DeferredFn<T>) -> Self {
        Self {
            source: Source::Deferred(f),
        }
    }

    /// Check if the result has not been taken yet
    pub fn is_valid(&self) -> bool {
        !matches!(self.source, Source::Consumed)
    }

    /// Check if the producer runs lazily on the waiter
    pub fn is_deferred(&self) -> bool {
        matches!(self.source, Source::Deferred(_))
    }

    /// Check if `get` would return without blocking or computing
    pub fn is_ready(&self) -> bool {
        match &self.source {
            Source::Shared(slot) => slot.is_ready(),
            Source::Local(_) => true,
            Source::Deferred(_) | Source::Consumed => false,
        }
    }

    /// Block until the result is available, without taking it
    pub fn wait(&mut self, ctx: &TaskContext) -> ExecResult<()> {
        match &self.source {
            Source::Shared(slot) => slot.wait(ctx),
            Source::Local(_) => Ok(()),
            Source::Consumed => Err(ExecError::ResultAlreadyConsumed),
            Source::Deferred(_) => {
                if let Source::Deferred(f) = mem::replace(&mut self.source, Source::Consumed) {
                    self.source = Source::Local(run_guarded(f, ctx));
                }
                Ok(())
            }
        }
    }

    /// Block until the result is available and take it
    ///
    /// A second call fails with `ResultAlreadyConsumed`.
    pub fn get(&mut self, ctx: &TaskContext) -> ExecResult<T> {
        match mem::replace(&mut self.source, Source::Consumed) {
            Source::Shared(slot) => slot.get(ctx),
            Source::Deferred(f) => run_guarded(f, ctx),
            Source::Local(result) => result,
            Source::Consumed => Err(ExecError::ResultAlreadyConsumed),
        }
    }
}

impl<T> fmt::Debug for Future<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let source = match &self.source {
            Source::Shared(_) => "shared",
            Source::Deferred(_) => "deferred",
            Source::Local(_) => "local",
            Source::Consumed => "consumed",
        };
        f.debug_struct("Future").field("source", &source).finish()
    }
}

/// Run `f` on `ctx`, turning a panic into `ProducerPanicked`
pub(crate) fn run_guarded<T>(f: impl FnOnce(&TaskContext) -> T, ctx: &TaskContext) -> ExecResult<T> {
    panic::catch_unwind(AssertUnwindSafe(|| f(ctx))).map_err(|payload| {
        let message = panic_message(payload.as_ref());
        log::warn!("producer on {} panicked: {}", ctx.id(), message);
        ExecError::ProducerPanicked(message)
    })
}

/// Run `f` and return a future for its result
///
/// With [`Launch::Async`] a detached thread is spawned at the caller's
/// priority; registration failures are returned here. Dropping the future
/// does not stop the thread.
pub fn spawn_async<T, F>(ctx: &TaskContext, launch: Launch, f: F) -> ExecResult<Future<T>>
where
    T: Send + 'static,
    F: FnOnce(&TaskContext) -> T + Send + 'static,
{
    match launch {
        Launch::Deferred => Ok(Future::deferred(Box::new(f))),
        Launch::Async => {
            let slot = Arc::new(Slot::new());
            let producer = Arc::clone(&slot);
            let handle = ThreadHandle::spawn(ctx, move |ctx| {
                let _ = producer.fulfil(run_guarded(f, ctx));
            })?;
            handle.detach();
            Ok(Future::shared(slot))
        }
    }
}
