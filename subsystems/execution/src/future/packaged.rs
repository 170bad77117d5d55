//! # Packaged Task

use super::slot::Slot;
use super::{run_guarded, Future};
use crate::{ExecError, ExecResult, TaskContext};
use core::fmt;
use std::sync::Arc;

type PackagedFn<T> = Box<dyn FnOnce(&TaskContext) -> T + Send>;

/// A callable bundled with the future for its result
///
/// Typically moved into a thread and invoked there. Dropping it uninvoked
/// stores `BrokenPromise`.
pub struct PackagedTask<T> {
    f: Option<PackagedFn<T>>,
    slot: Arc<Slot<T>>,
    future_taken: bool,
}

impl<T: Send + 'static> PackagedTask<T> {
    /// Package `f`
    pub fn new(f: impl FnOnce(&TaskContext) -> T + Send + 'static) -> Self {
        Self {
            f: Some(Box::new(f)),
            slot: Arc::new(Slot::new()),
            future_taken: false,
        }
    }

    /// Hand out the future; only once
    pub fn get_future(&mut self) -> ExecResult<Future<T>> {
        if self.future_taken {
            return Err(ExecError::FutureAlreadyRetrieved);
        }
        self.future_taken = true;
        Ok(Future::shared(Arc::clone(&self.slot)))
    }

    /// Check if the callable has not run yet
    pub fn is_valid(&self) -> bool {
        self.f.is_some()
    }

    /// Run the callable on `ctx` and store its result
    pub fn invoke(mut self, ctx: &TaskContext) -> ExecResult<()> {
        let f = self.f.take().ok_or(ExecError::ResultAlreadyProduced)?;
        self.slot.fulfil(run_guarded(f, ctx))
    }
}

impl<T> Drop for PackagedTask<T> {
    fn drop(&mut self) {
        if self.f.is_some() && self.slot.abandon() {
            log::debug!("packaged task dropped without being invoked");
        }
    }
}

impl<T> fmt::Debug for PackagedTask<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PackagedTask")
            .field("invoked", &self.f.is_none())
            .field("slot", &self.slot)
            .finish()
    }
}
