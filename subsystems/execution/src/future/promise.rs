//! # Promise

use super::slot::Slot;
use super::Future;
use crate::{ExecError, ExecResult, TaskContext};
use std::sync::Arc;

/// Producing end of a deferred result, set explicitly
///
/// Dropping a promise that was never set stores `BrokenPromise`.
#[derive(Debug)]
pub struct Promise<T> {
    /// `None` once ownership of the write moved to an exit hook
    slot: Option<Arc<Slot<T>>>,
    future_taken: bool,
}

impl<T: Send + 'static> Promise<T> {
    /// Create a promise with no value
    pub fn new() -> Self {
        Self {
            slot: Some(Arc::new(Slot::new())),
            future_taken: false,
        }
    }

    /// Hand out the future; only once
    pub fn get_future(&mut self) -> ExecResult<Future<T>> {
        if self.future_taken {
            return Err(ExecError::FutureAlreadyRetrieved);
        }
        let slot = self.slot.clone().ok_or(ExecError::FutureAlreadyRetrieved)?;
        self.future_taken = true;
        Ok(Future::shared(slot))
    }

    /// Store the value and wake the waiter
    pub fn set_value(&self, value: T) -> ExecResult<()> {
        self.store(Ok(value))
    }

    /// Store a producer failure
    pub fn set_error(&self, error: ExecError) -> ExecResult<()> {
        self.store(Err(error))
    }

    fn store(&self, result: ExecResult<T>) -> ExecResult<()> {
        match &self.slot {
            Some(slot) => slot.fulfil(result),
            None => Err(ExecError::ResultAlreadyProduced),
        }
    }

    /// Store the value once the calling context has fully terminated
    ///
    /// The write is reserved now, so a later set fails, but the waiter only
    /// sees the value after the body of `ctx` has returned.
    pub fn set_value_at_exit(mut self, ctx: &TaskContext, value: T) -> ExecResult<()> {
        let slot = self.slot.take().ok_or(ExecError::ResultAlreadyProduced)?;
        if let Err(err) = slot.claim() {
            self.slot = Some(slot);
            return Err(err);
        }
        ctx.on_exit(move || {
            if let Err(err) = slot.commit(Ok(value)) {
                log::error!("promise commit at exit failed: {}", err);
            }
        });
        Ok(())
    }
}

impl<T: Send + 'static> Default for Promise<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for Promise<T> {
    fn drop(&mut self) {
        if let Some(slot) = self.slot.take() {
            if slot.abandon() {
                log::debug!("promise dropped without a value");
            }
        }
    }
}
