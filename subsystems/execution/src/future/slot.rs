//! # Shared Result Slot
//!
//! The state shared between one producer and one consumer. Written once,
//! read once.

use crate::context::{TaskContext, Waiter};
use crate::{ExecError, ExecResult};
use core::fmt;
use core::mem;
use spin::Mutex;

enum SlotState<T> {
    /// No value yet
    Pending {
        waiters: Vec<Waiter>,
        /// The write has been claimed and will be committed later
        staged: bool,
    },
    Ready(ExecResult<T>),
    Consumed,
}

/// Write-once, read-once result slot
pub(crate) struct Slot<T> {
    state: Mutex<SlotState<T>>,
}

impl<T> Slot<T> {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(SlotState::Pending {
                waiters: Vec::new(),
                staged: false,
            }),
        }
    }

    /// Check if a value (or error) is stored and not yet taken
    pub(crate) fn is_ready(&self) -> bool {
        matches!(*self.state.lock(), SlotState::Ready(_))
    }

    /// Reserve the write for a later [`Slot::commit`]
    pub(crate) fn claim(&self) -> ExecResult<()> {
        match &mut *self.state.lock() {
            SlotState::Pending { staged, .. } if !*staged => {
                *staged = true;
                Ok(())
            }
            _ => Err(ExecError::ResultAlreadyProduced),
        }
    }

    /// Store the result and wake every waiter
    pub(crate) fn fulfil(&self, result: ExecResult<T>) -> ExecResult<()> {
        self.store(result, false)
    }

    /// Store the result of a claimed write
    pub(crate) fn commit(&self, result: ExecResult<T>) -> ExecResult<()> {
        self.store(result, true)
    }

    /// Store `BrokenPromise` if nothing was ever written or claimed
    ///
    /// Returns whether the slot was abandoned.
    pub(crate) fn abandon(&self) -> bool {
        self.store(Err(ExecError::BrokenPromise), false).is_ok()
    }

    fn store(&self, result: ExecResult<T>, claimed: bool) -> ExecResult<()> {
        let waiters = {
            let mut state = self.state.lock();
            let waiters = match &mut *state {
                SlotState::Pending { waiters, staged } if *staged == claimed => mem::take(waiters),
                _ => return Err(ExecError::ResultAlreadyProduced),
            };
            *state = SlotState::Ready(result);
            waiters
        };
        for waiter in waiters {
            waiter.wake();
        }
        Ok(())
    }

    /// Block `ctx` until the slot holds a result
    pub(crate) fn wait(&self, ctx: &TaskContext) -> ExecResult<()> {
        loop {
            {
                let mut state = self.state.lock();
                match &mut *state {
                    SlotState::Ready(_) => return Ok(()),
                    SlotState::Consumed => return Err(ExecError::ResultAlreadyConsumed),
                    SlotState::Pending { waiters, .. } => waiters.push(ctx.waiter()),
                }
            }
            ctx.block();
        }
    }

    /// Block `ctx` until the slot holds a result, then take it
    pub(crate) fn get(&self, ctx: &TaskContext) -> ExecResult<T> {
        self.wait(ctx)?;
        match mem::replace(&mut *self.state.lock(), SlotState::Consumed) {
            SlotState::Ready(result) => result,
            _ => Err(ExecError::ResultAlreadyConsumed),
        }
    }
}

impl<T> fmt::Debug for Slot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &*self.state.lock() {
            SlotState::Pending { staged: false, .. } => "pending",
            SlotState::Pending { staged: true, .. } => "staged",
            SlotState::Ready(_) => "ready",
            SlotState::Consumed => "consumed",
        };
        f.debug_struct("Slot").field("state", &state).finish()
    }
}
