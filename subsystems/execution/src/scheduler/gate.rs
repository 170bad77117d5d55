//! # CPU Token Handoff
//!
//! Every execution context owns a gate. A context runs only while it holds
//! the CPU token; switching means granting the next context's gate and then
//! waiting on one's own.

use core::sync::atomic::{AtomicBool, Ordering};
use spin::Mutex;
use std::thread::{self, Thread};

/// One-shot, reusable wake-up gate for a single host thread
#[derive(Debug, Default)]
pub(crate) struct Gate {
    granted: AtomicBool,
    waiter: Mutex<Option<Thread>>,
}

impl Gate {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Hand the token to the thread waiting on this gate
    pub(crate) fn grant(&self) {
        self.granted.store(true, Ordering::SeqCst);
        if let Some(waiter) = self.waiter.lock().as_ref() {
            waiter.unpark();
        }
    }

    /// Block the calling thread until the gate is granted, consuming the grant
    ///
    /// The waiter registers before testing the flag, so a grant that lands
    /// in between is seen either by the flag test or by the unpark.
    pub(crate) fn wait(&self) {
        *self.waiter.lock() = Some(thread::current());
        while !self.granted.swap(false, Ordering::SeqCst) {
            thread::park();
        }
    }
}
