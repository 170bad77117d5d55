//! # Thread Management
//!
//! std-style thread handles. Every spawned thread is an on-demand execution
//! context of the kernel that spawned it.

pub mod handle;

pub use handle::{ThreadBuilder, ThreadHandle};
