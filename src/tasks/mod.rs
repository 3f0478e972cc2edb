//! Background Tasks Module
//!
//! Long-running tasks that keep shared state tidy.

pub mod cleanup;

pub use cleanup::spawn_cleanup_task;
