//! Dispatch ordering for queued tasks.
//!
//! Strict priority across levels, most recent first within a level.

pub mod priority;

pub use priority::{PriorityQueue, QueueEntry};
