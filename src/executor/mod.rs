//! Task execution infrastructure.
//!
//! This module provides the task primitives, the worker threads and the
//! priority thread pool.

pub mod panic_handler;
pub mod task;
pub mod thread_pool;
pub(crate) mod worker;

pub use panic_handler::{catch_task, PanicInfo};
pub use task::{Task, TaskId, TaskPriority};
pub use thread_pool::ThreadPool;
