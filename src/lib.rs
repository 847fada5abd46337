//! taskpool-rs - priority thread pool with deadlock-free waits
//!
//! Offloads long-running work from an interactive thread. Tasks run on a
//! small set of worker threads in priority order and can be waited on from
//! anywhere, including from inside other tasks and from the main/UI thread.
//!
//! # Quick Start
//!
//! ```no_run
//! use taskpool_rs::prelude::*;
//!
//! let pool = ThreadPool::with_threads(4).unwrap();
//! let mut group = TaskGroup::new(&pool);
//!
//! for slice in 0..16 {
//!     group.enqueue(move || println!("decoding slice {}", slice), TaskPriority::Normal);
//! }
//!
//! assert!(group.wait_all(None));
//! ```
//!
//! # Features
//!
//! - **Priority scheduling**: five levels, most recent first within a level
//! - **Cancellation**: queued tasks can be dequeued until they start
//! - **Helping waits**: a worker waiting on its own pool runs queued tasks
//!   instead of blocking
//! - **Main loop integration**: the main thread keeps processing posted
//!   events while it waits
//! - **Task groups**: wait for the first or all tasks of a batch, cancel on
//!   drop, or wait on drop with [`NoLockedTask`]
//! - **Telemetry**: counters and run-time histogram (feature `telemetry`)

#![warn(missing_debug_implementations)]

pub mod config;
pub mod dispatch;
pub mod error;
pub mod executor;
pub mod group;
pub mod prelude;
pub mod runtime;
pub mod scheduler;
pub mod telemetry;

// Re-export key types at crate root
pub use config::{Config, ConfigBuilder};
pub use dispatch::{
    exec_in_main_thread_async, exec_in_main_thread_sync, exec_unlocked, is_gui_thread, MainLoop,
};
pub use error::{Error, Result};
pub use executor::{Task, TaskId, TaskPriority, ThreadPool};
pub use group::{NoLockedTask, TaskGroup};
pub use runtime::{init, init_with_config, instance};
