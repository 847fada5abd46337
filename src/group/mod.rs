//! Caller-side handles over pool tasks.

pub mod no_locked;
pub mod task_group;

pub use no_locked::NoLockedTask;
pub use task_group::TaskGroup;
