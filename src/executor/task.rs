//! Task representation and execution.

use std::fmt;
use std::num::NonZeroU64;

/// Identifier of a task within one pool's lifetime.
///
/// Ids grow monotonically per pool and are never zero, so "no task" is
/// spelled `Option<TaskId>::None` at no extra cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(NonZeroU64);

impl TaskId {
    pub(crate) fn from_raw(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(TaskId)
    }

    /// Raw numeric value, useful for logging.
    pub fn get(self) -> u64 {
        self.0.get()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Priority level for task scheduling.
///
/// Variants are declared lowest first, so the derived `Ord` ranks
/// `Critical` highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "telemetry", derive(serde::Serialize))]
pub enum TaskPriority {
    Lowest,
    Low,
    #[default]
    Normal,
    High,
    Critical,
}

impl TaskPriority {
    pub const ALL: [TaskPriority; 5] = [
        TaskPriority::Lowest,
        TaskPriority::Low,
        TaskPriority::Normal,
        TaskPriority::High,
        TaskPriority::Critical,
    ];
}

/// A unit of work: runs once, returns nothing.
pub struct Task {
    func: Box<dyn FnOnce() + Send + 'static>,
}

impl Task {
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Task { func: Box::new(f) }
    }

    /// Execute the task
    pub fn run(self) {
        (self.func)();
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task").finish_non_exhaustive()
    }
}
