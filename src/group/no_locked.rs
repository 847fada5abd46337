use super::TaskGroup;
use crate::executor::{TaskId, TaskPriority, ThreadPool};
use std::sync::atomic::AtomicBool;

/// Runs one task in the background and waits for it when dropped.
///
/// ```no_run
/// use taskpool_rs::NoLockedTask;
///
/// let checksum = std::sync::Arc::new(std::sync::atomic::AtomicU64::new(0));
/// {
///     let checksum = checksum.clone();
///     let _background = NoLockedTask::new(move || {
///         checksum.store(42, std::sync::atomic::Ordering::SeqCst);
///     });
///     // other work on this thread
/// }
/// assert_eq!(checksum.load(std::sync::atomic::Ordering::SeqCst), 42);
/// ```
#[derive(Debug)]
pub struct NoLockedTask<'p> {
    group: TaskGroup<'p>,
}

impl NoLockedTask<'static> {
    /// Run `f` on the process-wide pool at normal priority.
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self::with_pool(ThreadPool::instance(), f, TaskPriority::Normal)
    }
}

impl<'p> NoLockedTask<'p> {
    pub fn with_pool<F>(pool: &'p ThreadPool, f: F, priority: TaskPriority) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let mut group = TaskGroup::new(pool);
        if group.enqueue(f, priority).is_none() {
            tracing::warn!("background task refused by a stopped pool");
        }
        Self { group }
    }

    /// Id of the task, `None` if the pool refused it or a wait already saw
    /// it finish.
    pub fn id(&self) -> Option<TaskId> {
        self.group.ids().first().copied()
    }

    /// Wait for the task early. Returns false if `stop` interrupted.
    pub fn wait(&mut self, stop: Option<&AtomicBool>) -> bool {
        self.group.wait_all(stop)
    }

    /// Cancel the task if it has not started.
    pub fn stop(&mut self) {
        self.group.stop();
    }

    pub fn complete(&self, check_pool: bool) -> bool {
        self.group.is_empty(check_pool)
    }
}

impl Drop for NoLockedTask<'_> {
    fn drop(&mut self) {
        self.group.wait_all(None);
    }
}
