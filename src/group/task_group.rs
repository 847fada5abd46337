use crate::error::Result;
use crate::executor::{catch_task, PanicInfo, TaskId, TaskPriority, ThreadPool};
use parking_lot::Mutex;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// A set of tasks submitted to one pool and waited on or cancelled together.
///
/// The group forgets an id once a wait has seen it finish. Dropping the
/// group cancels whatever has not started yet; it does not wait. Call
/// [`wait_all`](Self::wait_all) first when completion matters.
pub struct TaskGroup<'p> {
    pool: &'p ThreadPool,
    ids: Vec<TaskId>,
    failures: Arc<Mutex<Vec<PanicInfo>>>,
}

impl<'p> TaskGroup<'p> {
    pub fn new(pool: &'p ThreadPool) -> Self {
        Self {
            pool,
            ids: Vec::new(),
            failures: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn pool(&self) -> &'p ThreadPool {
        self.pool
    }

    pub fn enqueue<F>(&mut self, f: F, priority: TaskPriority) -> Option<TaskId>
    where
        F: FnOnce() + Send + 'static,
    {
        let id = self.pool.enqueue(f, priority)?;
        self.ids.push(id);
        Some(id)
    }

    /// Like [`enqueue`](Self::enqueue), but a panic in `f` is recorded in
    /// the group instead of unwinding into the pool.
    pub fn enqueue_catching<F>(&mut self, f: F, priority: TaskPriority) -> Option<TaskId>
    where
        F: FnOnce() + Send + 'static,
    {
        let failures = Arc::clone(&self.failures);
        self.enqueue(
            move || {
                if let Err(info) = catch_task(f) {
                    tracing::debug!(message = %info.message, "grouped task panicked");
                    failures.lock().push(info);
                }
            },
            priority,
        )
    }

    /// Submit `f` once fewer than `limit` tasks of this group are
    /// outstanding, waiting for earlier ones as needed.
    ///
    /// Returns `None` if `stop` interrupts the wait or the pool refuses the
    /// task.
    pub fn enqueue_bounded<F>(
        &mut self,
        limit: usize,
        f: F,
        priority: TaskPriority,
        stop: Option<&AtomicBool>,
    ) -> Option<TaskId>
    where
        F: FnOnce() + Send + 'static,
    {
        while self.ids.len() >= limit.max(1) {
            if !self.wait_first(stop) {
                return None;
            }
        }
        self.enqueue(f, priority)
    }

    /// Wait until one task of the group finishes and forget it.
    ///
    /// Returns false if `stop` interrupted the wait. An empty group returns
    /// true at once.
    pub fn wait_first(&mut self, stop: Option<&AtomicBool>) -> bool {
        if self.ids.is_empty() {
            return true;
        }

        match self.pool.wait_first(&self.ids, stop) {
            Some(finished) => {
                self.ids.retain(|id| *id != finished);
                true
            }
            None => false,
        }
    }

    /// Wait until every task of the group has finished.
    ///
    /// Returns false if `stop` interrupted the wait; ids not yet seen
    /// finishing stay in the group.
    pub fn wait_all(&mut self, stop: Option<&AtomicBool>) -> bool {
        while !self.ids.is_empty() {
            let snapshot = self.ids.len();
            if !self.pool.wait_all(&self.ids[..snapshot], stop) {
                return false;
            }
            self.ids.drain(..snapshot);
        }
        true
    }

    /// [`wait_all`](Self::wait_all), then report the first panic recorded by
    /// a task submitted with [`enqueue_catching`](Self::enqueue_catching).
    pub fn wait_all_checked(&mut self, stop: Option<&AtomicBool>) -> Result<bool> {
        let completed = self.wait_all(stop);

        let mut failures = self.failures.lock();
        if failures.is_empty() {
            Ok(completed)
        } else {
            Err(failures.remove(0).into())
        }
    }

    /// Drain the panics recorded so far.
    pub fn take_failures(&self) -> Vec<PanicInfo> {
        std::mem::take(&mut *self.failures.lock())
    }

    /// Whether the group has nothing outstanding.
    ///
    /// Without `check_pool` only the group's own bookkeeping is consulted,
    /// which lags until a wait observes completion. With `check_pool` the
    /// pool is asked whether every remembered id has actually finished.
    pub fn is_empty(&self, check_pool: bool) -> bool {
        if check_pool {
            self.pool.check(&self.ids)
        } else {
            self.ids.is_empty()
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn ids(&self) -> &[TaskId] {
        &self.ids
    }

    /// Cancel every task of the group that has not started and forget all
    /// of them. Running tasks are left to finish.
    pub fn stop(&mut self) {
        if self.ids.is_empty() {
            return;
        }

        let running = self.pool.dequeue_many(&self.ids);
        tracing::trace!(owned = self.ids.len(), running, "task group stopped");
        self.ids.clear();
    }
}

impl Drop for TaskGroup<'_> {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for TaskGroup<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskGroup")
            .field("ids", &self.ids)
            .field("failures", &self.failures.lock().len())
            .finish()
    }
}
