use super::task::{Task, TaskId, TaskPriority};
use super::worker;
use crate::config::Config;
use crate::dispatch;
use crate::error::{Error, Result};
use crate::scheduler::PriorityQueue;
use crate::telemetry::{Metrics, MetricsSnapshot};
use crossbeam_channel::{Receiver, Sender};
use parking_lot::{Condvar, Mutex};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

static NEXT_POOL_ID: AtomicUsize = AtomicUsize::new(1);

/// Task table entry. A running task keeps its entry until its body returns.
enum Slot {
    Queued(Task),
    Running,
}

/// State shared between the pool handle and its worker threads.
pub(crate) struct Shared {
    pool_id: usize,
    config: Config,
    next_id: AtomicU64,
    queue: Mutex<PriorityQueue>,
    table: Mutex<HashMap<TaskId, Slot>>,
    // completion counter, bumped once per finished or cancelled task
    progress: Mutex<u64>,
    progressed: Condvar,
    // main-thread waiters that want a wake-up event per completion
    main_waiters: AtomicUsize,
    metrics: Metrics,
}

impl Shared {
    pub(crate) fn pool_id(&self) -> usize {
        self.pool_id
    }

    pub(crate) fn config(&self) -> &Config {
        &self.config
    }

    fn next_task_id(&self) -> Option<TaskId> {
        TaskId::from_raw(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    fn completions(&self) -> u64 {
        *self.progress.lock()
    }

    fn notify_progress(&self) {
        {
            let mut counter = self.progress.lock();
            *counter += 1;
            self.progressed.notify_all();
        }

        if self.main_waiters.load(Ordering::Acquire) > 0 {
            dispatch::wake_main_loop();
        }
    }

    /// Block until the completion counter moves past `seen` or `timeout`
    /// elapses.
    fn park(&self, seen: u64, timeout: Duration) {
        let mut counter = self.progress.lock();
        if *counter == seen {
            self.progressed.wait_for(&mut counter, timeout);
        }
    }

    /// Pop the highest-priority live task and run it on the calling thread.
    ///
    /// Stale heap entries (tasks cancelled after they were queued) are
    /// skipped. The body runs with no lock held.
    pub(crate) fn run_pending_task(&self, helped: bool) -> Option<TaskId> {
        let (id, task) = loop {
            let entry = self.queue.lock().pop()?;
            let mut table = self.table.lock();
            match table
                .get_mut(&entry.id)
                .map(|slot| std::mem::replace(slot, Slot::Running))
            {
                Some(Slot::Queued(task)) => break (entry.id, task),
                _ => continue,
            }
        };

        let completion = Completion {
            shared: self,
            id,
            started: Instant::now(),
            helped,
        };
        task.run();
        drop(completion);

        Some(id)
    }

    fn wait_helping<P>(&self, mut done: P, stop: Option<&AtomicBool>) -> bool
    where
        P: FnMut() -> bool,
    {
        loop {
            // read before the predicate so a completion in between is not lost
            let seen = self.completions();
            if done() {
                return true;
            }
            if interrupted(stop) {
                return false;
            }

            if self.run_pending_task(true).is_none() {
                // what we wait for is running on another worker
                self.park(seen, self.config.wait_poll_interval);
            }
        }
    }

    fn wait_pumping<P>(&self, mut done: P, stop: Option<&AtomicBool>) -> bool
    where
        P: FnMut() -> bool,
    {
        let _waiter = MainWaiter::register(&self.main_waiters);

        loop {
            let seen = self.completions();
            if done() {
                return true;
            }
            if interrupted(stop) {
                return false;
            }

            while self.completions() == seen {
                if interrupted(stop) {
                    return false;
                }
                if dispatch::pump_events(self.config.main_loop_poll_interval).is_none() {
                    self.park(seen, self.config.main_loop_poll_interval);
                }
            }
        }
    }

    fn wait_blocking<P>(&self, mut done: P, stop: Option<&AtomicBool>) -> bool
    where
        P: FnMut() -> bool,
    {
        let mut counter = self.progress.lock();
        loop {
            if done() {
                return true;
            }
            if interrupted(stop) {
                return false;
            }

            match stop {
                Some(_) => {
                    self.progressed
                        .wait_for(&mut counter, self.config.wait_poll_interval);
                }
                None => self.progressed.wait(&mut counter),
            }
        }
    }
}

/// Removes a started task from the table once its body returns or unwinds.
struct Completion<'a> {
    shared: &'a Shared,
    id: TaskId,
    started: Instant,
    helped: bool,
}

impl Drop for Completion<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            self.shared.metrics.record_panic();
        } else {
            self.shared
                .metrics
                .record_execution(self.started.elapsed(), self.helped);
        }

        self.shared.table.lock().remove(&self.id);
        self.shared.notify_progress();
    }
}

struct MainWaiter<'a> {
    count: &'a AtomicUsize,
}

impl<'a> MainWaiter<'a> {
    fn register(count: &'a AtomicUsize) -> Self {
        count.fetch_add(1, Ordering::AcqRel);
        Self { count }
    }
}

impl Drop for MainWaiter<'_> {
    fn drop(&mut self) {
        self.count.fetch_sub(1, Ordering::AcqRel);
    }
}

fn interrupted(stop: Option<&AtomicBool>) -> bool {
    stop.is_some_and(|flag| flag.load(Ordering::Acquire))
}

/// Who is asking to wait. Resolved once per wait call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WaitContext {
    /// A worker thread of the pool being waited on.
    Worker,
    /// The thread running the installed main loop.
    MainThread,
    Foreign,
}

impl WaitContext {
    fn resolve(pool_id: usize) -> Self {
        if worker::current_pool_id() == Some(pool_id) {
            WaitContext::Worker
        } else if dispatch::is_gui_thread() == Some(true) {
            WaitContext::MainThread
        } else {
            WaitContext::Foreign
        }
    }
}

struct Lifecycle {
    stopped: bool,
    // dispatch units; dropping the sender lets workers drain and exit
    channel: Option<(Sender<()>, Receiver<()>)>,
    workers: Vec<JoinHandle<()>>,
    num_threads: usize,
}

/// Priority thread pool.
///
/// Tasks run on a fixed set of lazily started worker threads, highest
/// priority first and most recently queued first within a priority. Any
/// thread may wait on tasks: pool workers keep executing queued work while
/// they wait, the main-loop thread keeps pumping its events, and other
/// threads block.
pub struct ThreadPool {
    shared: Arc<Shared>,
    lifecycle: Mutex<Lifecycle>,
}

impl ThreadPool {
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_validated(config))
    }

    pub fn with_threads(num_threads: usize) -> Result<Self> {
        Self::new(Config::builder().num_threads(num_threads).build()?)
    }

    pub(crate) fn from_validated(config: Config) -> Self {
        let num_threads = config.worker_threads();
        let shared = Arc::new(Shared {
            pool_id: NEXT_POOL_ID.fetch_add(1, Ordering::Relaxed),
            config,
            next_id: AtomicU64::new(1),
            queue: Mutex::new(PriorityQueue::new()),
            table: Mutex::new(HashMap::new()),
            progress: Mutex::new(0),
            progressed: Condvar::new(),
            main_waiters: AtomicUsize::new(0),
            metrics: Metrics::new(),
        });

        Self {
            shared,
            lifecycle: Mutex::new(Lifecycle {
                stopped: false,
                channel: Some(crossbeam_channel::unbounded()),
                workers: Vec::new(),
                num_threads,
            }),
        }
    }

    /// The process-wide default pool.
    pub fn instance() -> &'static ThreadPool {
        crate::runtime::instance()
    }

    /// Submit `f` at `priority`.
    ///
    /// Returns `None` without running anything once the pool is stopped.
    /// The first accepted task starts the worker threads.
    pub fn enqueue<F>(&self, f: F, priority: TaskPriority) -> Option<TaskId>
    where
        F: FnOnce() + Send + 'static,
    {
        let mut lifecycle = self.lifecycle.lock();
        if lifecycle.stopped {
            self.shared.metrics.record_refused();
            tracing::trace!(pool = self.shared.pool_id, "enqueue refused, pool stopped");
            return None;
        }

        if lifecycle.workers.is_empty() {
            if let Err(e) = self.start_workers(&mut lifecycle) {
                self.shared.metrics.record_refused();
                tracing::error!(pool = self.shared.pool_id, error = %e, "cannot start workers");
                return None;
            }
        }

        let id = self.shared.next_task_id()?;
        self.shared
            .table
            .lock()
            .insert(id, Slot::Queued(Task::new(f)));
        self.shared.queue.lock().push(id, priority);

        if let Some((sender, _)) = &lifecycle.channel {
            let _ = sender.send(());
        }

        self.shared.metrics.record_enqueued();
        tracing::trace!(pool = self.shared.pool_id, task = %id, ?priority, "task enqueued");
        Some(id)
    }

    pub fn execute<F>(&self, f: F) -> Option<TaskId>
    where
        F: FnOnce() + Send + 'static,
    {
        self.enqueue(f, TaskPriority::Normal)
    }

    /// Cancel `id` if it has not started yet.
    ///
    /// Returns false when the task is already running or no longer known.
    pub fn dequeue(&self, id: TaskId) -> bool {
        let removed = {
            let mut table = self.shared.table.lock();
            match table.get(&id) {
                Some(Slot::Queued(_)) => table.remove(&id),
                _ => None,
            }
        };

        match removed {
            Some(_task) => {
                self.shared.metrics.record_cancelled(1);
                self.shared.notify_progress();
                tracing::trace!(pool = self.shared.pool_id, task = %id, "task dequeued");
                true
            }
            None => false,
        }
    }

    /// Cancel every not-yet-started task in `ids`.
    ///
    /// Returns how many of them were already running.
    pub fn dequeue_many(&self, ids: &[TaskId]) -> usize {
        let mut cancelled = Vec::new();
        let mut running = 0;
        {
            let mut table = self.shared.table.lock();
            for id in ids {
                match table.get(id) {
                    Some(Slot::Queued(_)) => cancelled.extend(table.remove(id)),
                    Some(Slot::Running) => running += 1,
                    None => {}
                }
            }
        }

        if !cancelled.is_empty() {
            self.shared.metrics.record_cancelled(cancelled.len() as u64);
            self.shared.notify_progress();
            tracing::trace!(
                pool = self.shared.pool_id,
                cancelled = cancelled.len(),
                running,
                "tasks dequeued"
            );
        }
        running
    }

    /// Cancel every queued task. Returns the number still running.
    pub fn dequeue_all(&self) -> usize {
        let mut cancelled = Vec::new();
        let running;
        {
            let mut queue = self.shared.queue.lock();
            let mut table = self.shared.table.lock();
            table.retain(|_, slot| match slot {
                Slot::Queued(_) => {
                    cancelled.push(std::mem::replace(slot, Slot::Running));
                    false
                }
                Slot::Running => true,
            });
            running = table.len();
            queue.retain_live(|id| table.contains_key(&id));
        }

        if !cancelled.is_empty() {
            self.shared.metrics.record_cancelled(cancelled.len() as u64);
            self.shared.notify_progress();
        }
        tracing::debug!(
            pool = self.shared.pool_id,
            cancelled = cancelled.len(),
            running,
            "all queued tasks dequeued"
        );
        running
    }

    /// True when no task is queued or running.
    pub fn is_empty(&self) -> bool {
        self.shared.table.lock().is_empty()
    }

    /// Number of tasks queued or running.
    pub fn len(&self) -> usize {
        self.shared.table.lock().len()
    }

    pub fn running_count(&self) -> usize {
        self.shared
            .table
            .lock()
            .values()
            .filter(|slot| matches!(slot, Slot::Running))
            .count()
    }

    /// True when none of `ids` is queued or running any more.
    pub fn check(&self, ids: &[TaskId]) -> bool {
        let table = self.shared.table.lock();
        ids.iter().all(|id| !table.contains_key(id))
    }

    /// Wait until any of `ids` has finished or been cancelled.
    ///
    /// Returns that id, or `None` if `stop` was raised first or `ids` is
    /// empty.
    pub fn wait_first(&self, ids: &[TaskId], stop: Option<&AtomicBool>) -> Option<TaskId> {
        if ids.is_empty() {
            return None;
        }

        let mut finished = None;
        let done = self.wait(
            || {
                let table = self.shared.table.lock();
                finished = ids.iter().copied().find(|id| !table.contains_key(id));
                finished.is_some()
            },
            stop,
        );

        if done {
            finished
        } else {
            None
        }
    }

    /// Wait until every id in `ids` has finished or been cancelled.
    ///
    /// Returns false if `stop` was raised first.
    pub fn wait_all(&self, ids: &[TaskId], stop: Option<&AtomicBool>) -> bool {
        self.wait(|| self.check(ids), stop)
    }

    /// Wait for every task tracked at the time of the call.
    pub fn wait_all_tracked(&self, stop: Option<&AtomicBool>) -> bool {
        let ids: Vec<TaskId> = self.shared.table.lock().keys().copied().collect();
        self.wait_all(&ids, stop)
    }

    fn wait<P>(&self, done: P, stop: Option<&AtomicBool>) -> bool
    where
        P: FnMut() -> bool,
    {
        match WaitContext::resolve(self.shared.pool_id) {
            WaitContext::Worker => self.shared.wait_helping(done, stop),
            WaitContext::MainThread => self.shared.wait_pumping(done, stop),
            WaitContext::Foreign => self.shared.wait_blocking(done, stop),
        }
    }

    /// Run the next queued task on the calling thread.
    ///
    /// Returns the id that ran, or `None` when nothing was queued. A panic
    /// in the task body propagates to the caller.
    pub fn run_pending_task(&self) -> Option<TaskId> {
        self.shared.run_pending_task(false)
    }

    /// Grow the pool by `count` workers.
    pub fn add_threads(&self, count: usize) -> Result<()> {
        let mut lifecycle = self.lifecycle.lock();
        if lifecycle.stopped {
            return Err(Error::executor("cannot add threads to a stopped pool"));
        }

        lifecycle.num_threads += count;
        if !lifecycle.workers.is_empty() {
            self.start_workers(&mut lifecycle)?;
        }
        tracing::debug!(
            pool = self.shared.pool_id,
            threads = lifecycle.num_threads,
            "worker count raised"
        );
        Ok(())
    }

    pub fn num_threads(&self) -> usize {
        self.lifecycle.lock().num_threads
    }

    /// Number of worker threads currently started.
    pub fn started_threads(&self) -> usize {
        self.lifecycle.lock().workers.len()
    }

    pub fn is_stopped(&self) -> bool {
        self.lifecycle.lock().stopped
    }

    /// Retire the pool for good.
    ///
    /// Further enqueues are refused. Workers finish the work already queued,
    /// then exit and are joined.
    pub fn stop(&self) {
        let (channel, workers) = {
            let mut lifecycle = self.lifecycle.lock();
            lifecycle.stopped = true;
            (
                lifecycle.channel.take(),
                std::mem::take(&mut lifecycle.workers),
            )
        };

        drop(channel);
        if !workers.is_empty() {
            tracing::debug!(pool = self.shared.pool_id, workers = workers.len(), "stopping pool");
        }
        join_workers(workers);
    }

    /// Stop the pool as [`stop`](Self::stop) does, then make it accept work
    /// again, optionally with a new worker count.
    pub fn reset(&self, num_threads: Option<usize>) -> Result<()> {
        if worker::current_pool_id() == Some(self.shared.pool_id) {
            return Err(Error::executor("cannot reset a pool from one of its own workers"));
        }
        if num_threads == Some(0) {
            return Err(Error::config("num_threads must be > 0"));
        }

        self.stop();

        let mut lifecycle = self.lifecycle.lock();
        lifecycle.stopped = false;
        lifecycle.channel = Some(crossbeam_channel::unbounded());
        if let Some(n) = num_threads {
            lifecycle.num_threads = n;
        }
        tracing::debug!(
            pool = self.shared.pool_id,
            threads = lifecycle.num_threads,
            "pool reset"
        );
        Ok(())
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.shared.metrics.snapshot()
    }

    pub fn config(&self) -> &Config {
        &self.shared.config
    }

    fn start_workers(&self, lifecycle: &mut Lifecycle) -> Result<()> {
        let units = match &lifecycle.channel {
            Some((_, receiver)) => receiver.clone(),
            None => return Err(Error::executor("pool is stopped")),
        };

        for index in lifecycle.workers.len()..lifecycle.num_threads {
            match worker::spawn(Arc::clone(&self.shared), units.clone(), index) {
                Ok(handle) => lifecycle.workers.push(handle),
                Err(e) if lifecycle.workers.is_empty() => return Err(e),
                Err(e) => {
                    tracing::warn!(
                        pool = self.shared.pool_id,
                        started = lifecycle.workers.len(),
                        error = %e,
                        "running with fewer workers than configured"
                    );
                    break;
                }
            }
        }

        tracing::debug!(
            pool = self.shared.pool_id,
            workers = lifecycle.workers.len(),
            "workers started"
        );
        Ok(())
    }
}

fn join_workers(workers: Vec<JoinHandle<()>>) {
    let current = thread::current().id();
    for handle in workers {
        // a worker stopping its own pool cannot join itself
        if handle.thread().id() == current {
            continue;
        }
        if handle.join().is_err() {
            tracing::warn!("worker thread exited by panic");
        }
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        self.stop();
    }
}

impl fmt::Debug for ThreadPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lifecycle = self.lifecycle.lock();
        f.debug_struct("ThreadPool")
            .field("pool_id", &self.shared.pool_id)
            .field("num_threads", &lifecycle.num_threads)
            .field("started_threads", &lifecycle.workers.len())
            .field("stopped", &lifecycle.stopped)
            .finish()
    }
}
