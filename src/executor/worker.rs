// worker thread stuff
use super::panic_handler::catch_task;
use super::thread_pool::Shared;
use crate::error::{Error, Result};
use crossbeam_channel::Receiver;
use std::cell::Cell;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

thread_local! {
    // id of the pool this thread works for, 0 on non-worker threads
    static CURRENT_POOL: Cell<usize> = const { Cell::new(0) };
}

/// Id of the pool whose worker loop owns the calling thread, if any.
pub(crate) fn current_pool_id() -> Option<usize> {
    let id = CURRENT_POOL.with(Cell::get);
    (id != 0).then_some(id)
}

/// Marks the current thread as a worker of one pool until dropped.
struct WorkerScope {
    previous: usize,
}

impl WorkerScope {
    fn enter(pool_id: usize) -> Self {
        let previous = CURRENT_POOL.with(|current| current.replace(pool_id));
        Self { previous }
    }
}

impl Drop for WorkerScope {
    fn drop(&mut self) {
        CURRENT_POOL.with(|current| current.set(self.previous));
    }
}

pub(crate) fn spawn(
    shared: Arc<Shared>,
    units: Receiver<()>,
    index: usize,
) -> Result<JoinHandle<()>> {
    let config = shared.config();
    let mut builder =
        thread::Builder::new().name(format!("{}-{}", config.thread_name_prefix, index));

    if let Some(stack_size) = config.stack_size {
        builder = builder.stack_size(stack_size);
    }

    builder
        .spawn(move || run(&shared, units, index))
        .map_err(|e| Error::executor(format!("spawn failed: {}", e)))
}

// main loop: one dispatch unit per enqueue, until the pool drops its sender
fn run(shared: &Shared, units: Receiver<()>, index: usize) {
    let _scope = WorkerScope::enter(shared.pool_id());
    tracing::debug!(pool = shared.pool_id(), worker = index, "worker started");

    for () in units.iter() {
        // the task's id and panic count are settled during unwinding
        if let Err(info) = catch_task(|| shared.run_pending_task(false)) {
            tracing::debug!(
                pool = shared.pool_id(),
                worker = index,
                message = %info.message,
                "task panicked, worker continues"
            );
        }
    }

    tracing::debug!(pool = shared.pool_id(), worker = index, "worker exiting");
}
