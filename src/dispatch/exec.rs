use super::main_loop::{self, is_gui_thread};
use crate::error::{Error, Result};
use crate::executor::catch_task;
use crossbeam_channel::RecvTimeoutError;
use std::thread;
use std::time::Duration;

/// Poll interval used by [`exec_unlocked`] on the main thread.
pub const UNLOCKED_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Queue `f` for the main loop's next event pass.
///
/// Always returns before `f` runs, even when called on the main thread.
pub fn exec_in_main_thread_async<F>(f: F) -> Result<()>
where
    F: FnOnce() + Send + 'static,
{
    main_loop::post(Box::new(f))
}

/// Run `f` on the main thread and wait for its result.
///
/// On the main thread itself `f` runs inline. Either way a panic in `f` is
/// caught on the main thread and returned as [`Error::TaskPanicked`]. If the main loop
/// goes away before running `f`, the result is
/// [`Error::MainLoopUnavailable`].
pub fn exec_in_main_thread_sync<F, R>(f: F) -> Result<R>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    if is_gui_thread() == Some(true) {
        return catch_task(f).map_err(Error::from);
    }

    let (tx, rx) = crossbeam_channel::bounded(1);
    main_loop::post(Box::new(move || {
        let _ = tx.send(catch_task(f));
    }))?;

    let outcome = rx.recv().map_err(|_| Error::MainLoopUnavailable)?;
    outcome.map_err(Error::from)
}

/// Run `f` on a fresh thread outside any pool and wait for it.
///
/// On the main thread the wait keeps processing main-loop events every
/// [`UNLOCKED_POLL_INTERVAL`].
pub fn exec_unlocked<F, R>(f: F) -> Result<R>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    exec_unlocked_with_interval(f, UNLOCKED_POLL_INTERVAL)
}

pub fn exec_unlocked_with_interval<F, R>(f: F, interval: Duration) -> Result<R>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    let (tx, rx) = crossbeam_channel::bounded(1);
    let handle = thread::Builder::new()
        .name("taskpool-unlocked".to_string())
        .spawn(move || {
            let _ = tx.send(catch_task(f));
        })?;

    let outcome = if is_gui_thread() == Some(true) {
        loop {
            match rx.recv_timeout(interval) {
                Ok(outcome) => break Some(outcome),
                Err(RecvTimeoutError::Timeout) => {
                    main_loop::drain_pending_events();
                }
                Err(RecvTimeoutError::Disconnected) => break None,
            }
        }
    } else {
        rx.recv().ok()
    };

    let _ = handle.join();
    match outcome {
        Some(outcome) => outcome.map_err(Error::from),
        None => Err(Error::executor("unlocked thread exited without a result")),
    }
}
