//! The main/UI thread's event loop.
//!
//! A host installs one [`MainLoop`] on its UI thread. Other threads post
//! closures to it; the UI thread runs them whenever it processes events,
//! including while it waits on pool work.

use crate::error::{Error, Result};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use parking_lot::RwLock;
use std::cell::RefCell;
use std::marker::PhantomData;
use std::thread::{self, ThreadId};
use std::time::Duration;

pub(crate) type Event = Box<dyn FnOnce() + Send + 'static>;

struct MainThread {
    thread: ThreadId,
    sender: Sender<Event>,
}

static MAIN_THREAD: RwLock<Option<MainThread>> = RwLock::new(None);

thread_local! {
    // set only on the thread that owns the installed MainLoop
    static EVENTS: RefCell<Option<Receiver<Event>>> = const { RefCell::new(None) };
}

const RUN_UNTIL_SLICE: Duration = Duration::from_millis(10);

/// Event loop bound to the thread that installed it.
///
/// Dropping it uninstalls the loop and discards events nobody ran.
pub struct MainLoop {
    events: Receiver<Event>,
    _not_send: PhantomData<*const ()>,
}

impl MainLoop {
    /// Make the calling thread the main thread.
    pub fn install() -> Result<Self> {
        let mut slot = MAIN_THREAD.write();
        if slot.is_some() {
            return Err(Error::MainLoopInstalled);
        }

        let (sender, events) = crossbeam_channel::unbounded();
        *slot = Some(MainThread {
            thread: thread::current().id(),
            sender,
        });
        EVENTS.with(|local| *local.borrow_mut() = Some(events.clone()));

        tracing::debug!(thread = ?thread::current().id(), "main loop installed");
        Ok(Self {
            events,
            _not_send: PhantomData,
        })
    }

    /// Run every event already queued. Returns how many ran.
    pub fn process_events(&self) -> usize {
        drain(&self.events)
    }

    /// Wait up to `timeout` for an event, then run everything queued.
    pub fn process_events_timeout(&self, timeout: Duration) -> usize {
        run_events(&self.events, timeout)
    }

    /// Keep processing events until `done` returns true.
    pub fn run_until<F>(&self, mut done: F)
    where
        F: FnMut() -> bool,
    {
        while !done() {
            self.process_events_timeout(RUN_UNTIL_SLICE);
        }
    }

    pub fn pending_events(&self) -> usize {
        self.events.len()
    }
}

impl Drop for MainLoop {
    fn drop(&mut self) {
        MAIN_THREAD.write().take();
        EVENTS.with(|local| local.borrow_mut().take());
        tracing::debug!(discarded = self.events.len(), "main loop uninstalled");
    }
}

impl std::fmt::Debug for MainLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MainLoop")
            .field("pending_events", &self.events.len())
            .finish()
    }
}

// Only what is queued now; events posted while draining wait for the next pass.
fn drain(events: &Receiver<Event>) -> usize {
    let mut ran = 0;
    for _ in 0..events.len() {
        match events.try_recv() {
            Ok(event) => {
                event();
                ran += 1;
            }
            Err(_) => break,
        }
    }
    ran
}

fn run_events(events: &Receiver<Event>, timeout: Duration) -> usize {
    match events.recv_timeout(timeout) {
        Ok(event) => {
            event();
            1 + drain(events)
        }
        Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => 0,
    }
}

/// `None` before any main loop is installed, otherwise whether the calling
/// thread is the main thread.
pub fn is_gui_thread() -> Option<bool> {
    MAIN_THREAD
        .read()
        .as_ref()
        .map(|main| main.thread == thread::current().id())
}

pub(crate) fn post(event: Event) -> Result<()> {
    match &*MAIN_THREAD.read() {
        Some(main) => main
            .sender
            .send(event)
            .map_err(|_| Error::MainLoopUnavailable),
        None => Err(Error::MainLoopUnavailable),
    }
}

/// Process events on the calling thread if it owns the main loop.
///
/// Returns `None` when it does not.
pub(crate) fn pump_events(timeout: Duration) -> Option<usize> {
    let events = EVENTS.with(|local| local.borrow().clone())?;
    Some(run_events(&events, timeout))
}

/// Run already-queued events if the calling thread owns the main loop.
pub(crate) fn drain_pending_events() -> usize {
    EVENTS
        .with(|local| local.borrow().clone())
        .map_or(0, |events| drain(&events))
}

/// Nudge a main thread blocked in [`pump_events`].
pub(crate) fn wake_main_loop() {
    let _ = post(Box::new(|| {}));
}
