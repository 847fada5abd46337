//! Main-thread detection and cross-thread dispatch.
//!
//! Independent of any pool: background code uses these helpers to touch
//! state that belongs to the main/UI thread, and the main thread uses them
//! to run blocking work without freezing its event loop.

pub mod exec;
pub mod main_loop;

pub use exec::{
    exec_in_main_thread_async, exec_in_main_thread_sync, exec_unlocked,
    exec_unlocked_with_interval, UNLOCKED_POLL_INTERVAL,
};
pub use main_loop::{is_gui_thread, MainLoop};

pub(crate) use main_loop::{pump_events, wake_main_loop};
