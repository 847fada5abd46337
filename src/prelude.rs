pub use crate::config::{Config, ConfigBuilder};
pub use crate::dispatch::{
    exec_in_main_thread_async, exec_in_main_thread_sync, exec_unlocked, is_gui_thread, MainLoop,
};
pub use crate::error::{Error, Result};
pub use crate::executor::{TaskId, TaskPriority, ThreadPool};
pub use crate::group::{NoLockedTask, TaskGroup};
pub use crate::telemetry::MetricsSnapshot;
