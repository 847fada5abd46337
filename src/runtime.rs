//! Process-wide default pool.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::executor::ThreadPool;
use parking_lot::RwLock;

// Created at most once and kept for the life of the process.
static DEFAULT_POOL: RwLock<Option<&'static ThreadPool>> = RwLock::new(None);

/// The default pool, created with [`Config::default`] on first use unless
/// [`init_with_config`] ran earlier.
pub fn instance() -> &'static ThreadPool {
    if let Some(pool) = *DEFAULT_POOL.read() {
        return pool;
    }

    let mut slot = DEFAULT_POOL.write();
    if let Some(pool) = *slot {
        return pool;
    }

    let pool = install(Config::default());
    *slot = Some(pool);
    pool
}

pub fn init() -> Result<()> {
    init_with_config(Config::default())
}

/// Configure the default pool. Fails once the pool exists.
pub fn init_with_config(config: Config) -> Result<()> {
    config.validate()?;

    let mut slot = DEFAULT_POOL.write();
    if slot.is_some() {
        return Err(Error::AlreadyInitialized);
    }

    *slot = Some(install(config));
    Ok(())
}

pub fn is_initialized() -> bool {
    DEFAULT_POOL.read().is_some()
}

fn install(config: Config) -> &'static ThreadPool {
    tracing::debug!(threads = config.worker_threads(), "creating default pool");
    Box::leak(Box::new(ThreadPool::from_validated(config)))
}
