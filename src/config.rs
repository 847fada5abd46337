use crate::error::{Error, Result};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub num_threads: Option<usize>,
    pub stack_size: Option<usize>,
    pub thread_name_prefix: String,

    /// How often a blocked waiter re-checks its stop flag, and how long an
    /// idle helping worker parks before looking for queued work again.
    pub wait_poll_interval: Duration,

    /// Slice of time the main thread spends pumping its event loop between
    /// progress checks while it waits on pool work.
    pub main_loop_poll_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            num_threads: None,
            stack_size: Some(2 * 1024 * 1024),
            thread_name_prefix: "taskpool-worker".to_string(),
            wait_poll_interval: Duration::from_millis(1),
            main_loop_poll_interval: Duration::from_millis(5),
        }
    }
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(n) = self.num_threads {
            if n == 0 {
                return Err(Error::config("num_threads must be > 0"));
            }
            if n > 1024 {
                return Err(Error::config("num_threads too large (max 1024)"));
            }
        }

        if let Some(size) = self.stack_size {
            if size < 64 * 1024 {
                return Err(Error::config("stack_size must be at least 64 KiB"));
            }
        }

        if self.wait_poll_interval.is_zero() {
            return Err(Error::config("wait_poll_interval must be non-zero"));
        }

        if self.main_loop_poll_interval.is_zero() {
            return Err(Error::config("main_loop_poll_interval must be non-zero"));
        }

        Ok(())
    }

    pub fn worker_threads(&self) -> usize {
        self.num_threads.unwrap_or_else(num_cpus::get)
    }
}

#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn num_threads(mut self, n: usize) -> Self {
        self.config.num_threads = Some(n);
        self
    }

    pub fn stack_size(mut self, size: usize) -> Self {
        self.config.stack_size = Some(size);
        self
    }

    pub fn thread_name_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.config.thread_name_prefix = prefix.into();
        self
    }

    pub fn wait_poll_interval(mut self, interval: Duration) -> Self {
        self.config.wait_poll_interval = interval;
        self
    }

    pub fn main_loop_poll_interval(mut self, interval: Duration) -> Self {
        self.config.main_loop_poll_interval = interval;
        self
    }

    pub fn build(self) -> Result<Config> {
        self.config.validate()?;
        Ok(self.config)
    }
}
