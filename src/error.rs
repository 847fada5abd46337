pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("executor error: {0}")]
    Executor(String),

    #[error("default pool already initialized")]
    AlreadyInitialized,

    #[error("a main loop is already installed on another thread")]
    MainLoopInstalled,

    #[error("no main loop is available to run the request")]
    MainLoopUnavailable,

    #[error("task panicked: {message}")]
    TaskPanicked { message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::Config(msg.into())
    }

    pub fn executor<S: Into<String>>(msg: S) -> Self {
        Error::Executor(msg.into())
    }

    pub fn task_panicked<S: Into<String>>(message: S) -> Self {
        Error::TaskPanicked {
            message: message.into(),
        }
    }

    #[cfg(feature = "telemetry")]
    pub fn telemetry<S: Into<String>>(msg: S) -> Self {
        Error::Other(format!("telemetry: {}", msg.into()))
    }
}
