//! Opt-in panic capture for task bodies.
//!
//! The pool never reports a panicking task to anyone; its workers only
//! contain the unwind and move on. Callers that want a failure reported back
//! wrap the body with [`catch_task`] (or submit it via
//! `TaskGroup::enqueue_catching`).

use crate::error::Error;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Description of a caught task panic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanicInfo {
    pub message: String,
}

impl PanicInfo {
    pub(crate) fn from_payload(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };

        Self { message }
    }
}

impl From<PanicInfo> for Error {
    fn from(info: PanicInfo) -> Self {
        Error::task_panicked(info.message)
    }
}

/// Run `f`, turning a panic into `Err(PanicInfo)`.
pub fn catch_task<F, R>(f: F) -> Result<R, PanicInfo>
where
    F: FnOnce() -> R,
{
    catch_unwind(AssertUnwindSafe(f)).map_err(PanicInfo::from_payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catch_task_success() {
        let result = catch_task(|| 42);
        assert_eq!(result.unwrap(), 42);
    }

    #[test]
    fn test_catch_task_str_payload() {
        let result = catch_task(|| {
            panic!("test panic");
        });

        assert_eq!(result.unwrap_err().message, "test panic");
    }

    #[test]
    fn test_catch_task_formatted_payload() {
        let n = 3;
        let result: Result<(), _> = catch_task(|| panic!("slice {} unreadable", n));

        let err: Error = result.unwrap_err().into();
        match err {
            Error::TaskPanicked { message } => assert_eq!(message, "slice 3 unreadable"),
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
