//! Result of a best-effort write on the capture path.
//!
//! Background callers must keep running whatever happens, so these calls
//! never return `Err`. [`Outcome`] still lets them tell an intentional no-op
//! apart from a swallowed storage failure.

use crate::db::error::{StorageError, StorageResult};

#[derive(Debug)]
pub enum Outcome<T> {
    Done(T),
    /// Precondition not met; nothing was written. Carries the reason.
    Skipped(&'static str),
    Failed(StorageError),
}

impl<T> Outcome<T> {
    pub fn is_done(&self) -> bool {
        matches!(self, Outcome::Done(_))
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Outcome::Skipped(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Outcome::Failed(_))
    }

    pub fn done(self) -> Option<T> {
        match self {
            Outcome::Done(value) => Some(value),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Outcome::Done(value) => Outcome::Done(f(value)),
            Outcome::Skipped(reason) => Outcome::Skipped(reason),
            Outcome::Failed(e) => Outcome::Failed(e),
        }
    }

    /// Back to a `Result` for callers that do want to propagate; skips become `Ok(None)`.
    pub fn into_result(self) -> StorageResult<Option<T>> {
        match self {
            Outcome::Done(value) => Ok(Some(value)),
            Outcome::Skipped(_) => Ok(None),
            Outcome::Failed(e) => Err(e),
        }
    }
}

impl<T> From<StorageResult<T>> for Outcome<T> {
    fn from(result: StorageResult<T>) -> Self {
        match result {
            Ok(value) => Outcome::Done(value),
            Err(e) => Outcome::Failed(e),
        }
    }
}
