//! Typed storage errors.
//!
//! Every failure inside a DAO or transaction leaves the storage layer as a
//! [`StorageError`] carrying the operation that failed, the table it touched
//! and the underlying `rusqlite` cause.

use std::fmt;
use thiserror::Error;

/// The kind of write or read that produced a [`StorageError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
    Migrate,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            Operation::Create => "create",
            Operation::Read => "read",
            Operation::Update => "update",
            Operation::Delete => "delete",
            Operation::Migrate => "migrate",
        };
        f.write_str(tag)
    }
}

#[derive(Error, Debug)]
#[error("{operation} on `{table}` failed: {source}")]
pub struct StorageError {
    pub operation: Operation,
    pub table: &'static str,
    #[source]
    pub source: rusqlite::Error,
}

impl StorageError {
    pub fn new(operation: Operation, table: &'static str, source: rusqlite::Error) -> Self {
        Self { operation, table, source }
    }

    /// True when the cause is a violated SQL constraint (FK, CHECK, UNIQUE).
    pub fn is_constraint_violation(&self) -> bool {
        matches!(
            &self.source,
            rusqlite::Error::SqliteFailure(err, _) if err.code == rusqlite::ErrorCode::ConstraintViolation
        )
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Attaches an operation tag to a bare `rusqlite` result.
pub trait StorageContext<T> {
    fn tagged(self, operation: Operation, table: &'static str) -> StorageResult<T>;
}

impl<T> StorageContext<T> for rusqlite::Result<T> {
    fn tagged(self, operation: Operation, table: &'static str) -> StorageResult<T> {
        self.map_err(|e| StorageError::new(operation, table, e))
    }
}
