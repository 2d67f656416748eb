//! Explicit begin/commit/rollback wrapper for entity writes.
//!
//! Every mutating DAO call goes through a [`Transaction`]. The closure that
//! performs the write either commits as a whole or is rolled back, and the
//! failure is returned as a [`StorageError`] tagged with the operation.

use crate::db::db::Db;
use crate::db::error::{Operation, StorageContext, StorageError, StorageResult};
use crate::db::repository::{Criteria, Patch, Record, SYNCED_COLUMN};
use crate::libs::messages::Message;
use crate::{msg_debug, msg_error};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, OptionalExtension};
use std::marker::PhantomData;

pub struct Transaction<'a, R> {
    db: &'a Db,
    table: &'static str,
    _record: PhantomData<fn() -> R>,
}

impl<'a, R: Record> Transaction<'a, R> {
    pub fn new(db: &'a Db, table: &'static str) -> Self {
        Self {
            db,
            table,
            _record: PhantomData,
        }
    }

    /// Runs `work` inside a transaction: commit on success, rollback on error.
    pub fn execute<T, F>(&self, operation: Operation, work: F) -> StorageResult<T>
    where
        F: FnOnce(&rusqlite::Transaction<'_>) -> rusqlite::Result<T>,
    {
        let mut conn = self.db.lock();
        let tx = conn.transaction().tagged(operation, self.table)?;

        match work(&tx) {
            Ok(value) => {
                tx.commit().tagged(operation, self.table)?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback_err) = tx.rollback() {
                    msg_error!(Message::RollbackFailed(self.table.to_string(), rollback_err.to_string()));
                }
                msg_debug!(Message::TransactionRolledBack(operation.to_string(), self.table.to_string(), e.to_string()));
                Err(StorageError::new(operation, self.table, e))
            }
        }
    }

    /// Inserts `record` and returns the stored row.
    ///
    /// Records with a natural key are inserted with `ON CONFLICT DO NOTHING`
    /// and the existing row is returned when the key is already taken.
    pub fn create(&self, record: &R) -> StorageResult<R> {
        let table = self.table;
        let columns = R::COLUMNS.join(", ");
        let placeholders = vec!["?"; R::COLUMNS.len()].join(", ");
        let natural_key = record.natural_key();

        let mut insert = format!("INSERT INTO {table} ({columns}) VALUES ({placeholders})");
        if let Some((key, _)) = &natural_key {
            insert.push_str(&format!(" ON CONFLICT({key}) DO NOTHING"));
        }
        let select = format!("SELECT id, {columns} FROM {table}");

        self.execute(Operation::Create, |tx| {
            tx.execute(&insert, params_from_iter(record.values()))?;
            let stored = match natural_key {
                Some((key, value)) => tx
                    .query_row(&format!("{select} WHERE {key} = ?1"), [value], R::from_row)
                    .optional()?,
                None => tx
                    .query_row(&format!("{select} WHERE id = ?1"), [tx.last_insert_rowid()], R::from_row)
                    .optional()?,
            };
            stored.ok_or(rusqlite::Error::QueryReturnedNoRows)
        })
    }

    /// Applies the non-empty fields of `patch` to row `id`.
    ///
    /// The `synced` flag is written as `MAX(synced, ?)` so a row that has been
    /// acknowledged remotely never reverts to unsynced.
    pub fn update(&self, id: i64, patch: &R::Patch) -> StorageResult<usize> {
        let assignments = patch.assignments();
        if assignments.is_empty() {
            return Ok(0);
        }

        let mut sets = Vec::with_capacity(assignments.len());
        let mut values = Vec::with_capacity(assignments.len() + 1);
        for (column, value) in assignments {
            if column == SYNCED_COLUMN {
                sets.push(format!("{column} = MAX({column}, ?)"));
            } else {
                sets.push(format!("{column} = ?"));
            }
            values.push(value);
        }
        values.push(Value::Integer(id));

        let sql = format!("UPDATE {} SET {} WHERE id = ?", self.table, sets.join(", "));
        self.execute(Operation::Update, |tx| tx.execute(&sql, params_from_iter(values)))
    }

    /// Deletes every row matching `criteria`. Empty criteria delete nothing.
    pub fn delete(&self, criteria: &Criteria) -> StorageResult<usize> {
        if criteria.is_empty() {
            return Ok(0);
        }
        criteria.validate::<R>(Operation::Delete, self.table)?;

        let (clause, values) = criteria.to_sql();
        let sql = format!("DELETE FROM {} {}", self.table, clause);
        self.execute(Operation::Delete, |tx| tx.execute(&sql, params_from_iter(values)))
    }
}
