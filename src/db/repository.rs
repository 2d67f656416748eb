//! Uniform CRUD surface shared by every entity table.
//!
//! An entity describes its table layout by implementing [`Record`], its
//! partial-update shape by implementing [`Patch`], and gets `find_all`,
//! `save`, `find_one_by_id`, `update` and `delete` from [`Repository`].
//! Entity-specific finders live in `impl Repository<Entity>` blocks next to
//! the entity definition.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use trackvault::db::{db::Db, repository::Criteria, screenshots::{Screenshot, Screenshots}};
//!
//! let db = Db::open_in_memory()?;
//! let screenshots = Screenshots::new(&db);
//! let stored = screenshots.save(&Screenshot::new("/tmp/shot-1.png"))?;
//! screenshots.delete(&Criteria::id(stored.id.unwrap_or_default()))?;
//! # Ok::<(), anyhow::Error>(())
//! ```

use crate::db::db::Db;
use crate::db::error::{Operation, StorageContext, StorageError, StorageResult};
use crate::db::transaction::Transaction;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, OptionalExtension, Row};
use std::marker::PhantomData;

/// Column that only ever moves from false to true.
pub const SYNCED_COLUMN: &str = "synced";

/// Table layout of a stored entity.
pub trait Record: Sized {
    /// Columns written on insert, in the order returned by [`Record::values`].
    /// The `id` primary key is implicit.
    const COLUMNS: &'static [&'static str];

    type Patch: Patch;

    fn id(&self) -> Option<i64>;

    fn values(&self) -> Vec<Value>;

    /// Builds the entity from a row selected as `id, COLUMNS...`.
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;

    /// Non-primary dedup key. When set, inserts converge to one row per key.
    fn natural_key(&self) -> Option<(&'static str, Value)> {
        None
    }
}

/// Partial update of a [`Record`]: only `Some` fields are written.
pub trait Patch {
    fn assignments(&self) -> Vec<(&'static str, Value)>;
}

/// Equality filters joined with `AND`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Criteria {
    filters: Vec<(&'static str, Value)>,
}

impl Criteria {
    pub fn id(id: i64) -> Self {
        Self::eq("id", id)
    }

    /// Matches rows where `column` equals `value`.
    pub fn eq(column: &'static str, value: impl Into<Value>) -> Self {
        Self {
            filters: vec![(column, value.into())],
        }
    }

    pub fn and(mut self, column: &'static str, value: impl Into<Value>) -> Self {
        self.filters.push((column, value.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub(crate) fn validate<R: Record>(&self, operation: Operation, table: &'static str) -> StorageResult<()> {
        match self.filters.iter().find(|(column, _)| *column != "id" && !R::COLUMNS.contains(column)) {
            Some((column, _)) => Err(StorageError::new(operation, table, rusqlite::Error::InvalidColumnName(column.to_string()))),
            None => Ok(()),
        }
    }

    /// `WHERE` clause with anonymous placeholders plus the bound values.
    pub(crate) fn to_sql(&self) -> (String, Vec<Value>) {
        if self.filters.is_empty() {
            return (String::new(), Vec::new());
        }
        let mut clauses = Vec::with_capacity(self.filters.len());
        let mut values = Vec::with_capacity(self.filters.len());
        for (column, value) in &self.filters {
            if *value == Value::Null {
                clauses.push(format!("{column} IS NULL"));
            } else {
                clauses.push(format!("{column} = ?"));
                values.push(value.clone());
            }
        }
        (format!("WHERE {}", clauses.join(" AND ")), values)
    }
}

/// DAO over one table.
pub struct Repository<R> {
    db: Db,
    table: &'static str,
    _record: PhantomData<fn() -> R>,
}

impl<R> Clone for Repository<R> {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
            table: self.table,
            _record: PhantomData,
        }
    }
}

impl<R: Record> Repository<R> {
    pub(crate) fn with_table(db: &Db, table: &'static str) -> Self {
        Self {
            db: db.clone(),
            table,
            _record: PhantomData,
        }
    }

    pub fn table(&self) -> &'static str {
        self.table
    }

    pub fn db(&self) -> &Db {
        &self.db
    }

    /// Write path for this entity.
    pub fn transaction(&self) -> Transaction<'_, R> {
        Transaction::new(&self.db, self.table)
    }

    /// Every row, in insertion order.
    pub fn find_all(&self) -> StorageResult<Vec<R>> {
        self.select("ORDER BY id", Vec::new())
    }

    /// Row with primary key `id`, if present.
    pub fn find_one_by_id(&self, id: i64) -> StorageResult<Option<R>> {
        let sql = format!("{} WHERE id = ?1", self.select_sql());
        let conn = self.db.lock();
        conn.query_row(&sql, [id], R::from_row).optional().tagged(Operation::Read, self.table)
    }

    /// Rows matching all of `criteria`.
    pub fn find_by(&self, criteria: &Criteria) -> StorageResult<Vec<R>> {
        criteria.validate::<R>(Operation::Read, self.table)?;
        let (clause, values) = criteria.to_sql();
        self.select(&format!("{clause} ORDER BY id"), values)
    }

    /// Inserts `record` and returns it as stored, id included.
    pub fn save(&self, record: &R) -> StorageResult<R> {
        self.transaction().create(record)
    }

    /// Applies `patch` to row `id` and returns the number of rows changed.
    pub fn update(&self, id: i64, patch: &R::Patch) -> StorageResult<usize> {
        self.transaction().update(id, patch)
    }

    /// Deletes the rows matching `criteria`; empty criteria delete nothing.
    pub fn delete(&self, criteria: &Criteria) -> StorageResult<usize> {
        self.transaction().delete(criteria)
    }

    /// Number of rows in the table.
    pub fn count(&self) -> StorageResult<i64> {
        let conn = self.db.lock();
        conn.query_row(&format!("SELECT COUNT(*) FROM {}", self.table), [], |row| row.get(0))
            .tagged(Operation::Read, self.table)
    }

    /// Runs `SELECT id, COLUMNS FROM table <suffix>` and maps every row.
    pub(crate) fn select(&self, suffix: &str, values: Vec<Value>) -> StorageResult<Vec<R>> {
        let sql = format!("{} {}", self.select_sql(), suffix);
        let conn = self.db.lock();
        let mut stmt = conn.prepare(&sql).tagged(Operation::Read, self.table)?;
        let rows = stmt
            .query_map(params_from_iter(values), R::from_row)
            .tagged(Operation::Read, self.table)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row.tagged(Operation::Read, self.table)?);
        }
        Ok(records)
    }

    fn select_sql(&self) -> String {
        format!("SELECT id, {} FROM {}", R::COLUMNS.join(", "), self.table)
    }
}
