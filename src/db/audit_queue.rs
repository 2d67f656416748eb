//! Persisted outbox rows. The service API on top lives in `libs::audit_queue`.

use crate::db::columns::{get_json, get_opt_ts, get_ts, json, opt_ts, ts};
use crate::db::db::Db;
use crate::db::error::StorageResult;
use crate::db::repository::{Patch, Record, Repository};
use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::Row;
use serde::{Deserialize, Serialize};

pub const TABLE_AUDIT_QUEUE: &str = "audit_queue";

/// A locally completed operation waiting for remote acknowledgment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: Option<i64>,
    pub queue_id: String,
    /// Remote target the payload is pushed to, e.g. `timer` or `time-slot`.
    pub queue: String,
    /// What happened locally, e.g. `start`, `stop`, `create`.
    pub operation: String,
    pub data: serde_json::Value,
    pub attempts: i64,
    pub last_error: Option<String>,
    pub next_attempt_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(queue_id: impl Into<String>, queue: impl Into<String>, operation: impl Into<String>, data: serde_json::Value) -> Self {
        let now = Utc::now();
        AuditEntry {
            id: None,
            queue_id: queue_id.into(),
            queue: queue.into(),
            operation: operation.into(),
            data,
            attempts: 0,
            last_error: None,
            next_attempt_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AuditPatch {
    /// Required: identifies the entry to update.
    pub queue_id: Option<String>,
    pub data: Option<serde_json::Value>,
    pub attempts: Option<i64>,
    pub last_error: Option<String>,
    pub next_attempt_at: Option<DateTime<Utc>>,
}

impl Patch for AuditPatch {
    fn assignments(&self) -> Vec<(&'static str, Value)> {
        let mut set = Vec::new();
        if let Some(data) = &self.data {
            set.push(("data", json(data)));
        }
        if let Some(attempts) = self.attempts {
            set.push(("attempts", Value::Integer(attempts)));
        }
        if let Some(last_error) = &self.last_error {
            set.push(("last_error", Value::Text(last_error.clone())));
        }
        if self.next_attempt_at.is_some() {
            set.push(("next_attempt_at", opt_ts(&self.next_attempt_at)));
        }
        if !set.is_empty() {
            set.push(("updated_at", ts(&Utc::now())));
        }
        set
    }
}

impl Record for AuditEntry {
    const COLUMNS: &'static [&'static str] = &[
        "queue_id",
        "queue",
        "operation",
        "data",
        "attempts",
        "last_error",
        "next_attempt_at",
        "created_at",
        "updated_at",
    ];

    type Patch = AuditPatch;

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn values(&self) -> Vec<Value> {
        vec![
            Value::Text(self.queue_id.clone()),
            Value::Text(self.queue.clone()),
            Value::Text(self.operation.clone()),
            json(&self.data),
            Value::Integer(self.attempts),
            Value::from(self.last_error.clone()),
            opt_ts(&self.next_attempt_at),
            ts(&self.created_at),
            ts(&self.updated_at),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(AuditEntry {
            id: Some(row.get("id")?),
            queue_id: row.get("queue_id")?,
            queue: row.get("queue")?,
            operation: row.get("operation")?,
            data: get_json(row, "data")?,
            attempts: row.get("attempts")?,
            last_error: row.get("last_error")?,
            next_attempt_at: get_opt_ts(row, "next_attempt_at")?,
            created_at: get_ts(row, "created_at")?,
            updated_at: get_ts(row, "updated_at")?,
        })
    }

    fn natural_key(&self) -> Option<(&'static str, Value)> {
        Some(("queue_id", Value::Text(self.queue_id.clone())))
    }
}

pub type AuditEntries = Repository<AuditEntry>;

impl Repository<AuditEntry> {
    pub fn new(db: &Db) -> Self {
        Self::with_table(db, TABLE_AUDIT_QUEUE)
    }

    /// Entry with the given client-side queue id.
    pub fn find_by_queue_id(&self, queue_id: &str) -> StorageResult<Option<AuditEntry>> {
        let rows = self.select("WHERE queue_id = ?1", vec![Value::Text(queue_id.to_string())])?;
        Ok(rows.into_iter().next())
    }

    /// Every queued entry, oldest first.
    pub fn find_pending(&self) -> StorageResult<Vec<AuditEntry>> {
        self.select("ORDER BY created_at, id", Vec::new())
    }

    /// Entries never attempted or whose backoff has elapsed, oldest first.
    pub fn find_due(&self, now: DateTime<Utc>, limit: usize) -> StorageResult<Vec<AuditEntry>> {
        self.select(
            "WHERE next_attempt_at IS NULL OR next_attempt_at <= ?1 ORDER BY created_at, id LIMIT ?2",
            vec![ts(&now), Value::Integer(limit as i64)],
        )
    }
}
