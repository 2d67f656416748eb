//! Sub-periods of a timer that are reported to the server as one time slot.

use crate::db::columns::{get_ts, ts};
use crate::db::db::Db;
use crate::db::error::StorageResult;
use crate::db::repository::{Patch, Record, Repository};
use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::Row;
use serde::{Deserialize, Serialize};

pub const TABLE_INTERVALS: &str = "intervals";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    pub id: Option<i64>,
    pub timer_id: i64,
    pub started_at: DateTime<Utc>,
    pub stopped_at: DateTime<Utc>,
    pub remote_id: Option<String>,
    pub synced: bool,
    pub tenant_id: Option<String>,
    pub organization_id: Option<String>,
    pub employee_id: Option<String>,
}

impl Interval {
    pub fn new(timer_id: i64, started_at: DateTime<Utc>, stopped_at: DateTime<Utc>) -> Self {
        Interval {
            id: None,
            timer_id,
            started_at,
            stopped_at,
            remote_id: None,
            synced: false,
            tenant_id: None,
            organization_id: None,
            employee_id: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct IntervalPatch {
    pub remote_id: Option<String>,
    pub synced: Option<bool>,
}

impl Patch for IntervalPatch {
    fn assignments(&self) -> Vec<(&'static str, Value)> {
        let mut set = Vec::new();
        if let Some(remote_id) = &self.remote_id {
            set.push(("remote_id", Value::Text(remote_id.clone())));
        }
        if let Some(synced) = self.synced {
            set.push(("synced", Value::from(synced)));
        }
        set
    }
}

impl Record for Interval {
    const COLUMNS: &'static [&'static str] = &[
        "timer_id",
        "started_at",
        "stopped_at",
        "remote_id",
        "synced",
        "tenant_id",
        "organization_id",
        "employee_id",
    ];

    type Patch = IntervalPatch;

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn values(&self) -> Vec<Value> {
        vec![
            Value::Integer(self.timer_id),
            ts(&self.started_at),
            ts(&self.stopped_at),
            Value::from(self.remote_id.clone()),
            Value::from(self.synced),
            Value::from(self.tenant_id.clone()),
            Value::from(self.organization_id.clone()),
            Value::from(self.employee_id.clone()),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Interval {
            id: Some(row.get("id")?),
            timer_id: row.get("timer_id")?,
            started_at: get_ts(row, "started_at")?,
            stopped_at: get_ts(row, "stopped_at")?,
            remote_id: row.get("remote_id")?,
            synced: row.get("synced")?,
            tenant_id: row.get("tenant_id")?,
            organization_id: row.get("organization_id")?,
            employee_id: row.get("employee_id")?,
        })
    }
}

pub type Intervals = Repository<Interval>;

impl Repository<Interval> {
    pub fn new(db: &Db) -> Self {
        Self::with_table(db, TABLE_INTERVALS)
    }

    /// Intervals not yet pushed, oldest first.
    pub fn find_unsynced(&self) -> StorageResult<Vec<Interval>> {
        self.select("WHERE synced = 0 ORDER BY started_at", Vec::new())
    }

    /// Flags the interval as pushed and keeps the server-side id.
    pub fn mark_synced(&self, id: i64, remote_id: Option<String>) -> StorageResult<usize> {
        self.update(id, &IntervalPatch { remote_id, synced: Some(true) })
    }
}
