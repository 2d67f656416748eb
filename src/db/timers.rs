//! Work sessions.
//!
//! A timer is created when tracking starts and closed when it stops. It owns
//! every activity event recorded during the session; deleting a timer
//! cascades to the per-category event tables.

use crate::db::columns::{get_opt_ts, get_ts, opt_ts, ts};
use crate::db::db::Db;
use crate::db::error::StorageResult;
use crate::db::repository::{Patch, Record, Repository};
use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::Row;
use serde::{Deserialize, Serialize};

pub const TABLE_TIMERS: &str = "timers";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timer {
    pub id: Option<i64>,
    pub tenant_id: Option<String>,
    pub organization_id: Option<String>,
    pub employee_id: Option<String>,
    pub project_id: Option<String>,
    pub started_at: DateTime<Utc>,
    pub stopped_at: Option<DateTime<Utc>>,
    pub synced: bool,
    /// Started while the remote API was unreachable.
    pub is_started_offline: bool,
    pub is_stopped_offline: bool,
    /// Remote time log id once the server has acknowledged the timer.
    pub timelog_id: Option<String>,
}

impl Timer {
    pub fn start(started_at: DateTime<Utc>) -> Self {
        Timer {
            id: None,
            tenant_id: None,
            organization_id: None,
            employee_id: None,
            project_id: None,
            started_at,
            stopped_at: None,
            synced: false,
            is_started_offline: false,
            is_stopped_offline: false,
            timelog_id: None,
        }
    }

    /// `true` until the timer has a stop time.
    pub fn is_running(&self) -> bool {
        self.stopped_at.is_none()
    }
}

#[derive(Debug, Clone, Default)]
pub struct TimerPatch {
    pub project_id: Option<String>,
    pub stopped_at: Option<DateTime<Utc>>,
    pub synced: Option<bool>,
    pub is_started_offline: Option<bool>,
    pub is_stopped_offline: Option<bool>,
    pub timelog_id: Option<String>,
}

impl Patch for TimerPatch {
    fn assignments(&self) -> Vec<(&'static str, Value)> {
        let mut set = Vec::new();
        if let Some(project_id) = &self.project_id {
            set.push(("project_id", Value::Text(project_id.clone())));
        }
        if let Some(stopped_at) = &self.stopped_at {
            set.push(("stopped_at", ts(stopped_at)));
        }
        if let Some(synced) = self.synced {
            set.push(("synced", Value::from(synced)));
        }
        if let Some(flag) = self.is_started_offline {
            set.push(("is_started_offline", Value::from(flag)));
        }
        if let Some(flag) = self.is_stopped_offline {
            set.push(("is_stopped_offline", Value::from(flag)));
        }
        if let Some(timelog_id) = &self.timelog_id {
            set.push(("timelog_id", Value::Text(timelog_id.clone())));
        }
        set
    }
}

impl Record for Timer {
    const COLUMNS: &'static [&'static str] = &[
        "tenant_id",
        "organization_id",
        "employee_id",
        "project_id",
        "started_at",
        "stopped_at",
        "synced",
        "is_started_offline",
        "is_stopped_offline",
        "timelog_id",
    ];

    type Patch = TimerPatch;

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn values(&self) -> Vec<Value> {
        vec![
            Value::from(self.tenant_id.clone()),
            Value::from(self.organization_id.clone()),
            Value::from(self.employee_id.clone()),
            Value::from(self.project_id.clone()),
            ts(&self.started_at),
            opt_ts(&self.stopped_at),
            Value::from(self.synced),
            Value::from(self.is_started_offline),
            Value::from(self.is_stopped_offline),
            Value::from(self.timelog_id.clone()),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Timer {
            id: Some(row.get("id")?),
            tenant_id: row.get("tenant_id")?,
            organization_id: row.get("organization_id")?,
            employee_id: row.get("employee_id")?,
            project_id: row.get("project_id")?,
            started_at: get_ts(row, "started_at")?,
            stopped_at: get_opt_ts(row, "stopped_at")?,
            synced: row.get("synced")?,
            is_started_offline: row.get("is_started_offline")?,
            is_stopped_offline: row.get("is_stopped_offline")?,
            timelog_id: row.get("timelog_id")?,
        })
    }
}

pub type Timers = Repository<Timer>;

impl Repository<Timer> {
    pub fn new(db: &Db) -> Self {
        Self::with_table(db, TABLE_TIMERS)
    }

    /// Most recently started timer, running or not.
    pub fn find_last_one(&self) -> StorageResult<Option<Timer>> {
        Ok(self.select("ORDER BY started_at DESC, id DESC LIMIT 1", Vec::new())?.pop())
    }

    /// Timers the server has not acknowledged yet, oldest first.
    pub fn find_to_sync(&self) -> StorageResult<Vec<Timer>> {
        self.select("WHERE synced = 0 ORDER BY started_at", Vec::new())
    }

    /// Closes the session boundary. Stopping twice keeps the first stop time.
    pub fn stop(&self, id: i64, stopped_at: DateTime<Utc>, offline: bool) -> StorageResult<usize> {
        let open = self.find_one_by_id(id)?.map(|timer| timer.is_running()).unwrap_or(false);
        if !open {
            return Ok(0);
        }
        self.update(
            id,
            &TimerPatch {
                stopped_at: Some(stopped_at),
                is_stopped_offline: Some(offline),
                ..Default::default()
            },
        )
    }

    /// Flags the timer as acknowledged by the server.
    pub fn mark_synced(&self, id: i64) -> StorageResult<usize> {
        self.update(
            id,
            &TimerPatch {
                synced: Some(true),
                ..Default::default()
            },
        )
    }
}
