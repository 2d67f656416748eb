//! Captured screenshots awaiting upload.
//!
//! The image path is the dedup key: capturing the same file twice (for
//! example after a crash between capture and bookkeeping) leaves exactly one
//! row, and `save` hands back that row either way.

use crate::db::columns::{get_ts, ts};
use crate::db::db::Db;
use crate::db::error::StorageResult;
use crate::db::repository::{Criteria, Patch, Record, Repository};
use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::Row;
use serde::{Deserialize, Serialize};

pub const TABLE_SCREENSHOTS: &str = "screenshots";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Screenshot {
    pub id: Option<i64>,
    pub image_path: String,
    pub recorded_at: DateTime<Utc>,
    pub time_slot_id: Option<String>,
    pub synced: bool,
    pub tenant_id: Option<String>,
    pub organization_id: Option<String>,
    pub employee_id: Option<String>,
}

impl Screenshot {
    pub fn new(image_path: impl Into<String>) -> Self {
        Screenshot {
            id: None,
            image_path: image_path.into(),
            recorded_at: Utc::now(),
            time_slot_id: None,
            synced: false,
            tenant_id: None,
            organization_id: None,
            employee_id: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScreenshotPatch {
    pub time_slot_id: Option<String>,
    pub synced: Option<bool>,
}

impl Patch for ScreenshotPatch {
    fn assignments(&self) -> Vec<(&'static str, Value)> {
        let mut set = Vec::new();
        if let Some(time_slot_id) = &self.time_slot_id {
            set.push(("time_slot_id", Value::Text(time_slot_id.clone())));
        }
        if let Some(synced) = self.synced {
            set.push(("synced", Value::from(synced)));
        }
        set
    }
}

impl Record for Screenshot {
    const COLUMNS: &'static [&'static str] = &[
        "image_path",
        "recorded_at",
        "time_slot_id",
        "synced",
        "tenant_id",
        "organization_id",
        "employee_id",
    ];

    type Patch = ScreenshotPatch;

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn values(&self) -> Vec<Value> {
        vec![
            Value::Text(self.image_path.clone()),
            ts(&self.recorded_at),
            Value::from(self.time_slot_id.clone()),
            Value::from(self.synced),
            Value::from(self.tenant_id.clone()),
            Value::from(self.organization_id.clone()),
            Value::from(self.employee_id.clone()),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Screenshot {
            id: Some(row.get("id")?),
            image_path: row.get("image_path")?,
            recorded_at: get_ts(row, "recorded_at")?,
            time_slot_id: row.get("time_slot_id")?,
            synced: row.get("synced")?,
            tenant_id: row.get("tenant_id")?,
            organization_id: row.get("organization_id")?,
            employee_id: row.get("employee_id")?,
        })
    }

    fn natural_key(&self) -> Option<(&'static str, Value)> {
        Some(("image_path", Value::Text(self.image_path.clone())))
    }
}

pub type Screenshots = Repository<Screenshot>;

impl Repository<Screenshot> {
    pub fn new(db: &Db) -> Self {
        Self::with_table(db, TABLE_SCREENSHOTS)
    }

    /// Screenshots not yet uploaded, in capture order.
    pub fn find_unsynced(&self) -> StorageResult<Vec<Screenshot>> {
        self.select("WHERE synced = 0 ORDER BY recorded_at", Vec::new())
    }

    pub fn find_by_path(&self, image_path: &str) -> StorageResult<Option<Screenshot>> {
        Ok(self.find_by(&Criteria::eq("image_path", image_path.to_string()))?.pop())
    }

    /// Records the time slot a screenshot belongs to without marking it uploaded.
    pub fn assign_time_slot(&self, id: i64, time_slot_id: &str) -> StorageResult<usize> {
        self.update(
            id,
            &ScreenshotPatch {
                time_slot_id: Some(time_slot_id.to_string()),
                synced: None,
            },
        )
    }

    /// Flags the screenshot as uploaded under `time_slot_id`.
    pub fn mark_synced(&self, id: i64, time_slot_id: Option<String>) -> StorageResult<usize> {
        self.update(id, &ScreenshotPatch { time_slot_id, synced: Some(true) })
    }
}
