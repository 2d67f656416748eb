//! Aggregated keyboard and mouse counters, one row per flushed capture window.

use crate::db::columns::{get_json, get_ts, json, ts};
use crate::db::db::Db;
use crate::db::error::StorageResult;
use crate::db::repository::{Patch, Record, Repository};
use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::Row;
use serde::{Deserialize, Serialize};

pub const TABLE_KB_MOUSE_ACTIVITY: &str = "kb_mouse_activity";

/// Time spent in one application during a capture window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowActivity {
    pub name: String,
    pub duration: f64,
    #[serde(default)]
    pub meta: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KbMouseActivity {
    pub id: Option<i64>,
    pub time_start: DateTime<Utc>,
    pub time_end: DateTime<Utc>,
    pub timer_id: Option<i64>,
    pub tenant_id: Option<String>,
    pub organization_id: Option<String>,
    /// Remote user the counters belong to.
    pub remote_id: Option<String>,
    pub kb_press_count: i64,
    pub kb_sequence: Vec<u32>,
    pub mouse_left_click_count: i64,
    pub mouse_right_click_count: i64,
    pub mouse_movements_count: i64,
    pub mouse_wheel_count: i64,
    pub active_windows: Vec<WindowActivity>,
    /// Seconds of the window spent away from keyboard.
    pub afk_duration: f64,
    pub screenshots: Vec<String>,
    pub synced: bool,
}

impl KbMouseActivity {
    pub fn new(time_start: DateTime<Utc>, time_end: DateTime<Utc>) -> Self {
        KbMouseActivity {
            id: None,
            time_start,
            time_end,
            timer_id: None,
            tenant_id: None,
            organization_id: None,
            remote_id: None,
            kb_press_count: 0,
            kb_sequence: Vec::new(),
            mouse_left_click_count: 0,
            mouse_right_click_count: 0,
            mouse_movements_count: 0,
            mouse_wheel_count: 0,
            active_windows: Vec::new(),
            afk_duration: 0.0,
            screenshots: Vec::new(),
            synced: false,
        }
    }

    /// Window length in whole seconds.
    pub fn duration_secs(&self) -> i64 {
        (self.time_end - self.time_start).num_seconds().max(0)
    }

    /// Window length minus time spent away from keyboard.
    pub fn overall_secs(&self) -> i64 {
        (self.duration_secs() - self.afk_duration as i64).max(0)
    }
}

/// Partial update. `id` identifies the row and is required by the service layer.
#[derive(Debug, Clone, Default)]
pub struct KbMouseActivityPatch {
    pub id: Option<i64>,
    pub time_end: Option<DateTime<Utc>>,
    pub kb_press_count: Option<i64>,
    pub mouse_left_click_count: Option<i64>,
    pub mouse_right_click_count: Option<i64>,
    pub mouse_movements_count: Option<i64>,
    pub mouse_wheel_count: Option<i64>,
    pub kb_sequence: Option<Vec<u32>>,
    pub active_windows: Option<Vec<WindowActivity>>,
    pub afk_duration: Option<f64>,
    pub screenshots: Option<Vec<String>>,
    pub synced: Option<bool>,
}

impl Patch for KbMouseActivityPatch {
    fn assignments(&self) -> Vec<(&'static str, Value)> {
        let mut set = Vec::new();
        if let Some(time_end) = &self.time_end {
            set.push(("time_end", ts(time_end)));
        }
        if let Some(count) = self.kb_press_count {
            set.push(("kb_press_count", Value::Integer(count)));
        }
        if let Some(count) = self.mouse_left_click_count {
            set.push(("mouse_left_click_count", Value::Integer(count)));
        }
        if let Some(count) = self.mouse_right_click_count {
            set.push(("mouse_right_click_count", Value::Integer(count)));
        }
        if let Some(count) = self.mouse_movements_count {
            set.push(("mouse_movements_count", Value::Integer(count)));
        }
        if let Some(count) = self.mouse_wheel_count {
            set.push(("mouse_wheel_count", Value::Integer(count)));
        }
        if let Some(sequence) = &self.kb_sequence {
            set.push(("kb_sequence", json(sequence)));
        }
        if let Some(windows) = &self.active_windows {
            set.push(("active_windows", json(windows)));
        }
        if let Some(afk) = self.afk_duration {
            set.push(("afk_duration", Value::Real(afk)));
        }
        if let Some(screenshots) = &self.screenshots {
            set.push(("screenshots", json(screenshots)));
        }
        if let Some(synced) = self.synced {
            set.push(("synced", Value::from(synced)));
        }
        set
    }
}

impl Record for KbMouseActivity {
    const COLUMNS: &'static [&'static str] = &[
        "time_start",
        "time_end",
        "timer_id",
        "tenant_id",
        "organization_id",
        "remote_id",
        "kb_press_count",
        "kb_sequence",
        "mouse_left_click_count",
        "mouse_right_click_count",
        "mouse_movements_count",
        "mouse_wheel_count",
        "active_windows",
        "afk_duration",
        "screenshots",
        "synced",
    ];

    type Patch = KbMouseActivityPatch;

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn values(&self) -> Vec<Value> {
        vec![
            ts(&self.time_start),
            ts(&self.time_end),
            Value::from(self.timer_id),
            Value::from(self.tenant_id.clone()),
            Value::from(self.organization_id.clone()),
            Value::from(self.remote_id.clone()),
            Value::Integer(self.kb_press_count),
            json(&self.kb_sequence),
            Value::Integer(self.mouse_left_click_count),
            Value::Integer(self.mouse_right_click_count),
            Value::Integer(self.mouse_movements_count),
            Value::Integer(self.mouse_wheel_count),
            json(&self.active_windows),
            Value::Real(self.afk_duration),
            json(&self.screenshots),
            Value::from(self.synced),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(KbMouseActivity {
            id: Some(row.get("id")?),
            time_start: get_ts(row, "time_start")?,
            time_end: get_ts(row, "time_end")?,
            timer_id: row.get("timer_id")?,
            tenant_id: row.get("tenant_id")?,
            organization_id: row.get("organization_id")?,
            remote_id: row.get("remote_id")?,
            kb_press_count: row.get("kb_press_count")?,
            kb_sequence: get_json(row, "kb_sequence")?,
            mouse_left_click_count: row.get("mouse_left_click_count")?,
            mouse_right_click_count: row.get("mouse_right_click_count")?,
            mouse_movements_count: row.get("mouse_movements_count")?,
            mouse_wheel_count: row.get("mouse_wheel_count")?,
            active_windows: get_json(row, "active_windows")?,
            afk_duration: row.get("afk_duration")?,
            screenshots: get_json(row, "screenshots")?,
            synced: row.get("synced")?,
        })
    }
}

pub type KbMouseActivities = Repository<KbMouseActivity>;

impl Repository<KbMouseActivity> {
    pub fn new(db: &Db) -> Self {
        Self::with_table(db, TABLE_KB_MOUSE_ACTIVITY)
    }

    /// Activity windows the server has not acknowledged.
    pub fn find_unsynced(&self) -> StorageResult<Vec<KbMouseActivity>> {
        self.select("WHERE synced = 0 ORDER BY time_start", Vec::new())
    }

    /// Oldest unsynced window recorded for this user and organization.
    pub fn find_oldest(&self, remote_id: &str, organization_id: &str, tenant_id: &str) -> StorageResult<Option<KbMouseActivity>> {
        let rows = self.select(
            "WHERE synced = 0 AND remote_id = ?1 AND organization_id = ?2 AND tenant_id = ?3 ORDER BY time_start, id LIMIT 1",
            vec![
                Value::Text(remote_id.to_string()),
                Value::Text(organization_id.to_string()),
                Value::Text(tenant_id.to_string()),
            ],
        )?;
        Ok(rows.into_iter().next())
    }
}
