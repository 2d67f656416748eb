//! Watcher events: AFK status, focused window and browser tabs.
//!
//! Each category has its own table with identical shape. The `data` column
//! keeps the watcher payload as JSON; aggregation queries read the `status`
//! field from it directly instead of relying on a normalized column.

use crate::db::columns::{get_json, get_ts, json, ts};
use crate::db::db::Db;
use crate::db::error::{Operation, StorageResult};
use crate::db::repository::{Criteria, Patch, Record, Repository};
use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::Row;
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    Afk,
    Window,
    WebChrome,
    WebFirefox,
}

impl EventCategory {
    pub const ALL: [EventCategory; 4] = [EventCategory::Afk, EventCategory::Window, EventCategory::WebChrome, EventCategory::WebFirefox];

    pub fn table(self) -> &'static str {
        match self {
            EventCategory::Afk => "afk_events",
            EventCategory::Window => "window_events",
            EventCategory::WebChrome => "chrome_events",
            EventCategory::WebFirefox => "firefox_events",
        }
    }

    /// Value stored in the `type` column.
    pub fn kind(self) -> &'static str {
        match self {
            EventCategory::Afk => "afk",
            EventCategory::Window => "window",
            EventCategory::WebChrome => "web-chrome",
            EventCategory::WebFirefox => "web-firefox",
        }
    }
}

/// AFK discriminant carried in the payload's `status` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AfkStatus {
    #[serde(rename = "AFK")]
    Afk,
    #[serde(rename = "NO_AFK")]
    NoAfk,
}

impl AfkStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AfkStatus::Afk => "AFK",
            AfkStatus::NoAfk => "NO_AFK",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEvent {
    pub id: Option<i64>,
    /// Globally unique id supplied by the watcher.
    pub event_id: String,
    /// Seconds, never negative.
    pub duration: f64,
    pub data: serde_json::Value,
    pub time_slot_id: Option<String>,
    pub kind: String,
    pub recorded_at: DateTime<Utc>,
    pub timer_id: i64,
}

impl ActivityEvent {
    pub fn new(category: EventCategory, event_id: impl Into<String>, timer_id: i64, duration: f64, data: serde_json::Value) -> Self {
        ActivityEvent {
            id: None,
            event_id: event_id.into(),
            duration,
            data,
            time_slot_id: None,
            kind: category.kind().to_string(),
            recorded_at: Utc::now(),
            timer_id,
        }
    }

    /// Event whose payload is tagged with an AFK status.
    pub fn with_status(category: EventCategory, event_id: impl Into<String>, timer_id: i64, duration: f64, status: AfkStatus) -> Self {
        Self::new(category, event_id, timer_id, duration, json!({ "status": status.as_str() }))
    }

    /// The AFK status stored in the event payload, if any.
    pub fn status(&self) -> Option<&str> {
        self.data.get("status").and_then(|status| status.as_str())
    }
}

#[derive(Debug, Clone, Default)]
pub struct ActivityEventPatch {
    pub time_slot_id: Option<String>,
    pub duration: Option<f64>,
    pub data: Option<serde_json::Value>,
}

impl Patch for ActivityEventPatch {
    fn assignments(&self) -> Vec<(&'static str, Value)> {
        let mut set = Vec::new();
        if let Some(time_slot_id) = &self.time_slot_id {
            set.push(("time_slot_id", Value::Text(time_slot_id.clone())));
        }
        if let Some(duration) = self.duration {
            set.push(("duration", Value::Real(duration)));
        }
        if let Some(data) = &self.data {
            set.push(("data", json(data)));
        }
        set
    }
}

impl Record for ActivityEvent {
    const COLUMNS: &'static [&'static str] = &["event_id", "duration", "data", "time_slot_id", "type", "recorded_at", "timer_id"];

    type Patch = ActivityEventPatch;

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn values(&self) -> Vec<Value> {
        vec![
            Value::Text(self.event_id.clone()),
            Value::Real(self.duration),
            json(&self.data),
            Value::from(self.time_slot_id.clone()),
            Value::Text(self.kind.clone()),
            ts(&self.recorded_at),
            Value::Integer(self.timer_id),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(ActivityEvent {
            id: Some(row.get("id")?),
            event_id: row.get("event_id")?,
            duration: row.get("duration")?,
            data: get_json(row, "data")?,
            time_slot_id: row.get("time_slot_id")?,
            kind: row.get("type")?,
            recorded_at: get_ts(row, "recorded_at")?,
            timer_id: row.get("timer_id")?,
        })
    }

    // Watchers redeliver events after a restart; the event id keeps one row each.
    fn natural_key(&self) -> Option<(&'static str, Value)> {
        Some(("event_id", Value::Text(self.event_id.clone())))
    }
}

pub type ActivityEvents = Repository<ActivityEvent>;

impl Repository<ActivityEvent> {
    pub fn new(db: &Db, category: EventCategory) -> Self {
        Self::with_table(db, category.table())
    }

    /// Events recorded under `timer_id`, oldest first.
    pub fn find_by_timer(&self, timer_id: i64) -> StorageResult<Vec<ActivityEvent>> {
        self.select("WHERE timer_id = ?1 ORDER BY recorded_at, id", vec![Value::Integer(timer_id)])
    }

    /// Events not yet correlated with a remote time slot.
    pub fn find_without_time_slot(&self, timer_id: i64) -> StorageResult<Vec<ActivityEvent>> {
        self.find_by(&Criteria::eq("timer_id", timer_id).and("time_slot_id", Value::Null))
    }

    /// Attaches the remote time slot to every uncorrelated event of a timer.
    pub fn assign_time_slot(&self, timer_id: i64, time_slot_id: &str) -> StorageResult<usize> {
        let sql = format!("UPDATE {} SET time_slot_id = ?1 WHERE timer_id = ?2 AND time_slot_id IS NULL", self.table());
        let slot = time_slot_id.to_string();
        self.transaction()
            .execute(Operation::Update, |tx| tx.execute(&sql, rusqlite::params![slot, timer_id]))
    }

    /// Drops every stored event of this category.
    pub fn clear(&self) -> StorageResult<usize> {
        let sql = format!("DELETE FROM {}", self.table());
        self.transaction().execute(Operation::Delete, |tx| tx.execute(&sql, []))
    }
}
