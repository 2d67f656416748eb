//! Duration queries over the stored watcher events.
//!
//! Sums run across all four event tables at once. AFK classification reads
//! the `status` field of the JSON payload through SQLite's JSON1
//! `json_extract`, so no normalized status column is required.

use crate::db::activity_events::EventCategory;
use crate::db::db::Db;
use crate::db::error::{Operation, StorageContext, StorageResult};
use serde::Serialize;

const TABLE: &str = "activity_events";

const STATUS: &str = "UPPER(REPLACE(json_extract(data, '$.status'), '-', '_'))";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StatusFilter {
    Any,
    Afk,
    NoAfk,
}

impl StatusFilter {
    fn predicate(self) -> String {
        match self {
            StatusFilter::Any => String::new(),
            StatusFilter::Afk => format!("WHERE {STATUS} = 'AFK'"),
            StatusFilter::NoAfk => format!("WHERE {STATUS} IN ('NO_AFK', 'NOT_AFK')"),
        }
    }
}

/// Per-timer breakdown used to reconcile local activity with the remote timesheet.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ActivitySummary {
    pub total: f64,
    pub afk: f64,
    pub no_afk: f64,
    /// Events whose payload carries no recognized status.
    pub untagged: f64,
    /// Share of the total spent active, 0 when nothing was recorded.
    pub activity_percentage: f64,
}

pub struct Aggregation {
    db: Db,
}

impl Aggregation {
    pub fn new(db: &Db) -> Self {
        Self { db: db.clone() }
    }

    /// Seconds recorded for `timer_id` across every category; 0 when empty.
    pub fn duration(&self, timer_id: i64) -> StorageResult<f64> {
        self.sum(timer_id, StatusFilter::Any)
    }

    /// Seconds of events whose status marks the user away.
    pub fn duration_afk(&self, timer_id: i64) -> StorageResult<f64> {
        self.sum(timer_id, StatusFilter::Afk)
    }

    /// Seconds of events whose status marks the user present.
    pub fn duration_no_afk(&self, timer_id: i64) -> StorageResult<f64> {
        self.sum(timer_id, StatusFilter::NoAfk)
    }

    /// Seconds recorded in one event table.
    pub fn duration_by_category(&self, timer_id: i64, category: EventCategory) -> StorageResult<f64> {
        let sql = format!(
            "SELECT COALESCE(SUM(duration), 0.0) FROM {} WHERE timer_id = ?1",
            category.table()
        );
        let conn = self.db.lock();
        conn.query_row(&sql, [timer_id], |row| row.get(0))
            .tagged(Operation::Read, category.table())
    }

    /// All of the above in one pass, for the duration report.
    pub fn summary(&self, timer_id: i64) -> StorageResult<ActivitySummary> {
        let total = self.duration(timer_id)?;
        let afk = self.duration_afk(timer_id)?;
        let no_afk = self.duration_no_afk(timer_id)?;
        let activity_percentage = if total > 0.0 { no_afk / total * 100.0 } else { 0.0 };

        Ok(ActivitySummary {
            total,
            afk,
            no_afk,
            untagged: (total - afk - no_afk).max(0.0),
            activity_percentage,
        })
    }

    fn sum(&self, timer_id: i64, filter: StatusFilter) -> StorageResult<f64> {
        let sql = format!(
            "SELECT COALESCE(SUM(duration), 0.0) FROM ({}) {}",
            events_of_timer(),
            filter.predicate()
        );
        let conn = self.db.lock();
        conn.query_row(&sql, [timer_id], |row| row.get(0)).tagged(Operation::Read, TABLE)
    }
}

fn events_of_timer() -> String {
    EventCategory::ALL
        .iter()
        .map(|category| format!("SELECT duration, data FROM {} WHERE timer_id = ?1", category.table()))
        .collect::<Vec<_>>()
        .join(" UNION ALL ")
}
