//! Console tables.

use crate::db::aggregation::ActivitySummary;
use crate::db::audit_queue::AuditEntry;
use prettytable::{row, Table};

pub struct View {}

impl View {
    pub fn queue(entries: &[AuditEntry]) {
        let mut table = Table::new();

        table.add_row(row!["ID", "QUEUE ID", "QUEUE", "OPERATION", "ATTEMPTS", "NEXT ATTEMPT", "LAST ERROR"]);
        for entry in entries {
            table.add_row(row![
                entry.id.unwrap_or(0),
                entry.queue_id,
                entry.queue,
                entry.operation,
                entry.attempts,
                entry
                    .next_attempt_at
                    .map(|at| at.format("%Y-%m-%d %H:%M:%S").to_string())
                    .unwrap_or_else(|| "now".to_string()),
                entry.last_error.as_deref().unwrap_or("")
            ]);
        }
        table.printstd();
    }

    pub fn activity(summary: &ActivitySummary) {
        let mut table = Table::new();

        table.add_row(row!["TOTAL", "ACTIVE", "AFK", "UNTAGGED", "ACTIVITY"]);
        table.add_row(row![
            format_seconds(summary.total),
            format_seconds(summary.no_afk),
            format_seconds(summary.afk),
            format_seconds(summary.untagged),
            format!("{:.1}%", summary.activity_percentage)
        ]);
        table.printstd();
    }
}

/// `HH:MM:SS`, rounded down to whole seconds.
pub fn format_seconds(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    format!("{:02}:{:02}:{:02}", total / 3600, total % 3600 / 60, total % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_hours_minutes_seconds() {
        assert_eq!(format_seconds(0.0), "00:00:00");
        assert_eq!(format_seconds(200.9), "00:03:20");
        assert_eq!(format_seconds(3_725.0), "01:02:05");
    }
}
