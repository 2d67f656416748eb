//! Outbox of locally completed operations awaiting remote acknowledgment.
//!
//! None of these calls return an error: the capture path calls them from a
//! background loop that must keep running. Missing input yields
//! [`Outcome::Skipped`], storage failures [`Outcome::Failed`], and reads
//! degrade to `None` or an empty list.
//!
//! An entry stays in the queue until its push is acknowledged and
//! [`AuditQueue::remove`] is called. A failed push only bumps `attempts` and
//! pushes `next_attempt_at` back, so delivery is at-least-once.

use crate::db::audit_queue::{AuditEntries, AuditEntry, AuditPatch};
use crate::db::db::Db;
use crate::db::repository::Criteria;
use crate::libs::config::SyncConfig;
use crate::libs::messages::Message;
use crate::libs::outcome::Outcome;
use crate::{msg_debug, msg_error, msg_warning};
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Exponential retry schedule for failed pushes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    base: Duration,
    max: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::from(&SyncConfig::default())
    }
}

impl From<&SyncConfig> for BackoffPolicy {
    fn from(config: &SyncConfig) -> Self {
        Self::new(Duration::from_secs(config.backoff_base), Duration::from_secs(config.backoff_max))
    }
}

impl BackoffPolicy {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self { base, max: max.max(base) }
    }

    /// `base * 2^(attempts - 1)`, capped at `max`.
    pub fn delay(&self, attempts: i64) -> Duration {
        let exponent = attempts.saturating_sub(1).clamp(0, 31) as u32;
        self.base.checked_mul(1 << exponent).unwrap_or(self.max).min(self.max)
    }

    pub fn next_attempt(&self, now: DateTime<Utc>, attempts: i64) -> DateTime<Utc> {
        let delay = chrono::Duration::from_std(self.delay(attempts)).unwrap_or(chrono::Duration::MAX);
        now.checked_add_signed(delay).unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

#[derive(Clone)]
pub struct AuditQueue {
    entries: AuditEntries,
}

impl AuditQueue {
    pub fn new(db: &Db) -> Self {
        Self {
            entries: AuditEntries::new(db),
        }
    }

    /// Persists `entry`. Saving an existing queue id keeps the stored row.
    pub fn save(&self, entry: Option<&AuditEntry>) -> Outcome<AuditEntry> {
        let Some(entry) = entry else {
            msg_warning!(Message::QueueEntryMissing);
            return Outcome::Skipped("no entry");
        };

        match self.entries.save(entry) {
            Ok(stored) => {
                msg_debug!(Message::QueueEntrySaved(stored.queue_id.clone()));
                Outcome::Done(stored)
            }
            Err(e) => {
                msg_error!(Message::QueueWriteFailed(e.to_string()));
                Outcome::Failed(e)
            }
        }
    }

    /// Applies `patch` to the entry named by `patch.queue_id`.
    pub fn update(&self, patch: &AuditPatch) -> Outcome<usize> {
        let Some(queue_id) = patch.queue_id.as_deref().filter(|id| !id.is_empty()) else {
            msg_warning!(Message::QueueIdMissing);
            return Outcome::Skipped("missing queue id");
        };

        let existing = match self.entries.find_by_queue_id(queue_id) {
            Ok(existing) => existing,
            Err(e) => {
                msg_error!(Message::QueueReadFailed(e.to_string()));
                return Outcome::Failed(e);
            }
        };
        let Some(id) = existing.and_then(|entry| entry.id) else {
            msg_warning!(Message::QueueEntryNotFound(queue_id.to_string()));
            return Outcome::Skipped("unknown queue id");
        };

        match self.entries.update(id, patch) {
            Ok(updated) => {
                msg_debug!(Message::QueueEntryUpdated(queue_id.to_string()));
                Outcome::Done(updated)
            }
            Err(e) => {
                msg_error!(Message::QueueWriteFailed(e.to_string()));
                Outcome::Failed(e)
            }
        }
    }

    /// Entry with `queue_id`, or `None` on miss or read failure.
    pub fn retrieve(&self, queue_id: &str) -> Option<AuditEntry> {
        self.entries.find_by_queue_id(queue_id).unwrap_or_else(|e| {
            msg_error!(Message::QueueReadFailed(e.to_string()));
            None
        })
    }

    /// Drops an entry once the server has acknowledged it.
    pub fn remove(&self, entry: &AuditEntry) -> Outcome<usize> {
        if entry.queue_id.is_empty() {
            msg_warning!(Message::QueueIdMissing);
            return Outcome::Skipped("missing queue id");
        }

        match self.entries.delete(&Criteria::eq("queue_id", entry.queue_id.clone())) {
            Ok(removed) => {
                msg_debug!(Message::QueueEntryRemoved(entry.queue_id.clone()));
                Outcome::Done(removed)
            }
            Err(e) => {
                msg_error!(Message::QueueWriteFailed(e.to_string()));
                Outcome::Failed(e)
            }
        }
    }

    /// Every pending entry, oldest first. Empty on read failure.
    pub fn list(&self) -> Vec<AuditEntry> {
        self.entries.find_pending().unwrap_or_else(|e| {
            msg_error!(Message::QueueReadFailed(e.to_string()));
            Vec::new()
        })
    }

    /// Up to `limit` entries whose retry delay has elapsed at `now`.
    pub fn due(&self, now: DateTime<Utc>, limit: usize) -> Vec<AuditEntry> {
        self.entries.find_due(now, limit).unwrap_or_else(|e| {
            msg_error!(Message::QueueReadFailed(e.to_string()));
            Vec::new()
        })
    }

    /// Records a failed push and schedules the next attempt.
    pub fn record_failure(&self, entry: &AuditEntry, error: &str, policy: &BackoffPolicy, now: DateTime<Utc>) -> Outcome<usize> {
        let attempts = entry.attempts + 1;
        let next_attempt_at = policy.next_attempt(now, attempts);

        let outcome = self.update(&AuditPatch {
            queue_id: Some(entry.queue_id.clone()),
            attempts: Some(attempts),
            last_error: Some(error.to_string()),
            next_attempt_at: Some(next_attempt_at),
            ..Default::default()
        });
        if outcome.is_done() {
            msg_warning!(Message::QueueRetryScheduled(entry.queue_id.clone(), attempts, next_attempt_at.to_rfc3339()));
        }
        outcome
    }
}
