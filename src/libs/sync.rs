//! Drains locally buffered records to the server.
//!
//! Each drain pushes, in order: timers created or stopped while offline, the
//! oldest pending activity window together with its screenshots, due outbox
//! entries, and any screenshot no pending window refers to. A failed push
//! leaves the record in place for the next drain; outbox entries additionally
//! get an exponential retry delay. An activity window is only removed once the
//! server returned its time slot and all of its screenshots were uploaded.

use crate::db::activity_events::{ActivityEvents, EventCategory};
use crate::db::audit_queue::AuditEntry;
use crate::db::db::Db;
use crate::db::kb_mouse_activity::{KbMouseActivities, KbMouseActivity, KbMouseActivityPatch};
use crate::db::screenshots::{Screenshot, Screenshots};
use crate::db::timers::{Timer, TimerPatch, Timers};
use crate::libs::audit_queue::{AuditQueue, BackoffPolicy};
use crate::libs::config::TenantConfig;
use crate::libs::kb_mouse::KbMouseActivityService;
use crate::libs::messages::Message;
use crate::libs::outcome::Outcome;
use crate::{msg_debug, msg_info, msg_warning};
use anyhow::Result;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::future::Future;

/// Remote side of the sync. Implementations return the server-side id where one is assigned.
pub trait RemoteSync: Send + Sync {
    /// `false` when there is no server to talk to; the drain then does nothing.
    fn is_enabled(&self) -> bool {
        true
    }

    /// Returns the remote time log id.
    fn push_timer(&self, timer: &Timer) -> impl Future<Output = Result<Option<String>>> + Send;

    /// Returns the remote time slot id.
    fn push_activity(&self, activity: &KbMouseActivity) -> impl Future<Output = Result<Option<String>>> + Send;

    fn push_screenshot(&self, screenshot: &Screenshot, time_slot_id: Option<&str>) -> impl Future<Output = Result<()>> + Send;

    fn push_entry(&self, entry: &AuditEntry) -> impl Future<Output = Result<()>> + Send;
}

/// Stand-in used when no server is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopRemote;

impl RemoteSync for NoopRemote {
    fn is_enabled(&self) -> bool {
        false
    }

    async fn push_timer(&self, _timer: &Timer) -> Result<Option<String>> {
        Ok(None)
    }

    async fn push_activity(&self, _activity: &KbMouseActivity) -> Result<Option<String>> {
        Ok(None)
    }

    async fn push_screenshot(&self, _screenshot: &Screenshot, _time_slot_id: Option<&str>) -> Result<()> {
        Ok(())
    }

    async fn push_entry(&self, _entry: &AuditEntry) -> Result<()> {
        Ok(())
    }
}

/// What one drain pushed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DrainReport {
    pub timers: usize,
    pub activities: usize,
    pub screenshots: usize,
    pub entries: usize,
    pub failures: usize,
}

impl DrainReport {
    pub fn pushed(&self) -> usize {
        self.timers + self.activities + self.screenshots + self.entries
    }
}

pub struct SyncDrain<R: RemoteSync> {
    db: Db,
    remote: R,
    queue: AuditQueue,
    activities: KbMouseActivityService,
    pending_activities: KbMouseActivities,
    timers: Timers,
    screenshots: Screenshots,
    policy: BackoffPolicy,
    batch_size: usize,
    tenant: TenantConfig,
}

impl<R: RemoteSync> SyncDrain<R> {
    pub fn new(db: &Db, remote: R, policy: BackoffPolicy, batch_size: usize, tenant: TenantConfig) -> Self {
        Self {
            db: db.clone(),
            remote,
            queue: AuditQueue::new(db),
            activities: KbMouseActivityService::new(db),
            pending_activities: KbMouseActivities::new(db),
            timers: Timers::new(db),
            screenshots: Screenshots::new(db),
            policy,
            batch_size: batch_size.max(1),
            tenant,
        }
    }

    pub fn queue(&self) -> &AuditQueue {
        &self.queue
    }

    /// Pushes everything that is due at `now`.
    ///
    /// Remote failures are counted in the report; only storage errors are returned.
    pub async fn drain(&self, now: DateTime<Utc>) -> Result<DrainReport> {
        let mut report = DrainReport::default();
        if !self.remote.is_enabled() {
            msg_debug!(Message::SyncDisabled);
            return Ok(report);
        }

        self.push_offline_timers(&mut report).await?;
        self.push_oldest_activity(&mut report).await?;
        self.push_due_entries(now, &mut report).await;
        self.push_loose_screenshots(&mut report).await?;

        if report.pushed() > 0 {
            msg_info!(Message::DrainCompleted(report.pushed()));
        }
        Ok(report)
    }

    async fn push_offline_timers(&self, report: &mut DrainReport) -> Result<()> {
        for timer in self.timers.find_to_sync()? {
            let Some(id) = timer.id else { continue };
            // A running timer is pushed once to obtain its remote id, then again after it stops.
            if timer.is_running() && timer.timelog_id.is_some() {
                continue;
            }

            match self.remote.push_timer(&timer).await {
                Ok(timelog_id) => {
                    let patch = TimerPatch {
                        timelog_id: timelog_id.or(timer.timelog_id.clone()),
                        synced: (!timer.is_running()).then_some(true),
                        ..Default::default()
                    };
                    self.timers.update(id, &patch)?;
                    report.timers += 1;
                    msg_debug!(Message::TimerSynced(id));
                }
                Err(e) => {
                    report.failures += 1;
                    msg_warning!(Message::SyncPushFailed(format!("timer {id}"), format!("{e:#}")));
                }
            }
        }
        Ok(())
    }

    async fn push_oldest_activity(&self, report: &mut DrainReport) -> Result<()> {
        if !self.tenant.is_complete() {
            msg_debug!(Message::SyncIdentityMissing);
            return Ok(());
        }
        let Some(activity) = self
            .activities
            .retrieve(&self.tenant.remote_user_id, &self.tenant.organization_id, &self.tenant.tenant_id)
        else {
            return Ok(());
        };
        let Some(id) = activity.id else { return Ok(()) };

        let time_slot_id = match self.remote.push_activity(&activity).await {
            Ok(time_slot_id) => time_slot_id,
            Err(e) => {
                report.failures += 1;
                msg_warning!(Message::SyncPushFailed(format!("activity {id}"), format!("{e:#}")));
                return Ok(());
            }
        };

        // The window stays pending until the server assigned a slot and every screenshot landed.
        let Some(slot) = time_slot_id else {
            msg_warning!(Message::ActivityKeptPending(id));
            return Ok(());
        };

        let mut all_uploaded = true;
        for path in &activity.screenshots {
            let Some(mut screenshot) = self.screenshots.find_by_path(path)? else { continue };
            if let Some(screenshot_id) = screenshot.id {
                self.screenshots.assign_time_slot(screenshot_id, &slot)?;
                screenshot.time_slot_id = Some(slot.clone());
            }
            all_uploaded &= self.push_screenshot(&screenshot, Some(&slot), report).await?;
        }
        if !all_uploaded {
            msg_warning!(Message::ActivityKeptPending(id));
            return Ok(());
        }

        if let Some(timer_id) = activity.timer_id {
            for category in EventCategory::ALL {
                ActivityEvents::new(&self.db, category).assign_time_slot(timer_id, &slot)?;
            }
        }

        let removed = self.activities.remove(&KbMouseActivityPatch {
            id: Some(id),
            ..Default::default()
        });
        if let Outcome::Failed(e) = removed {
            return Err(e.into());
        }
        report.activities += 1;
        msg_debug!(Message::ActivitySynced(id));
        Ok(())
    }

    async fn push_due_entries(&self, now: DateTime<Utc>, report: &mut DrainReport) {
        for entry in self.queue.due(now, self.batch_size) {
            match self.remote.push_entry(&entry).await {
                Ok(()) => {
                    if self.queue.remove(&entry).is_done() {
                        report.entries += 1;
                        msg_debug!(Message::QueueEntrySynced(entry.queue_id.clone()));
                    }
                }
                Err(e) => {
                    report.failures += 1;
                    self.queue.record_failure(&entry, &format!("{e:#}"), &self.policy, now);
                }
            }
        }
    }

    async fn push_loose_screenshots(&self, report: &mut DrainReport) -> Result<()> {
        let claimed: HashSet<String> = self
            .pending_activities
            .find_unsynced()?
            .into_iter()
            .flat_map(|activity| activity.screenshots)
            .collect();

        for screenshot in self.screenshots.find_unsynced()? {
            if claimed.contains(&screenshot.image_path) {
                continue;
            }
            let slot = screenshot.time_slot_id.clone();
            self.push_screenshot(&screenshot, slot.as_deref(), report).await?;
        }
        Ok(())
    }

    /// Uploads one screenshot. Returns whether it is now on the server.
    async fn push_screenshot(&self, screenshot: &Screenshot, time_slot_id: Option<&str>, report: &mut DrainReport) -> Result<bool> {
        let Some(id) = screenshot.id else { return Ok(false) };
        if screenshot.synced {
            return Ok(true);
        }

        match self.remote.push_screenshot(screenshot, time_slot_id).await {
            Ok(()) => {
                self.screenshots.mark_synced(id, time_slot_id.map(str::to_string))?;
                report.screenshots += 1;
                msg_debug!(Message::ScreenshotSynced(screenshot.image_path.clone()));
                Ok(true)
            }
            Err(e) => {
                report.failures += 1;
                msg_warning!(Message::SyncPushFailed(screenshot.image_path.clone(), format!("{e:#}")));
                Ok(false)
            }
        }
    }
}
