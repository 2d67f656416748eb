#[cfg(test)]
mod tests {
    use anyhow::{bail, Result};
    use chrono::{Duration, Utc};
    use parking_lot::Mutex;
    use serde_json::json;
    use std::sync::Arc;
    use test_context::{test_context, AsyncTestContext};
    use trackvault::db::activity_events::{ActivityEvent, ActivityEvents, AfkStatus, EventCategory};
    use trackvault::db::audit_queue::AuditEntry;
    use trackvault::db::db::Db;
    use trackvault::db::kb_mouse_activity::{KbMouseActivities, KbMouseActivity};
    use trackvault::db::screenshots::{Screenshot, Screenshots};
    use trackvault::db::timers::{Timer, Timers};
    use trackvault::libs::audit_queue::BackoffPolicy;
    use trackvault::libs::config::TenantConfig;
    use trackvault::libs::logging;
    use trackvault::libs::sync::{NoopRemote, RemoteSync, SyncDrain};

    /// Remote that records every push and can be told to fail.
    #[derive(Clone, Default)]
    struct FakeRemote {
        pushed: Arc<Mutex<Vec<String>>>,
        failing: Arc<Mutex<bool>>,
        failing_screenshots: Arc<Mutex<usize>>,
    }

    impl FakeRemote {
        fn pushed(&self) -> Vec<String> {
            self.pushed.lock().clone()
        }

        fn set_failing(&self, failing: bool) {
            *self.failing.lock() = failing;
        }

        fn fail_next_screenshots(&self, count: usize) {
            *self.failing_screenshots.lock() = count;
        }

        fn record(&self, what: String) -> Result<()> {
            if *self.failing.lock() {
                bail!("503 Service Unavailable");
            }
            self.pushed.lock().push(what);
            Ok(())
        }
    }

    impl RemoteSync for FakeRemote {
        async fn push_timer(&self, timer: &Timer) -> Result<Option<String>> {
            let id = timer.id.unwrap_or_default();
            self.record(format!("timer:{id}"))?;
            Ok(Some(format!("tl-{id}")))
        }

        async fn push_activity(&self, activity: &KbMouseActivity) -> Result<Option<String>> {
            let id = activity.id.unwrap_or_default();
            self.record(format!("activity:{id}"))?;
            Ok(Some(format!("slot-{id}")))
        }

        async fn push_screenshot(&self, screenshot: &Screenshot, time_slot_id: Option<&str>) -> Result<()> {
            {
                let mut remaining = self.failing_screenshots.lock();
                if *remaining > 0 {
                    *remaining -= 1;
                    bail!("upload interrupted");
                }
            }
            self.record(format!("screenshot:{}@{}", screenshot.image_path, time_slot_id.unwrap_or("-")))
        }

        async fn push_entry(&self, entry: &AuditEntry) -> Result<()> {
            self.record(format!("entry:{}", entry.queue_id))
        }
    }

    struct SyncTestContext {
        db: Db,
        remote: FakeRemote,
        drain: SyncDrain<FakeRemote>,
    }

    fn tenant() -> TenantConfig {
        TenantConfig {
            tenant_id: "tenant-1".to_string(),
            organization_id: "org-1".to_string(),
            employee_id: "emp-1".to_string(),
            remote_user_id: "user-1".to_string(),
        }
    }

    impl AsyncTestContext for SyncTestContext {
        async fn setup() -> Self {
            logging::init_test();
            let db = Db::open_in_memory().unwrap();
            let remote = FakeRemote::default();
            let drain = SyncDrain::new(&db, remote.clone(), BackoffPolicy::default(), 10, tenant());
            SyncTestContext { db, remote, drain }
        }
    }

    fn owned_activity(timer_id: Option<i64>, minutes_ago: i64) -> KbMouseActivity {
        let start = Utc::now() - Duration::minutes(minutes_ago);
        let mut activity = KbMouseActivity::new(start, start + Duration::minutes(1));
        activity.timer_id = timer_id;
        activity.tenant_id = Some("tenant-1".to_string());
        activity.organization_id = Some("org-1".to_string());
        activity.remote_id = Some("user-1".to_string());
        activity.kb_press_count = 5;
        activity
    }

    #[test_context(SyncTestContext)]
    #[tokio::test]
    async fn test_stopped_timer_is_pushed_and_marked(ctx: &mut SyncTestContext) {
        let timers = Timers::new(&ctx.db);
        let id = timers.save(&Timer::start(Utc::now() - Duration::hours(1))).unwrap().id.unwrap();
        timers.stop(id, Utc::now(), true).unwrap();

        let report = ctx.drain.drain(Utc::now()).await.unwrap();
        assert_eq!(report.timers, 1);

        let timer = timers.find_one_by_id(id).unwrap().unwrap();
        assert!(timer.synced);
        assert_eq!(timer.timelog_id, Some(format!("tl-{id}")));

        let again = ctx.drain.drain(Utc::now()).await.unwrap();
        assert_eq!(again.timers, 0);
    }

    #[test_context(SyncTestContext)]
    #[tokio::test]
    async fn test_running_timer_is_pushed_once_until_stopped(ctx: &mut SyncTestContext) {
        let timers = Timers::new(&ctx.db);
        let id = timers.save(&Timer::start(Utc::now() - Duration::hours(1))).unwrap().id.unwrap();

        ctx.drain.drain(Utc::now()).await.unwrap();
        ctx.drain.drain(Utc::now()).await.unwrap();
        let timer = timers.find_one_by_id(id).unwrap().unwrap();
        assert!(!timer.synced);
        assert!(timer.timelog_id.is_some());
        assert_eq!(ctx.remote.pushed(), vec![format!("timer:{id}")]);

        timers.stop(id, Utc::now(), false).unwrap();
        ctx.drain.drain(Utc::now()).await.unwrap();
        assert!(timers.find_one_by_id(id).unwrap().unwrap().synced);
        assert_eq!(ctx.remote.pushed().len(), 2);
    }

    #[test_context(SyncTestContext)]
    #[tokio::test]
    async fn test_activity_push_correlates_slot(ctx: &mut SyncTestContext) {
        let timers = Timers::new(&ctx.db);
        let timer = timers.save(&Timer::start(Utc::now() - Duration::hours(1))).unwrap();
        let timer_id = timer.id.unwrap();
        timers.mark_synced(timer_id).unwrap();

        let events = ActivityEvents::new(&ctx.db, EventCategory::Window);
        events
            .save(&ActivityEvent::with_status(EventCategory::Window, "w-1", timer_id, 30.0, AfkStatus::NoAfk))
            .unwrap();
        Screenshots::new(&ctx.db).save(&Screenshot::new("/shots/1.png")).unwrap();

        let mut activity = owned_activity(Some(timer_id), 2);
        activity.screenshots = vec!["/shots/1.png".to_string()];
        let activity_id = KbMouseActivities::new(&ctx.db).save(&activity).unwrap().id.unwrap();

        let report = ctx.drain.drain(Utc::now()).await.unwrap();
        assert_eq!(report.activities, 1);
        assert_eq!(report.screenshots, 1);

        let slot = format!("slot-{activity_id}");
        assert_eq!(
            ctx.remote.pushed(),
            vec![format!("activity:{activity_id}"), format!("screenshot:/shots/1.png@{slot}")]
        );
        assert_eq!(events.find_by_timer(timer_id).unwrap()[0].time_slot_id, Some(slot.clone()));
        let screenshot = Screenshots::new(&ctx.db).find_by_path("/shots/1.png").unwrap().unwrap();
        assert!(screenshot.synced);
        assert_eq!(screenshot.time_slot_id, Some(slot));
        assert_eq!(KbMouseActivities::new(&ctx.db).count().unwrap(), 0);
    }

    #[test_context(SyncTestContext)]
    #[tokio::test]
    async fn test_one_activity_per_drain_oldest_first(ctx: &mut SyncTestContext) {
        let activities = KbMouseActivities::new(&ctx.db);
        let newer = activities.save(&owned_activity(None, 2)).unwrap().id.unwrap();
        let older = activities.save(&owned_activity(None, 10)).unwrap().id.unwrap();

        ctx.drain.drain(Utc::now()).await.unwrap();
        assert_eq!(ctx.remote.pushed(), vec![format!("activity:{older}")]);

        ctx.drain.drain(Utc::now()).await.unwrap();
        assert_eq!(ctx.remote.pushed(), vec![format!("activity:{older}"), format!("activity:{newer}")]);
    }

    #[test_context(SyncTestContext)]
    #[tokio::test]
    async fn test_failed_activity_push_keeps_row(ctx: &mut SyncTestContext) {
        KbMouseActivities::new(&ctx.db).save(&owned_activity(None, 2)).unwrap();
        ctx.remote.set_failing(true);

        let report = ctx.drain.drain(Utc::now()).await.unwrap();
        assert_eq!(report.activities, 0);
        assert_eq!(report.failures, 1);
        assert_eq!(KbMouseActivities::new(&ctx.db).count().unwrap(), 1);
    }

    #[test_context(SyncTestContext)]
    #[tokio::test]
    async fn test_failed_screenshot_keeps_activity_and_slot(ctx: &mut SyncTestContext) {
        let screenshots = Screenshots::new(&ctx.db);
        screenshots.save(&Screenshot::new("/s/1.png")).unwrap();
        let mut activity = owned_activity(None, 2);
        activity.screenshots = vec!["/s/1.png".to_string()];
        let activity_id = KbMouseActivities::new(&ctx.db).save(&activity).unwrap().id.unwrap();
        let slot = format!("slot-{activity_id}");
        ctx.remote.fail_next_screenshots(1);

        let report = ctx.drain.drain(Utc::now()).await.unwrap();
        assert_eq!(report.activities, 0);
        assert_eq!(report.failures, 1);
        assert_eq!(KbMouseActivities::new(&ctx.db).count().unwrap(), 1);
        let stored = screenshots.find_by_path("/s/1.png").unwrap().unwrap();
        assert!(!stored.synced);
        assert_eq!(stored.time_slot_id, Some(slot.clone()));
        assert_eq!(ctx.remote.pushed(), vec![format!("activity:{activity_id}")]);

        let report = ctx.drain.drain(Utc::now()).await.unwrap();
        assert_eq!(report.activities, 1);
        assert_eq!(report.screenshots, 1);
        assert_eq!(
            ctx.remote.pushed(),
            vec![
                format!("activity:{activity_id}"),
                format!("activity:{activity_id}"),
                format!("screenshot:/s/1.png@{slot}"),
            ]
        );
        assert_eq!(KbMouseActivities::new(&ctx.db).count().unwrap(), 0);
    }

    #[test_context(SyncTestContext)]
    #[tokio::test]
    async fn test_incomplete_identity_skips_activities(ctx: &mut SyncTestContext) {
        KbMouseActivities::new(&ctx.db).save(&owned_activity(None, 2)).unwrap();
        let anonymous = SyncDrain::new(&ctx.db, ctx.remote.clone(), BackoffPolicy::default(), 10, TenantConfig::default());

        let report = anonymous.drain(Utc::now()).await.unwrap();
        assert_eq!(report.activities, 0);
        assert!(ctx.remote.pushed().is_empty());
    }

    #[test_context(SyncTestContext)]
    #[tokio::test]
    async fn test_queue_entries_removed_on_success(ctx: &mut SyncTestContext) {
        let queue = ctx.drain.queue();
        queue.save(Some(&AuditEntry::new("q-1", "timer", "update", json!({ "id": 1 }))));
        queue.save(Some(&AuditEntry::new("q-2", "interval", "create", json!({ "id": 2 }))));

        let report = ctx.drain.drain(Utc::now()).await.unwrap();
        assert_eq!(report.entries, 2);
        assert!(queue.list().is_empty());
        assert_eq!(ctx.remote.pushed(), vec!["entry:q-1".to_string(), "entry:q-2".to_string()]);
    }

    #[test_context(SyncTestContext)]
    #[tokio::test]
    async fn test_failed_entry_waits_for_backoff(ctx: &mut SyncTestContext) {
        let queue = ctx.drain.queue();
        queue.save(Some(&AuditEntry::new("q-1", "timer", "update", json!({}))));
        let now = Utc::now();

        ctx.remote.set_failing(true);
        let report = ctx.drain.drain(now).await.unwrap();
        assert_eq!(report.failures, 1);
        let entry = queue.retrieve("q-1").unwrap();
        assert_eq!(entry.attempts, 1);
        assert!(entry.last_error.unwrap().contains("503"));

        ctx.remote.set_failing(false);
        let report = ctx.drain.drain(now).await.unwrap();
        assert_eq!(report.entries, 0);

        let report = ctx.drain.drain(now + Duration::hours(2)).await.unwrap();
        assert_eq!(report.entries, 1);
        assert!(queue.list().is_empty());
    }

    #[test_context(SyncTestContext)]
    #[tokio::test]
    async fn test_loose_screenshots_pushed_without_slot(ctx: &mut SyncTestContext) {
        let screenshots = Screenshots::new(&ctx.db);
        screenshots.save(&Screenshot::new("/shots/loose.png")).unwrap();
        screenshots.save(&Screenshot::new("/shots/claimed.png")).unwrap();

        let mut pending = owned_activity(None, 2);
        pending.remote_id = Some("someone-else".to_string());
        pending.screenshots = vec!["/shots/claimed.png".to_string()];
        KbMouseActivities::new(&ctx.db).save(&pending).unwrap();

        let report = ctx.drain.drain(Utc::now()).await.unwrap();
        assert_eq!(report.screenshots, 1);
        assert_eq!(ctx.remote.pushed(), vec!["screenshot:/shots/loose.png@-".to_string()]);
        assert!(!screenshots.find_by_path("/shots/claimed.png").unwrap().unwrap().synced);
    }

    #[tokio::test]
    async fn test_disabled_remote_leaves_everything_in_place() {
        let db = Db::open_in_memory().unwrap();
        let timers = Timers::new(&db);
        timers.save(&Timer::start(Utc::now())).unwrap();
        let drain = SyncDrain::new(&db, NoopRemote, BackoffPolicy::default(), 10, tenant());
        drain.queue().save(Some(&AuditEntry::new("q-1", "timer", "create", json!({}))));

        let report = drain.drain(Utc::now()).await.unwrap();
        assert_eq!(report.pushed(), 0);
        assert_eq!(timers.find_to_sync().unwrap().len(), 1);
        assert_eq!(drain.queue().list().len(), 1);
    }
}
