#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};
    use test_context::{test_context, TestContext};
    use trackvault::db::activity_events::{ActivityEvent, ActivityEvents, AfkStatus, EventCategory};
    use trackvault::db::clients::{Client, ClientPatch, Clients};
    use trackvault::db::db::Db;
    use trackvault::db::error::Operation;
    use trackvault::db::intervals::{Interval, Intervals};
    use trackvault::db::projects::{Project, Projects};
    use trackvault::db::repository::Criteria;
    use trackvault::db::timers::{Timer, TimerPatch, Timers};
    use trackvault::db::transaction::Transaction;
    use trackvault::db::users::{User, Users};

    struct StoreTestContext {
        db: Db,
        timers: Timers,
    }

    impl TestContext for StoreTestContext {
        fn setup() -> Self {
            let db = Db::open_in_memory().unwrap();
            let timers = Timers::new(&db);
            StoreTestContext { db, timers }
        }
    }

    fn start_timer(ctx: &StoreTestContext, minutes_ago: i64) -> Timer {
        ctx.timers.save(&Timer::start(Utc::now() - Duration::minutes(minutes_ago))).unwrap()
    }

    #[test_context(StoreTestContext)]
    #[test]
    fn test_save_assigns_id_and_reads_back(ctx: &mut StoreTestContext) {
        let started_at = Utc.with_ymd_and_hms(2025, 1, 15, 9, 0, 0).unwrap();
        let mut timer = Timer::start(started_at);
        timer.project_id = Some("p-1".to_string());

        let stored = ctx.timers.save(&timer).unwrap();
        let id = stored.id.unwrap();
        let found = ctx.timers.find_one_by_id(id).unwrap().unwrap();

        assert_eq!(found.started_at, started_at);
        assert_eq!(found.project_id.as_deref(), Some("p-1"));
        assert!(found.is_running());
        assert_eq!(ctx.timers.count().unwrap(), 1);
    }

    #[test_context(StoreTestContext)]
    #[test]
    fn test_find_one_by_id_miss_is_none(ctx: &mut StoreTestContext) {
        assert!(ctx.timers.find_one_by_id(404).unwrap().is_none());
    }

    #[test_context(StoreTestContext)]
    #[test]
    fn test_update_applies_only_set_fields(ctx: &mut StoreTestContext) {
        let id = start_timer(ctx, 30).id.unwrap();
        let updated = ctx
            .timers
            .update(
                id,
                &TimerPatch {
                    timelog_id: Some("tl-9".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated, 1);

        let timer = ctx.timers.find_one_by_id(id).unwrap().unwrap();
        assert_eq!(timer.timelog_id.as_deref(), Some("tl-9"));
        assert!(timer.is_running());
        assert!(!timer.synced);

        assert_eq!(ctx.timers.update(id, &TimerPatch::default()).unwrap(), 0);
    }

    #[test_context(StoreTestContext)]
    #[test]
    fn test_synced_flag_never_reverts(ctx: &mut StoreTestContext) {
        let id = start_timer(ctx, 10).id.unwrap();
        ctx.timers.mark_synced(id).unwrap();
        ctx.timers
            .update(
                id,
                &TimerPatch {
                    synced: Some(false),
                    ..Default::default()
                },
            )
            .unwrap();

        assert!(ctx.timers.find_one_by_id(id).unwrap().unwrap().synced);
        assert!(ctx.timers.find_to_sync().unwrap().is_empty());
    }

    #[test_context(StoreTestContext)]
    #[test]
    fn test_stop_keeps_first_stop_time(ctx: &mut StoreTestContext) {
        let id = start_timer(ctx, 60).id.unwrap();
        let first = Utc::now() - Duration::minutes(5);

        assert_eq!(ctx.timers.stop(id, first, true).unwrap(), 1);
        assert_eq!(ctx.timers.stop(id, Utc::now(), false).unwrap(), 0);

        let timer = ctx.timers.find_one_by_id(id).unwrap().unwrap();
        assert!(!timer.is_running());
        assert!(timer.is_stopped_offline);
        assert_eq!(timer.stopped_at.unwrap().timestamp_micros(), first.timestamp_micros());
    }

    #[test_context(StoreTestContext)]
    #[test]
    fn test_find_last_one_returns_latest_start(ctx: &mut StoreTestContext) {
        start_timer(ctx, 120);
        let latest = start_timer(ctx, 5);
        start_timer(ctx, 60);

        assert_eq!(ctx.timers.find_last_one().unwrap().unwrap().id, latest.id);
    }

    #[test_context(StoreTestContext)]
    #[test]
    fn test_delete_with_empty_criteria_is_noop(ctx: &mut StoreTestContext) {
        start_timer(ctx, 10);
        start_timer(ctx, 20);

        assert_eq!(ctx.timers.delete(&Criteria::default()).unwrap(), 0);
        assert_eq!(ctx.timers.count().unwrap(), 2);
    }

    #[test_context(StoreTestContext)]
    #[test]
    fn test_unknown_criteria_column_is_rejected(ctx: &mut StoreTestContext) {
        let err = ctx.timers.find_by(&Criteria::eq("no_such_column", 1_i64)).unwrap_err();
        assert_eq!(err.operation, Operation::Read);
        assert_eq!(err.table, "timers");

        let err = ctx.timers.delete(&Criteria::eq("no_such_column", 1_i64)).unwrap_err();
        assert_eq!(err.operation, Operation::Delete);
    }

    #[test_context(StoreTestContext)]
    #[test]
    fn test_deleting_timer_cascades_to_events_and_intervals(ctx: &mut StoreTestContext) {
        let timer_id = start_timer(ctx, 30).id.unwrap();
        let other_id = start_timer(ctx, 20).id.unwrap();

        let intervals = Intervals::new(&ctx.db);
        intervals.save(&Interval::new(timer_id, Utc::now() - Duration::minutes(30), Utc::now())).unwrap();
        for category in EventCategory::ALL {
            let events = ActivityEvents::new(&ctx.db, category);
            events
                .save(&ActivityEvent::with_status(category, format!("{}-1", category.kind()), timer_id, 5.0, AfkStatus::NoAfk))
                .unwrap();
            events
                .save(&ActivityEvent::with_status(category, format!("{}-2", category.kind()), other_id, 5.0, AfkStatus::Afk))
                .unwrap();
        }

        assert_eq!(ctx.timers.delete(&Criteria::id(timer_id)).unwrap(), 1);

        assert_eq!(intervals.count().unwrap(), 0);
        for category in EventCategory::ALL {
            let events = ActivityEvents::new(&ctx.db, category);
            assert!(events.find_by_timer(timer_id).unwrap().is_empty());
            assert_eq!(events.find_by_timer(other_id).unwrap().len(), 1);
        }
    }

    #[test_context(StoreTestContext)]
    #[test]
    fn test_event_for_unknown_timer_is_rejected(ctx: &mut StoreTestContext) {
        let events = ActivityEvents::new(&ctx.db, EventCategory::Window);
        let err = events
            .save(&ActivityEvent::with_status(EventCategory::Window, "orphan", 999, 1.0, AfkStatus::NoAfk))
            .unwrap_err();

        assert!(err.is_constraint_violation());
        assert_eq!(err.operation, Operation::Create);
        assert_eq!(events.count().unwrap(), 0);
    }

    #[test_context(StoreTestContext)]
    #[test]
    fn test_negative_duration_is_rejected(ctx: &mut StoreTestContext) {
        let timer_id = start_timer(ctx, 1).id.unwrap();
        let events = ActivityEvents::new(&ctx.db, EventCategory::Afk);
        let err = events
            .save(&ActivityEvent::with_status(EventCategory::Afk, "neg", timer_id, -1.0, AfkStatus::Afk))
            .unwrap_err();

        assert!(err.is_constraint_violation());
    }

    #[test_context(StoreTestContext)]
    #[test]
    fn test_users_retrieve_latest(ctx: &mut StoreTestContext) {
        let users = Users::new(&ctx.db);
        assert!(users.retrieve().unwrap().is_none());

        users.save(&User::new("u-1")).unwrap();
        users.save(&User::new("u-2")).unwrap();
        assert_eq!(users.retrieve().unwrap().unwrap().remote_id, "u-2");
    }

    #[test_context(StoreTestContext)]
    #[test]
    fn test_projects_filtered_by_organization(ctx: &mut StoreTestContext) {
        let projects = Projects::new(&ctx.db);
        for (remote_id, org) in [("p-1", "org-a"), ("p-2", "org-b"), ("p-3", "org-a")] {
            projects
                .save(&Project {
                    id: None,
                    remote_id: remote_id.to_string(),
                    name: format!("Project {remote_id}"),
                    client_id: None,
                    tenant_id: Some("t-1".to_string()),
                    organization_id: Some(org.to_string()),
                })
                .unwrap();
        }

        let found: Vec<String> = projects
            .find_for_organization("t-1", "org-a")
            .unwrap()
            .into_iter()
            .map(|project| project.remote_id)
            .collect();
        assert_eq!(found, vec!["p-1".to_string(), "p-3".to_string()]);
    }

    #[test_context(StoreTestContext)]
    #[test]
    fn test_clients_keyed_by_remote_id(ctx: &mut StoreTestContext) {
        let clients = Clients::new(&ctx.db);
        let client = Client {
            id: None,
            remote_id: "c-1".to_string(),
            name: "Acme".to_string(),
            tenant_id: None,
            organization_id: None,
        };
        let stored = clients.save(&client).unwrap();
        let again = clients.save(&Client { name: "Other".to_string(), ..client }).unwrap();
        assert_eq!(stored.id, again.id);
        assert_eq!(again.name, "Acme");

        let id = stored.id.unwrap();
        clients.update(id, &ClientPatch { name: Some("Acme Corp".to_string()) }).unwrap();
        assert_eq!(clients.find_by(&Criteria::eq("remote_id", "c-1".to_string())).unwrap()[0].name, "Acme Corp");
    }

    #[test_context(StoreTestContext)]
    #[test]
    fn test_intervals_mark_synced_with_remote_id(ctx: &mut StoreTestContext) {
        let timer_id = start_timer(ctx, 30).id.unwrap();
        let intervals = Intervals::new(&ctx.db);
        let first = intervals.save(&Interval::new(timer_id, Utc::now() - Duration::minutes(30), Utc::now() - Duration::minutes(20))).unwrap();
        intervals.save(&Interval::new(timer_id, Utc::now() - Duration::minutes(10), Utc::now())).unwrap();
        assert_eq!(intervals.find_unsynced().unwrap().len(), 2);

        intervals.mark_synced(first.id.unwrap(), Some("iv-1".to_string())).unwrap();
        let unsynced = intervals.find_unsynced().unwrap();
        assert_eq!(unsynced.len(), 1);
        assert_ne!(unsynced[0].id, first.id);
        assert_eq!(intervals.find_one_by_id(first.id.unwrap()).unwrap().unwrap().remote_id.as_deref(), Some("iv-1"));
    }

    #[test_context(StoreTestContext)]
    #[test]
    fn test_failed_transaction_leaves_no_partial_write(ctx: &mut StoreTestContext) {
        let tx = Transaction::<Timer>::new(&ctx.db, "timers");
        let err = tx
            .execute(Operation::Create, |tx| {
                tx.execute("INSERT INTO timers (started_at) VALUES ('2025-01-15T09:00:00.000000Z')", [])?;
                tx.execute("INSERT INTO no_such_table (id) VALUES (1)", [])?;
                Ok(())
            })
            .unwrap_err();

        assert_eq!(err.operation, Operation::Create);
        assert_eq!(err.table, "timers");
        assert_eq!(ctx.timers.count().unwrap(), 0);
    }

    #[test_context(StoreTestContext)]
    #[test]
    fn test_stored_timer_round_trips_through_json(ctx: &mut StoreTestContext) {
        let started_at = Utc.with_ymd_and_hms(2025, 1, 15, 9, 0, 0).unwrap();
        let stored = ctx.timers.save(&Timer::start(started_at)).unwrap();

        let encoded = serde_json::to_value(&stored).unwrap();
        assert_eq!(encoded["started_at"], "2025-01-15T09:00:00Z");
        let decoded: Timer = serde_json::from_value(encoded).unwrap();
        assert_eq!(decoded, stored);
    }
}
