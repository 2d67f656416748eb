#[cfg(test)]
mod tests {
    use rusqlite::Connection;
    use std::path::PathBuf;
    use tempfile::TempDir;
    use test_context::{test_context, TestContext};
    use trackvault::db::db::Db;
    use trackvault::db::migrations::{get_db_version, needs_migration, MigrationManager};
    use trackvault::db::screenshots::Screenshots;

    struct MigrationTestContext {
        _temp_dir: TempDir,
        path: PathBuf,
        conn: Connection,
    }

    impl TestContext for MigrationTestContext {
        fn setup() -> Self {
            let temp_dir = tempfile::tempdir().unwrap();
            let path = temp_dir.path().join("trackvault.db");
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
            MigrationTestContext {
                _temp_dir: temp_dir,
                path,
                conn,
            }
        }
    }

    fn table_exists(conn: &Connection, name: &str) -> bool {
        conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1)",
            [name],
            |row| row.get(0),
        )
        .unwrap()
    }

    #[test_context(MigrationTestContext)]
    #[test]
    fn test_fresh_database_reports_version_zero(ctx: &mut MigrationTestContext) {
        assert_eq!(get_db_version(&ctx.conn).unwrap(), 0);
        assert!(needs_migration(&ctx.conn).unwrap());
        assert!(MigrationManager::new().get_migration_history(&ctx.conn).unwrap().is_empty());
    }

    #[test_context(MigrationTestContext)]
    #[test]
    fn test_migrations_create_every_table(ctx: &mut MigrationTestContext) {
        let manager = MigrationManager::new();
        manager.run_migrations(&mut ctx.conn).unwrap();

        assert_eq!(get_db_version(&ctx.conn).unwrap(), manager.latest_version());
        assert!(!needs_migration(&ctx.conn).unwrap());
        for table in [
            "users",
            "clients",
            "projects",
            "timers",
            "intervals",
            "afk_events",
            "window_events",
            "chrome_events",
            "firefox_events",
            "screenshots",
            "kb_mouse_activity",
            "audit_queue",
        ] {
            assert!(table_exists(&ctx.conn, table), "missing table {table}");
        }
    }

    #[test_context(MigrationTestContext)]
    #[test]
    fn test_migration_history_is_ordered(ctx: &mut MigrationTestContext) {
        let manager = MigrationManager::new();
        manager.run_migrations(&mut ctx.conn).unwrap();

        let history = manager.get_migration_history(&ctx.conn).unwrap();
        assert_eq!(history.len() as u32, manager.latest_version());
        for (i, (version, name, _)) in history.iter().enumerate() {
            assert_eq!(*version as usize, i + 1);
            assert!(!name.is_empty());
        }
    }

    #[test_context(MigrationTestContext)]
    #[test]
    fn test_migration_idempotency(ctx: &mut MigrationTestContext) {
        let manager = MigrationManager::new();
        manager.run_migrations(&mut ctx.conn).unwrap();
        let version1 = get_db_version(&ctx.conn).unwrap();

        manager.run_migrations(&mut ctx.conn).unwrap();
        let version2 = get_db_version(&ctx.conn).unwrap();

        assert_eq!(version1, version2);
        assert_eq!(manager.get_migration_history(&ctx.conn).unwrap().len() as u32, version1);
    }

    #[test_context(MigrationTestContext)]
    #[test]
    fn test_rollback_reverts_newest_first(ctx: &mut MigrationTestContext) {
        let manager = MigrationManager::new();
        manager.run_migrations(&mut ctx.conn).unwrap();

        manager.rollback_to(&mut ctx.conn, 2).unwrap();
        assert_eq!(get_db_version(&ctx.conn).unwrap(), 2);
        assert!(table_exists(&ctx.conn, "timers"));
        assert!(!table_exists(&ctx.conn, "afk_events"));
        assert!(!table_exists(&ctx.conn, "audit_queue"));
        assert!(!manager.is_migration_applied(&ctx.conn, 3).unwrap());

        manager.run_migrations(&mut ctx.conn).unwrap();
        assert_eq!(get_db_version(&ctx.conn).unwrap(), manager.latest_version());
        assert!(table_exists(&ctx.conn, "afk_events"));
    }

    #[test_context(MigrationTestContext)]
    #[test]
    fn test_rollback_above_current_is_noop(ctx: &mut MigrationTestContext) {
        let manager = MigrationManager::new();
        manager.run_migrations(&mut ctx.conn).unwrap();
        let latest = manager.latest_version();

        manager.rollback_to(&mut ctx.conn, latest).unwrap();
        assert_eq!(get_db_version(&ctx.conn).unwrap(), latest);
    }

    #[test_context(MigrationTestContext)]
    #[test]
    fn test_legacy_screenshots_collapse_to_unique_paths(ctx: &mut MigrationTestContext) {
        let manager = MigrationManager::new();
        manager.run_migrations(&mut ctx.conn).unwrap();
        let latest = manager.latest_version();
        manager.rollback_to(&mut ctx.conn, latest - 1).unwrap();

        ctx.conn
            .execute_batch(
                "INSERT INTO screenshots (image_path, recorded_at, synced) VALUES ('/shots/a.png', '2025-01-15T09:00:00.000000Z', 0);
                 INSERT INTO screenshots (image_path, recorded_at, synced) VALUES ('/shots/a.png', '2025-01-15T09:05:00.000000Z', 0);
                 INSERT INTO screenshots (image_path, recorded_at, synced) VALUES ('/shots/b.png', '2025-01-15T09:10:00.000000Z', 0);
                 INSERT INTO screenshots (image_path, recorded_at, synced) VALUES ('/shots/c.png', '2025-01-15T09:15:00.000000Z', 1);",
            )
            .unwrap();

        manager.run_migrations(&mut ctx.conn).unwrap();

        let db = Db::open(&ctx.path).unwrap();
        let screenshots = Screenshots::new(&db);
        let paths: Vec<String> = screenshots.find_all().unwrap().into_iter().map(|s| s.image_path).collect();
        assert_eq!(paths, vec!["/shots/a.png".to_string(), "/shots/b.png".to_string()]);

        let first = screenshots.find_by_path("/shots/a.png").unwrap().unwrap();
        assert_eq!(first.recorded_at.to_rfc3339(), "2025-01-15T09:00:00+00:00");
    }
}
