//! Versioned, reversible schema migrations.
//!
//! Every migration has an `up` that moves the schema forward and a `down`
//! that restores the previous shape. Applied versions are recorded in the
//! `migrations` table. Superseded tables are dropped and recreated in their
//! canonical shape instead of being altered in place.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use trackvault::db::migrations::{init_with_migrations, get_db_version};
//! use rusqlite::Connection;
//!
//! let mut conn = Connection::open("trackvault.db")?;
//! init_with_migrations(&mut conn)?;
//! let version = get_db_version(&conn)?;
//! # Ok::<(), anyhow::Error>(())
//! ```

use crate::db::activity_events::EventCategory;
use crate::db::error::{Operation, StorageContext, StorageError, StorageResult};
use crate::libs::messages::Message;
use crate::{msg_debug, msg_error, msg_info, msg_success};
use rusqlite::{params, Connection, OptionalExtension, Transaction};

const MIGRATIONS_TABLE: &str = "
CREATE TABLE IF NOT EXISTS migrations (
    id INTEGER PRIMARY KEY,
    version INTEGER NOT NULL UNIQUE,
    name TEXT NOT NULL,
    applied_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
)";

const TABLE: &str = "migrations";

type Step = fn(&Transaction) -> rusqlite::Result<()>;

#[derive(Debug, Clone)]
struct Migration {
    version: u32,
    name: &'static str,
    up: Step,
    down: Step,
}

/// Registry of every migration, in version order.
pub struct MigrationManager {
    migrations: Vec<Migration>,
}

impl Default for MigrationManager {
    fn default() -> Self {
        Self::new()
    }
}

impl MigrationManager {
    pub fn new() -> Self {
        let mut manager = Self { migrations: Vec::new() };
        manager.register_migrations();
        manager
    }

    fn register_migrations(&mut self) {
        // Version 1: reference dimensions synced down from the server
        self.add_migration(
            1,
            "create_reference_tables",
            |tx| {
                tx.execute_batch(
                    "CREATE TABLE IF NOT EXISTS users (
                        id INTEGER PRIMARY KEY,
                        remote_id TEXT NOT NULL UNIQUE,
                        email TEXT,
                        first_name TEXT,
                        last_name TEXT,
                        employee_id TEXT,
                        tenant_id TEXT,
                        organization_id TEXT
                    );
                    CREATE TABLE IF NOT EXISTS clients (
                        id INTEGER PRIMARY KEY,
                        remote_id TEXT NOT NULL UNIQUE,
                        name TEXT NOT NULL,
                        tenant_id TEXT,
                        organization_id TEXT
                    );
                    CREATE TABLE IF NOT EXISTS projects (
                        id INTEGER PRIMARY KEY,
                        remote_id TEXT NOT NULL UNIQUE,
                        name TEXT NOT NULL,
                        client_id TEXT,
                        tenant_id TEXT,
                        organization_id TEXT
                    );
                    CREATE INDEX IF NOT EXISTS idx_projects_organization ON projects(tenant_id, organization_id);",
                )
            },
            |tx| tx.execute_batch("DROP TABLE IF EXISTS projects; DROP TABLE IF EXISTS clients; DROP TABLE IF EXISTS users;"),
        );

        // Version 2: work sessions and the intervals reported for them
        self.add_migration(
            2,
            "create_timers_and_intervals",
            |tx| {
                tx.execute_batch(
                    "CREATE TABLE IF NOT EXISTS timers (
                        id INTEGER PRIMARY KEY,
                        tenant_id TEXT,
                        organization_id TEXT,
                        employee_id TEXT,
                        project_id TEXT,
                        started_at TEXT NOT NULL,
                        stopped_at TEXT,
                        synced BOOLEAN NOT NULL DEFAULT 0,
                        is_started_offline BOOLEAN NOT NULL DEFAULT 0,
                        is_stopped_offline BOOLEAN NOT NULL DEFAULT 0,
                        timelog_id TEXT
                    );
                    CREATE INDEX IF NOT EXISTS idx_timers_started_at ON timers(started_at);
                    CREATE INDEX IF NOT EXISTS idx_timers_synced ON timers(synced);
                    CREATE TABLE IF NOT EXISTS intervals (
                        id INTEGER PRIMARY KEY,
                        timer_id INTEGER NOT NULL,
                        started_at TEXT NOT NULL,
                        stopped_at TEXT NOT NULL,
                        remote_id TEXT,
                        synced BOOLEAN NOT NULL DEFAULT 0,
                        tenant_id TEXT,
                        organization_id TEXT,
                        employee_id TEXT,
                        FOREIGN KEY (timer_id) REFERENCES timers(id) ON DELETE CASCADE
                    );
                    CREATE INDEX IF NOT EXISTS idx_intervals_timer_id ON intervals(timer_id);",
                )
            },
            |tx| tx.execute_batch("DROP TABLE IF EXISTS intervals; DROP TABLE IF EXISTS timers;"),
        );

        // Version 3: one table per watcher category, owned by a timer
        self.add_migration(3, "create_activity_event_tables", create_event_tables, drop_event_tables);

        // Version 4: legacy screenshot bookkeeping, superseded by version 7
        self.add_migration(4, "create_screenshots", create_legacy_screenshots, |tx| {
            tx.execute_batch("DROP TABLE IF EXISTS screenshots;")
        });

        // Version 5: flushed keyboard/mouse capture windows
        self.add_migration(
            5,
            "create_kb_mouse_activity",
            |tx| {
                tx.execute_batch(
                    "CREATE TABLE IF NOT EXISTS kb_mouse_activity (
                        id INTEGER PRIMARY KEY,
                        time_start TEXT NOT NULL,
                        time_end TEXT NOT NULL,
                        timer_id INTEGER,
                        tenant_id TEXT,
                        organization_id TEXT,
                        remote_id TEXT,
                        kb_press_count INTEGER NOT NULL DEFAULT 0,
                        kb_sequence TEXT,
                        mouse_left_click_count INTEGER NOT NULL DEFAULT 0,
                        mouse_right_click_count INTEGER NOT NULL DEFAULT 0,
                        mouse_movements_count INTEGER NOT NULL DEFAULT 0,
                        mouse_wheel_count INTEGER NOT NULL DEFAULT 0,
                        active_windows TEXT,
                        afk_duration REAL NOT NULL DEFAULT 0 CHECK (afk_duration >= 0),
                        screenshots TEXT,
                        synced BOOLEAN NOT NULL DEFAULT 0
                    );
                    CREATE INDEX IF NOT EXISTS idx_kb_mouse_activity_owner
                        ON kb_mouse_activity(remote_id, organization_id, tenant_id, synced);",
                )
            },
            |tx| tx.execute_batch("DROP TABLE IF EXISTS kb_mouse_activity;"),
        );

        // Version 6: outbox of operations awaiting remote acknowledgment
        self.add_migration(
            6,
            "create_audit_queue",
            |tx| {
                tx.execute_batch(
                    "CREATE TABLE IF NOT EXISTS audit_queue (
                        id INTEGER PRIMARY KEY,
                        queue_id TEXT NOT NULL UNIQUE,
                        queue TEXT NOT NULL,
                        operation TEXT NOT NULL,
                        data TEXT,
                        attempts INTEGER NOT NULL DEFAULT 0,
                        last_error TEXT,
                        next_attempt_at TEXT,
                        created_at TEXT NOT NULL,
                        updated_at TEXT NOT NULL
                    );
                    CREATE INDEX IF NOT EXISTS idx_audit_queue_next_attempt ON audit_queue(next_attempt_at);",
                )
            },
            |tx| tx.execute_batch("DROP TABLE IF EXISTS audit_queue;"),
        );

        // Version 7: screenshots recreated with the image path as dedup key
        self.add_migration(7, "recreate_screenshots_with_dedup_key", create_canonical_screenshots, |tx| {
            tx.execute_batch("DROP TABLE IF EXISTS screenshots;")?;
            create_legacy_screenshots(tx)
        });
    }

    fn add_migration(&mut self, version: u32, name: &'static str, up: Step, down: Step) {
        self.migrations.push(Migration { version, name, up, down });
    }

    /// Applies every pending migration inside a single transaction.
    pub fn run_migrations(&self, conn: &mut Connection) -> StorageResult<()> {
        conn.execute(MIGRATIONS_TABLE, []).tagged(Operation::Migrate, TABLE)?;

        let current_version = self.get_current_version(conn)?;
        let pending: Vec<&Migration> = self.migrations.iter().filter(|m| m.version > current_version).collect();

        if pending.is_empty() {
            msg_debug!(Message::DatabaseUpToDate);
            return Ok(());
        }

        msg_info!(Message::MigrationsFound(pending.len()));

        let tx = conn.transaction().tagged(Operation::Migrate, TABLE)?;
        for migration in pending {
            msg_debug!(Message::RunningMigration(migration.version, migration.name.to_string()));

            if let Err(e) = (migration.up)(&tx) {
                msg_error!(Message::MigrationFailed(migration.version, e.to_string()));
                // Dropping the transaction rolls back every migration of this run.
                return Err(StorageError::new(Operation::Migrate, migration.name, e));
            }
            tx.execute(
                "INSERT INTO migrations (version, name) VALUES (?1, ?2)",
                params![migration.version, migration.name],
            )
            .tagged(Operation::Migrate, TABLE)?;
        }
        tx.commit().tagged(Operation::Migrate, TABLE)?;
        msg_success!(Message::AllMigrationsCompleted);

        Ok(())
    }

    /// Reverts applied migrations above `target_version`, newest first.
    pub fn rollback_to(&self, conn: &mut Connection, target_version: u32) -> StorageResult<()> {
        conn.execute(MIGRATIONS_TABLE, []).tagged(Operation::Migrate, TABLE)?;
        let current_version = self.get_current_version(conn)?;

        if target_version >= current_version {
            msg_info!(Message::NothingToRollback);
            return Ok(());
        }

        msg_info!(Message::RollingBack(current_version, target_version));

        let tx = conn.transaction().tagged(Operation::Migrate, TABLE)?;
        let applied = self
            .migrations
            .iter()
            .rev()
            .filter(|m| m.version > target_version && m.version <= current_version);
        for migration in applied {
            if let Err(e) = (migration.down)(&tx) {
                msg_error!(Message::MigrationFailed(migration.version, e.to_string()));
                return Err(StorageError::new(Operation::Migrate, migration.name, e));
            }
            tx.execute("DELETE FROM migrations WHERE version = ?1", params![migration.version])
                .tagged(Operation::Migrate, TABLE)?;
        }
        tx.commit().tagged(Operation::Migrate, TABLE)?;

        msg_success!(Message::RollbackCompleted(target_version));
        Ok(())
    }

    fn get_current_version(&self, conn: &Connection) -> StorageResult<u32> {
        if !has_migrations_table(conn)? {
            return Ok(0);
        }
        let version: Option<u32> = conn
            .query_row("SELECT MAX(version) FROM migrations", [], |row| row.get(0))
            .optional()
            .tagged(Operation::Migrate, TABLE)?
            .flatten();
        Ok(version.unwrap_or(0))
    }

    pub fn latest_version(&self) -> u32 {
        self.migrations.last().map(|m| m.version).unwrap_or(0)
    }

    pub fn is_migration_applied(&self, conn: &Connection, version: u32) -> StorageResult<bool> {
        if !has_migrations_table(conn)? {
            return Ok(false);
        }
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM migrations WHERE version = ?1", params![version], |row| row.get(0))
            .tagged(Operation::Migrate, TABLE)?;
        Ok(count > 0)
    }

    /// `(version, name, applied_at)` for each applied migration.
    pub fn get_migration_history(&self, conn: &Connection) -> StorageResult<Vec<(u32, String, String)>> {
        if !has_migrations_table(conn)? {
            return Ok(Vec::new());
        }
        let mut stmt = conn
            .prepare("SELECT version, name, applied_at FROM migrations ORDER BY version")
            .tagged(Operation::Migrate, TABLE)?;
        let history = stmt
            .query_map([], |row| Ok((row.get::<_, u32>(0)?, row.get::<_, String>(1)?, row.get::<_, String>(2)?)))
            .tagged(Operation::Migrate, TABLE)?
            .collect::<Result<Vec<_>, _>>()
            .tagged(Operation::Migrate, TABLE)?;
        Ok(history)
    }
}

fn has_migrations_table(conn: &Connection) -> StorageResult<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'migrations')",
        [],
        |row| row.get(0),
    )
    .tagged(Operation::Migrate, TABLE)
}

fn create_event_tables(tx: &Transaction) -> rusqlite::Result<()> {
    for category in EventCategory::ALL {
        let table = category.table();
        tx.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                id INTEGER PRIMARY KEY,
                event_id TEXT NOT NULL UNIQUE,
                duration REAL NOT NULL DEFAULT 0 CHECK (duration >= 0),
                data TEXT,
                time_slot_id TEXT,
                type TEXT NOT NULL,
                recorded_at TEXT NOT NULL,
                timer_id INTEGER NOT NULL,
                FOREIGN KEY (timer_id) REFERENCES timers(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_{table}_timer_id ON {table}(timer_id);"
        ))?;
    }
    Ok(())
}

fn drop_event_tables(tx: &Transaction) -> rusqlite::Result<()> {
    for category in EventCategory::ALL {
        tx.execute_batch(&format!("DROP TABLE IF EXISTS {};", category.table()))?;
    }
    Ok(())
}

fn create_legacy_screenshots(tx: &Transaction) -> rusqlite::Result<()> {
    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS screenshots (
            id INTEGER PRIMARY KEY,
            image_path TEXT NOT NULL,
            recorded_at TEXT NOT NULL,
            synced BOOLEAN NOT NULL DEFAULT 0,
            tenant_id TEXT,
            organization_id TEXT,
            employee_id TEXT
        );",
    )
}

// Unsynced rows are carried over; duplicates collapse to the first capture.
fn create_canonical_screenshots(tx: &Transaction) -> rusqlite::Result<()> {
    tx.execute_batch(
        "CREATE TABLE screenshots_canonical (
            id INTEGER PRIMARY KEY,
            image_path TEXT NOT NULL UNIQUE,
            recorded_at TEXT NOT NULL,
            time_slot_id TEXT,
            synced BOOLEAN NOT NULL DEFAULT 0,
            tenant_id TEXT,
            organization_id TEXT,
            employee_id TEXT
        );
        INSERT OR IGNORE INTO screenshots_canonical (image_path, recorded_at, synced, tenant_id, organization_id, employee_id)
            SELECT image_path, recorded_at, synced, tenant_id, organization_id, employee_id
            FROM screenshots WHERE synced = 0 ORDER BY id;
        DROP TABLE screenshots;
        ALTER TABLE screenshots_canonical RENAME TO screenshots;
        CREATE INDEX IF NOT EXISTS idx_screenshots_synced ON screenshots(synced);",
    )
}

/// Applies all pending migrations to `conn`.
pub fn init_with_migrations(conn: &mut Connection) -> StorageResult<()> {
    MigrationManager::new().run_migrations(conn)
}

pub fn get_db_version(conn: &Connection) -> StorageResult<u32> {
    MigrationManager::new().get_current_version(conn)
}

pub fn needs_migration(conn: &Connection) -> StorageResult<bool> {
    let manager = MigrationManager::new();
    Ok(manager.get_current_version(conn)? < manager.latest_version())
}
