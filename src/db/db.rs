//! Connection provider for the embedded SQLite database.

use crate::db::migrations::init_with_migrations;
use crate::libs::data_storage::DataStorage;
use anyhow::Result;
use parking_lot::{Mutex, MutexGuard};
use rusqlite::Connection;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

pub const DB_FILE_NAME: &str = "trackvault.db";

/// How long a writer waits on SQLite's file lock before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Shared handle to the local store.
///
/// The connection is wrapped in an `Arc<Mutex<>>` so the capture loop, the
/// sync drain and CLI commands can all hold a clone. Cloning is cheap and
/// every clone talks to the same connection.
#[derive(Clone)]
pub struct Db {
    conn: Arc<Mutex<Connection>>,
}

impl Db {
    /// Opens the database in the platform data directory and applies any
    /// pending migrations.
    pub fn new() -> Result<Db> {
        let db_file_path = DataStorage::new().get_path(DB_FILE_NAME)?;
        Self::open(db_file_path)
    }

    /// Opens (or creates) the database at `path` and migrates it.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Db> {
        let mut conn = Connection::open(path)?;
        configure(&conn)?;
        init_with_migrations(&mut conn)?;
        Ok(Self::from_connection(conn))
    }

    /// In-memory database, fully migrated. Used by tests and dry runs.
    pub fn open_in_memory() -> Result<Db> {
        let mut conn = Connection::open_in_memory()?;
        configure(&conn)?;
        init_with_migrations(&mut conn)?;
        Ok(Self::from_connection(conn))
    }

    /// Raw connection to the default database file with no migrations applied.
    pub fn new_without_migrations() -> Result<Connection> {
        let db_file_path = DataStorage::new().get_path(DB_FILE_NAME)?;
        let conn = Connection::open(db_file_path)?;
        configure(&conn)?;
        Ok(conn)
    }

    pub fn from_connection(conn: Connection) -> Db {
        Db {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Locks the shared connection. Never hold the guard across an `.await`.
    pub fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock()
    }
}

// Foreign keys are off by default in SQLite and must be enabled per connection,
// otherwise timer deletes would not cascade to activity events.
fn configure(conn: &Connection) -> rusqlite::Result<()> {
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    Ok(())
}
