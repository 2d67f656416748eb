//! Database layer for trackvault.
//!
//! Everything captured on this machine lands in one SQLite file before it is
//! ever pushed to the server. Entities share a generic DAO
//! ([`repository::Repository`]) and every write goes through an explicit
//! transaction ([`transaction::Transaction`]).
//!
//! ## Usage
//!
//! ```rust,no_run
//! use trackvault::db::{aggregation::Aggregation, db::Db, timers::{Timer, Timers}};
//!
//! let db = Db::new()?;
//! let timer = Timers::new(&db).save(&Timer::start(chrono::Utc::now()))?;
//! let seconds = Aggregation::new(&db).duration(timer.id.unwrap_or_default())?;
//! # Ok::<(), anyhow::Error>(())
//! ```

/// Connection provider; opens and migrates the database file.
pub mod db;

/// Versioned, reversible schema migrations.
pub mod migrations;

/// Typed storage errors tagged with the failing operation.
pub mod error;

/// Column value conversions (timestamps, JSON payloads).
pub mod columns;

/// Generic DAO over a single table.
pub mod repository;

/// Begin/commit/rollback wrapper used by every write.
pub mod transaction;

/// Duration sums over watcher events.
pub mod aggregation;

pub mod activity_events;
pub mod audit_queue;
pub mod clients;
pub mod intervals;
pub mod kb_mouse_activity;
pub mod projects;
pub mod screenshots;
pub mod timers;
pub mod users;
