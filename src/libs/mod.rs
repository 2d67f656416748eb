//! Services on top of the database layer: capture, outbox, sync and the
//! ambient pieces (config, messages, logging) they share.
//!
//! ```rust,no_run
//! use trackvault::db::db::Db;
//! use trackvault::libs::audit_queue::AuditQueue;
//!
//! let db = Db::new()?;
//! for entry in AuditQueue::new(&db).list() {
//!     println!("{} {}", entry.queue, entry.operation);
//! }
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod audit_queue;
pub mod capture;
pub mod config;
pub mod data_storage;
pub mod input_hook;
pub mod kb_mouse;
pub mod logging;
pub mod messages;
pub mod outcome;
pub mod poller;
pub mod sync;
pub mod view;
