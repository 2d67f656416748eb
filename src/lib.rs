//! # Trackvault - local activity capture and offline sync
//!
//! The persistence and capture core of a time-tracking desktop agent.
//!
//! ## Features
//!
//! - **Local Store**: SQLite schema with ordered, reversible migrations
//! - **Activity Events**: Window, application, AFK and browser events per timer
//! - **Aggregation**: Total, AFK and non-AFK durations for a timer
//! - **Input Capture**: Keyboard and mouse counters folded into activity windows
//! - **Offline Sync**: Outbox with exponential retry, drained to a remote API
//!
//! ## Usage
//!
//! ```rust,no_run
//! use trackvault::commands::Cli;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     Cli::menu().await
//! }
//! ```

pub mod api;
pub mod commands;
pub mod db;
pub mod libs;
