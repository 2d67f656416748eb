//! Display text for [`Message`].
//!
//! All message text is defined here so wording stays consistent between the
//! console output of CLI commands and the tracing output of the watcher.

use super::types::Message;
use std::fmt::{Display, Formatter, Result};

impl Display for Message {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        let text = match self {
            // === CONFIGURATION MESSAGES ===
            Message::ConfigSaved => "Configuration saved successfully".to_string(),
            Message::ConfigFileNotFound => "Configuration file not found, using defaults".to_string(),
            Message::ConfigParseError(error) => format!("Failed to parse configuration: {}", error),
            Message::ConfigModuleMonitor => "Monitor settings".to_string(),
            Message::ConfigModuleSync => "Sync settings".to_string(),
            Message::ConfigModuleServer => "Server settings".to_string(),
            Message::ConfigModuleTenant => "Tenant settings".to_string(),
            Message::InitCompleted(path) => format!("Local database ready at {}", path),

            // === PROMPTS ===
            Message::PromptSelectModules => "Select modules to configure".to_string(),
            Message::PromptPollInterval => "Capture poll interval (ms)".to_string(),
            Message::PromptAfkThreshold => "Seconds without input before the user counts as away".to_string(),
            Message::PromptBackoffBase => "Initial retry delay (seconds)".to_string(),
            Message::PromptBackoffMax => "Maximum retry delay (seconds)".to_string(),
            Message::PromptBatchSize => "Queue entries pushed per cycle".to_string(),
            Message::PromptServerApiUrl => "Server API URL".to_string(),
            Message::PromptServerAuthToken => "Server auth token".to_string(),
            Message::PromptTenantId => "Tenant id".to_string(),
            Message::PromptOrganizationId => "Organization id".to_string(),
            Message::PromptEmployeeId => "Employee id".to_string(),
            Message::PromptRemoteUserId => "Remote user id".to_string(),

            // === STORAGE MESSAGES ===
            Message::RollbackFailed(table, error) => format!("Rollback on `{}` failed: {}", table, error),
            Message::TransactionRolledBack(operation, table, error) => {
                format!("Rolled back {} on `{}`: {}", operation, table, error)
            }

            // === MIGRATION MESSAGES ===
            Message::MigrationsFound(count) => format!("Found {} pending database migrations", count),
            Message::RunningMigration(version, name) => format!("Running migration v{}: {}", version, name),
            Message::MigrationFailed(version, error) => format!("✗ Migration v{} failed: {}", version, error),
            Message::AllMigrationsCompleted => "All database migrations completed successfully".to_string(),
            Message::DatabaseVersion(version) => format!("Current database version: {}", version),
            Message::DatabaseUpToDate => "Database schema is up to date".to_string(),
            Message::DatabaseNeedsUpdate => "Database schema needs to be updated".to_string(),
            Message::MigrationHistory => "Migration history:".to_string(),
            Message::MigrationHistoryEntry(version, name, applied_at) => format!("  v{} {} ({})", version, name, applied_at),
            Message::NothingToRollback => "Nothing to rollback".to_string(),
            Message::RollingBack(from, to) => format!("Rolling back from v{} to v{}", from, to),
            Message::RollbackCompleted(version) => format!("Rollback to v{} completed", version),

            // === POLLER MESSAGES ===
            Message::PollerStarted(interval) => format!("Capture loop started, polling every {} ms", interval),
            Message::PollerAlreadyRunning => "Capture loop is already running".to_string(),
            Message::PollerStopRequested => "Capture loop will stop after the current cycle".to_string(),
            Message::PollerStopped => "Capture loop stopped".to_string(),
            Message::PollerCycleFailed(error) => format!("Capture cycle failed: {}", error),

            // === INPUT HOOK MESSAGES ===
            Message::InputListenerStarted => "Input listener started".to_string(),
            Message::InputListenerAlreadyRunning => "Input listener is already running".to_string(),
            Message::InputListenerStopped => "Input listener stopped".to_string(),
            Message::InputListenerNotRunning => "Input listener is not running".to_string(),
            Message::ErrorInRdevListener(error) => format!("Error in rdev listener: {}", error),

            // === QUEUE MESSAGES ===
            Message::QueueEntryMissing => "No queue entry given, nothing saved".to_string(),
            Message::QueueIdMissing => "Queue entry has no queue id, nothing updated".to_string(),
            Message::QueueEntrySaved(id) => format!("Queued {}", id),
            Message::QueueEntryUpdated(id) => format!("Updated queue entry {}", id),
            Message::QueueEntryRemoved(id) => format!("Removed acknowledged queue entry {}", id),
            Message::QueueEntryNotFound(id) => format!("Queue entry {} not found", id),
            Message::QueueReadFailed(error) => format!("Failed to read sync queue: {}", error),
            Message::QueueWriteFailed(error) => format!("Failed to write sync queue: {}", error),
            Message::QueueEmpty => "Sync queue is empty".to_string(),
            Message::QueuePendingHeader(count) => format!("{} entries waiting for the server", count),
            Message::QueueRetryScheduled(id, attempts, next) => {
                format!("Push of {} failed (attempt {}), retrying at {}", id, attempts, next)
            }

            // === KEYBOARD/MOUSE ACTIVITY MESSAGES ===
            Message::ActivityIdMissing => "Activity has no id, nothing changed".to_string(),
            Message::ActivitySaved(id) => format!("Saved activity window {}", id),
            Message::ActivityUpdated(id) => format!("Updated activity window {}", id),
            Message::ActivityRemoved(id) => format!("Removed activity window {}", id),
            Message::ActivityReadFailed(error) => format!("Failed to read activity: {}", error),
            Message::ActivityWriteFailed(error) => format!("Failed to write activity: {}", error),
            Message::CaptureFlushed(keys, mouse) => format!("Flushed {} key presses and {} mouse events", keys, mouse),
            Message::CaptureIdle => "No input since the last flush".to_string(),

            // === SYNC MESSAGES ===
            Message::SyncDisabled => "No server configured, sync is disabled".to_string(),
            Message::SyncIdentityMissing => "Tenant settings incomplete, activity windows are kept locally".to_string(),
            Message::TimerSynced(id) => format!("Timer {} acknowledged by the server", id),
            Message::ActivitySynced(id) => format!("Activity window {} acknowledged by the server", id),
            Message::ActivityKeptPending(id) => format!("Activity window {} kept for the next drain", id),
            Message::ScreenshotSynced(path) => format!("Screenshot {} uploaded", path),
            Message::QueueEntrySynced(id) => format!("Queue entry {} acknowledged by the server", id),
            Message::SyncPushFailed(what, error) => format!("Failed to push {}: {}", what, error),
            Message::DrainCompleted(count) => format!("Pushed {} records to the server", count),
            Message::RemoteRequestFailed(path, status) => format!("Request to {} failed with status {}", path, status),

            // === WATCH MESSAGES ===
            Message::WatcherStarted => "Watching activity, press Ctrl-C to stop".to_string(),
            Message::WatcherReceivedSigterm => "Received SIGTERM, shutting down".to_string(),
            Message::WatcherReceivedSigint => "Received SIGINT, shutting down".to_string(),
            Message::WatcherReceivedCtrlC => "Received Ctrl-C, shutting down".to_string(),
            Message::WatcherCtrlCListenFailed(error) => format!("Failed to listen for Ctrl-C: {}", error),
            Message::WatcherSignalHandlingNotSupported => "Signal handling not supported on this platform".to_string(),
            Message::WatcherShuttingDown => "Flushing pending activity before exit".to_string(),
            Message::WatcherStopped => "Watcher stopped".to_string(),
            Message::FailedToCreateSignalHandler(error) => format!("Failed to create signal handler: {}", error),

            // === REPORT MESSAGES ===
            Message::DurationReportHeader(timer_id) => format!("Activity for timer {}", timer_id),
            Message::TimerNotFound(timer_id) => format!("Timer {} not found", timer_id),
        };

        write!(f, "{}", text)
    }
}
