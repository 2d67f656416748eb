//! Every user-facing and logged message, as one typed enum.
//!
//! Text lives in `display.rs`; call sites only pick a variant and its
//! parameters.

#[derive(Debug, Clone)]
pub enum Message {
    // === CONFIGURATION MESSAGES ===
    ConfigSaved,
    ConfigFileNotFound,
    ConfigParseError(String),
    ConfigModuleMonitor,
    ConfigModuleSync,
    ConfigModuleServer,
    ConfigModuleTenant,
    InitCompleted(String), // database path

    // === PROMPTS ===
    PromptSelectModules,
    PromptPollInterval,
    PromptAfkThreshold,
    PromptBackoffBase,
    PromptBackoffMax,
    PromptBatchSize,
    PromptServerApiUrl,
    PromptServerAuthToken,
    PromptTenantId,
    PromptOrganizationId,
    PromptEmployeeId,
    PromptRemoteUserId,

    // === STORAGE MESSAGES ===
    RollbackFailed(String, String),                // table, error
    TransactionRolledBack(String, String, String), // operation, table, error

    // === MIGRATION MESSAGES ===
    MigrationsFound(usize),
    RunningMigration(u32, String),
    MigrationFailed(u32, String),
    AllMigrationsCompleted,
    DatabaseVersion(u32),
    DatabaseUpToDate,
    DatabaseNeedsUpdate,
    MigrationHistory,
    MigrationHistoryEntry(u32, String, String), // version, name, applied at
    NothingToRollback,
    RollingBack(u32, u32),
    RollbackCompleted(u32),

    // === POLLER MESSAGES ===
    PollerStarted(u64), // interval in milliseconds
    PollerAlreadyRunning,
    PollerStopRequested,
    PollerStopped,
    PollerCycleFailed(String),

    // === INPUT HOOK MESSAGES ===
    InputListenerStarted,
    InputListenerAlreadyRunning,
    InputListenerStopped,
    InputListenerNotRunning,
    ErrorInRdevListener(String),

    // === QUEUE MESSAGES ===
    QueueEntryMissing,
    QueueIdMissing,
    QueueEntrySaved(String),
    QueueEntryUpdated(String),
    QueueEntryRemoved(String),
    QueueEntryNotFound(String),
    QueueReadFailed(String),
    QueueWriteFailed(String),
    QueueEmpty,
    QueuePendingHeader(usize),
    QueueRetryScheduled(String, i64, String), // queue id, attempts, next attempt

    // === KEYBOARD/MOUSE ACTIVITY MESSAGES ===
    ActivityIdMissing,
    ActivitySaved(i64),
    ActivityUpdated(i64),
    ActivityRemoved(i64),
    ActivityReadFailed(String),
    ActivityWriteFailed(String),
    CaptureFlushed(i64, i64), // key presses, mouse events
    CaptureIdle,

    // === SYNC MESSAGES ===
    SyncDisabled,
    SyncIdentityMissing,
    TimerSynced(i64),
    ActivitySynced(i64),
    ActivityKeptPending(i64),
    ScreenshotSynced(String),
    QueueEntrySynced(String),
    SyncPushFailed(String, String), // what, error
    DrainCompleted(usize),
    RemoteRequestFailed(String, String), // path, status

    // === WATCH MESSAGES ===
    WatcherStarted,
    WatcherReceivedSigterm,
    WatcherReceivedSigint,
    WatcherReceivedCtrlC,
    WatcherCtrlCListenFailed(String),
    WatcherSignalHandlingNotSupported,
    WatcherShuttingDown,
    WatcherStopped,
    FailedToCreateSignalHandler(String),

    // === REPORT MESSAGES ===
    DurationReportHeader(i64),
    TimerNotFound(i64),
}
