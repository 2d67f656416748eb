//! Cooperative capture loop.
//!
//! A [`Poller`] owns one async callback and calls it, then sleeps for a fixed
//! interval, until stopped. Cycles never overlap: the next one starts only
//! after the previous callback resolved and the interval elapsed. A failing
//! or panicking cycle is handed to the error handler and the loop carries on.
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use trackvault::libs::poller::Poller;
//!
//! # async fn run() {
//! let poller = Poller::new(Duration::from_secs(5), || async { Ok(()) })
//!     .with_error_handler(|e| eprintln!("cycle failed: {e}"));
//! poller.start();
//! // ...
//! poller.stop();
//! poller.join().await;
//! # }
//! ```

use crate::libs::messages::Message;
use crate::{msg_debug, msg_error, msg_info, msg_warning};
use parking_lot::Mutex;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(5000);

type CycleFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>>;
type Callback = Arc<dyn Fn() -> CycleFuture + Send + Sync>;
type ErrorHandler = Arc<dyn Fn(&anyhow::Error) + Send + Sync>;

pub struct Poller {
    interval: Duration,
    callback: Callback,
    on_error: ErrorHandler,
    running: Arc<AtomicBool>,
    // Bumped on every start so a loop still sleeping from an earlier run exits.
    generation: Arc<AtomicU64>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Poller {
    pub fn new<F, Fut>(interval: Duration, callback: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let callback: Callback = Arc::new(move || Box::pin(callback()) as CycleFuture);
        Self {
            interval,
            callback,
            on_error: Arc::new(|e: &anyhow::Error| msg_error!(Message::PollerCycleFailed(format!("{e:#}")))),
            running: Arc::new(AtomicBool::new(false)),
            generation: Arc::new(AtomicU64::new(0)),
            handle: Mutex::new(None),
        }
    }

    /// Replaces the default handler, which logs the failure.
    pub fn with_error_handler(mut self, handler: impl Fn(&anyhow::Error) + Send + Sync + 'static) -> Self {
        self.on_error = Arc::new(handler);
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Spawns the loop on the current tokio runtime.
    ///
    /// Returns `false` without spawning when a loop is already running,
    /// including when two callers race to start it.
    pub fn start(&self) -> bool {
        if self.running.swap(true, Ordering::SeqCst) {
            msg_warning!(Message::PollerAlreadyRunning);
            return false;
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let current = Arc::clone(&self.generation);
        let running = Arc::clone(&self.running);
        let callback = Arc::clone(&self.callback);
        let on_error = Arc::clone(&self.on_error);
        let interval = self.interval;

        let handle = tokio::spawn(async move {
            while running.load(Ordering::SeqCst) && current.load(Ordering::SeqCst) == generation {
                // Each cycle runs as its own task so a panic surfaces as a `JoinError`.
                let cycle = tokio::spawn({
                    let callback = Arc::clone(&callback);
                    async move { callback().await }
                });
                match cycle.await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => on_error(&e),
                    Err(join_err) => on_error(&anyhow::anyhow!("cycle panicked: {join_err}")),
                }
                tokio::time::sleep(interval).await;
            }
            if current.load(Ordering::SeqCst) == generation {
                running.store(false, Ordering::SeqCst);
            }
            msg_debug!(Message::PollerStopped);
        });
        *self.handle.lock() = Some(handle);

        msg_info!(Message::PollerStarted(interval.as_millis() as u64));
        true
    }

    /// Asks the loop to exit before its next cycle. An in-flight callback is not interrupted.
    pub fn stop(&self) {
        if self.running.swap(false, Ordering::SeqCst) {
            msg_debug!(Message::PollerStopRequested);
        }
    }

    /// Waits for the most recently spawned loop to finish.
    pub async fn join(&self) {
        let handle = self.handle.lock().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }
}
