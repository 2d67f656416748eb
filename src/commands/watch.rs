use crate::api::HttpRemote;
use crate::db::db::Db;
use crate::libs::audit_queue::BackoffPolicy;
use crate::libs::capture::CaptureCycle;
use crate::libs::config::Config;
use crate::libs::input_hook::InputHook;
use crate::libs::messages::Message;
use crate::libs::poller::Poller;
use crate::libs::sync::{NoopRemote, RemoteSync, SyncDrain};
use crate::{msg_error, msg_info};
use anyhow::Result;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

pub async fn cmd() -> Result<()> {
    let config = Config::read()?;
    let monitor = config.monitor_or_default();
    let sync = config.sync_or_default();
    let tenant = config.tenant_or_default();
    let db = Db::new()?;

    let hook = InputHook::system();
    hook.start_listener()?;

    let capture = Arc::new(CaptureCycle::new(&db, hook.counters(), monitor.clone(), tenant.clone()));
    let policy = BackoffPolicy::from(&sync);
    let interval = monitor.poll_interval();

    let result = match config.active_server() {
        Some(server) => {
            let drain = SyncDrain::new(&db, HttpRemote::new(server)?, policy, sync.batch_size, tenant);
            run(Arc::clone(&capture), Arc::new(drain), interval).await
        }
        None => {
            msg_info!(Message::SyncDisabled);
            let drain = SyncDrain::new(&db, NoopRemote, policy, sync.batch_size, tenant);
            run(Arc::clone(&capture), Arc::new(drain), interval).await
        }
    };

    hook.stop_listener();
    result
}

async fn run<R: RemoteSync + 'static>(capture: Arc<CaptureCycle>, drain: Arc<SyncDrain<R>>, interval: Duration) -> Result<()> {
    let poller = Poller::new(interval, {
        let capture = Arc::clone(&capture);
        move || {
            let capture = Arc::clone(&capture);
            let drain = Arc::clone(&drain);
            async move {
                capture.tick(Utc::now())?;
                drain.drain(Utc::now()).await?;
                Ok(())
            }
        }
    });

    poller.start();
    msg_info!(Message::WatcherStarted);

    wait_for_shutdown().await;

    msg_info!(Message::WatcherShuttingDown);
    poller.stop();
    poller.join().await;
    capture.flush(Utc::now())?;
    msg_info!(Message::WatcherStopped);
    Ok(())
}

async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
            (Ok(mut sigterm), Ok(mut sigint)) => {
                tokio::select! {
                    _ = sigterm.recv() => {
                        msg_info!(Message::WatcherReceivedSigterm);
                    }
                    _ = sigint.recv() => {
                        msg_info!(Message::WatcherReceivedSigint);
                    }
                }
            }
            (Err(e), _) | (_, Err(e)) => {
                msg_error!(Message::FailedToCreateSignalHandler(e.to_string()));
                wait_for_ctrl_c().await;
            }
        }
    }

    #[cfg(windows)]
    wait_for_ctrl_c().await;

    #[cfg(not(any(unix, windows)))]
    {
        msg_info!(Message::WatcherSignalHandlingNotSupported);
        std::future::pending::<()>().await;
    }
}

#[cfg(any(unix, windows))]
async fn wait_for_ctrl_c() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => msg_info!(Message::WatcherReceivedCtrlC),
        Err(e) => msg_error!(Message::WatcherCtrlCListenFailed(e.to_string())),
    }
}
