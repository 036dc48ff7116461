//! Polling daemon: sends the configured command to each sensor on a fixed
//! interval and logs the replies.

use std::process::ExitCode;

use tokio::signal::unix::{self, SignalKind};
use tokio_util::{sync::CancellationToken, task::TaskTracker};

use atlas_sensor::config::PollerConfig;
use atlas_sensor::poller;
use atlas_sensor::tracing::{self, prelude::*};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    tracing::init_journald_or_stdout();

    let config = PollerConfig::from_env()?;
    debug!("{config:?}");

    let running = CancellationToken::new();
    let tracker = TaskTracker::new();
    let poll = tracker.spawn(poller::task(config, running.clone()));
    tracker.close();
    info!("Started.");

    let mut sigint = unix::signal(SignalKind::interrupt())?;
    let mut sigterm = unix::signal(SignalKind::terminate())?;
    let mut failed = false;
    tokio::select! {
        _ = sigint.recv() => {},
        _ = sigterm.recv() => {},
        // The task only returns early when a transport failed to open.
        outcome = poll => {
            if let Ok(Err(e)) = outcome {
                error!("{e}");
            }
            failed = true;
        }
    }

    trace!("Shutting down.");
    running.cancel();

    tracker.wait().await;
    info!("Exiting.");
    Ok(if failed { ExitCode::FAILURE } else { ExitCode::SUCCESS })
}
