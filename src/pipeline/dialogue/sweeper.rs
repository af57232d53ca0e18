//! Periodic idle-session sweep.
//!
//! Runs on the tokio runtime, one `reap_idle` pass per interval tick.
//! Sessions are only ever moved from `active` to `abandoned` here, so the
//! sweep never races a caller on a live session.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;

use super::orchestrator::DialogueOrchestrator;

/// Floor for the sweep period; `tokio::time::interval` rejects zero.
const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(10);

/// Handle to the background sweep. Stops the task on `shutdown()` or drop.
pub struct IdleSweeperHandle {
    shutdown: Arc<AtomicBool>,
    notify: Arc<Notify>,
    handle: Option<JoinHandle<()>>,
}

impl IdleSweeperHandle {
    /// Request shutdown. A pass already running completes first.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
        self.notify.notify_one();
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }

    /// Shut down and wait for the task to exit.
    pub async fn join(mut self) {
        self.shutdown();
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "Idle sweeper task ended abnormally");
            }
        }
    }
}

impl Drop for IdleSweeperHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Spawns the sweep on the current tokio runtime.
pub fn start_idle_sweeper(orchestrator: Arc<DialogueOrchestrator>) -> IdleSweeperHandle {
    let period = orchestrator.config().sweep_interval.max(MIN_SWEEP_INTERVAL);
    let shutdown = Arc::new(AtomicBool::new(false));
    let notify = Arc::new(Notify::new());

    let handle = tokio::spawn(sweep_loop(
        orchestrator,
        period,
        Arc::clone(&shutdown),
        Arc::clone(&notify),
    ));
    tracing::info!(interval_secs = period.as_secs(), "Idle sweeper started");

    IdleSweeperHandle {
        shutdown,
        notify,
        handle: Some(handle),
    }
}

async fn sweep_loop(
    orchestrator: Arc<DialogueOrchestrator>,
    period: Duration,
    shutdown: Arc<AtomicBool>,
    notify: Arc<Notify>,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    while !shutdown.load(Ordering::Relaxed) {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = notify.notified() => {}
        }
        if shutdown.load(Ordering::Relaxed) {
            break;
        }
        if let Err(e) = orchestrator.reap_idle() {
            tracing::error!(error = %e, "Idle sweep failed");
        }
    }
    tracing::info!("Idle sweeper stopped");
}
