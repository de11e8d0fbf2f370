//! Periodic price refresh.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info};

use super::session::PortfolioSession;

/// Default refresh period.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(5 * 60);

pub struct RefreshTask;

impl RefreshTask {
    /// Starts refreshing `session` every `period`, first tick one period from now.
    ///
    /// Each tick launches the sync on its own task, so a slow fetch never delays
    /// the timer; overlapping ticks are dropped by the session.
    pub fn spawn(session: Arc<PortfolioSession>, period: Duration) -> RefreshHandle {
        let (stop_tx, mut stop_rx) = watch::channel(false);

        let join = tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            info!(?period, "Periodic price refresh started");

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if session.is_empty() {
                            debug!("Refresh tick skipped, portfolio is empty");
                            continue;
                        }
                        let session = Arc::clone(&session);
                        tokio::spawn(async move {
                            // Failures are already broadcast by the session.
                            let _ = session.sync().await;
                        });
                    }
                    changed = stop_rx.changed() => {
                        if changed.is_err() || *stop_rx.borrow() {
                            break;
                        }
                    }
                }
            }
            info!("Periodic price refresh stopped");
        });

        RefreshHandle { stop_tx, join }
    }
}

/// Handle to a running [`RefreshTask`].
pub struct RefreshHandle {
    stop_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl RefreshHandle {
    /// Stops the timer and waits for it to exit. A fetch already in flight is not cancelled.
    pub async fn stop(self) {
        let _ = self.stop_tx.send(true);
        if let Err(e) = self.join.await {
            debug!("Refresh task ended abnormally: {e}");
        }
    }
}
