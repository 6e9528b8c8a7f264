//! Dashboard counters refresher
//!
//! Refetches `GET /stats/today` on a fixed interval and whenever the
//! workflow publishes `StatsRefreshRequested` (after a recorded event or an
//! undo). Failures are logged and the previous counters stay on screen.

use crate::ledger::Ledger;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use whs_common::api::{Mode, StatsToday};
use whs_common::events::{EventBus, ScanEvent};

pub struct StatsRefresher {
    ledger: Arc<dyn Ledger>,
    event_bus: EventBus,
    interval: Duration,
}

impl StatsRefresher {
    pub fn new(ledger: Arc<dyn Ledger>, event_bus: EventBus, interval: Duration) -> Self {
        Self {
            ledger,
            event_bus,
            interval,
        }
    }

    /// Fetch counters once and publish them
    pub async fn refresh(&self) -> Option<StatsToday> {
        match self.ledger.stats_today().await {
            Ok(stats) => {
                debug!(
                    received = stats.received_today,
                    to_put_away = stats.to_put_away,
                    "Stats refreshed"
                );
                self.event_bus.emit_lossy(ScanEvent::StatsUpdated {
                    stats: stats.clone(),
                    timestamp: Utc::now(),
                });
                Some(stats)
            }
            Err(e) => {
                warn!(error = %e, "Stats refresh failed");
                None
            }
        }
    }

    /// Refresh on every tick and refresh request until cancelled
    pub async fn run(self, shutdown: CancellationToken) {
        let mut rx = self.event_bus.subscribe();
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(interval_ms = self.interval.as_millis() as u64, "Stats refresher started");
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    self.refresh().await;
                }
                received = rx.recv() => match received {
                    Ok(ScanEvent::StatsRefreshRequested { .. }) => {
                        self.refresh().await;
                        ticker.reset();
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Stats refresher lagged behind event bus");
                        self.refresh().await;
                    }
                    Err(RecvError::Closed) => break,
                },
            }
        }
        debug!("Stats refresher stopped");
    }
}

/// Order of the action cards on the selection screen
///
/// Putaway work waiting puts MOVE first.
pub fn action_order(stats: Option<&StatsToday>) -> [Mode; 3] {
    match stats {
        Some(stats) if stats.to_put_away > 0 => [Mode::Move, Mode::Receive, Mode::Ship],
        _ => [Mode::Receive, Mode::Move, Mode::Ship],
    }
}
