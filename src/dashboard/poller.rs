//! The dashboard cycle: load the log, filter, aggregate, publish, alert, sleep.

use crate::config::PollerConfig;
use crate::dashboard::state::{
    CycleSnapshot, DashboardEvent, DashboardState, Notice, SignalAlert, SystemStatus,
};
use crate::signals::record::sort_newest_first;
use crate::signals::{load_signals, AlertState, LoadOutcome, SignalView, ALERT_SOUND_URL};
use chrono::Utc;
use std::sync::Arc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

/// Warning shown while there is nothing to render
pub const NO_SIGNALS_MESSAGE: &str = "No signals have been logged yet.";

/// What one cycle produced
#[derive(Debug, Clone)]
pub struct CycleOutcome {
    pub snapshot: Arc<CycleSnapshot>,
    pub alert: Option<SignalAlert>,
}

/// Owns the per-process alert memory and drives the render cycle.
pub struct SignalPoller {
    state: Arc<DashboardState>,
    config: PollerConfig,
    alerts: AlertState,
    cycle: u64,
}

impl SignalPoller {
    pub fn new(state: Arc<DashboardState>, config: PollerConfig) -> Self {
        Self {
            state,
            config,
            alerts: AlertState::new(),
            cycle: 0,
        }
    }

    /// Run one full cycle and publish its snapshot.
    pub async fn run_cycle(&mut self) -> CycleOutcome {
        self.cycle += 1;
        let filters = self.state.get_filters().await;
        let mut alert = None;

        let (status, view, notice) = match load_signals(&self.config.log_path).await {
            Ok(LoadOutcome::Missing) | Ok(LoadOutcome::Empty) => {
                debug!("[POLL] No signals in {:?}", self.config.log_path);
                (
                    SystemStatus::Waiting,
                    None,
                    Some(Notice::warning(NO_SIGNALS_MESSAGE)),
                )
            }
            Ok(LoadOutcome::Loaded(mut batch)) => {
                sort_newest_first(&mut batch.records);
                let view = SignalView::build(&batch.records, &filters);

                if self.alerts.observe(view.latest_timestamp, filters.alert_sound) {
                    if let Some(top) = batch.records.first() {
                        info!(
                            "[ALERT] New signal: {} {} at {}",
                            top.symbol, top.direction, top.timestamp
                        );
                        alert = Some(SignalAlert {
                            sound_url: ALERT_SOUND_URL.to_string(),
                            timestamp: top.timestamp,
                            symbol: top.symbol.clone(),
                            direction: top.direction.to_string(),
                        });
                    }
                }

                debug!(
                    "[POLL] Cycle {}: {} of {} rows shown, {} quarantined, last alert {:?}",
                    self.cycle,
                    view.rows.len(),
                    batch.records.len(),
                    batch.quarantined.len(),
                    self.alerts.last_seen()
                );
                (
                    SystemStatus::Running,
                    Some(view),
                    Notice::quarantined(&batch.quarantined),
                )
            }
            Err(e) => {
                error!("[POLL] Failed to read {:?}: {}", self.config.log_path, e);
                (
                    SystemStatus::Error,
                    None,
                    Some(Notice::error(format!("Could not read signal log: {}", e))),
                )
            }
        };

        let snapshot = self
            .state
            .publish_snapshot(CycleSnapshot {
                cycle: self.cycle,
                completed_at: Utc::now(),
                status,
                filters,
                view,
                notice,
            })
            .await;

        if let Some(ref alert) = alert {
            self.state.broadcast(DashboardEvent::Alert(alert.clone()));
        }

        CycleOutcome { snapshot, alert }
    }

    /// Cycle until shutdown, pacing by the configured interval. A filter
    /// change wakes the loop early.
    pub async fn run(mut self) {
        let mut shutdown = self.state.shutdown_signal();
        let mut interval = tokio::time::interval(self.config.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            "[POLL] Watching {:?} every {}s",
            self.config.log_path,
            self.config.poll_interval.as_secs()
        );

        loop {
            if self.state.is_shutting_down() {
                break;
            }

            tokio::select! {
                _ = interval.tick() => {}
                _ = self.state.refresh.notified() => {
                    debug!("[POLL] Refresh requested");
                }
                _ = shutdown.changed() => break,
            }

            self.run_cycle().await;
        }

        info!("[POLL] Stopped after {} cycles", self.cycle);
    }
}

/// Start the poller in a background task
pub fn spawn_poller(state: Arc<DashboardState>, config: PollerConfig) -> tokio::task::JoinHandle<()> {
    tokio::spawn(SignalPoller::new(state, config).run())
}
