//! Shared application state for the dashboard.
//!
//! The poller writes a fresh [`CycleSnapshot`] every cycle; handlers and SSE
//! streams only read it. Filter changes made through the controls are stored
//! here and wake the poller so the next render happens immediately.

use crate::config::EVENT_CHANNEL_CAPACITY;
use crate::signals::{FilterState, FilterUpdate, QuarantinedRow, SignalRecord, SignalView};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, watch, Notify, RwLock};

/// Poller status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SystemStatus {
    Starting,
    /// Rendering signals from the log
    Running,
    /// Log missing or empty
    Waiting,
    Error,
}

impl Default for SystemStatus {
    fn default() -> Self {
        SystemStatus::Starting
    }
}

/// Notice severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Warning,
    Error,
}

/// Message shown above the table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }

    /// Summarize rows skipped this cycle
    pub fn quarantined(rows: &[QuarantinedRow]) -> Option<Self> {
        let first = rows.first()?;
        Some(Self::warning(format!(
            "Skipped {} malformed row(s); first at line {}: {}",
            rows.len(),
            first.line,
            first.reason
        )))
    }
}

/// Result of one dashboard cycle
#[derive(Debug, Clone)]
pub struct CycleSnapshot {
    pub cycle: u64,
    pub completed_at: DateTime<Utc>,
    pub status: SystemStatus,
    /// Filters the view was built with
    pub filters: FilterState,
    /// `None` when there was nothing to render
    pub view: Option<SignalView>,
    pub notice: Option<Notice>,
}

impl CycleSnapshot {
    pub fn rows(&self) -> &[SignalRecord] {
        self.view.as_ref().map(|v| v.rows.as_slice()).unwrap_or(&[])
    }
}

/// Payload of an audible new-signal alert
#[derive(Debug, Clone, Serialize)]
pub struct SignalAlert {
    pub sound_url: String,
    pub timestamp: NaiveDateTime,
    pub symbol: String,
    pub direction: String,
}

/// Heartbeat payload
#[derive(Debug, Clone, Serialize)]
pub struct StatusUpdate {
    pub status: SystemStatus,
    pub cycles: u64,
    pub last_cycle_at: Option<DateTime<Utc>>,
    pub log_path: String,
}

/// Events fanned out to SSE clients
#[derive(Debug, Clone)]
pub enum DashboardEvent {
    /// A cycle finished rendering
    Cycle(Arc<CycleSnapshot>),
    /// The set of observed symbols changed
    Symbols(Vec<String>),
    Alert(SignalAlert),
    Status(StatusUpdate),
}

/// Shared dashboard state
pub struct DashboardState {
    /// Log file being polled, for display
    pub log_path: PathBuf,

    /// Operator's filter selections
    pub filters: RwLock<FilterState>,

    /// Last completed cycle
    pub snapshot: RwLock<Option<Arc<CycleSnapshot>>>,

    /// Completed cycle count
    pub cycles: AtomicU64,

    /// Broadcast channel for SSE events
    pub event_tx: broadcast::Sender<DashboardEvent>,

    /// Wakes the poller ahead of its interval
    pub refresh: Notify,

    shutdown_tx: watch::Sender<bool>,
}

impl DashboardState {
    /// Create a new dashboard state with default filters
    pub fn new(log_path: impl Into<PathBuf>) -> Arc<Self> {
        Self::with_filters(log_path, FilterState::default())
    }

    pub fn with_filters(log_path: impl Into<PathBuf>, filters: FilterState) -> Arc<Self> {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (shutdown_tx, _) = watch::channel(false);

        Arc::new(Self {
            log_path: log_path.into(),
            filters: RwLock::new(filters),
            snapshot: RwLock::new(None),
            cycles: AtomicU64::new(0),
            event_tx,
            refresh: Notify::new(),
            shutdown_tx,
        })
    }

    /// Subscribe to SSE events
    pub fn subscribe(&self) -> broadcast::Receiver<DashboardEvent> {
        self.event_tx.subscribe()
    }

    /// Broadcast an event to all SSE subscribers
    pub fn broadcast(&self, event: DashboardEvent) {
        // Ignore send errors (no subscribers)
        let _ = self.event_tx.send(event);
    }

    /// Receiver that flips to `true` when the dashboard is stopping
    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown_tx.subscribe()
    }

    /// Stop the poller, heartbeat, and open SSE streams
    pub fn shutdown(&self) {
        self.shutdown_tx.send_replace(true);
    }

    pub fn is_shutting_down(&self) -> bool {
        *self.shutdown_tx.borrow()
    }

    pub async fn get_filters(&self) -> FilterState {
        self.filters.read().await.clone()
    }

    /// Apply a control update and ask the poller to re-render
    pub async fn update_filters(&self, update: FilterUpdate) -> FilterState {
        let updated = {
            let mut filters = self.filters.write().await;
            filters.apply_update(update);
            filters.clone()
        };

        self.refresh.notify_one();
        tracing::info!(
            "Filters changed: symbols={:?} direction={} alert_sound={}",
            updated.symbols,
            updated.direction,
            updated.alert_sound
        );
        updated
    }

    /// Store a finished cycle and push it to subscribers
    pub async fn publish_snapshot(&self, snapshot: CycleSnapshot) -> Arc<CycleSnapshot> {
        let snapshot = Arc::new(snapshot);
        let previous = self.snapshot.write().await.replace(snapshot.clone());
        self.cycles.store(snapshot.cycle, Ordering::Relaxed);

        let symbols_of = |s: Option<&CycleSnapshot>| {
            s.and_then(|s| s.view.as_ref())
                .map(|v| v.observed_symbols.iter().cloned().collect::<Vec<_>>())
                .unwrap_or_default()
        };
        let before = symbols_of(previous.as_deref());
        let after = symbols_of(Some(snapshot.as_ref()));

        self.broadcast(DashboardEvent::Cycle(snapshot.clone()));
        if before != after {
            self.broadcast(DashboardEvent::Symbols(after));
        }

        snapshot
    }

    pub async fn latest_snapshot(&self) -> Option<Arc<CycleSnapshot>> {
        self.snapshot.read().await.clone()
    }

    pub fn cycle_count(&self) -> u64 {
        self.cycles.load(Ordering::Relaxed)
    }

    /// Symbols seen in the last cycle
    pub async fn observed_symbols(&self) -> Vec<String> {
        self.snapshot
            .read()
            .await
            .as_ref()
            .and_then(|s| s.view.as_ref())
            .map(|v| v.observed_symbols.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub async fn status(&self) -> StatusUpdate {
        let snapshot = self.latest_snapshot().await;
        StatusUpdate {
            status: snapshot.as_ref().map(|s| s.status).unwrap_or_default(),
            cycles: self.cycle_count(),
            last_cycle_at: snapshot.as_ref().map(|s| s.completed_at),
            log_path: self.log_path.display().to_string(),
        }
    }
}
