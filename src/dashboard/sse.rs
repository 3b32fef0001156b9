//! Server-Sent Events (SSE) implementation for live dashboard updates.
//!
//! Every finished cycle is pushed as a set of events: `table`, `metrics` and
//! `notice` carry ready-to-swap HTML, `chart` carries JSON for Chart.js.
//! `symbols`, `alert` and `status` are sent as they happen.

use crate::config::HEARTBEAT_INTERVAL_SECS;
use crate::dashboard::handlers::{chart_data, render_metrics, render_notice, render_signals_table};
use crate::dashboard::state::{CycleSnapshot, DashboardEvent, DashboardState};
use async_stream::stream;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use serde::Serialize;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

/// Create an SSE stream for a client connection
pub fn create_sse_stream(
    state: Arc<DashboardState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let mut rx = state.subscribe();
    let mut shutdown = state.shutdown_signal();

    let stream = stream! {
        // Send the last rendered cycle on connection
        if let Some(snapshot) = state.latest_snapshot().await {
            for event in snapshot_events(&snapshot) {
                yield Ok(event);
            }
        }

        if let Some(event) = json_event("status", &state.status().await) {
            yield Ok(event);
        }

        loop {
            let received = tokio::select! {
                received = rx.recv() => received,
                _ = shutdown.changed() => {
                    debug!("SSE stream closing for shutdown");
                    break;
                }
            };

            match received {
                Ok(DashboardEvent::Cycle(snapshot)) => {
                    for event in snapshot_events(&snapshot) {
                        yield Ok(event);
                    }
                }
                Ok(DashboardEvent::Symbols(symbols)) => {
                    if let Some(event) = json_event("symbols", &symbols) {
                        yield Ok(event);
                    }
                }
                Ok(DashboardEvent::Alert(alert)) => {
                    if let Some(event) = json_event("alert", &alert) {
                        yield Ok(event);
                    }
                }
                Ok(DashboardEvent::Status(status)) => {
                    if let Some(event) = json_event("status", &status) {
                        yield Ok(event);
                    }
                }
                Err(RecvError::Lagged(n)) => {
                    warn!("SSE client lagged by {} messages", n);
                    // Continue receiving
                }
                Err(RecvError::Closed) => {
                    debug!("SSE broadcast channel closed");
                    break;
                }
            }
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// Events that redraw the page for one cycle
pub fn snapshot_events(snapshot: &CycleSnapshot) -> Vec<Event> {
    let mut events = vec![html_event("notice", &render_notice(snapshot.notice.as_ref()))];

    match &snapshot.view {
        Some(view) => {
            events.push(html_event("table", &render_signals_table(&view.rows)));
            events.push(html_event("metrics", &render_metrics(&view.summary)));
            if let Some(event) = json_event("chart", &chart_data(&view.chart)) {
                events.push(event);
            }
        }
        None => {
            events.push(Event::default().event("table").data(""));
            events.push(Event::default().event("metrics").data(""));
            events.push(Event::default().event("chart").data("null"));
        }
    }

    debug!("SSE sending cycle {}", snapshot.cycle);
    events
}

/// HTML payload as an SSE event. Carriage returns cannot appear in SSE
/// data, so any left after escaping are dropped.
fn html_event(event_type: &str, html: &str) -> Event {
    let data: String = html.chars().filter(|c| *c != '\r').collect();
    Event::default().event(event_type).data(data)
}

fn json_event<T: Serialize>(event_type: &str, payload: &T) -> Option<Event> {
    match serde_json::to_string(payload) {
        Ok(json) => Some(Event::default().event(event_type).data(json)),
        Err(e) => {
            warn!("Failed to serialize SSE event {}: {}", event_type, e);
            None
        }
    }
}

/// Background task that sends heartbeat status updates
pub async fn heartbeat_broadcaster(state: Arc<DashboardState>) {
    let mut interval = tokio::time::interval(Duration::from_secs(HEARTBEAT_INTERVAL_SECS));
    let mut shutdown = state.shutdown_signal();

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = shutdown.changed() => break,
        }

        let status = state.status().await;
        state.broadcast(DashboardEvent::Status(status));
    }
}
