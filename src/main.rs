//! Signal Dashboard
//!
//! Watches the signal log written by the analyzer and serves a live dashboard.
//!
//! ## Configuration
//!
//! - `SIGNAL_LOG_PATH` - log to poll (default `signals_log.csv`)
//! - `POLL_INTERVAL_SECS` - seconds between redraws (default 5)
//! - `ALERT_SOUND` - initial alert toggle (default on)
//! - `DASHBOARD_HOST` / `DASHBOARD_PORT` - bind address (default `127.0.0.1:8080`)
//! - `DASHBOARD_STATIC_DIR` / `DASHBOARD_CORS` - static assets and CORS
//!
//! A `.env` file in the working directory is loaded first when present.

use anyhow::{Context, Result};
use tracing::info;

use signal_dashboard::config::PollerConfig;
use signal_dashboard::dashboard::{DashboardConfig, DashboardServer, DashboardState};
use signal_dashboard::signals::FilterState;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("signal_dashboard=info".parse()?),
        )
        .init();

    info!("Signal Dashboard v{}", env!("CARGO_PKG_VERSION"));

    let poller_config = PollerConfig::from_env().context("Invalid poller configuration")?;
    let dashboard_config = DashboardConfig::from_env();

    info!("   Signal log: {:?}", poller_config.log_path);
    info!("   Refresh interval: {}s", poller_config.poll_interval.as_secs());
    info!(
        "   Alert sound: {}",
        if poller_config.alert_sound { "on" } else { "off" }
    );

    let filters = FilterState {
        alert_sound: poller_config.alert_sound,
        ..Default::default()
    };
    let state = DashboardState::with_filters(&poller_config.log_path, filters);

    DashboardServer::with_config(state, poller_config, dashboard_config)
        .run()
        .await
}
