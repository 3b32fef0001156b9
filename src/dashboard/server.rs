//! Axum server setup and configuration.
//!
//! This module provides the main dashboard server with all routes configured,
//! CORS middleware, static file serving, and graceful shutdown support. The
//! server also owns the background poller and heartbeat tasks.

use crate::config::{parse_flag, PollerConfig};
use crate::dashboard::handlers::{
    api_chart, api_events, api_filters, api_filters_update, api_signals, api_summary,
    controls_partial, health_check, index_page, mark_started, metrics_partial, signals_partial,
};
use crate::dashboard::poller::spawn_poller;
use crate::dashboard::sse::heartbeat_broadcaster;
use crate::dashboard::state::DashboardState;
use anyhow::Context;
use axum::{
    http::{header, Method, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::info;

/// Dashboard server configuration
#[derive(Debug, Clone)]
pub struct DashboardConfig {
    /// Port to listen on
    pub port: u16,
    /// Host to bind to
    pub host: String,
    /// Path to static files directory
    pub static_dir: PathBuf,
    /// Enable CORS for development
    pub enable_cors: bool,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            host: "127.0.0.1".to_string(),
            static_dir: PathBuf::from("static"),
            enable_cors: true,
        }
    }
}

impl DashboardConfig {
    /// Create config from environment variables
    pub fn from_env() -> Self {
        Self {
            port: std::env::var("DASHBOARD_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8080),
            host: std::env::var("DASHBOARD_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            static_dir: std::env::var("DASHBOARD_STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("static")),
            enable_cors: std::env::var("DASHBOARD_CORS")
                .map(|v| parse_flag(&v))
                .unwrap_or(true),
        }
    }

    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid dashboard address {}:{}", self.host, self.port))
    }
}

/// Dashboard server
pub struct DashboardServer {
    state: Arc<DashboardState>,
    config: DashboardConfig,
    poller: PollerConfig,
}

impl DashboardServer {
    /// Create a new dashboard server with state
    pub fn new(state: Arc<DashboardState>, poller: PollerConfig) -> Self {
        Self {
            state,
            config: DashboardConfig::default(),
            poller,
        }
    }

    /// Create with custom configuration
    pub fn with_config(
        state: Arc<DashboardState>,
        poller: PollerConfig,
        config: DashboardConfig,
    ) -> Self {
        Self {
            state,
            config,
            poller,
        }
    }

    /// Build the router with all routes
    fn build_router(&self) -> Router {
        // Create CORS layer if enabled
        let cors = if self.config.enable_cors {
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        } else {
            CorsLayer::new()
        };

        // Static file service
        let static_service = ServeDir::new(&self.config.static_dir)
            .append_index_html_on_directories(true);

        Router::new()
            // HTML pages
            .route("/", get(index_page))
            .route("/partials/signals", get(signals_partial))
            .route("/partials/metrics", get(metrics_partial))
            .route("/partials/controls", get(controls_partial))
            // API routes
            .route("/api/signals", get(api_signals))
            .route("/api/summary", get(api_summary))
            .route("/api/chart", get(api_chart))
            .route("/api/filters", get(api_filters).post(api_filters_update))
            .route("/api/events", get(api_events))
            // Health check
            .route("/health", get(health_check))
            // Fallback for static files and styles
            .nest_service("/static", static_service)
            .route("/styles.css", get(serve_styles))
            // Add state and middleware
            .with_state(self.state.clone())
            .layer(cors)
            .layer(TraceLayer::new_for_http())
    }

    /// Run the server until Ctrl+C / SIGTERM
    pub async fn run(self) -> anyhow::Result<()> {
        let addr = self.config.socket_addr()?;
        mark_started();

        info!("Starting dashboard server at http://{}", addr);
        info!("Static files directory: {:?}", self.config.static_dir);

        let router = self.build_router();
        let state = self.state.clone();

        // Create TCP listener
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind {}", addr))?;

        // Spawn background tasks
        let poller = spawn_poller(state.clone(), self.poller.clone());
        let heartbeat = tokio::spawn(heartbeat_broadcaster(state.clone()));

        info!("Dashboard ready at http://{}", addr);

        let state_for_shutdown = state.clone();
        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                shutdown_signal().await;
                // Ends the poller, heartbeat, and open SSE streams
                state_for_shutdown.shutdown();
            })
            .await
            .context("dashboard server error")?;

        let _ = tokio::join!(poller, heartbeat);
        info!("Dashboard server shut down");
        Ok(())
    }
}

/// Serve the CSS styles (embedded or from file)
async fn serve_styles() -> impl IntoResponse {
    let css = include_str!("../../static/styles.css");
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/css")],
        css,
    )
}

/// Shutdown signal handler for graceful shutdown
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down...");
        }
        _ = terminate => {
            info!("Received SIGTERM, shutting down...");
        }
    }
}
