//! Web Dashboard Module
//!
//! Live view of the signal log, built with Axum, HTMX, and Tailwind CSS.
//!
//! # Features
//!
//! - **Signal Table**: filtered signals, newest first
//! - **Summary Metrics**: total, unique symbols, buy and sell counts
//! - **Frequency Chart**: signals per timestamp, split by direction (Chart.js)
//! - **Filters**: symbol multi-select, direction select, alert-sound toggle
//! - **Real-time Updates**: Server-Sent Events (SSE) redraw the page every cycle
//! - **Audible Alerts**: the browser beeps when a new signal tops the log
//!
//! # Usage
//!
//! ```rust,ignore
//! use signal_dashboard::config::PollerConfig;
//! use signal_dashboard::dashboard::{DashboardServer, DashboardState};
//!
//! let config = PollerConfig::from_env()?;
//! let state = DashboardState::new(&config.log_path);
//! DashboardServer::new(state, config).run().await?;
//! ```

pub mod handlers;
pub mod poller;
pub mod server;
pub mod sse;
pub mod state;

pub use poller::SignalPoller;
pub use server::{DashboardConfig, DashboardServer};
pub use state::DashboardState;
