//! Signal Dashboard
//!
//! Polls a CSV log of trading signals and serves it as a live web dashboard:
//! a filterable table, summary counters, a frequency chart, and an audible
//! alert whenever a new signal arrives.

pub mod config;
pub mod dashboard;
pub mod signals;
