//! Per-cycle aggregation: filtered table, summary counters, and chart buckets.

use crate::signals::filter::{observed_symbols, FilterState};
use crate::signals::record::{Direction, SignalRecord};
use chrono::NaiveDateTime;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Summary counters shown above the table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SignalSummary {
    pub total_signals: usize,
    pub unique_symbols: usize,
    pub buy_signals: usize,
    pub sell_signals: usize,
}

impl SignalSummary {
    pub fn from_rows(rows: &[SignalRecord]) -> Self {
        let unique: BTreeSet<&str> = rows.iter().map(|r| r.symbol.as_str()).collect();
        Self {
            total_signals: rows.len(),
            unique_symbols: unique.len(),
            buy_signals: rows.iter().filter(|r| r.direction == Direction::Buy).count(),
            sell_signals: rows.iter().filter(|r| r.direction == Direction::Sell).count(),
        }
    }
}

/// Number of signals sharing one (timestamp, direction) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartBucket {
    pub timestamp: NaiveDateTime,
    pub direction: String,
    pub count: usize,
}

/// Group rows by (timestamp, direction), oldest bucket first.
pub fn chart_buckets(rows: &[SignalRecord]) -> Vec<ChartBucket> {
    let mut counts: BTreeMap<(NaiveDateTime, &str), usize> = BTreeMap::new();
    for row in rows {
        *counts.entry((row.timestamp, row.direction.as_str())).or_insert(0) += 1;
    }

    counts
        .into_iter()
        .map(|((timestamp, direction), count)| ChartBucket {
            timestamp,
            direction: direction.to_string(),
            count,
        })
        .collect()
}

/// Everything one render needs.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SignalView {
    /// Filtered rows, newest first
    pub rows: Vec<SignalRecord>,
    pub summary: SignalSummary,
    pub chart: Vec<ChartBucket>,
    /// Symbols present in the unfiltered data
    pub observed_symbols: BTreeSet<String>,
    /// Timestamp of the newest unfiltered row
    pub latest_timestamp: Option<NaiveDateTime>,
}

impl SignalView {
    /// Build the view from records already sorted newest first.
    pub fn build(sorted: &[SignalRecord], filters: &FilterState) -> Self {
        let observed = observed_symbols(sorted);
        let resolved = filters.symbols.resolve(&observed);
        let rows: Vec<SignalRecord> = filters
            .apply(sorted, &resolved)
            .into_iter()
            .cloned()
            .collect();

        Self {
            summary: SignalSummary::from_rows(&rows),
            chart: chart_buckets(&rows),
            rows,
            observed_symbols: observed,
            latest_timestamp: sorted.first().map(|r| r.timestamp),
        }
    }
}
