//! HTTP route handlers for the dashboard.
//!
//! This module contains the page shell, the HTMX partials redrawn every
//! cycle, the JSON API, and the filter control endpoint.

use crate::dashboard::sse::create_sse_stream;
use crate::dashboard::state::{DashboardState, Notice, NoticeLevel, StatusUpdate};
use crate::dashboard::poller::NO_SIGNALS_MESSAGE;
use crate::signals::{
    ChartBucket, DirectionFilter, FilterState, FilterUpdate, SignalRecord, SignalSummary,
    SymbolSelection,
};
use axum::{
    extract::State,
    response::{Html, IntoResponse, Json},
};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Timestamp layout used in the table and chart labels
/// (fractional seconds only when present)
const DISPLAY_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

// ============================================================================
// HTML PAGE HANDLERS (HTMX)
// ============================================================================

/// Main dashboard page
pub async fn index_page() -> impl IntoResponse {
    Html(include_str!("../../static/index.html"))
}

/// Signal table partial (for HTMX)
pub async fn signals_partial(State(state): State<Arc<DashboardState>>) -> impl IntoResponse {
    match state.latest_snapshot().await {
        Some(snapshot) => match &snapshot.view {
            Some(view) => Html(render_signals_table(&view.rows)),
            None => Html(render_notice(snapshot.notice.as_ref())),
        },
        None => Html(render_notice(Some(&Notice::warning(NO_SIGNALS_MESSAGE)))),
    }
}

/// Summary metrics partial (for HTMX)
pub async fn metrics_partial(State(state): State<Arc<DashboardState>>) -> impl IntoResponse {
    let snapshot = state.latest_snapshot().await;
    let html = snapshot
        .as_ref()
        .and_then(|s| s.view.as_ref())
        .map(|v| render_metrics(&v.summary))
        .unwrap_or_default();
    Html(html)
}

/// Filter controls partial (for HTMX)
pub async fn controls_partial(State(state): State<Arc<DashboardState>>) -> impl IntoResponse {
    let filters = state.get_filters().await;
    let observed = state.observed_symbols().await;
    Html(render_controls(&filters, &observed))
}

// ============================================================================
// API HANDLERS (JSON)
// ============================================================================

/// Filtered signals as JSON, newest first
pub async fn api_signals(State(state): State<Arc<DashboardState>>) -> impl IntoResponse {
    let rows = state
        .latest_snapshot()
        .await
        .map(|s| s.rows().to_vec())
        .unwrap_or_default();
    Json(rows)
}

/// Summary counters as JSON
pub async fn api_summary(State(state): State<Arc<DashboardState>>) -> impl IntoResponse {
    let summary = state
        .latest_snapshot()
        .await
        .and_then(|s| s.view.as_ref().map(|v| v.summary.clone()))
        .unwrap_or_default();
    Json(summary)
}

/// Chart series as JSON
pub async fn api_chart(State(state): State<Arc<DashboardState>>) -> impl IntoResponse {
    let data = state
        .latest_snapshot()
        .await
        .and_then(|s| s.view.as_ref().map(|v| chart_data(&v.chart)))
        .unwrap_or_default();
    Json(data)
}

/// Current filter state as JSON
pub async fn api_filters(State(state): State<Arc<DashboardState>>) -> impl IntoResponse {
    Json(state.get_filters().await)
}

/// SSE events endpoint
pub async fn api_events(State(state): State<Arc<DashboardState>>) -> impl IntoResponse {
    create_sse_stream(state)
}

// ============================================================================
// CONTROL HANDLERS
// ============================================================================

#[derive(Debug, Serialize)]
pub struct FilterResponse {
    pub success: bool,
    pub filters: FilterState,
    pub message: String,
}

/// Filter update endpoint
pub async fn api_filters_update(
    State(state): State<Arc<DashboardState>>,
    Json(update): Json<FilterUpdate>,
) -> impl IntoResponse {
    let filters = state.update_filters(update).await;

    Json(FilterResponse {
        success: true,
        filters,
        message: "Filters updated".to_string(),
    })
}

// ============================================================================
// CHART DATA
// ============================================================================

/// One bar series per direction
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChartDataset {
    pub label: String,
    pub data: Vec<usize>,
}

/// Chart.js-ready bar chart data
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChartData {
    pub labels: Vec<String>,
    pub datasets: Vec<ChartDataset>,
}

/// Pivot (timestamp, direction) buckets into aligned per-direction series.
pub fn chart_data(buckets: &[ChartBucket]) -> ChartData {
    let timestamps: BTreeSet<_> = buckets.iter().map(|b| b.timestamp).collect();
    let index: BTreeMap<_, usize> = timestamps.iter().enumerate().map(|(i, t)| (*t, i)).collect();

    let mut series: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for bucket in buckets {
        let data = series
            .entry(bucket.direction.as_str())
            .or_insert_with(|| vec![0; timestamps.len()]);
        data[index[&bucket.timestamp]] += bucket.count;
    }

    ChartData {
        labels: timestamps
            .iter()
            .map(|t| t.format(DISPLAY_TIME_FORMAT).to_string())
            .collect(),
        datasets: series
            .into_iter()
            .map(|(label, data)| ChartDataset {
                label: label.to_string(),
                data,
            })
            .collect(),
    }
}

// ============================================================================
// HTMX PARTIAL RENDERERS
// ============================================================================

pub fn render_signals_table(rows: &[SignalRecord]) -> String {
    if rows.is_empty() {
        return r#"
        <div class="text-center py-8 text-gray-500">
            <p class="mt-2">No signals match the current filters</p>
        </div>
        "#
        .to_string();
    }

    let mut html = String::from(r#"
    <table class="min-w-full divide-y divide-gray-200">
        <thead class="bg-gray-50">
            <tr>
                <th class="px-6 py-3 text-left text-xs font-medium text-gray-500 uppercase tracking-wider">Timestamp</th>
                <th class="px-6 py-3 text-left text-xs font-medium text-gray-500 uppercase tracking-wider">Symbol</th>
                <th class="px-6 py-3 text-left text-xs font-medium text-gray-500 uppercase tracking-wider">Direction</th>
                <th class="px-6 py-3 text-right text-xs font-medium text-gray-500 uppercase tracking-wider">RSI</th>
            </tr>
        </thead>
        <tbody class="bg-white divide-y divide-gray-200">
    "#);

    for row in rows {
        let direction_class = match row.direction.as_str() {
            "BUY" => "bg-green-100 text-green-800",
            "SELL" => "bg-red-100 text-red-800",
            _ => "bg-gray-100 text-gray-800",
        };

        html.push_str(&format!(r#"
            <tr class="hover:bg-gray-50">
                <td class="px-6 py-4 whitespace-nowrap text-sm text-gray-900">{}</td>
                <td class="px-6 py-4 whitespace-nowrap text-sm font-medium text-gray-900">{}</td>
                <td class="px-6 py-4 whitespace-nowrap text-sm">
                    <span class="px-2 py-1 text-xs font-medium rounded-full {}">{}</span>
                </td>
                <td class="px-6 py-4 whitespace-nowrap text-sm text-gray-900 text-right">{}</td>
            </tr>
        "#,
            row.timestamp.format(DISPLAY_TIME_FORMAT),
            html_escape(&row.symbol),
            direction_class,
            html_escape(row.direction.as_str()),
            row.rsi.map(|rsi| format!("{:.2}", rsi)).unwrap_or_default()
        ));
    }

    html.push_str("</tbody></table>");
    html
}

pub fn render_metrics(summary: &SignalSummary) -> String {
    format!(r#"
    <div class="grid grid-cols-2 md:grid-cols-4 gap-4">
        <div class="bg-white rounded-lg shadow p-4">
            <div class="text-sm font-medium text-gray-500">Total Signals</div>
            <div class="text-2xl font-bold text-gray-900">{}</div>
        </div>
        <div class="bg-white rounded-lg shadow p-4">
            <div class="text-sm font-medium text-gray-500">Unique Symbols</div>
            <div class="text-2xl font-bold text-gray-900">{}</div>
        </div>
        <div class="bg-white rounded-lg shadow p-4">
            <div class="text-sm font-medium text-gray-500">Buy Signals</div>
            <div class="text-2xl font-bold text-green-600">{}</div>
        </div>
        <div class="bg-white rounded-lg shadow p-4">
            <div class="text-sm font-medium text-gray-500">Sell Signals</div>
            <div class="text-2xl font-bold text-red-600">{}</div>
        </div>
    </div>
    "#,
        summary.total_signals,
        summary.unique_symbols,
        summary.buy_signals,
        summary.sell_signals
    )
}

pub fn render_notice(notice: Option<&Notice>) -> String {
    let Some(notice) = notice else {
        return String::new();
    };

    let class = match notice.level {
        NoticeLevel::Warning => "bg-yellow-50 border-yellow-400 text-yellow-800",
        NoticeLevel::Error => "bg-red-50 border-red-400 text-red-800",
    };

    format!(
        r#"<div class="border-l-4 p-4 rounded {}" role="alert">{}</div>"#,
        class,
        html_escape(&notice.message)
    )
}

pub fn render_controls(filters: &FilterState, observed: &[String]) -> String {
    // Explicit picks stay listed even after they vanish from the log
    let mut symbols: BTreeSet<&str> = observed.iter().map(String::as_str).collect();
    if let SymbolSelection::Only(picked) = &filters.symbols {
        symbols.extend(picked.iter().map(String::as_str));
    }

    let mut symbol_options = String::new();
    for symbol in &symbols {
        // Nothing is ticked while every symbol is shown
        let explicit = matches!(filters.symbols, SymbolSelection::Only(_));
        let checked = if explicit && filters.symbols.is_selected(symbol) {
            "checked"
        } else {
            ""
        };
        symbol_options.push_str(&format!(r#"
            <label class="flex items-center space-x-2 text-sm text-gray-700">
                <input type="checkbox" name="symbols" value="{0}" {1} class="rounded border-gray-300" />
                <span>{0}</span>
            </label>
        "#,
            html_escape(symbol),
            checked
        ));
    }
    if symbols.is_empty() {
        symbol_options.push_str(r#"<p class="text-sm text-gray-500">No symbols observed yet</p>"#);
    }

    let direction_options: String = [DirectionFilter::All, DirectionFilter::Buy, DirectionFilter::Sell]
        .iter()
        .map(|d| {
            let selected = if *d == filters.direction { "selected" } else { "" };
            format!(r#"<option value="{0}" {1}>{0}</option>"#, d.as_str(), selected)
        })
        .collect();

    let alert_checked = if filters.alert_sound { "checked" } else { "" };

    format!(r#"
    <form id="filter-form" class="space-y-6" onsubmit="return false;">
        <div>
            <h3 class="text-sm font-medium text-gray-900 mb-2">Filter Symbols</h3>
            <div class="space-y-1">{}</div>
            <p class="mt-1 text-xs text-gray-500">None selected shows every symbol</p>
        </div>
        <div>
            <label for="direction" class="block text-sm font-medium text-gray-900 mb-2">Signal Type</label>
            <select id="direction" name="direction"
                    class="block w-full rounded-md border-gray-300 shadow-sm focus:border-blue-500 focus:ring-blue-500">
                {}
            </select>
        </div>
        <div>
            <label class="flex items-center space-x-2 text-sm text-gray-900">
                <input type="checkbox" id="alert-sound" name="alert_sound" {} class="rounded border-gray-300" />
                <span>Enable Alert Sound on New Signal</span>
            </label>
        </div>
    </form>
    "#,
        symbol_options,
        direction_options,
        alert_checked
    )
}

/// Simple HTML escaping to prevent XSS. Carriage returns are encoded too,
/// since rendered HTML is also sent as SSE data.
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
        .replace('\r', "&#13;")
}

// ============================================================================
// HEALTH CHECK
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub poller: StatusUpdate,
}

static START_TIME: std::sync::OnceLock<std::time::Instant> = std::sync::OnceLock::new();

/// Record process start for uptime reporting
pub fn mark_started() {
    START_TIME.get_or_init(std::time::Instant::now);
}

pub async fn health_check(State(state): State<Arc<DashboardState>>) -> impl IntoResponse {
    let start = START_TIME.get_or_init(std::time::Instant::now);
    let uptime = start.elapsed().as_secs();

    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: uptime,
        poller: state.status().await,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signals::view::chart_buckets;
    use crate::signals::Direction;
    use chrono::NaiveDateTime;

    fn ts(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").unwrap()
    }

    #[test]
    fn test_html_escape() {
        assert_eq!(html_escape("<script>"), "&lt;script&gt;");
        assert_eq!(html_escape("a & b"), "a &amp; b");
        assert_eq!(html_escape("\"test\""), "&quot;test&quot;");
        assert_eq!(html_escape("R\r100"), "R&#13;100");
    }

    #[test]
    fn test_render_empty_table() {
        let result = render_signals_table(&[]);
        assert!(result.contains("No signals match"));
    }

    #[test]
    fn test_render_table_rows_in_given_order() {
        let rows = vec![
            SignalRecord::new(ts("2024-01-01T00:05:00"), "R_100", Direction::Sell, 30.0),
            SignalRecord::new(ts("2024-01-01T00:00:00"), "<R_100>", Direction::Buy, 70.0),
        ];
        let html = render_signals_table(&rows);

        let newer = html.find("2024-01-01 00:05:00").unwrap();
        let older = html.find("2024-01-01 00:00:00").unwrap();
        assert!(newer < older);
        assert!(html.contains("&lt;R_100&gt;"));
        assert!(html.contains("30.00"));
        assert_eq!(html.matches("<tr class").count(), 2);
    }

    #[test]
    fn test_render_metrics() {
        let html = render_metrics(&SignalSummary {
            total_signals: 2,
            unique_symbols: 1,
            buy_signals: 1,
            sell_signals: 1,
        });
        assert!(html.contains("Total Signals"));
        assert!(html.contains("Unique Symbols"));
        assert!(html.contains("Buy Signals"));
        assert!(html.contains("Sell Signals"));
    }

    #[test]
    fn test_render_notice() {
        assert!(render_notice(None).is_empty());
        let html = render_notice(Some(&Notice::warning(NO_SIGNALS_MESSAGE)));
        assert!(html.contains("No signals have been logged yet."));
        assert!(html.contains("yellow"));
    }

    #[test]
    fn test_render_controls_marks_selection() {
        let filters = FilterState {
            symbols: SymbolSelection::from_picks(vec!["R_50", "R_10"]),
            direction: DirectionFilter::Sell,
            alert_sound: false,
        };
        let html = render_controls(&filters, &["R_100".to_string(), "R_50".to_string()]);

        assert!(html.contains(r#"value="R_100" "#));
        assert!(html.contains(r#"value="R_50" checked"#));
        // Picked but no longer observed
        assert!(html.contains(r#"value="R_10" checked"#));
        assert!(html.contains(r#"<option value="SELL" selected>"#));
        assert!(!html.contains(r#"name="alert_sound" checked"#));
    }

    #[test]
    fn test_chart_data_aligns_series() {
        let rows = vec![
            SignalRecord::new(ts("2024-01-01T00:01:00"), "A", Direction::Buy, 1.0),
            SignalRecord::new(ts("2024-01-01T00:01:00"), "B", Direction::Buy, 1.0),
            SignalRecord::new(ts("2024-01-01T00:00:00"), "A", Direction::Sell, 1.0),
        ];
        let data = chart_data(&chart_buckets(&rows));

        assert_eq!(data.labels, vec!["2024-01-01 00:00:00", "2024-01-01 00:01:00"]);
        assert_eq!(
            data.datasets,
            vec![
                ChartDataset { label: "BUY".into(), data: vec![0, 2] },
                ChartDataset { label: "SELL".into(), data: vec![1, 0] },
            ]
        );
    }

    #[test]
    fn test_render_table_blank_rsi() {
        let rows = vec![SignalRecord::new(ts("2024-01-01T00:00:00"), "R_100", Direction::Buy, None)];
        let html = render_signals_table(&rows);
        assert!(html.contains(r#"text-right"></td>"#));
    }

    #[test]
    fn test_render_controls_all_leaves_boxes_unticked() {
        let html = render_controls(&FilterState::default(), &["R_100".to_string()]);
        assert!(html.contains(r#"value="R_100" "#));
        assert!(!html.contains(r#"value="R_100" checked"#));
    }

    #[test]
    fn test_chart_labels_keep_sub_second_buckets_apart() {
        let first = NaiveDateTime::parse_from_str("2024-01-01 00:00:00.250", "%Y-%m-%d %H:%M:%S%.f").unwrap();
        let second = NaiveDateTime::parse_from_str("2024-01-01 00:00:00.750", "%Y-%m-%d %H:%M:%S%.f").unwrap();
        let rows = vec![
            SignalRecord::new(second, "A", Direction::Buy, 1.0),
            SignalRecord::new(first, "A", Direction::Buy, 1.0),
        ];
        let data = chart_data(&chart_buckets(&rows));

        assert_eq!(data.labels.len(), 2);
        assert_ne!(data.labels[0], data.labels[1]);
        assert_eq!(data.labels[0], "2024-01-01 00:00:00.250");
        assert_eq!(data.datasets[0].data, vec![1, 1]);
    }

    #[test]
    fn test_chart_data_empty() {
        assert_eq!(chart_data(&[]), ChartData::default());
    }
}
