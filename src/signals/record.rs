//! Signal records as they appear in the log.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Serialize, Serializer};
use std::fmt;

// ============================================================================
// DIRECTION
// ============================================================================

/// Trade side of a signal.
///
/// The producer conventionally writes `BUY` or `SELL`, but the column is not
/// validated on read: anything else is kept verbatim as `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Direction {
    Buy,
    Sell,
    Other(String),
}

impl Direction {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "BUY" => Direction::Buy,
            "SELL" => Direction::Sell,
            other => Direction::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Direction::Buy => "BUY",
            Direction::Sell => "SELL",
            Direction::Other(raw) => raw,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Direction {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

// ============================================================================
// SIGNAL RECORD
// ============================================================================

/// One logged trading signal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalRecord {
    pub timestamp: NaiveDateTime,
    pub symbol: String,
    pub direction: Direction,
    /// RSI at logging time; opaque to the dashboard. `None` when the
    /// column is missing or not a number.
    pub rsi: Option<f64>,
}

impl SignalRecord {
    pub fn new(
        timestamp: NaiveDateTime,
        symbol: &str,
        direction: Direction,
        rsi: impl Into<Option<f64>>,
    ) -> Self {
        Self {
            timestamp,
            symbol: symbol.to_string(),
            direction,
            rsi: rsi.into(),
        }
    }
}

/// Layouts accepted for naive timestamps, tried in order.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Parse a log timestamp.
///
/// Offset-qualified values are normalized to UTC and then treated as naive,
/// so rows from mixed producers still order correctly.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc).naive_utc());
    }

    for format in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt);
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Sort newest first. Stable, so equal timestamps keep their file order.
pub fn sort_newest_first(records: &mut [SignalRecord]) {
    records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").unwrap()
    }

    #[test]
    fn test_direction_parse() {
        assert_eq!(Direction::parse("BUY"), Direction::Buy);
        assert_eq!(Direction::parse("SELL"), Direction::Sell);
        assert_eq!(Direction::parse("buy"), Direction::Other("buy".to_string()));
        assert_eq!(Direction::parse("HOLD").as_str(), "HOLD");
    }

    #[test]
    fn test_direction_serializes_as_plain_string() {
        let json = serde_json::to_string(&Direction::Other("HOLD".into())).unwrap();
        assert_eq!(json, "\"HOLD\"");
        assert_eq!(serde_json::to_string(&Direction::Buy).unwrap(), "\"BUY\"");
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = ts("2024-01-01T00:05:00");
        assert_eq!(parse_timestamp("2024-01-01T00:05:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-01 00:05:00"), Some(expected));
        assert_eq!(parse_timestamp(" 2024-01-01 00:05 "), Some(expected));
        assert_eq!(parse_timestamp("2024-01-01T02:05:00+02:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-01T00:05:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-01"), Some(ts("2024-01-01T00:00:00")));

        let fractional = parse_timestamp("2024-01-01 00:05:00.250000").unwrap();
        assert!(fractional > expected);
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("yesterday"), None);
        assert_eq!(parse_timestamp("2024-13-01 00:00:00"), None);
    }

    #[test]
    fn test_sort_newest_first_keeps_ties_adjacent() {
        let mut records = vec![
            SignalRecord::new(ts("2024-01-01T00:00:00"), "A", Direction::Buy, 10.0),
            SignalRecord::new(ts("2024-01-01T00:05:00"), "B", Direction::Sell, 20.0),
            SignalRecord::new(ts("2024-01-01T00:01:00"), "C", Direction::Buy, 30.0),
            SignalRecord::new(ts("2024-01-01T00:05:00"), "D", Direction::Buy, 40.0),
        ];
        sort_newest_first(&mut records);

        let symbols: Vec<&str> = records.iter().map(|r| r.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["B", "D", "C", "A"]);
        assert!(records.windows(2).all(|w| w[0].timestamp >= w[1].timestamp));
    }
}
