//! Reading the headerless signal log.
//!
//! The log is written by an external producer, one `timestamp,symbol,direction,rsi`
//! row per line. It is only ever read here. Trailing columns may be missing:
//! a row without direction or RSI is still a signal. Only rows that cannot be
//! placed in time or attributed to a symbol are quarantined.

use crate::signals::record::{parse_timestamp, Direction, SignalRecord};
use csv::{ByteRecord, ReaderBuilder, Trim};
use serde::Serialize;
use std::io::ErrorKind;
use std::path::Path;
use thiserror::Error;
use tracing::warn;

/// Columns in a complete row.
pub const LOG_COLUMNS: usize = 4;

/// Timestamp and symbol are the least a row must carry.
pub const REQUIRED_COLUMNS: usize = 2;

// ============================================================================
// ERROR TYPES
// ============================================================================

/// Errors that prevent the log from being read at all.
///
/// A missing file is not an error; see [`LoadOutcome::Missing`].
#[derive(Debug, Error)]
pub enum SignalLogError {
    #[error("IO error reading signal log: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error reading signal log: {0}")]
    Csv(#[from] csv::Error),
}

pub type SignalLogResult<T> = Result<T, SignalLogError>;

// ============================================================================
// LOAD RESULTS
// ============================================================================

/// A row that could not be turned into a [`SignalRecord`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuarantinedRow {
    /// 1-based line number in the log
    pub line: u64,
    pub reason: String,
}

/// Parsed contents of the log, in file order.
#[derive(Debug, Clone, Default)]
pub struct SignalBatch {
    pub records: Vec<SignalRecord>,
    pub quarantined: Vec<QuarantinedRow>,
}

/// Outcome of one attempt to read the log.
#[derive(Debug, Clone)]
pub enum LoadOutcome {
    /// The file does not exist yet
    Missing,
    /// The file exists but holds no rows
    Empty,
    Loaded(SignalBatch),
}

// ============================================================================
// LOADING
// ============================================================================

/// Read and parse the log at `path`.
pub async fn load_signals(path: &Path) -> SignalLogResult<LoadOutcome> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(LoadOutcome::Missing),
        Err(e) => return Err(e.into()),
    };

    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(LoadOutcome::Empty);
    }

    let batch = parse_signals(&bytes)?;
    for row in &batch.quarantined {
        warn!("[LOG] Skipping line {} of {:?}: {}", row.line, path, row.reason);
    }

    Ok(LoadOutcome::Loaded(batch))
}

/// Parse raw log bytes. Malformed rows are quarantined rather than failing
/// the whole batch.
pub fn parse_signals(bytes: &[u8]) -> SignalLogResult<SignalBatch> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(bytes);

    let mut batch = SignalBatch::default();
    let mut raw = ByteRecord::new();

    loop {
        if !reader.read_byte_record(&mut raw)? {
            break;
        }
        let line = raw.position().map(|p| p.line()).unwrap_or(0);

        // Blank lines come through as a single empty field
        if raw.len() == 1 && raw[0].is_empty() {
            continue;
        }

        match parse_row(&raw) {
            Ok(record) => batch.records.push(record),
            Err(reason) => batch.quarantined.push(QuarantinedRow { line, reason }),
        }
    }

    Ok(batch)
}

fn parse_row(raw: &ByteRecord) -> Result<SignalRecord, String> {
    if raw.len() < REQUIRED_COLUMNS || raw.len() > LOG_COLUMNS {
        return Err(format!(
            "expected {} to {} columns, found {}",
            REQUIRED_COLUMNS,
            LOG_COLUMNS,
            raw.len()
        ));
    }

    // Missing trailing columns read as empty
    let field = |idx: usize| match raw.get(idx) {
        Some(bytes) => std::str::from_utf8(bytes)
            .map(str::trim)
            .map_err(|_| format!("column {} is not valid UTF-8", idx + 1)),
        None => Ok(""),
    };

    let timestamp_raw = field(0)?;
    let timestamp = parse_timestamp(timestamp_raw)
        .ok_or_else(|| format!("unparseable timestamp {:?}", timestamp_raw))?;

    let symbol = field(1)?;
    if symbol.is_empty() {
        return Err("empty symbol".to_string());
    }

    let direction = Direction::parse(field(2)?);

    let rsi: Option<f64> = field(3)?.parse().ok();

    Ok(SignalRecord::new(timestamp, symbol, direction, rsi))
}
