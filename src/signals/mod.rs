//! Signal log model: reading, filtering, aggregating, and alerting.

pub mod alert;
pub mod filter;
pub mod log;
pub mod record;
pub mod view;

pub use alert::{AlertState, ALERT_SOUND_URL};
pub use filter::{DirectionFilter, FilterState, FilterUpdate, SymbolSelection};
pub use log::{load_signals, parse_signals, LoadOutcome, QuarantinedRow, SignalBatch, SignalLogError};
pub use record::{Direction, SignalRecord};
pub use view::{ChartBucket, SignalSummary, SignalView};
