//! User-selected filters over the signal table.

use crate::signals::record::{Direction, SignalRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Which symbols the operator wants to see.
///
/// `All` is the unset state: it resolves to whatever symbols the current
/// cycle observed, so symbols appearing later are picked up automatically.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "symbols", rename_all = "lowercase")]
pub enum SymbolSelection {
    #[default]
    All,
    Only(BTreeSet<String>),
}

impl SymbolSelection {
    /// Build from a user's picks. An empty pick means "all".
    pub fn from_picks<I, S>(picks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let set: BTreeSet<String> = picks
            .into_iter()
            .map(Into::into)
            .filter(|s: &String| !s.trim().is_empty())
            .collect();
        if set.is_empty() {
            SymbolSelection::All
        } else {
            SymbolSelection::Only(set)
        }
    }

    /// Resolve to a concrete symbol set for one cycle.
    pub fn resolve(&self, observed: &BTreeSet<String>) -> BTreeSet<String> {
        match self {
            SymbolSelection::All => observed.clone(),
            SymbolSelection::Only(set) => set.clone(),
        }
    }

    pub fn is_selected(&self, symbol: &str) -> bool {
        match self {
            SymbolSelection::All => true,
            SymbolSelection::Only(set) => set.contains(symbol),
        }
    }
}

/// Direction dropdown value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DirectionFilter {
    #[default]
    All,
    #[serde(rename = "BUY")]
    Buy,
    #[serde(rename = "SELL")]
    Sell,
}

impl DirectionFilter {
    pub fn matches(&self, direction: &Direction) -> bool {
        match self {
            DirectionFilter::All => true,
            DirectionFilter::Buy => *direction == Direction::Buy,
            DirectionFilter::Sell => *direction == Direction::Sell,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DirectionFilter::All => "All",
            DirectionFilter::Buy => "BUY",
            DirectionFilter::Sell => "SELL",
        }
    }
}

impl std::fmt::Display for DirectionFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Filter controls for the dashboard session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterState {
    pub symbols: SymbolSelection,
    pub direction: DirectionFilter,
    /// Play a sound when a new signal tops the log
    pub alert_sound: bool,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            symbols: SymbolSelection::All,
            direction: DirectionFilter::All,
            alert_sound: true,
        }
    }
}

/// Partial update posted by the filter controls.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterUpdate {
    /// Symbol picks; an empty list resets to all symbols
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbols: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<DirectionFilter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alert_sound: Option<bool>,
}

impl FilterState {
    pub fn apply_update(&mut self, update: FilterUpdate) {
        if let Some(picks) = update.symbols {
            self.symbols = SymbolSelection::from_picks(picks);
        }
        if let Some(direction) = update.direction {
            self.direction = direction;
        }
        if let Some(alert_sound) = update.alert_sound {
            self.alert_sound = alert_sound;
        }
    }

    /// Keep the records passing both filters, preserving order.
    pub fn apply<'a>(
        &self,
        records: &'a [SignalRecord],
        resolved_symbols: &BTreeSet<String>,
    ) -> Vec<&'a SignalRecord> {
        records
            .iter()
            .filter(|r| resolved_symbols.contains(&r.symbol))
            .filter(|r| self.direction.matches(&r.direction))
            .collect()
    }
}

/// Distinct symbols present in `records`.
pub fn observed_symbols(records: &[SignalRecord]) -> BTreeSet<String> {
    records.iter().map(|r| r.symbol.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn record(minute: u32, symbol: &str, direction: Direction) -> SignalRecord {
        let ts = NaiveDateTime::parse_from_str(
            &format!("2024-01-01 00:{:02}:00", minute),
            "%Y-%m-%d %H:%M:%S",
        )
        .unwrap();
        SignalRecord::new(ts, symbol, direction, 50.0)
    }

    fn sample() -> Vec<SignalRecord> {
        vec![
            record(5, "R_100", Direction::Sell),
            record(4, "R_50", Direction::Buy),
            record(3, "R_100", Direction::Other("HOLD".into())),
            record(2, "R_25", Direction::Buy),
            record(1, "R_100", Direction::Buy),
        ]
    }

    #[test]
    fn test_empty_picks_mean_all() {
        assert_eq!(SymbolSelection::from_picks(Vec::<String>::new()), SymbolSelection::All);
        assert_eq!(SymbolSelection::from_picks(vec![" "]), SymbolSelection::All);
        assert!(matches!(
            SymbolSelection::from_picks(vec!["R_100"]),
            SymbolSelection::Only(_)
        ));
    }

    #[test]
    fn test_all_tracks_newly_observed_symbols() {
        let selection = SymbolSelection::All;
        let mut observed = observed_symbols(&sample());
        assert_eq!(selection.resolve(&observed).len(), 3);

        observed.insert("R_75".to_string());
        assert!(selection.resolve(&observed).contains("R_75"));
    }

    #[test]
    fn test_explicit_selection_does_not_grow() {
        let selection = SymbolSelection::from_picks(vec!["R_100"]);
        let mut observed = observed_symbols(&sample());
        observed.insert("R_75".to_string());

        let resolved = selection.resolve(&observed);
        assert_eq!(resolved.len(), 1);
        assert!(resolved.contains("R_100"));
    }

    #[test]
    fn test_direction_partitions_symbol_filtered_set() {
        let records = sample();
        let symbols = observed_symbols(&records);

        let mut state = FilterState::default();
        let all = state.apply(&records, &symbols);
        assert_eq!(all.len(), records.len());

        state.direction = DirectionFilter::Buy;
        let buys = state.apply(&records, &symbols);
        state.direction = DirectionFilter::Sell;
        let sells = state.apply(&records, &symbols);
        let others = all
            .iter()
            .filter(|r| matches!(r.direction, Direction::Other(_)))
            .count();

        assert_eq!(buys.len(), 3);
        assert_eq!(sells.len(), 1);
        assert_eq!(buys.len() + sells.len() + others, all.len());
        assert!(buys.iter().all(|b| !sells.iter().any(|s| std::ptr::eq(*b, *s))));
    }

    #[test]
    fn test_apply_preserves_order() {
        let records = sample();
        let state = FilterState {
            symbols: SymbolSelection::from_picks(vec!["R_100"]),
            ..Default::default()
        };
        let resolved = state.symbols.resolve(&observed_symbols(&records));
        let kept = state.apply(&records, &resolved);

        let minutes: Vec<String> = kept.iter().map(|r| r.timestamp.format("%M").to_string()).collect();
        assert_eq!(minutes, vec!["05", "03", "01"]);
    }

    #[test]
    fn test_apply_update() {
        let mut state = FilterState::default();
        state.apply_update(FilterUpdate {
            symbols: Some(vec!["R_50".into()]),
            direction: Some(DirectionFilter::Sell),
            alert_sound: None,
        });
        assert!(state.symbols.is_selected("R_50"));
        assert!(!state.symbols.is_selected("R_100"));
        assert_eq!(state.direction, DirectionFilter::Sell);
        assert!(state.alert_sound);

        state.apply_update(FilterUpdate {
            symbols: Some(vec![]),
            alert_sound: Some(false),
            ..Default::default()
        });
        assert_eq!(state.symbols, SymbolSelection::All);
        assert_eq!(state.direction, DirectionFilter::Sell);
        assert!(!state.alert_sound);
    }

    #[test]
    fn test_update_deserializes_from_controls() {
        let update: FilterUpdate =
            serde_json::from_str(r#"{"symbols":["R_100"],"direction":"BUY"}"#).unwrap();
        assert_eq!(update.direction, Some(DirectionFilter::Buy));
        assert_eq!(update.symbols.unwrap(), vec!["R_100".to_string()]);
        assert!(update.alert_sound.is_none());
    }
}
