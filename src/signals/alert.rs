//! New-signal detection for the audible alert.

use chrono::NaiveDateTime;

/// Sound played by the browser when a new signal arrives.
pub const ALERT_SOUND_URL: &str = "https://www.soundjay.com/button/beep-07.wav";

/// Remembers the newest timestamp seen while alerting was enabled.
#[derive(Debug, Clone, Default)]
pub struct AlertState {
    last_seen: Option<NaiveDateTime>,
}

impl AlertState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_seen(&self) -> Option<NaiveDateTime> {
        self.last_seen
    }

    /// Feed the newest unfiltered timestamp of a cycle. Returns `true` when
    /// an alert should fire.
    ///
    /// The first observation only primes the state. While alerting is
    /// disabled nothing is remembered, so re-enabling it alerts on whatever
    /// arrived in the meantime.
    pub fn observe(&mut self, latest: Option<NaiveDateTime>, enabled: bool) -> bool {
        let Some(latest) = latest else {
            return false;
        };
        if !enabled {
            return false;
        }

        match self.last_seen {
            None => {
                self.last_seen = Some(latest);
                false
            }
            Some(prev) if prev != latest => {
                self.last_seen = Some(latest);
                true
            }
            Some(_) => false,
        }
    }
}
