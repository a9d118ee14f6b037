//! Auto-save bookkeeping.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Counter and timestamp driving periodic auto-save checkpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutosaveState {
    /// Edits since the last checkpoint.
    #[serde(default)]
    pub operation_count: u32,
    /// When the last checkpoint was taken.
    #[serde(default)]
    pub last_autosave: Option<DateTime<Utc>>,
}

impl AutosaveState {
    /// Counts one edit. Returns `true` when a checkpoint was taken.
    ///
    /// A checkpoint is due after `every` edits, after `interval` has passed
    /// since the previous one, or when none was ever taken.
    pub fn record(&mut self, now: DateTime<Utc>, every: u32, interval: Duration) -> bool {
        self.operation_count += 1;
        let due = match self.last_autosave {
            _ if self.operation_count >= every => true,
            Some(last) => now - last >= interval,
            None => true,
        };
        if due {
            self.operation_count = 0;
            self.last_autosave = Some(now);
        }
        due
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_edit_checkpoints() {
        let mut state = AutosaveState::default();
        assert!(state.record(Utc::now(), 10, Duration::seconds(30)));
        assert_eq!(state.operation_count, 0);
    }

    #[test]
    fn test_count_and_interval_thresholds() {
        let start = Utc::now();
        let mut state = AutosaveState {
            operation_count: 0,
            last_autosave: Some(start),
        };
        for _ in 0..9 {
            assert!(!state.record(start, 10, Duration::seconds(30)));
        }
        assert!(state.record(start, 10, Duration::seconds(30)));

        assert!(!state.record(start + Duration::seconds(5), 10, Duration::seconds(30)));
        assert!(state.record(start + Duration::seconds(31), 10, Duration::seconds(30)));
    }
}
