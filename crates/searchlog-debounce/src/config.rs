use searchlog_core::{SearchlogError, SearchlogResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

/// What the scheduler does when a flush cycle outlasts the interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TickPolicy {
    /// Fixed wall-clock grid. Ticks that fall inside a running cycle are dropped.
    #[default]
    Skip,
    /// Start the next cycle one interval after the previous one completes.
    FixedGap,
}

/// Debounce window and flush cadence.
///
/// Fixed for the life of the process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebounceConfig {
    /// Quiet time after a session's last event before it may be flushed.
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
    /// Time between flush cycles.
    #[serde(default = "default_flush_interval_ms")]
    pub flush_interval_ms: u64,
    /// Behaviour when a cycle overruns the interval.
    #[serde(default)]
    pub tick_policy: TickPolicy,
}

fn default_window_secs() -> u64 {
    3
}
fn default_flush_interval_ms() -> u64 {
    1000
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self {
            window_secs: default_window_secs(),
            flush_interval_ms: default_flush_interval_ms(),
            tick_policy: TickPolicy::default(),
        }
    }
}

impl DebounceConfig {
    /// The debounce window as a [`Duration`].
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    /// The flush cadence as a [`Duration`].
    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }

    /// Reject zero durations. An interval that is not well below the window
    /// is allowed but logged, since every skipped tick then costs a full window.
    pub fn validate(&self) -> SearchlogResult<()> {
        if self.window_secs == 0 {
            return Err(SearchlogError::Config(
                "debounce.window_secs must be greater than zero".into(),
            ));
        }
        if self.flush_interval_ms == 0 {
            return Err(SearchlogError::Config(
                "debounce.flush_interval_ms must be greater than zero".into(),
            ));
        }
        if self.flush_interval() >= self.window() {
            warn!(
                window_secs = self.window_secs,
                flush_interval_ms = self.flush_interval_ms,
                "Flush interval is not smaller than the debounce window"
            );
        }
        Ok(())
    }
}
