//! Acquisition configuration types
//!
//! Everything an acquisition session needs is carried in an explicit
//! [`AcquisitionConfig`] value handed to the engine, so independent sessions
//! (and tests) never share process-wide settings.

use crate::types::{DaqError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for an acquisition session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcquisitionConfig {
    /// Number of points kept per channel in the history rings
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,

    /// Time to wait after the source opens before discarding stale input
    #[serde(default = "default_settle_delay")]
    pub settle_delay_ms: u64,

    /// Echo every decoded sample at info level
    #[serde(default = "default_true")]
    pub terminal_log: bool,

    /// Directory that receives the session log at shutdown
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
}

fn default_history_capacity() -> usize {
    50
}

// The board resets when the port opens; give it a second before listening.
fn default_settle_delay() -> u64 {
    1000
}

fn default_true() -> bool {
    true
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("./log")
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            history_capacity: default_history_capacity(),
            settle_delay_ms: default_settle_delay(),
            terminal_log: default_true(),
            log_dir: default_log_dir(),
        }
    }
}

impl AcquisitionConfig {
    /// Create a new configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: set the history ring capacity
    pub fn with_history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = capacity;
        self
    }

    /// Builder method: set the settle delay before the input buffer reset
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay_ms = delay.as_millis() as u64;
        self
    }

    /// Builder method: enable or disable per-sample echo
    pub fn with_terminal_log(mut self, enabled: bool) -> Self {
        self.terminal_log = enabled;
        self
    }

    /// Builder method: set the log output directory
    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = dir.into();
        self
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.history_capacity == 0 {
            return Err(DaqError::Config(
                "history_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AcquisitionConfig::new();
        assert_eq!(config.history_capacity, 50);
        assert_eq!(config.settle_delay(), Duration::from_secs(1));
        assert!(config.terminal_log);
        assert_eq!(config.log_dir, PathBuf::from("./log"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = AcquisitionConfig::new()
            .with_history_capacity(8)
            .with_settle_delay(Duration::ZERO)
            .with_terminal_log(false)
            .with_log_dir("/tmp/daq");

        assert_eq!(config.history_capacity, 8);
        assert_eq!(config.settle_delay_ms, 0);
        assert!(!config.terminal_log);
        assert_eq!(config.log_dir, PathBuf::from("/tmp/daq"));
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let config = AcquisitionConfig::new().with_history_capacity(0);
        assert!(matches!(config.validate(), Err(DaqError::Config(_))));
    }
}
