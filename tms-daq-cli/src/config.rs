//! Configuration loading and parsing

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tms_daq_decoder::AcquisitionConfig;

/// Main application configuration (loaded from tms-daq.toml)
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub acquisition: AcquisitionConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where the frame stream comes from
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SourceConfig {
    Serial {
        #[serde(default = "default_port")]
        port: String,
        #[serde(default = "default_baud_rate")]
        baud_rate: u32,
        #[serde(default = "default_timeout")]
        timeout_ms: u64,
    },
    /// Replay a captured byte stream
    File { path: PathBuf },
}

impl Default for SourceConfig {
    fn default() -> Self {
        SourceConfig::Serial {
            port: default_port(),
            baud_rate: default_baud_rate(),
            timeout_ms: default_timeout(),
        }
    }
}

fn default_port() -> String {
    "COM7".to_string()
}

fn default_baud_rate() -> u32 {
    115_200
}

fn default_timeout() -> u64 {
    4000
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DisplayConfig {
    /// Refresh rate of the live readout
    #[serde(default = "default_poll_rate")]
    pub poll_rate_hz: u32,
    /// Stop automatically after this many seconds
    #[serde(default)]
    pub duration_secs: Option<u64>,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            poll_rate_hz: default_poll_rate(),
            duration_secs: None,
        }
    }
}

fn default_poll_rate() -> u32 {
    60
}

impl DisplayConfig {
    pub fn poll_period(&self) -> Duration {
        Duration::from_millis(1000 / u64::from(self.poll_rate_hz.max(1)))
    }

    pub fn duration(&self) -> Option<Duration> {
        self.duration_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Verbosity level: 0 = info, 1 = debug, 2+ = trace
    #[serde(default)]
    pub verbose: u8,
    /// Suppress all output except errors
    #[serde(default)]
    pub quiet: bool,
}

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    parse_config(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
}

/// Load configuration, falling back to defaults when the file does not exist
pub fn load_config_or_default(path: &Path) -> Result<AppConfig> {
    if path.exists() {
        load_config(path)
    } else {
        Ok(AppConfig::default())
    }
}

fn parse_config(content: &str) -> Result<AppConfig> {
    let config: AppConfig = toml::from_str(content)?;
    config.acquisition.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_deserialization() {
        let toml_content = r#"
            [source]
            kind = "serial"
            port = "/dev/ttyACM0"

            [acquisition]
            history_capacity = 100
            terminal_log = false
            log_dir = "/var/log/tms"

            [display]
            poll_rate_hz = 30
            duration_secs = 120
        "#;

        let config = parse_config(toml_content).unwrap();
        match &config.source {
            SourceConfig::Serial { port, baud_rate, timeout_ms } => {
                assert_eq!(port, "/dev/ttyACM0");
                assert_eq!(*baud_rate, 115_200);
                assert_eq!(*timeout_ms, 4000);
            }
            other => panic!("unexpected source {:?}", other),
        }
        assert_eq!(config.acquisition.history_capacity, 100);
        assert_eq!(config.acquisition.settle_delay_ms, 1000);
        assert!(!config.acquisition.terminal_log);
        assert_eq!(config.display.poll_period(), Duration::from_millis(33));
        assert_eq!(config.display.duration(), Some(Duration::from_secs(120)));
    }

    #[test]
    fn test_file_source() {
        let config = parse_config("[source]\nkind = \"file\"\npath = \"capture.bin\"\n").unwrap();
        assert!(matches!(config.source, SourceConfig::File { ref path } if path == Path::new("capture.bin")));
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = parse_config("").unwrap();
        assert!(matches!(config.source, SourceConfig::Serial { .. }));
        assert_eq!(config.acquisition.history_capacity, 50);
        assert_eq!(config.display.poll_rate_hz, 60);
        assert_eq!(config.logging.verbose, 0);
    }

    #[test]
    fn test_example_config_parses() {
        let config = parse_config(include_str!("../tms-daq.toml.example")).unwrap();
        assert!(matches!(config.source, SourceConfig::Serial { ref port, .. } if port == "COM7"));
        assert_eq!(config.acquisition.log_dir, PathBuf::from("./log"));
        assert_eq!(config.display.duration(), None);
    }

    #[test]
    fn test_invalid_capacity_rejected() {
        assert!(parse_config("[acquisition]\nhistory_capacity = 0\n").is_err());
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let config = load_config_or_default(&tmp.path().join("absent.toml")).unwrap();
        assert_eq!(config.display.poll_rate_hz, 60);

        let path = tmp.path().join("broken.toml");
        fs::write(&path, "[display\n").unwrap();
        assert!(load_config_or_default(&path).is_err());
    }
}
