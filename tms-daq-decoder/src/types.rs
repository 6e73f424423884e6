//! Core types for the TMS DAQ decoder library
//!
//! This module defines the values that flow through the acquisition pipeline:
//! measurement groups, the four logical channels, decoded samples and the rows
//! accumulated for the session log.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Result type for decoder operations
pub type Result<T> = std::result::Result<T, DaqError>;

/// Newtons per gram-force, as applied by the device firmware's load cell output
const THRUST_SCALE: f64 = 9.8 / 1000.0;

/// Measurement group carried by a frame's tag byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Group {
    /// Tag 0x00: load cell thrust and pressure transducer
    ThrustPressure,
    /// Tag 0xFF: two thermocouples
    Temperature,
}

impl Group {
    /// Both groups, in log flush order
    pub const ALL: [Group; 2] = [Group::ThrustPressure, Group::Temperature];

    /// Wire tag byte for this group
    pub fn tag(self) -> u8 {
        match self {
            Group::ThrustPressure => 0x00,
            Group::Temperature => 0xFF,
        }
    }

    /// Map a tag byte to its group, `None` for anything unrecognized
    pub fn from_tag(tag: u8) -> Option<Group> {
        match tag {
            0x00 => Some(Group::ThrustPressure),
            0xFF => Some(Group::Temperature),
            _ => None,
        }
    }

    /// Descriptive suffix used when naming flushed artifacts
    pub fn name(self) -> &'static str {
        match self {
            Group::ThrustPressure => "thrust_pressure",
            Group::Temperature => "temperature",
        }
    }

    /// Column header for this group's log rows
    pub fn header(self) -> [&'static str; 3] {
        match self {
            Group::ThrustPressure => ["Time", "Thrust", "Pressure"],
            Group::Temperature => ["Time", "Temp1", "Temp2"],
        }
    }

    /// The two channels carried by `value_a` and `value_b`
    pub fn channels(self) -> [Channel; 2] {
        match self {
            Group::ThrustPressure => [Channel::Thrust, Channel::Pressure],
            Group::Temperature => [Channel::Temp1, Channel::Temp2],
        }
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One of the four scalar measurements tracked live
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Channel {
    Thrust,
    Pressure,
    Temp1,
    Temp2,
}

impl Channel {
    /// Number of live channels
    pub const COUNT: usize = 4;

    /// All channels in slot order
    pub const ALL: [Channel; Channel::COUNT] =
        [Channel::Thrust, Channel::Pressure, Channel::Temp1, Channel::Temp2];

    /// Slot index in the latest-value table and history rings
    pub fn index(self) -> usize {
        match self {
            Channel::Thrust => 0,
            Channel::Pressure => 1,
            Channel::Temp1 => 2,
            Channel::Temp2 => 3,
        }
    }

    /// Display label including the unit, e.g. "Thrust (N)"
    pub fn label(self) -> &'static str {
        match self {
            Channel::Thrust => "Thrust (N)",
            Channel::Pressure => "Pressure (barg)",
            Channel::Temp1 => "Temp1 (degC)",
            Channel::Temp2 => "Temp2 (degC)",
        }
    }

    /// Sensor designation on the test stand
    pub fn sensor_tag(self) -> &'static str {
        match self {
            Channel::Thrust => "Thrust",
            Channel::Pressure => "PT01",
            Channel::Temp1 => "TT01",
            Channel::Temp2 => "TT02",
        }
    }

    /// Engineering unit
    pub fn unit(self) -> &'static str {
        match self {
            Channel::Thrust => "N",
            Channel::Pressure => "bar",
            Channel::Temp1 | Channel::Temp2 => "degC",
        }
    }

    /// Nominal display range (min, max) for a consumer's axis
    pub fn display_range(self) -> (f64, f64) {
        match self {
            Channel::Thrust => (0.0, 300.0),
            Channel::Pressure => (-20.0, 50.0),
            Channel::Temp1 => (0.0, 1800.0),
            Channel::Temp2 => (0.0, 800.0),
        }
    }

    /// Group this channel belongs to
    pub fn group(self) -> Group {
        match self {
            Channel::Thrust | Channel::Pressure => Group::ThrustPressure,
            Channel::Temp1 | Channel::Temp2 => Group::Temperature,
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A decoded frame, as sent by the device
///
/// `value_a` and `value_b` are the raw wire floats; unit conversion happens in
/// [`Sample::channel_values`] and [`Sample::log_row`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub group: Group,
    /// Device uptime in milliseconds
    pub timestamp_ms: u32,
    pub value_a: f32,
    pub value_b: f32,
}

impl Sample {
    /// Device timestamp in seconds
    pub fn timestamp_s(&self) -> f64 {
        f64::from(self.timestamp_ms) / 1000.0
    }

    /// Physical values for the group's two channels, in engineering units
    pub fn channel_values(&self) -> [(Channel, f64); 2] {
        let [first, second] = self.group.channels();
        let a = f64::from(self.value_a);
        let b = f64::from(self.value_b);
        match self.group {
            Group::ThrustPressure => [(first, a * THRUST_SCALE), (second, b)],
            Group::Temperature => [(first, a), (second, b)],
        }
    }

    /// Project this sample onto a session log row
    pub fn log_row(&self) -> LogRow {
        let [(_, value_a), (_, value_b)] = self.channel_values();
        LogRow {
            time_s: self.timestamp_s(),
            value_a,
            value_b,
        }
    }
}

impl fmt::Display for Sample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [(a_ch, a), (b_ch, b)] = self.channel_values();
        write!(
            f,
            "t={:.3} s, {}={} {}, {}={} {}",
            self.timestamp_s(),
            a_ch.sensor_tag(),
            a,
            a_ch.unit(),
            b_ch.sensor_tag(),
            b,
            b_ch.unit()
        )
    }
}

/// One row of the session log: `(time, value_a, value_b)` in engineering units
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LogRow {
    pub time_s: f64,
    pub value_a: f64,
    pub value_b: f64,
}

/// Errors that can occur during acquisition
#[derive(Debug, thiserror::Error)]
pub enum DaqError {
    #[error("Failed to connect to byte source: {0}")]
    Connection(String),

    #[error("Byte source reached end of stream")]
    StreamClosed,

    #[error("Read timed out")]
    Timeout,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cannot {operation} while engine is {state}")]
    InvalidState {
        operation: &'static str,
        state: crate::engine::EngineState,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to flush {group} log: {source}")]
    Flush {
        group: Group,
        #[source]
        source: Box<DaqError>,
    },

    #[error("Acquisition thread panicked")]
    ThreadPanicked,

    #[error("Stop requested before the first sample arrived")]
    StartAborted,
}

impl DaqError {
    /// True for errors that end the acquisition loop
    pub fn is_terminal(&self) -> bool {
        !matches!(self, DaqError::Timeout)
    }
}
