//! Full-resolution session log
//!
//! Every decoded sample is appended here as a row of its group. Nothing is
//! written out until the session ends, when [`SampleLog::flush`] hands each
//! non-empty group to a [`SampleSink`] once.

use crate::sink::SampleSink;
use crate::types::{DaqError, Group, LogRow, Result, Sample};

/// Append-only rows for both measurement groups
#[derive(Debug, Clone, Default)]
pub struct SampleLog {
    thrust_pressure: Vec<LogRow>,
    temperature: Vec<LogRow>,
}

impl SampleLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a sample in its group's sequence
    pub fn append(&mut self, sample: &Sample) {
        let row = sample.log_row();
        match sample.group {
            Group::ThrustPressure => self.thrust_pressure.push(row),
            Group::Temperature => self.temperature.push(row),
        }
    }

    /// Rows of one group in arrival order
    pub fn rows(&self, group: Group) -> &[LogRow] {
        match group {
            Group::ThrustPressure => &self.thrust_pressure,
            Group::Temperature => &self.temperature,
        }
    }

    pub fn len(&self, group: Group) -> usize {
        self.rows(group).len()
    }

    pub fn total_rows(&self) -> usize {
        self.thrust_pressure.len() + self.temperature.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total_rows() == 0
    }

    /// Write each non-empty group to the sink under one timestamp tag
    ///
    /// Stops at the first failing group. The log itself is left untouched so a
    /// failed flush can be retried.
    pub fn flush(&self, sink: &mut dyn SampleSink, timestamp_tag: &str) -> Result<()> {
        for group in Group::ALL {
            let rows = self.rows(group);
            if rows.is_empty() {
                log::debug!("No {} rows to store", group);
                continue;
            }
            sink.write_rows(group, rows, timestamp_tag)
                .map_err(|e| DaqError::Flush {
                    group,
                    source: Box::new(e),
                })?;
        }
        Ok(())
    }
}
