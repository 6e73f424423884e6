//! Durable sinks for the session log
//!
//! A sink receives each group's rows once, at the end of a session. The CSV sink
//! writes one file per group named `<timestamp tag>_<group suffix>.csv`, with a
//! header row naming the group's columns.

use crate::types::{Group, LogRow, Result};
use std::fs;
use std::path::PathBuf;

/// Destination for flushed log rows
pub trait SampleSink: Send {
    /// Persist all rows of one group under the given timestamp tag
    fn write_rows(&mut self, group: Group, rows: &[LogRow], timestamp_tag: &str) -> Result<()>;
}

impl<K: SampleSink + ?Sized> SampleSink for Box<K> {
    fn write_rows(&mut self, group: Group, rows: &[LogRow], timestamp_tag: &str) -> Result<()> {
        (**self).write_rows(group, rows, timestamp_tag)
    }
}

/// Tag identifying one flush, local time as `YYYY_MM_DD_HHMMSS`
pub fn flush_timestamp_tag() -> String {
    chrono::Local::now().format("%Y_%m_%d_%H%M%S").to_string()
}

/// Writes each group to its own CSV file in a directory
#[derive(Debug, Clone)]
pub struct CsvSink {
    dir: PathBuf,
}

impl CsvSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// File that `write_rows` produces for a group and tag
    pub fn path_for(&self, group: Group, timestamp_tag: &str) -> PathBuf {
        self.dir
            .join(format!("{}_{}.csv", timestamp_tag, group.name()))
    }
}

impl SampleSink for CsvSink {
    fn write_rows(&mut self, group: Group, rows: &[LogRow], timestamp_tag: &str) -> Result<()> {
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir)?;
            log::info!("Created new directory {:?}", self.dir);
        }

        let path = self.path_for(group, timestamp_tag);
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(&path)?;

        writer.write_record(group.header())?;
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;

        log::info!("Successfully stored {} data ({} rows) in {:?}", group, rows.len(), path);
        Ok(())
    }
}
