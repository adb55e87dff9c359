// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-sensor-logger project and is licensed under the
// SCTG Development Non-Commercial License v1.0.

//! CSV storage sink

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::debug;

use super::{ensure_parent_dir, RecordSink};
use crate::acquisition::Record;
use crate::config::{ChannelConfig, StorageConfig};

/// Writes one row per record to a CSV file
///
/// The header row is written on creation. Rows are buffered and flushed on
/// close.
pub struct CsvSink {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
    rows: u64,
}

impl CsvSink {
    pub fn create(config: &StorageConfig, channels: &[ChannelConfig]) -> Result<Self> {
        let path = PathBuf::from(&config.output_path);
        ensure_parent_dir(&path)?;

        let file = File::create(&path)
            .with_context(|| format!("Failed to create CSV file at {:?}", path))?;
        let mut writer = BufWriter::new(file);

        let header = std::iter::once(config.time_label.clone())
            .chain(channels.iter().map(ChannelConfig::header_label))
            .map(|label| escape(&label))
            .collect::<Vec<_>>()
            .join(",");
        writeln!(writer, "{}", header)
            .with_context(|| format!("Failed to write CSV header to {:?}", path))?;

        debug!("CSV sink ready at {:?}", path);
        Ok(Self {
            path,
            writer: Some(writer),
            rows: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn rows(&self) -> u64 {
        self.rows
    }
}

/// Quote a field if it contains a separator, a quote or a line break
fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

impl RecordSink for CsvSink {
    fn name(&self) -> &'static str {
        "csv"
    }

    fn accept(&mut self, record: &Record) -> Result<()> {
        let writer = self
            .writer
            .as_mut()
            .context("CSV sink already closed")?;

        write!(writer, "{}", record.timestamp_secs())?;
        for value in record.values().values() {
            write!(writer, ",{}", value)?;
        }
        writeln!(writer)?;

        self.rows += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer
                .flush()
                .with_context(|| format!("Failed to flush CSV file {:?}", self.path))?;
            debug!("CSV sink closed after {} rows", self.rows);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquisition::SampleSet;
    use std::time::Duration;
    use tempfile::tempdir;

    #[test]
    fn test_header_and_rows() {
        let dir = tempdir().unwrap();
        let config = StorageConfig {
            output_path: dir.path().join("nested/run.csv").to_string_lossy().to_string(),
            ..StorageConfig::default()
        };
        let channels = vec![
            ChannelConfig::new("Load Cell 1", "N"),
            ChannelConfig::new("Force, axial", "N"),
        ];

        let mut sink = CsvSink::create(&config, &channels).unwrap();
        sink.accept(&Record::new(
            0,
            Duration::from_millis(1500),
            SampleSet::new(vec![5.0, 3.25]),
        ))
        .unwrap();
        sink.close().unwrap();
        sink.close().unwrap();

        let contents = std::fs::read_to_string(sink.path()).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(
            lines,
            vec!["Time (s),Load Cell 1 (N),\"Force, axial (N)\"", "1.5,5,3.25"]
        );
        assert_eq!(sink.rows(), 1);
    }

    #[test]
    fn test_accept_after_close_fails() {
        let dir = tempdir().unwrap();
        let config = StorageConfig {
            output_path: dir.path().join("run.csv").to_string_lossy().to_string(),
            ..StorageConfig::default()
        };
        let mut sink = CsvSink::create(&config, &[ChannelConfig::new("A", "V")]).unwrap();
        sink.close().unwrap();

        let record = Record::new(0, Duration::ZERO, SampleSet::new(vec![1.0]));
        assert!(sink.accept(&record).is_err());
    }
}
