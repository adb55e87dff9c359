// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-sensor-logger project and is licensed under the
// SCTG Development Non-Commercial License v1.0.

//! Excel workbook storage sink
//!
//! One worksheet, header row in bold italic red centred text, one centred
//! row per record. The workbook is written to disk when the sink is closed.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::debug;
use rust_xlsxwriter::{Color, Format, FormatAlign, Workbook, Worksheet};

use super::{ensure_parent_dir, RecordSink};
use crate::acquisition::Record;
use crate::config::{ChannelConfig, StorageConfig};

/// Highest row index an xlsx worksheet accepts
const MAX_ROW: u32 = 1_048_575;

/// Workbook storage sink
///
/// Rows are kept in memory and only reach the disk when [`RecordSink::close`]
/// saves the workbook. If the process is killed before that, every row of the
/// session is lost. The CSV sink only holds back its write buffer.
pub struct XlsxSink {
    path: PathBuf,
    workbook: Workbook,
    worksheet: Option<Worksheet>,
    cell_format: Format,
    /// Next row to write; row 0 holds the header
    next_row: u32,
}

impl XlsxSink {
    pub fn create(config: &StorageConfig, channels: &[ChannelConfig]) -> Result<Self> {
        let path = PathBuf::from(&config.output_path);
        ensure_parent_dir(&path)?;

        let header_format = Format::new()
            .set_bold()
            .set_italic()
            .set_font_color(Color::Red)
            .set_align(FormatAlign::Center);
        let cell_format = Format::new().set_align(FormatAlign::Center);

        let mut worksheet = Worksheet::new();
        worksheet
            .set_name(&config.worksheet_name)
            .with_context(|| format!("Invalid worksheet name {:?}", config.worksheet_name))?;
        worksheet.set_tab_color(Color::Red);

        worksheet.write_string_with_format(0, 0, &config.time_label, &header_format)?;
        for (index, channel) in channels.iter().enumerate() {
            let column = u16::try_from(index + 1).context("Too many channels for a worksheet")?;
            worksheet.write_string_with_format(0, column, channel.header_label(), &header_format)?;
        }

        debug!(
            "Workbook prepared for {:?}, worksheet {:?} with {} channels",
            path,
            config.worksheet_name,
            channels.len()
        );

        Ok(Self {
            path,
            workbook: Workbook::new(),
            worksheet: Some(worksheet),
            cell_format,
            next_row: 1,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of data rows written
    pub fn rows(&self) -> u32 {
        self.next_row - 1
    }
}

impl RecordSink for XlsxSink {
    fn name(&self) -> &'static str {
        "xlsx"
    }

    fn accept(&mut self, record: &Record) -> Result<()> {
        let worksheet = self
            .worksheet
            .as_mut()
            .context("Workbook already closed")?;
        if self.next_row > MAX_ROW {
            anyhow::bail!("Worksheet is full ({} rows)", MAX_ROW);
        }

        let row = self.next_row;
        worksheet.write_number_with_format(row, 0, record.timestamp_secs(), &self.cell_format)?;
        for (index, value) in record.values().values().iter().enumerate() {
            let column = u16::try_from(index + 1).context("Too many channels for a worksheet")?;
            worksheet.write_number_with_format(row, column, *value, &self.cell_format)?;
        }

        self.next_row += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if let Some(worksheet) = self.worksheet.take() {
            self.workbook.push_worksheet(worksheet);
            self.workbook
                .save(&self.path)
                .with_context(|| format!("Failed to save workbook to {:?}", self.path))?;
            debug!("Workbook saved to {:?} with {} rows", self.path, self.rows());
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

    fn channels() -> Vec<ChannelConfig> {
        vec![
            ChannelConfig::new("Load Cell 1", "N"),
            ChannelConfig::new("Load Cell 2", "N"),
        ]
    }

    #[test]
    fn test_workbook_written_on_close() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("results/experiment.xlsx");
        let config = StorageConfig {
            output_path: path.to_string_lossy().to_string(),
            ..StorageConfig::default()
        };

        let mut sink = XlsxSink::create(&config, &channels()).unwrap();
        for i in 0..3u64 {
            let record = Record::new(
                i,
                Duration::from_secs(i + 1),
                SampleSet::new(vec![100.0, 50.0]),
            );
            sink.accept(&record).unwrap();
        }
        assert!(!path.exists());

        sink.close().unwrap();
        assert!(path.exists());
        assert_eq!(sink.rows(), 3);

        // Workbooks are zip archives
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..2], b"PK");
    }

    #[test]
    fn test_rows_lost_without_close() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("killed.xlsx");
        let config = StorageConfig {
            output_path: path.to_string_lossy().to_string(),
            ..StorageConfig::default()
        };

        let mut sink = XlsxSink::create(&config, &channels()).unwrap();
        let record = Record::new(0, Duration::from_secs(1), SampleSet::new(vec![1.0, 2.0]));
        sink.accept(&record).unwrap();
        drop(sink);

        assert!(!path.exists());
    }

    #[test]
    fn test_second_close_is_noop_and_accept_fails() {
        let dir = tempdir().unwrap();
        let config = StorageConfig {
            output_path: dir.path().join("run.xlsx").to_string_lossy().to_string(),
            ..StorageConfig::default()
        };
        let mut sink = XlsxSink::create(&config, &channels()).unwrap();

        sink.close().unwrap();
        sink.close().unwrap();
        let record = Record::new(0, Duration::ZERO, SampleSet::new(vec![1.0, 2.0]));
        assert!(sink.accept(&record).is_err());
    }

    #[test]
    fn test_invalid_worksheet_name_rejected() {
        let dir = tempdir().unwrap();
        let config = StorageConfig {
            output_path: dir.path().join("run.xlsx").to_string_lossy().to_string(),
            worksheet_name: "bad[name]".to_string(),
            ..StorageConfig::default()
        };
        assert!(XlsxSink::create(&config, &channels()).is_err());
    }
}
