// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-sensor-logger project and is licensed under the
// SCTG Development Non-Commercial License v1.0.

//! Record sinks
//!
//! Every completed [`Record`] is handed to each configured sink in turn:
//! the storage table first, then the live gauge. Sinks are closed once, in
//! the same order, when the session ends.

pub mod csv;
pub mod gauge;
pub mod xlsx;

use anyhow::Result;
use log::info;

use crate::acquisition::Record;
use crate::config::{Config, StorageFormat};

pub use self::csv::CsvSink;
pub use gauge::GaugeSink;
pub use xlsx::XlsxSink;

/// Consumer of completed records
#[cfg_attr(test, mockall::automock)]
pub trait RecordSink: Send {
    /// Short name used in logs and errors
    fn name(&self) -> &'static str;

    /// Take one record
    fn accept(&mut self, record: &Record) -> Result<()>;

    /// Flush and release resources; called exactly once
    fn close(&mut self) -> Result<()>;
}

/// Build the sinks selected by the configuration
///
/// The storage sink is always present and comes first.
pub fn create_sinks(config: &Config) -> Result<Vec<Box<dyn RecordSink>>> {
    let mut sinks: Vec<Box<dyn RecordSink>> = Vec::with_capacity(2);

    match config.storage.format {
        StorageFormat::Xlsx => sinks.push(Box::new(XlsxSink::create(
            &config.storage,
            &config.acquisition.channels,
        )?)),
        StorageFormat::Csv => sinks.push(Box::new(CsvSink::create(
            &config.storage,
            &config.acquisition.channels,
        )?)),
    }
    info!(
        "Recording to {} ({:?})",
        config.storage.output_path, config.storage.format
    );

    if config.display.enabled {
        let channel = config.acquisition.channels.first();
        sinks.push(Box::new(GaugeSink::new(&config.display, channel)));
    }

    Ok(sinks)
}

/// Create the parent directory of an output file if needed
pub(crate) fn ensure_parent_dir(path: &std::path::Path) -> Result<()> {
    use anyhow::Context;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create output directory {:?}", parent))?;
        }
    }
    Ok(())
}
