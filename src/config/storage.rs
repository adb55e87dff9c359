// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-sensor-logger project and is licensed under the
// SCTG Development Non-Commercial License v1.0.

//! Record storage configuration

use serde::{Deserialize, Serialize};

/// File format of the stored table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageFormat {
    /// Excel workbook with a single worksheet
    #[default]
    Xlsx,
    /// Comma separated values
    Csv,
}

/// Configuration of the storage sink.
///
/// The table has one time column followed by one column per channel. The
/// header row is written when the sink is created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Destination file. Parent directories are created if missing.
    pub output_path: String,

    #[serde(default)]
    pub format: StorageFormat,

    /// Header of the time column.
    #[serde(default = "default_time_label")]
    pub time_label: String,

    /// Worksheet name, xlsx only.
    #[serde(default = "default_worksheet_name")]
    pub worksheet_name: String,
}

fn default_time_label() -> String {
    "Time (s)".to_string()
}

fn default_worksheet_name() -> String {
    "Data".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            output_path: "experiment.xlsx".to_string(),
            format: StorageFormat::Xlsx,
            time_label: default_time_label(),
            worksheet_name: default_worksheet_name(),
        }
    }
}
