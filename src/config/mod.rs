// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-sensor-logger project and is licensed under the
// SCTG Development Non-Commercial License v1.0.

//! Configuration management for the sensor logger
//!
//! This module provides functionality for loading, validating, and applying
//! configuration settings. The configuration is backed by a YAML file and
//! validated against a JSON schema before it is deserialized.
//!
//! ## Configuration Structure
//!
//! - `serial`: Link to the acquisition device
//! - `acquisition`: Channels, timing window and polling
//! - `storage`: Output table
//! - `display`: Live gauge for the first channel
//!
//! ## Usage
//!
//! ```no_run
//! use rust_sensor_logger::config::Config;
//! use std::path::Path;
//!
//! // Load config from file, creates a default if not found
//! let mut config = Config::from_file(Path::new("config.yaml")).unwrap();
//!
//! // Apply command line overrides if needed
//! config.apply_args(
//!     Some("/dev/ttyUSB0".to_string()), // Serial port
//!     Some(9600),                       // Baud rate
//!     None,                             // Output file
//!     Some(30.0),                       // Timing window
//!     false,                            // Simulated device
//! );
//!
//! println!("Logging from {}", config.serial.port);
//! ```

pub mod acquisition;
pub mod display;
pub mod serial;
pub mod storage;
pub mod utils;

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{debug, error};
use serde::{Deserialize, Serialize};

pub use acquisition::{AcquisitionConfig, ChannelConfig, ElapsedMode};
pub use display::{DisplayConfig, OutOfRangePolicy};
pub use serial::SerialConfig;
pub use storage::{StorageConfig, StorageFormat};
pub use utils::{output_config_schema, validate_specific_rules};

/// Embedded JSON schema for the configuration file
pub(crate) const CONFIG_SCHEMA: &str = include_str!("../../resources/config.schema.json");

/// Root configuration structure.
///
/// Each section falls back to its defaults when absent from the file, so a
/// minimal configuration only names what differs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Link to the acquisition device.
    #[serde(default)]
    pub serial: SerialConfig,

    /// Channel list and timing parameters.
    #[serde(default)]
    pub acquisition: AcquisitionConfig,

    /// Output table settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Live gauge settings.
    #[serde(default)]
    pub display: DisplayConfig,
}

impl Config {
    /// Helper method to create a sample config file when validation fails
    fn create_sample_config<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        let sample_path = path.with_extension("sample.yaml");
        debug!("Original path: {:?}, Sample path: {:?}", path, sample_path);

        if let Some(parent) = sample_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                debug!("Creating parent directory: {:?}", parent);
                fs::create_dir_all(parent).with_context(|| {
                    format!(
                        "Failed to create parent directory for sample config at {:?}",
                        parent
                    )
                })?;
            }
        }

        Self::default()
            .save_to_file(&sample_path)
            .with_context(|| format!("Failed to save sample config to {:?}", sample_path))?;

        error!(
            "Sample configuration file created at {:?}\nPlease edit and rename it",
            sample_path
        );
        Ok(())
    }

    /// Load configuration from a file
    ///
    /// A missing file is created with default values. A file that fails
    /// validation leaves a `.sample.yaml` next to it and returns an error.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(
                "Configuration file not found at {:?}, creating default",
                path
            );
            let default_config = Self::default();
            default_config.save_to_file(path)?;
            return Ok(default_config);
        }

        debug!("Loading configuration from {:?}", path);
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file at {:?}", path))?;

        let yaml_value: serde_yml::Value = serde_yml::from_str(&contents)
            .with_context(|| format!("Failed to parse YAML configuration from {:?}", path))?;

        let json_value = serde_json::to_value(&yaml_value).with_context(|| {
            format!("Failed to convert YAML to JSON for validation: {:?}", path)
        })?;

        let schema: serde_json::Value =
            serde_json::from_str(CONFIG_SCHEMA).context("Failed to parse JSON schema")?;

        let validator = jsonschema::draft202012::options()
            .should_validate_formats(true)
            .build(&schema)?;

        debug!("Validating {} configuration against schema", path.display());
        if let Err(error) = validator.validate(&json_value) {
            error!("Configuration validation error before deserialization");
            Self::create_sample_config(path)?;
            anyhow::bail!("Configuration validation failed: {}", error);
        }

        debug!("Schema validation passed, deserializing into Config structure");
        let config: Config = match serde_yml::from_str(&contents) {
            Ok(config) => config,
            Err(err) => {
                error!("Configuration deserialization error: {}", err);
                if let Err(e) = Self::create_sample_config(path) {
                    error!("Failed to create sample config: {}", e);
                }
                return Err(anyhow::anyhow!(
                    "Failed to deserialize configuration from {}: {}",
                    path.display(),
                    err
                ));
            }
        };

        if let Err(err) = validate_specific_rules(&config) {
            error!("Configuration specific validation error: {}", err);
            Self::create_sample_config(path)?;
            return Err(err);
        }

        Ok(config)
    }

    /// Save the configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml =
            serde_yml::to_string(self).context("Failed to serialize configuration to YAML")?;

        let mut file = File::create(path.as_ref())
            .with_context(|| format!("Failed to create config file at {:?}", path.as_ref()))?;

        file.write_all(yaml.as_bytes())
            .with_context(|| format!("Failed to write configuration to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Apply command line arguments to override configuration values.
    ///
    /// Only arguments that were given replace the file's values. The output
    /// format follows the extension of a new output path (`.csv` selects CSV,
    /// anything else xlsx).
    ///
    /// # Parameters
    ///
    /// * `port` - Serial port identifier
    /// * `baud_rate` - Line speed
    /// * `output` - Output table path
    /// * `max_time` - Timing window in seconds
    /// * `simulate` - If true, use the simulated device
    pub fn apply_args(
        &mut self,
        port: Option<String>,
        baud_rate: Option<u32>,
        output: Option<PathBuf>,
        max_time: Option<f64>,
        simulate: bool,
    ) {
        if let Some(port) = port {
            debug!("Overriding serial port from command line: {}", port);
            self.serial.port = port;
        }

        if let Some(baud_rate) = baud_rate {
            debug!("Overriding baud rate from command line: {}", baud_rate);
            self.serial.baud_rate = baud_rate;
        }

        if let Some(output) = output {
            debug!("Overriding output path from command line: {:?}", output);
            self.storage.format = match output.extension().and_then(|e| e.to_str()) {
                Some(ext) if ext.eq_ignore_ascii_case("csv") => StorageFormat::Csv,
                _ => StorageFormat::Xlsx,
            };
            self.storage.output_path = output.to_string_lossy().to_string();
        }

        if let Some(max_time) = max_time {
            debug!("Overriding timing window from command line: {}s", max_time);
            self.acquisition.max_time_s = max_time;
        }

        if simulate {
            debug!("Simulated device requested from command line");
            self.serial.simulate = true;
        }
    }
}
