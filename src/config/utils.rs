// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-sensor-logger project and is licensed under the
// SCTG Development Non-Commercial License v1.0.

//! Configuration utilities
//!
//! This module provides utility functions for working with configuration
//! settings, including validation and schema management.

use std::collections::HashSet;

use anyhow::{Context, Result};
use log::{debug, warn};

use super::{Config, CONFIG_SCHEMA};

/// Output the embedded JSON schema to the console.
///
/// This function is called when the `--show-config-schema` flag is provided
/// on the command line.
///
/// # Example
///
/// ```bash
/// ./rust_sensor_logger --show-config-schema > config_schema.json
/// ```
pub fn output_config_schema() -> Result<()> {
    let schema: serde_json::Value =
        serde_json::from_str(CONFIG_SCHEMA).context("Failed to parse JSON schema")?;

    let formatted_schema =
        serde_json::to_string_pretty(&schema).context("Failed to format JSON schema")?;

    println!("{}", formatted_schema);

    Ok(())
}

/// Validates the configuration against rules the JSON schema cannot express.
///
/// # Validation Rules
///
/// - **Channels**: At least one channel, no duplicate header labels
/// - **Timing window**: Finite, strictly positive and representable as a duration
/// - **Read timeout**: Between 1 and 100 ms
/// - **Gauge range**: Finite bounds with `max_value > min_value`
/// - **Output path**: Not empty
pub fn validate_specific_rules(config: &Config) -> Result<()> {
    debug!("Performing additional validation checks");

    if config.acquisition.channels.is_empty() {
        anyhow::bail!("At least one acquisition channel must be configured");
    }

    let mut labels = HashSet::new();
    for channel in &config.acquisition.channels {
        if channel.name.trim().is_empty() {
            anyhow::bail!("Channel names must not be empty");
        }
        if !labels.insert(channel.header_label()) {
            anyhow::bail!("Duplicate channel: {}", channel.header_label());
        }
    }

    let max_time = config.acquisition.max_time_s;
    if !max_time.is_finite() || max_time <= 0.0 {
        anyhow::bail!("Invalid timing window: {} s", max_time);
    }
    config.acquisition.max_time()?;

    if !(1..=100).contains(&config.serial.read_timeout_ms) {
        anyhow::bail!(
            "Invalid read timeout: {} ms (expected 1-100)",
            config.serial.read_timeout_ms
        );
    }

    if config.serial.baud_rate == 0 {
        anyhow::bail!("Invalid baud rate: 0");
    }

    let display = &config.display;
    if !display.min_value.is_finite() || !display.max_value.is_finite() {
        anyhow::bail!("Gauge bounds must be finite numbers");
    }
    if display.max_value <= display.min_value {
        anyhow::bail!(
            "Gauge max_value ({}) must be greater than min_value ({})",
            display.max_value,
            display.min_value
        );
    }

    if config.storage.output_path.trim().is_empty() {
        anyhow::bail!("Output path must not be empty");
    }

    if config.serial.simulate {
        warn!("Simulated device enabled, serial port {} will not be opened", config.serial.port);
    }

    Ok(())
}
