// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-sensor-logger project and is licensed under the
// SCTG Development Non-Commercial License v1.0.

//! Serial link configuration
//!
//! This module defines the settings used to open the link to the
//! acquisition device.

use serde::{Deserialize, Serialize};

/// Configuration of the serial link to the acquisition device.
///
/// # Example
///
/// ```
/// use rust_sensor_logger::config::SerialConfig;
///
/// let serial = SerialConfig {
///     port: "/dev/ttyUSB0".to_string(),
///     baud_rate: 9600,
///     ..SerialConfig::default()
/// };
/// assert_eq!(serial.read_timeout_ms, 50);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerialConfig {
    /// Port identifier, e.g. `/dev/ttyACM0` or `COM5`.
    pub port: String,

    /// Line speed in baud.
    pub baud_rate: u32,

    /// Upper bound of a single read in milliseconds.
    ///
    /// Reads return early when a full line is available. Valid range is
    /// 1-100; larger values make shutdown and pacing sluggish.
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,

    /// Replace the serial port by a simulated device.
    #[serde(default)]
    pub simulate: bool,
}

fn default_read_timeout_ms() -> u64 {
    50
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyACM0".to_string(),
            baud_rate: 115200,
            read_timeout_ms: default_read_timeout_ms(),
            simulate: false,
        }
    }
}
