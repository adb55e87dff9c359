// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-sensor-logger project and is licensed under the
// SCTG Development Non-Commercial License v1.0.

//! Live gauge configuration

use serde::{Deserialize, Serialize};

/// What the gauge does with a value outside `[min_value, max_value]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutOfRangePolicy {
    /// Show the nearest bound
    #[default]
    Clamp,
    /// Keep the previous value and log a warning
    Reject,
}

/// Configuration of the gauge showing channel 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayConfig {
    pub enabled: bool,

    /// Lower bound of the gauge.
    pub min_value: f64,

    /// Upper bound of the gauge. Must be greater than `min_value`.
    pub max_value: f64,

    #[serde(default)]
    pub out_of_range: OutOfRangePolicy,

    /// Bar width in characters.
    #[serde(default = "default_width")]
    pub width: usize,
}

fn default_width() -> usize {
    40
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_value: 0.0,
            max_value: 20000.0,
            out_of_range: OutOfRangePolicy::Clamp,
            width: default_width(),
        }
    }
}
