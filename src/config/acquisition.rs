// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-sensor-logger project and is licensed under the
// SCTG Development Non-Commercial License v1.0.

//! Data acquisition configuration
//!
//! Channels, time window and pacing of the acquisition loop.

use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// How the running total of elapsed time is accumulated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElapsedMode {
    /// Add each cycle's elapsed time to the total.
    ///
    /// Since cycle times are measured from the session origin, the total
    /// grows faster than wall-clock time. Kept for compatibility with data
    /// recorded by earlier loggers.
    #[default]
    Legacy,
    /// The total is the time since the session origin.
    WallClock,
}

/// One sensor channel, in the order the device reports it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelConfig {
    pub name: String,
    pub unit: String,
}

impl ChannelConfig {
    pub fn new(name: impl Into<String>, unit: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            unit: unit.into(),
        }
    }

    /// Column header, e.g. `Load Cell 1 (N)`
    pub fn header_label(&self) -> String {
        format!("{} ({})", self.name, self.unit)
    }
}

/// Configuration for the data acquisition process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcquisitionConfig {
    /// Channels reported by the device, one line each per sample set.
    pub channels: Vec<ChannelConfig>,

    /// Length of the rolling timing window in seconds.
    ///
    /// Must be greater than zero.
    pub max_time_s: f64,

    /// Pause between two polls of the transport in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default)]
    pub elapsed_mode: ElapsedMode,
}

fn default_poll_interval_ms() -> u64 {
    1
}

impl AcquisitionConfig {
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Timing window as a duration
    ///
    /// Fails if `max_time_s` is negative, not finite, or too large for a
    /// [`Duration`].
    pub fn max_time(&self) -> Result<Duration> {
        Duration::try_from_secs_f64(self.max_time_s)
            .with_context(|| format!("Invalid timing window: {} s", self.max_time_s))
    }

    pub fn header_labels(&self) -> Vec<String> {
        self.channels.iter().map(ChannelConfig::header_label).collect()
    }
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            channels: vec![
                ChannelConfig::new("Load Cell 1", "N"),
                ChannelConfig::new("Load Cell 2", "N"),
            ],
            max_time_s: 10.0,
            poll_interval_ms: default_poll_interval_ms(),
            elapsed_mode: ElapsedMode::Legacy,
        }
    }
}
