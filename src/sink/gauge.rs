// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-sensor-logger project and is licensed under the
// SCTG Development Non-Commercial License v1.0.

//! Live gauge for channel 0
//!
//! Redraws a single terminal line such as
//! `Load Cell 1 [##########..........]   5000.00 N` on every record.

use std::io::{self, Write};

use anyhow::Result;
use log::{debug, warn};

use super::RecordSink;
use crate::acquisition::Record;
use crate::config::{ChannelConfig, DisplayConfig, OutOfRangePolicy};

pub struct GaugeSink {
    label: String,
    unit: String,
    min: f64,
    max: f64,
    policy: OutOfRangePolicy,
    width: usize,
    value: Option<f64>,
    rejected: u64,
    out: Box<dyn Write + Send>,
}

impl GaugeSink {
    /// Gauge drawing on stdout
    pub fn new(config: &DisplayConfig, channel: Option<&ChannelConfig>) -> Self {
        Self::with_writer(config, channel, Box::new(io::stdout()))
    }

    pub fn with_writer(
        config: &DisplayConfig,
        channel: Option<&ChannelConfig>,
        out: Box<dyn Write + Send>,
    ) -> Self {
        let (label, unit) = channel
            .map(|c| (c.name.clone(), c.unit.clone()))
            .unwrap_or_else(|| ("Channel 0".to_string(), String::new()));

        Self {
            label,
            unit,
            min: config.min_value,
            max: config.max_value,
            policy: config.out_of_range,
            width: config.width.max(1),
            value: None,
            rejected: 0,
            out,
        }
    }

    /// Value currently shown
    pub fn value(&self) -> Option<f64> {
        self.value
    }

    /// Number of values dropped by the reject policy
    pub fn rejected(&self) -> u64 {
        self.rejected
    }

    /// Apply the range policy; `None` means the value is not shown
    fn admit(&mut self, value: f64) -> Option<f64> {
        if value.is_nan() {
            warn!("{}: ignoring non-numeric reading", self.label);
            self.rejected += 1;
            return None;
        }
        if (self.min..=self.max).contains(&value) {
            return Some(value);
        }
        match self.policy {
            OutOfRangePolicy::Clamp => {
                debug!(
                    "{}: {} outside [{}, {}], clamped",
                    self.label, value, self.min, self.max
                );
                Some(value.clamp(self.min, self.max))
            }
            OutOfRangePolicy::Reject => {
                warn!(
                    "{}: {} outside [{}, {}], keeping previous value",
                    self.label, value, self.min, self.max
                );
                self.rejected += 1;
                None
            }
        }
    }

    /// Text of the gauge line
    pub fn render(&self) -> String {
        let value = self.value.unwrap_or(self.min);
        let ratio = ((value - self.min) / (self.max - self.min)).clamp(0.0, 1.0);
        let filled = (ratio * self.width as f64).round() as usize;

        format!(
            "{} [{}{}] {:>10.2} {}",
            self.label,
            "#".repeat(filled),
            ".".repeat(self.width - filled),
            value,
            self.unit
        )
    }
}

impl RecordSink for GaugeSink {
    fn name(&self) -> &'static str {
        "gauge"
    }

    fn accept(&mut self, record: &Record) -> Result<()> {
        let Some(reading) = record.values().primary() else {
            return Ok(());
        };
        if let Some(shown) = self.admit(reading) {
            self.value = Some(shown);
            let line = self.render();
            write!(self.out, "\r{}", line)?;
            self.out.flush()?;
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if self.value.is_some() {
            writeln!(self.out)?;
        }
        self.out.flush()?;
        Ok(())
    }
}
