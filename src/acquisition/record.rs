// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-sensor-logger project and is licensed under the
// SCTG Development Non-Commercial License v1.0.

//! Sample sets and records
//!
//! A [`SampleSet`] is one synchronized snapshot of every channel. A
//! [`Record`] pairs it with the time it was completed; it is what the
//! sinks receive. Both are immutable once built.

use std::time::Duration;

use serde::Serialize;

/// One value per channel, in channel index order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleSet(Vec<f64>);

impl SampleSet {
    pub fn new(values: Vec<f64>) -> Self {
        Self(values)
    }

    pub fn values(&self) -> &[f64] {
        &self.0
    }

    /// Value of a single channel
    pub fn get(&self, channel: usize) -> Option<f64> {
        self.0.get(channel).copied()
    }

    /// Value of channel 0
    pub fn primary(&self) -> Option<f64> {
        self.get(0)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A completed sample set stamped with its elapsed time
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    /// Row number, starting at 0 for the first record of the session
    sequence: u64,
    /// Time since the session origin
    #[serde(rename = "timestamp_s", serialize_with = "serialize_secs")]
    timestamp: Duration,
    values: SampleSet,
}

fn serialize_secs<S: serde::Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(value.as_secs_f64())
}

impl Record {
    pub fn new(sequence: u64, timestamp: Duration, values: SampleSet) -> Self {
        Self {
            sequence,
            timestamp,
            values,
        }
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn timestamp(&self) -> Duration {
        self.timestamp
    }

    /// Timestamp in seconds, as written to storage
    pub fn timestamp_secs(&self) -> f64 {
        self.timestamp.as_secs_f64()
    }

    pub fn values(&self) -> &SampleSet {
        &self.values
    }
}
