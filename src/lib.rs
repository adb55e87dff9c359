// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-sensor-logger project and is licensed under the
// SCTG Development Non-Commercial License v1.0.

//! Rust sensor logger library
//!
//! Reads synchronized multi-channel samples from a serial acquisition
//! device, stamps each complete set with its elapsed time and stores it as a
//! table row while a gauge shows the first channel live.

pub mod acquisition;
pub mod config;
pub mod daemon;
pub mod sink;

pub use acquisition::{AcquisitionError, AcquisitionSession, Record, SampleSet};
pub use config::Config;
