// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-sensor-logger project and is licensed under the
// SCTG Development Non-Commercial License v1.0.

//! Sensor acquisition module
//!
//! This module talks to the acquisition device over a line-oriented byte
//! stream and turns each complete set of channel readings into a
//! time-stamped [`Record`].
//!
//! ## Protocol
//!
//! - The device repeats [`CONNECT_MARKER`] until the host answers.
//! - The host flushes its input and sends [`REQUEST_SAMPLE`].
//! - The device answers with one line per channel: an ASCII number followed
//!   by a two-byte delimiter.
//! - Once every channel has reported, the host flushes and sends
//!   [`REQUEST_SAMPLE`] again. The device never sends a new set unasked.
//! - On shutdown the host sends [`STOP_COMMAND`].

use std::time::Duration;

use log::info;

pub mod assembler;
mod error;
pub mod handshake;
pub mod mock;
pub mod record;
pub mod session;
pub mod timing;
pub mod transport;

pub use assembler::{parse_payload, AssemblerResult, SampleAssembler};
pub use error::AcquisitionError;
pub use handshake::{HandshakeCoordinator, HandshakeResult, SessionState};
pub use mock::{ScriptedTransport, SimulatedDevice, TransportMonitor};
pub use record::{Record, SampleSet};
pub use session::{AcquisitionSession, PollOutcome, SessionSummary, ShutdownOutcome};
pub use timing::{Clock, ManualClock, SystemClock, TimeSynchronizer, TimingSnapshot};
pub use transport::{list_ports, SerialTransport, Transport};

use crate::config::Config;

/// Device to host: ready to connect
pub const CONNECT_MARKER: u8 = b'C';
/// Host to device: send the next sample set
pub const REQUEST_SAMPLE: u8 = b'H';
/// Host to device: stop sampling
pub const STOP_COMMAND: u8 = b'Q';
/// Length of the delimiter ending every sample line
pub const DELIMITER_LEN: usize = 2;

/// Open the transport selected by the configuration
///
/// Returns the serial port named in `serial.port`, or a simulated device
/// when `serial.simulate` is set.
pub fn open_transport(config: &Config) -> Result<Box<dyn Transport>, AcquisitionError> {
    if config.serial.simulate {
        info!(
            "Using simulated device with {} channels",
            config.acquisition.channel_count()
        );
        return Ok(Box::new(SimulatedDevice::new(
            config.acquisition.channel_count(),
            Duration::from_millis(config.serial.read_timeout_ms),
        )));
    }

    Ok(Box::new(SerialTransport::open(&config.serial)?))
}
