// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-sensor-logger project and is licensed under the
// SCTG Development Non-Commercial License v1.0.

use thiserror::Error;

/// Fatal conditions of an acquisition session
///
/// None of these are retried: they unwind to the polling loop, which runs
/// the teardown sequence before surfacing the error.
#[derive(Error, Debug)]
pub enum AcquisitionError {
    #[error("Could not open serial port {port}: {reason}")]
    Connection { port: String, reason: String },

    #[error("Handshake rejected: expected connection marker, received {received:?}")]
    HandshakeRejected { received: String },

    #[error("Channel {channel} payload {payload:?} is not a valid number")]
    Parse { channel: usize, payload: String },

    #[error("Transport failure: {source}")]
    Transport {
        #[from]
        source: std::io::Error,
    },

    #[error("Sink '{sink}' failed: {reason}")]
    Sink { sink: &'static str, reason: String },

    #[error("Session already closed")]
    SessionClosed,
}

impl AcquisitionError {
    pub fn exit_code(&self) -> i32 {
        match self {
            AcquisitionError::Connection { .. } => 2,
            AcquisitionError::HandshakeRejected { .. } => 3,
            AcquisitionError::Parse { .. } => 4,
            AcquisitionError::Transport { .. } => 5,
            AcquisitionError::Sink { .. } => 6,
            AcquisitionError::SessionClosed => 7,
        }
    }
}
