// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-sensor-logger project and is licensed under the
// SCTG Development Non-Commercial License v1.0.

//! Connection handshake
//!
//! The device repeats a single connection marker byte until the host answers.
//! The first line the host reads decides the session: the marker starts
//! streaming, anything else is a rejection.

use std::io;
use std::time::Instant;

use log::{debug, info, warn};

use super::timing::Clock;
use super::transport::Transport;
use super::{CONNECT_MARKER, REQUEST_SAMPLE};

/// Acquisition session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    AwaitingHandshake,
    Streaming,
}

/// Outcome of one handshake attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeResult {
    /// Nothing received yet, try again on the next poll
    Pending,
    /// Marker received; sampling was requested at `origin`
    Established { origin: Instant },
    /// Something other than the marker arrived
    Rejected,
}

/// Gate in front of sample traffic
#[derive(Debug)]
pub struct HandshakeCoordinator {
    state: SessionState,
}

impl HandshakeCoordinator {
    pub fn new() -> Self {
        Self {
            state: SessionState::AwaitingHandshake,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_streaming(&self) -> bool {
        self.state == SessionState::Streaming
    }

    /// Examine the first line received from the device
    ///
    /// On the marker, stale input is flushed, the first sample request is
    /// sent and the time origin is captured. Once streaming, the
    /// coordinator has no further role and always reports `Pending`.
    pub fn attempt(
        &mut self,
        line: &[u8],
        transport: &mut dyn Transport,
        clock: &dyn Clock,
    ) -> io::Result<HandshakeResult> {
        if self.state == SessionState::Streaming {
            warn!("Handshake attempted on an established session");
            return Ok(HandshakeResult::Pending);
        }

        if line.is_empty() {
            return Ok(HandshakeResult::Pending);
        }

        if line != [CONNECT_MARKER].as_slice() {
            warn!(
                "Connection failed: unexpected handshake bytes {:?}",
                String::from_utf8_lossy(line)
            );
            return Ok(HandshakeResult::Rejected);
        }

        self.state = SessionState::Streaming;
        transport.flush_input()?;
        transport.write(&[REQUEST_SAMPLE])?;
        let origin = clock.now();

        info!("Connection established");
        debug!("First sample requested, time origin captured");
        Ok(HandshakeResult::Established { origin })
    }
}

impl Default for HandshakeCoordinator {
    fn default() -> Self {
        Self::new()
    }
}
