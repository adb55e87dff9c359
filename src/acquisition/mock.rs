// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-sensor-logger project and is licensed under the
// SCTG Development Non-Commercial License v1.0.

//! Mock transports
//!
//! Two stand-ins for a real serial link:
//!
//! - [`ScriptedTransport`] replays a fixed list of reads and records every
//!   byte written, so tests can check exactly what the host sent.
//! - [`SimulatedDevice`] behaves like the acquisition firmware: it repeats
//!   the connection marker until the host answers, sends one line per channel
//!   for each sample request and goes back to announcing itself when told to
//!   stop. It drives `--simulate` runs and end-to-end tests.

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};

use log::debug;

use super::transport::Transport;
use super::{CONNECT_MARKER, REQUEST_SAMPLE, STOP_COMMAND};

/// One scripted read
#[derive(Debug)]
enum ScriptedRead {
    Line(Vec<u8>),
    Fail(io::ErrorKind),
}

#[derive(Debug, Default)]
struct MonitorState {
    written: Vec<u8>,
    flushes: usize,
    closes: usize,
    fail_writes: bool,
}

/// Shared view on what a [`ScriptedTransport`] has seen
///
/// The monitor stays usable after the transport has been moved into a session.
#[derive(Debug, Clone, Default)]
pub struct TransportMonitor {
    state: Arc<Mutex<MonitorState>>,
}

impl TransportMonitor {
    fn lock(&self) -> MutexGuard<'_, MonitorState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Every byte written so far, in order
    pub fn written(&self) -> Vec<u8> {
        self.lock().written.clone()
    }

    /// Number of times a given command byte was written
    pub fn command_count(&self, command: u8) -> usize {
        self.lock().written.iter().filter(|&&b| b == command).count()
    }

    pub fn flush_count(&self) -> usize {
        self.lock().flushes
    }

    pub fn close_count(&self) -> usize {
        self.lock().closes
    }

    /// Make every following write fail
    pub fn fail_writes(&self) {
        self.lock().fail_writes = true;
    }
}

/// Transport replaying a scripted sequence of reads
///
/// An empty line stands for a read timeout. Once the script is exhausted
/// every read times out.
#[derive(Debug)]
pub struct ScriptedTransport {
    reads: VecDeque<ScriptedRead>,
    monitor: TransportMonitor,
    closed: bool,
}

impl ScriptedTransport {
    pub fn new<I, L>(lines: I) -> Self
    where
        I: IntoIterator<Item = L>,
        L: Into<Vec<u8>>,
    {
        Self {
            reads: lines
                .into_iter()
                .map(|line| ScriptedRead::Line(line.into()))
                .collect(),
            monitor: TransportMonitor::default(),
            closed: false,
        }
    }

    /// Append a line to the script
    pub fn push_line(&mut self, line: impl Into<Vec<u8>>) {
        self.reads.push_back(ScriptedRead::Line(line.into()));
    }

    /// Append a read that fails with `kind`
    pub fn push_error(&mut self, kind: io::ErrorKind) {
        self.reads.push_back(ScriptedRead::Fail(kind));
    }

    pub fn monitor(&self) -> TransportMonitor {
        self.monitor.clone()
    }

    fn ensure_open(&self) -> io::Result<()> {
        if self.closed {
            return Err(io::Error::new(
                io::ErrorKind::NotConnected,
                "scripted transport is closed",
            ));
        }
        Ok(())
    }
}

impl Transport for ScriptedTransport {
    fn read_line(&mut self, buf: &mut Vec<u8>) -> io::Result<usize> {
        self.ensure_open()?;
        buf.clear();
        match self.reads.pop_front() {
            Some(ScriptedRead::Line(line)) => {
                buf.extend_from_slice(&line);
                Ok(buf.len())
            }
            Some(ScriptedRead::Fail(kind)) => Err(io::Error::new(kind, "scripted read failure")),
            None => Ok(0),
        }
    }

    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.ensure_open()?;
        let mut state = self.monitor.lock();
        if state.fail_writes {
            return Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "scripted write failure",
            ));
        }
        state.written.extend_from_slice(bytes);
        Ok(())
    }

    fn flush_input(&mut self) -> io::Result<()> {
        self.ensure_open()?;
        self.monitor.lock().flushes += 1;
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        self.closed = true;
        self.monitor.lock().closes += 1;
        Ok(())
    }
}

/// Default interval between two connection markers
pub const DEFAULT_CONTACT_INTERVAL: Duration = Duration::from_millis(200);

/// Simulated acquisition device
pub struct SimulatedDevice {
    channels: usize,
    read_timeout: Duration,
    contact_interval: Duration,
    contacted: bool,
    last_contact: Option<Instant>,
    outbox: VecDeque<u8>,
    started: Instant,
    cycles: u64,
    closed: bool,
}

impl SimulatedDevice {
    /// Create a device reporting `channels` values per sample request
    pub fn new(channels: usize, read_timeout: Duration) -> Self {
        debug!(
            "Creating simulated device: {} channels, read timeout {:?}",
            channels, read_timeout
        );
        Self {
            channels: channels.max(1),
            read_timeout,
            contact_interval: DEFAULT_CONTACT_INTERVAL,
            contacted: false,
            last_contact: None,
            outbox: VecDeque::new(),
            started: Instant::now(),
            cycles: 0,
            closed: false,
        }
    }

    pub fn with_contact_interval(mut self, interval: Duration) -> Self {
        self.contact_interval = interval;
        self
    }

    /// Number of sample requests answered
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    fn ensure_open(&self) -> io::Result<()> {
        if self.closed {
            return Err(io::Error::new(
                io::ErrorKind::NotConnected,
                "simulated device is closed",
            ));
        }
        Ok(())
    }

    /// Value reported by a channel at time `t` seconds
    fn channel_value(channel: usize, t: f64) -> f64 {
        let base = 100.0 * (channel + 1) as f64;
        let wave = 10.0 * (2.0 * std::f64::consts::PI * t / 5.0 + channel as f64).sin();
        let noise = rand::random::<f64>() - 0.5;
        base + wave + noise
    }

    fn send_sample_set(&mut self) {
        let t = self.started.elapsed().as_secs_f64();
        for channel in 0..self.channels {
            let line = format!("{:.3}\r\n", Self::channel_value(channel, t));
            self.outbox.extend(line.as_bytes());
        }
        self.cycles += 1;
    }

    /// Queue a connection marker if one is due; returns the wait until the next one
    fn announce(&mut self) -> Duration {
        let now = Instant::now();
        match self.last_contact {
            Some(last) if now.duration_since(last) < self.contact_interval => {
                self.contact_interval - now.duration_since(last)
            }
            _ => {
                self.outbox.push_back(CONNECT_MARKER);
                self.last_contact = Some(now);
                Duration::ZERO
            }
        }
    }
}

impl Transport for SimulatedDevice {
    fn read_line(&mut self, buf: &mut Vec<u8>) -> io::Result<usize> {
        self.ensure_open()?;
        buf.clear();

        if self.outbox.is_empty() {
            if self.contacted {
                thread::sleep(self.read_timeout);
                return Ok(0);
            }
            let wait = self.announce();
            if wait > self.read_timeout {
                thread::sleep(self.read_timeout);
                return Ok(0);
            }
            if !wait.is_zero() {
                thread::sleep(wait);
                self.announce();
            }
        }

        while let Some(byte) = self.outbox.pop_front() {
            buf.push(byte);
            if byte == b'\n' {
                break;
            }
        }
        Ok(buf.len())
    }

    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.ensure_open()?;
        for &byte in bytes {
            // Any byte from the host ends the contact phase
            self.contacted = true;
            match byte {
                REQUEST_SAMPLE => self.send_sample_set(),
                STOP_COMMAND => {
                    debug!("Simulated device stopped, announcing again");
                    self.contacted = false;
                    self.last_contact = None;
                    self.outbox.clear();
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn flush_input(&mut self) -> io::Result<()> {
        self.ensure_open()?;
        self.outbox.clear();
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        self.closed = true;
        self.outbox.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquisition::assembler::parse_payload;

    fn fast_device(channels: usize) -> SimulatedDevice {
        SimulatedDevice::new(channels, Duration::from_millis(1))
            .with_contact_interval(Duration::from_millis(1))
    }

    #[test]
    fn test_scripted_transport_replays_and_records() {
        let mut transport = ScriptedTransport::new(vec![b"C".to_vec(), Vec::new()]);
        transport.push_error(io::ErrorKind::BrokenPipe);
        let monitor = transport.monitor();
        let mut buf = Vec::new();

        assert_eq!(transport.read_line(&mut buf).unwrap(), 1);
        assert_eq!(buf, b"C");
        assert_eq!(transport.read_line(&mut buf).unwrap(), 0);
        assert!(transport.read_line(&mut buf).is_err());
        assert_eq!(transport.read_line(&mut buf).unwrap(), 0);

        transport.write(b"HQ").unwrap();
        assert_eq!(monitor.written(), b"HQ".to_vec());
        assert_eq!(monitor.command_count(b'H'), 1);

        transport.close().unwrap();
        assert!(transport.write(b"H").is_err());
        assert_eq!(monitor.close_count(), 1);
    }

    #[test]
    fn test_simulated_device_announces_until_contacted() {
        let mut device = fast_device(2);
        let mut buf = Vec::new();

        device.read_line(&mut buf).unwrap();
        assert_eq!(buf, vec![CONNECT_MARKER]);

        device.write(&[REQUEST_SAMPLE]).unwrap();
        device.read_line(&mut buf).unwrap();
        assert!(buf.ends_with(b"\r\n"));
        assert!(parse_payload(&buf).is_some());
        device.read_line(&mut buf).unwrap();
        assert!(parse_payload(&buf).is_some());

        // Waiting for the next request: reads time out
        assert_eq!(device.read_line(&mut buf).unwrap(), 0);
        assert_eq!(device.cycles(), 1);
    }

    #[test]
    fn test_simulated_device_returns_to_contact_on_stop() {
        let mut device = fast_device(1);
        let mut buf = Vec::new();

        device.write(&[REQUEST_SAMPLE]).unwrap();
        device.write(&[STOP_COMMAND]).unwrap();
        device.read_line(&mut buf).unwrap();
        assert_eq!(buf, vec![CONNECT_MARKER]);
    }

    #[test]
    fn test_simulated_device_flush_discards_pending_lines() {
        let mut device = fast_device(3);
        let mut buf = Vec::new();

        device.write(&[REQUEST_SAMPLE]).unwrap();
        device.flush_input().unwrap();
        assert_eq!(device.read_line(&mut buf).unwrap(), 0);
    }
}
