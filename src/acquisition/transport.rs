// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-sensor-logger project and is licensed under the
// SCTG Development Non-Commercial License v1.0.

//! Byte-stream transport adapter
//!
//! The acquisition core only needs four things from the link to the device:
//! read one line with a short timeout, write a few command bytes, drop
//! whatever input is pending, and close. [`Transport`] captures exactly that,
//! and [`SerialTransport`] implements it on top of the `serialport` crate.
//!
//! A read that times out is not an error: it yields an empty line so the
//! caller can tell "nothing arrived yet" from a broken link.

use std::io::{self, Read, Write};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use log::{debug, info};
use serialport::{ClearBuffer, SerialPort};

use super::AcquisitionError;
use crate::config::SerialConfig;

/// Byte-stream endpoint used by the acquisition session
pub trait Transport: Send {
    /// Read bytes up to and including the next `\n`, or whatever arrived
    /// before the read timeout expired.
    ///
    /// `buf` is cleared first. Returns the number of bytes placed in `buf`;
    /// zero means the read timed out with nothing received.
    fn read_line(&mut self, buf: &mut Vec<u8>) -> io::Result<usize>;

    /// Write raw bytes to the device
    fn write(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Discard any input received but not yet read
    fn flush_input(&mut self) -> io::Result<()>;

    /// Release the endpoint. Further reads and writes fail.
    fn close(&mut self) -> io::Result<()>;
}

/// Serial port transport
pub struct SerialTransport {
    port: Option<Box<dyn SerialPort>>,
    name: String,
    read_timeout: Duration,
    /// Bytes read past the last returned line
    pending: Vec<u8>,
}

impl SerialTransport {
    /// Open the serial port described by `config`
    ///
    /// Stale input left in the driver buffer is discarded right after the
    /// port opens, so the first read only sees what the device sends from
    /// now on.
    pub fn open(config: &SerialConfig) -> Result<Self, AcquisitionError> {
        let read_timeout = Duration::from_millis(config.read_timeout_ms);
        let connection_error = |reason: String| AcquisitionError::Connection {
            port: config.port.clone(),
            reason,
        };

        let port = serialport::new(config.port.as_str(), config.baud_rate)
            .timeout(read_timeout)
            .open()
            .map_err(|e| connection_error(e.to_string()))?;

        port.clear(ClearBuffer::Input)
            .map_err(|e| connection_error(e.to_string()))?;

        info!(
            "Connected to {} at {} baud (read timeout {}ms)",
            config.port, config.baud_rate, config.read_timeout_ms
        );

        Ok(Self {
            port: Some(port),
            name: config.port.clone(),
            read_timeout,
            pending: Vec::with_capacity(64),
        })
    }

    /// Name of the underlying port
    pub fn name(&self) -> &str {
        &self.name
    }

    fn port(&mut self) -> io::Result<&mut Box<dyn SerialPort>> {
        self.port.as_mut().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotConnected, "serial port is closed")
        })
    }
}

impl Transport for SerialTransport {
    fn read_line(&mut self, buf: &mut Vec<u8>) -> io::Result<usize> {
        buf.clear();
        let deadline = Instant::now() + self.read_timeout;
        let mut chunk = [0u8; 64];

        loop {
            if let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
                buf.extend(self.pending.drain(..=pos));
                return Ok(buf.len());
            }

            let now = Instant::now();
            if now >= deadline {
                break;
            }

            let port = self.port()?;
            port.set_timeout(deadline - now)?;
            match port.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => self.pending.extend_from_slice(&chunk[..n]),
                Err(e) if e.kind() == io::ErrorKind::TimedOut => break,
                Err(e) => return Err(e),
            }
        }

        // Timed out: hand over the partial line, like a line read with timeout does
        buf.append(&mut self.pending);
        Ok(buf.len())
    }

    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        let port = self.port()?;
        port.write_all(bytes)?;
        port.flush()
    }

    fn flush_input(&mut self) -> io::Result<()> {
        self.pending.clear();
        self.port()?.clear(ClearBuffer::Input)?;
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        if self.port.take().is_some() {
            debug!("Serial port {} closed", self.name);
        }
        self.pending.clear();
        Ok(())
    }
}

/// List the serial ports available on this machine
pub fn list_ports() -> Result<Vec<String>> {
    let ports = serialport::available_ports().context("Failed to enumerate serial ports")?;
    Ok(ports
        .into_iter()
        .map(|info| match info.port_type {
            serialport::SerialPortType::UsbPort(usb) => format!(
                "{} (USB {:04x}:{:04x}{})",
                info.port_name,
                usb.vid,
                usb.pid,
                usb.product
                    .map(|product| format!(", {}", product))
                    .unwrap_or_default()
            ),
            _ => info.port_name,
        })
        .collect())
}
