// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-sensor-logger project and is licensed under the
// SCTG Development Non-Commercial License v1.0.

//! Sample set assembly
//!
//! After the handshake the device answers each sample request with one line
//! per channel. The assembler stores raw lines until it holds one for every
//! channel, then parses them all, asks the device for the next set and hands
//! back a [`SampleSet`].
//!
//! The exchange is stop-and-wait per full cycle: the host only requests a new
//! set once the previous one has been consumed, so at most one buffer of N
//! lines is ever held.

use log::debug;

use super::record::SampleSet;
use super::transport::Transport;
use super::{AcquisitionError, DELIMITER_LEN, REQUEST_SAMPLE};

/// Outcome of feeding one line to the assembler
#[derive(Debug, Clone, PartialEq)]
pub enum AssemblerResult {
    /// The read timed out, nothing changed
    NoData,
    /// Line stored, `received` of the set's lines are now buffered
    Incomplete { received: usize },
    /// Every channel reported; the next set has been requested
    Completed(SampleSet),
}

/// Accumulates one raw line per channel
#[derive(Debug)]
pub struct SampleAssembler {
    /// Raw lines of the current cycle, reused across cycles
    lines: Vec<Vec<u8>>,
    /// Parsed values, reused across cycles
    values: Vec<f64>,
    cursor: usize,
}

impl SampleAssembler {
    /// Create an assembler for `channels` channels (at least one)
    pub fn new(channels: usize) -> Self {
        let channels = channels.max(1);
        Self {
            lines: vec![Vec::with_capacity(16); channels],
            values: vec![0.0; channels],
            cursor: 0,
        }
    }

    pub fn channel_count(&self) -> usize {
        self.lines.len()
    }

    /// Number of lines buffered for the current cycle
    pub fn pending(&self) -> usize {
        self.cursor
    }

    /// Feed one line read from the transport
    ///
    /// A parse failure on completion is fatal for the cycle: the buffer is
    /// reset and no request for the next set is sent.
    pub fn on_line(
        &mut self,
        line: &[u8],
        transport: &mut dyn Transport,
    ) -> Result<AssemblerResult, AcquisitionError> {
        if line.is_empty() {
            return Ok(AssemblerResult::NoData);
        }

        let slot = &mut self.lines[self.cursor];
        slot.clear();
        slot.extend_from_slice(line);
        self.cursor += 1;

        if self.cursor < self.lines.len() {
            return Ok(AssemblerResult::Incomplete {
                received: self.cursor,
            });
        }

        self.cursor = 0;
        for (channel, raw) in self.lines.iter().enumerate() {
            self.values[channel] =
                parse_payload(raw).ok_or_else(|| AcquisitionError::Parse {
                    channel,
                    payload: String::from_utf8_lossy(strip_delimiter(raw)).into_owned(),
                })?;
        }

        transport.flush_input()?;
        transport.write(&[REQUEST_SAMPLE])?;
        debug!("Sample set complete: {:?}", self.values);

        Ok(AssemblerResult::Completed(SampleSet::new(self.values.clone())))
    }
}

/// Drop the fixed-size line delimiter from a raw line
fn strip_delimiter(raw: &[u8]) -> &[u8] {
    &raw[..raw.len().saturating_sub(DELIMITER_LEN)]
}

/// Parse a raw line into a number
///
/// The trailing delimiter bytes are removed whatever they are; surrounding
/// whitespace in the remaining payload is ignored.
pub fn parse_payload(raw: &[u8]) -> Option<f64> {
    std::str::from_utf8(strip_delimiter(raw))
        .ok()?
        .trim()
        .parse::<f64>()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquisition::mock::ScriptedTransport;
    use approx::assert_relative_eq;

    fn transport() -> ScriptedTransport {
        ScriptedTransport::new(Vec::<Vec<u8>>::new())
    }

    #[test]
    fn test_two_channel_cycle() {
        let mut transport = transport();
        let monitor = transport.monitor();
        let mut assembler = SampleAssembler::new(2);

        let first = assembler.on_line(b"5.00\r\n", &mut transport).unwrap();
        assert_eq!(first, AssemblerResult::Incomplete { received: 1 });
        assert!(monitor.written().is_empty());

        let second = assembler.on_line(b"3.25\r\n", &mut transport).unwrap();
        assert_eq!(
            second,
            AssemblerResult::Completed(SampleSet::new(vec![5.0, 3.25]))
        );
        assert_eq!(monitor.written(), b"H".to_vec());
        assert_eq!(monitor.flush_count(), 1);
        assert_eq!(assembler.pending(), 0);
    }

    #[test]
    fn test_empty_line_is_no_data() {
        let mut transport = transport();
        let mut assembler = SampleAssembler::new(2);

        assembler.on_line(b"1.0\r\n", &mut transport).unwrap();
        let result = assembler.on_line(b"", &mut transport).unwrap();

        assert_eq!(result, AssemblerResult::NoData);
        assert_eq!(assembler.pending(), 1);
    }

    #[test]
    fn test_parse_failure_is_fatal_and_does_not_request() {
        let mut transport = transport();
        let monitor = transport.monitor();
        let mut assembler = SampleAssembler::new(2);

        assembler.on_line(b"1.0\r\n", &mut transport).unwrap();
        let err = assembler.on_line(b"abc\r\n", &mut transport).unwrap_err();

        match err {
            AcquisitionError::Parse { channel, payload } => {
                assert_eq!(channel, 1);
                assert_eq!(payload, "abc");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(monitor.written().is_empty());
        assert_eq!(assembler.pending(), 0);
    }

    #[test]
    fn test_parse_payload_strips_any_two_byte_suffix() {
        for literal in ["0", "-12.5", "1e3", "20000.125", "0.001"] {
            let expected: f64 = literal.parse().unwrap();

            let mut crlf = literal.as_bytes().to_vec();
            crlf.extend_from_slice(b"\r\n");
            assert_relative_eq!(parse_payload(&crlf).unwrap(), expected);

            let mut binary = literal.as_bytes().to_vec();
            binary.extend_from_slice(&[0xff, 0xff]);
            assert_relative_eq!(parse_payload(&binary).unwrap(), expected);
        }
    }

    #[test]
    fn test_parse_payload_rejects_short_or_garbled_lines() {
        assert_eq!(parse_payload(b"\r\n"), None);
        assert_eq!(parse_payload(b"5"), None);
        assert_eq!(parse_payload(b"1.2.3\r\n"), None);
        assert_eq!(parse_payload(&[0xc3, 0x28, b'\r', b'\n']), None);
    }

    #[test]
    fn test_buffers_reused_across_cycles() {
        let mut transport = transport();
        let monitor = transport.monitor();
        let mut assembler = SampleAssembler::new(3);

        for cycle in 0..4 {
            for channel in 0..3 {
                let line = format!("{}.5\r\n", cycle * 10 + channel);
                let result = assembler.on_line(line.as_bytes(), &mut transport).unwrap();
                if channel < 2 {
                    assert!(matches!(result, AssemblerResult::Incomplete { .. }));
                } else {
                    let base = (cycle * 10) as f64;
                    assert_eq!(
                        result,
                        AssemblerResult::Completed(SampleSet::new(vec![
                            base + 0.5,
                            base + 1.5,
                            base + 2.5
                        ]))
                    );
                }
            }
        }
        assert_eq!(monitor.written(), b"HHHH".to_vec());
    }
}
