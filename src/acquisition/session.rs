// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-sensor-logger project and is licensed under the
// SCTG Development Non-Commercial License v1.0.

//! Acquisition session
//!
//! [`AcquisitionSession`] owns everything a session mutates: the transport,
//! the handshake state, the line buffers, the timing counters and the sinks.
//! It is driven by repeated calls to [`AcquisitionSession::poll_once`], each
//! of which performs a single bounded read and advances the state machine.
//! [`AcquisitionSession::run`] wraps that in the polling loop used by the
//! daemon.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;
use std::time::Duration;

use chrono::{DateTime, Local};
use log::{debug, error, info, log, warn, Level};

use super::assembler::{AssemblerResult, SampleAssembler};
use super::handshake::{HandshakeCoordinator, HandshakeResult, SessionState};
use super::record::{Record, SampleSet};
use super::timing::{Clock, SystemClock, TimeSynchronizer};
use super::transport::Transport;
use super::{AcquisitionError, STOP_COMMAND};
use crate::config::{AcquisitionConfig, ChannelConfig, ElapsedMode};
use crate::sink::RecordSink;

/// What a single poll did
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// Read timed out, nothing changed
    Idle,
    /// Handshake completed, sampling requested
    Connected,
    /// A line was buffered; `received` of the current set are in
    Collecting { received: usize },
    /// A set completed and was handed to every sink
    Recorded(Record),
}

/// Totals reported when a session ends
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
    pub started_at: DateTime<Local>,
    pub records: u64,
    pub last_timestamp: Option<Duration>,
    pub elapsed_total: Duration,
    /// Time accumulated in the current timing window
    pub window_elapsed: Duration,
}

/// Result of a shutdown request
#[derive(Debug, Clone, PartialEq)]
pub enum ShutdownOutcome {
    /// Stop command sent, transport closed, sinks closed
    Closed(SessionSummary),
    /// Teardown had already run; nothing was done
    AlreadyClosed,
}

pub struct AcquisitionSession {
    transport: Box<dyn Transport>,
    clock: Box<dyn Clock>,
    handshake: HandshakeCoordinator,
    assembler: SampleAssembler,
    timing: Option<TimeSynchronizer>,
    sinks: Vec<Box<dyn RecordSink>>,
    channels: Vec<ChannelConfig>,
    max_time: Duration,
    elapsed_mode: ElapsedMode,
    poll_interval: Duration,
    /// Scratch buffer for the line being read
    line: Vec<u8>,
    records: u64,
    last_timestamp: Option<Duration>,
    started_at: DateTime<Local>,
    closed: bool,
    /// Level of the one line summary logged for every record
    record_level: Level,
}

impl AcquisitionSession {
    /// Create a session over an open transport
    ///
    /// Fails if the configured timing window is not a valid duration.
    pub fn new(
        transport: Box<dyn Transport>,
        sinks: Vec<Box<dyn RecordSink>>,
        config: &AcquisitionConfig,
    ) -> anyhow::Result<Self> {
        let max_time = config.max_time()?;
        debug!(
            "Creating acquisition session: {} channels, window {:.3}s, {:?} elapsed time, {} sinks",
            config.channel_count(),
            max_time.as_secs_f64(),
            config.elapsed_mode,
            sinks.len()
        );

        Ok(Self {
            transport,
            clock: Box::new(SystemClock),
            handshake: HandshakeCoordinator::new(),
            assembler: SampleAssembler::new(config.channel_count()),
            timing: None,
            sinks,
            channels: config.channels.clone(),
            max_time,
            elapsed_mode: config.elapsed_mode,
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            line: Vec::with_capacity(64),
            records: 0,
            last_timestamp: None,
            started_at: Local::now(),
            closed: false,
            record_level: Level::Info,
        })
    }

    /// Replace the time source
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Log level of the per-record summary line
    ///
    /// Use [`Level::Debug`] when a console gauge shares stdout with the log.
    pub fn with_record_log_level(mut self, level: Level) -> Self {
        self.record_level = level;
        self
    }

    pub fn state(&self) -> SessionState {
        self.handshake.state()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn records(&self) -> u64 {
        self.records
    }

    /// Read once and advance the state machine
    pub fn poll_once(&mut self) -> Result<PollOutcome, AcquisitionError> {
        if self.closed {
            return Err(AcquisitionError::SessionClosed);
        }

        self.transport.read_line(&mut self.line)?;

        if !self.handshake.is_streaming() {
            return match self.handshake.attempt(
                &self.line,
                self.transport.as_mut(),
                self.clock.as_ref(),
            )? {
                HandshakeResult::Pending => Ok(PollOutcome::Idle),
                HandshakeResult::Established { origin } => {
                    self.timing = Some(TimeSynchronizer::new(
                        origin,
                        self.max_time,
                        self.elapsed_mode,
                    ));
                    Ok(PollOutcome::Connected)
                }
                HandshakeResult::Rejected => Err(AcquisitionError::HandshakeRejected {
                    received: String::from_utf8_lossy(&self.line).into_owned(),
                }),
            };
        }

        match self.assembler.on_line(&self.line, self.transport.as_mut())? {
            AssemblerResult::NoData => Ok(PollOutcome::Idle),
            AssemblerResult::Incomplete { received } => Ok(PollOutcome::Collecting { received }),
            AssemblerResult::Completed(values) => self.emit(values).map(PollOutcome::Recorded),
        }
    }

    /// Stamp a completed set and hand it to every sink
    ///
    /// All sinks receive the record even if one of them fails; the first
    /// failure is then reported.
    fn emit(&mut self, values: SampleSet) -> Result<Record, AcquisitionError> {
        let now = self.clock.now();
        let (max_time, mode) = (self.max_time, self.elapsed_mode);
        let snapshot = self
            .timing
            .get_or_insert_with(|| TimeSynchronizer::new(now, max_time, mode))
            .advance(now);

        let record = Record::new(self.records, snapshot.cycle_elapsed, values);
        self.records += 1;
        self.last_timestamp = Some(snapshot.cycle_elapsed);

        log!(self.record_level, "{}", self.describe(&record));
        debug!(
            "Record #{} at {:.3}s, window {:.3}s (previous {:.3}s)",
            record.sequence(),
            record.timestamp_secs(),
            snapshot.window_elapsed.as_secs_f64(),
            snapshot.window_previous.as_secs_f64()
        );

        let mut failure = None;
        for sink in self.sinks.iter_mut() {
            if let Err(e) = sink.accept(&record) {
                error!("Sink '{}' rejected record #{}: {:#}", sink.name(), record.sequence(), e);
                failure.get_or_insert(AcquisitionError::Sink {
                    sink: sink.name(),
                    reason: format!("{:#}", e),
                });
            }
        }

        match failure {
            Some(err) => Err(err),
            None => Ok(record),
        }
    }

    /// One line summary of a record with channel names and units
    fn describe(&self, record: &Record) -> String {
        record
            .values()
            .values()
            .iter()
            .enumerate()
            .map(|(channel, value)| match self.channels.get(channel) {
                Some(c) => format!("{}: {:.2} {}", c.name, value, c.unit),
                None => format!("Channel {}: {:.2}", channel, value),
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn summary(&self) -> SessionSummary {
        let timing = self.timing.as_ref();
        SessionSummary {
            started_at: self.started_at,
            records: self.records,
            last_timestamp: self.last_timestamp,
            elapsed_total: timing.map(|t| t.elapsed_total()).unwrap_or_default(),
            window_elapsed: timing.map(|t| t.window_elapsed()).unwrap_or_default(),
        }
    }

    /// Tear the session down
    ///
    /// Sends the stop command, closes the transport, then closes every sink,
    /// in that order. Each step runs even if an earlier one failed; the first
    /// failure is returned. A second call does nothing.
    pub fn shutdown(&mut self) -> Result<ShutdownOutcome, AcquisitionError> {
        if self.closed {
            debug!("Session already closed, ignoring shutdown request");
            return Ok(ShutdownOutcome::AlreadyClosed);
        }
        self.closed = true;
        info!("Shutting down acquisition session");

        let mut failure: Option<AcquisitionError> = None;

        if let Err(e) = self.transport.write(&[STOP_COMMAND]) {
            warn!("Failed to send stop command: {}", e);
            failure.get_or_insert(e.into());
        }

        if let Err(e) = self.transport.close() {
            warn!("Failed to close transport: {}", e);
            failure.get_or_insert(e.into());
        }

        for sink in self.sinks.iter_mut() {
            match sink.close() {
                Ok(()) => debug!("Sink '{}' closed", sink.name()),
                Err(e) => {
                    error!("Failed to close sink '{}': {:#}", sink.name(), e);
                    failure.get_or_insert(AcquisitionError::Sink {
                        sink: sink.name(),
                        reason: format!("{:#}", e),
                    });
                }
            }
        }

        match failure {
            Some(err) => Err(err),
            None => Ok(ShutdownOutcome::Closed(self.summary())),
        }
    }

    /// Poll until `running` is cleared or a fatal error occurs
    ///
    /// The teardown sequence runs on both paths. On failure it is best
    /// effort and the original error is returned.
    pub fn run(
        &mut self,
        running: &AtomicBool,
        records: &AtomicU64,
    ) -> Result<SessionSummary, AcquisitionError> {
        info!("Acquisition loop started, waiting for device");

        while running.load(Ordering::SeqCst) {
            match self.poll_once() {
                Ok(PollOutcome::Recorded(_)) => {
                    records.fetch_add(1, Ordering::Relaxed);
                }
                Ok(_) => {}
                Err(e) => {
                    error!("Acquisition stopped: {}", e);
                    running.store(false, Ordering::SeqCst);
                    if let Err(teardown) = self.shutdown() {
                        warn!("Teardown after failure incomplete: {}", teardown);
                    }
                    return Err(e);
                }
            }

            if !self.poll_interval.is_zero() {
                thread::sleep(self.poll_interval);
            }
        }

        self.shutdown()?;
        Ok(self.summary())
    }
}
