// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-sensor-logger project and is licensed under the
// SCTG Development Non-Commercial License v1.0.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use log::{debug, error, info, Level};
use tokio::task::JoinHandle;
use tokio::time;

use crate::acquisition::{self, AcquisitionError, AcquisitionSession, SessionSummary, Transport};
use crate::config::{AcquisitionConfig, Config, DisplayConfig};
use crate::sink::{self, RecordSink};

/// Interval between two heartbeat log lines
const HEARTBEAT_PERIOD: Duration = Duration::from_secs(60);

/// Runs the acquisition loop and its companion tasks
pub struct Daemon {
    tasks: Vec<JoinHandle<Result<()>>>,
    acquisition: Option<JoinHandle<Result<SessionSummary, AcquisitionError>>>,
    running: Arc<AtomicBool>,
    records: Arc<AtomicU64>,
    record_level: Level,
}

/// Per-record log level for a display configuration
///
/// The gauge redraws its line on stdout, so record lines drop to debug while
/// it is shown.
fn record_log_level(display: &DisplayConfig) -> Level {
    if display.enabled {
        Level::Debug
    } else {
        Level::Info
    }
}

impl Default for Daemon {
    fn default() -> Self {
        Self::new()
    }
}

impl Daemon {
    /// Create a new daemon instance
    pub fn new() -> Self {
        Daemon {
            tasks: Vec::new(),
            acquisition: None,
            running: Arc::new(AtomicBool::new(true)),
            records: Arc::new(AtomicU64::new(0)),
            record_level: Level::Info,
        }
    }

    /// Open the device and sinks, then start every task
    ///
    /// The transport is opened before anything is spawned, so a connection
    /// failure returns an [`AcquisitionError::Connection`] and leaves no task
    /// behind.
    pub async fn launch(&mut self, config: &Config) -> Result<()> {
        let transport = acquisition::open_transport(config)?;
        let sinks = match sink::create_sinks(config) {
            Ok(sinks) => sinks,
            Err(err) => {
                let mut transport = transport;
                if let Err(e) = transport.close() {
                    debug!("Failed to close transport after sink error: {}", e);
                }
                return Err(err);
            }
        };

        self.record_level = record_log_level(&config.display);
        self.launch_with(transport, sinks, &config.acquisition)
    }

    /// Start the tasks over an already open transport
    pub fn launch_with(
        &mut self,
        transport: Box<dyn Transport>,
        sinks: Vec<Box<dyn RecordSink>>,
        config: &AcquisitionConfig,
    ) -> Result<()> {
        let session = AcquisitionSession::new(transport, sinks, config)?
            .with_record_log_level(self.record_level);
        self.start_acquisition(session)?;
        self.start_heartbeat()?;
        Ok(())
    }

    /// Start the acquisition loop on a blocking thread
    fn start_acquisition(&mut self, mut session: AcquisitionSession) -> Result<()> {
        if self.acquisition.is_some() {
            return Err(anyhow!("Acquisition task already running"));
        }
        info!("Starting data acquisition task");

        let running = self.running.clone();
        let records = self.records.clone();
        let task = tokio::task::spawn_blocking(move || session.run(&running, &records));

        self.acquisition = Some(task);
        Ok(())
    }

    /// Start a heartbeat task that logs the record count periodically
    fn start_heartbeat(&mut self) -> Result<()> {
        debug!("Starting heartbeat monitor");

        let running = self.running.clone();
        let records = self.records.clone();
        let task = tokio::spawn(async move {
            let mut interval = time::interval(HEARTBEAT_PERIOD);
            interval.tick().await;
            while running.load(Ordering::SeqCst) {
                interval.tick().await;
                info!(
                    "Daemon heartbeat: {} records so far",
                    records.load(Ordering::Relaxed)
                );
            }
            Ok(())
        });

        self.tasks.push(task);
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Records stored since launch
    pub fn records(&self) -> u64 {
        self.records.load(Ordering::Relaxed)
    }

    /// Resolve once the acquisition loop has stopped, whatever the reason
    pub async fn stopped(&self) {
        while self.is_running() {
            time::sleep(Duration::from_millis(100)).await;
        }
    }

    /// Ask every task to stop
    pub fn shutdown(&self) {
        info!("Shutting down daemon tasks");
        self.running.store(false, Ordering::SeqCst);
    }

    /// Wait for the acquisition loop to finish its teardown
    ///
    /// Returns the session totals, or the error that ended the session.
    pub async fn join(self) -> Result<SessionSummary> {
        self.running.store(false, Ordering::SeqCst);

        let outcome = match self.acquisition {
            Some(task) => match task.await {
                Ok(Ok(summary)) => Ok(summary),
                Ok(Err(err)) => Err(err.into()),
                Err(e) => Err(anyhow!("Acquisition task panicked: {}", e)),
            },
            None => Err(anyhow!("Acquisition task was never started")),
        };

        // The heartbeat may be sleeping for a full period
        for task in self.tasks {
            task.abort();
            match task.await {
                Ok(Err(e)) => error!("Task failed: {}", e),
                Err(e) if e.is_panic() => error!("Task panicked: {}", e),
                _ => {}
            }
        }

        outcome
    }
}
