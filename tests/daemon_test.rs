// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-sensor-logger project and is licensed under the
// SCTG Development Non-Commercial License v1.0.

use anyhow::Result;
use rust_sensor_logger::acquisition::{AcquisitionError, SimulatedDevice};
use rust_sensor_logger::config::{AcquisitionConfig, Config, StorageFormat};
use rust_sensor_logger::daemon::Daemon;
use std::fs;
use std::time::Duration;
use tempfile::tempdir;
use tokio::time;

/// Wait until the daemon has stored `count` records, up to five seconds
async fn wait_for_records(daemon: &Daemon, count: u64) -> bool {
    for _ in 0..500 {
        if daemon.records() >= count {
            return true;
        }
        time::sleep(Duration::from_millis(10)).await;
    }
    false
}

#[tokio::test]
async fn test_simulated_session_writes_csv() -> Result<()> {
    let temp_dir = tempdir()?;
    let output = temp_dir.path().join("run/simulated.csv");

    let mut config = Config::default();
    config.serial.simulate = true;
    config.serial.read_timeout_ms = 5;
    config.storage.output_path = output.to_string_lossy().to_string();
    config.storage.format = StorageFormat::Csv;
    config.display.enabled = false;

    let mut daemon = Daemon::new();
    daemon.launch(&config).await?;
    assert!(wait_for_records(&daemon, 3).await, "no records stored");

    daemon.shutdown();
    let summary = daemon.join().await?;
    assert!(summary.records >= 3);

    let contents = fs::read_to_string(&output)?;
    let mut lines = contents.lines();
    assert_eq!(
        lines.next(),
        Some("Time (s),Load Cell 1 (N),Load Cell 2 (N)")
    );
    let rows: Vec<&str> = lines.collect();
    assert_eq!(rows.len() as u64, summary.records);
    for row in rows {
        let fields: Vec<f64> = row
            .split(',')
            .map(|f| f.parse::<f64>())
            .collect::<Result<_, _>>()?;
        assert_eq!(fields.len(), 3);
        assert!(fields[0] >= 0.0);
    }
    Ok(())
}

#[tokio::test]
async fn test_launch_with_simulated_device() -> Result<()> {
    let device = SimulatedDevice::new(2, Duration::from_millis(1))
        .with_contact_interval(Duration::from_millis(1));

    let mut daemon = Daemon::new();
    daemon.launch_with(Box::new(device), Vec::new(), &AcquisitionConfig::default())?;
    assert!(wait_for_records(&daemon, 5).await);

    daemon.shutdown();
    let summary = daemon.join().await?;
    assert!(summary.records >= 5);
    assert!(summary.last_timestamp.is_some());
    Ok(())
}

#[tokio::test]
async fn test_connection_failure_reports_exit_code() -> Result<()> {
    let temp_dir = tempdir()?;
    let mut config = Config::default();
    config.serial.port = temp_dir
        .path()
        .join("no-such-device")
        .to_string_lossy()
        .to_string();
    config.storage.output_path = temp_dir
        .path()
        .join("never.xlsx")
        .to_string_lossy()
        .to_string();

    let mut daemon = Daemon::new();
    let err = daemon.launch(&config).await.unwrap_err();

    let acq = err
        .downcast_ref::<AcquisitionError>()
        .expect("connection failure should be an acquisition error");
    assert!(matches!(acq, AcquisitionError::Connection { .. }));
    assert_eq!(acq.exit_code(), 2);
    assert!(!temp_dir.path().join("never.xlsx").exists());
    Ok(())
}
