// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-sensor-logger project and is licensed under the
// SCTG Development Non-Commercial License v1.0.

//! # Daemon Module
//!
//! Runs the acquisition session in the background and manages its lifetime.
//!
//! ## Components
//!
//! * **Launch Daemon**: Opens the device and the sinks, runs the polling loop
//!   on a blocking thread next to a heartbeat task, and tears everything down
//!   on request
//!
//! ## Usage
//!
//! ```no_run
//! use rust_sensor_logger::{config::Config, daemon::Daemon};
//!
//! async fn run() -> anyhow::Result<()> {
//!     let config = Config::from_file("config.yaml")?;
//!
//!     let mut daemon = Daemon::new();
//!     daemon.launch(&config).await?;
//!
//!     // Wait for Ctrl+C or for the session to end on its own
//!     tokio::select! {
//!         _ = tokio::signal::ctrl_c() => daemon.shutdown(),
//!         _ = daemon.stopped() => {}
//!     }
//!
//!     let summary = daemon.join().await?;
//!     println!("{} records", summary.records);
//!     Ok(())
//! }
//! ```

pub mod launch_daemon;

pub use launch_daemon::Daemon;
