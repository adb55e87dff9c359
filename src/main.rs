// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-sensor-logger project and is licensed under the
// SCTG Development Non-Commercial License v1.0.

// Main entry point for the serial sensor logger
use anyhow::Result;
use clap::Parser;
use log::{error, info};
use rust_sensor_logger::acquisition::{self, AcquisitionError};
use rust_sensor_logger::config::{self, Config};
use rust_sensor_logger::daemon::Daemon;
use std::path::PathBuf;
use tokio::signal;

/// Multi-channel sensor logger for serial acquisition devices
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file (YAML format)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Serial port of the acquisition device
    #[arg(long)]
    port: Option<String>,

    /// Serial line speed
    #[arg(long)]
    baud_rate: Option<u32>,

    /// Output table (.xlsx or .csv)
    #[arg(long)]
    output: Option<PathBuf>,

    /// Timing window in seconds
    #[arg(long)]
    max_time: Option<f64>,

    /// Use a simulated device instead of the serial port
    #[arg(long)]
    simulate: bool,

    /// List available serial ports and exit
    #[arg(long = "list-ports", default_value_t = false)]
    list_ports: bool,

    /// Path to a configuration to validate and exit
    #[arg(long)]
    validate_config: Option<PathBuf>,

    /// Output the configuration schema as JSON and exit
    #[arg(long)]
    show_config_schema: bool,

    /// Enable verbose logging (debug level)
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,

    /// Disable all logging output
    #[arg(short = 'q', long = "quiet")]
    quiet: bool,
}

/// Log an error and exit with the code matching its kind
fn exit_with(err: anyhow::Error) -> ! {
    match err.downcast_ref::<AcquisitionError>() {
        Some(acq) => {
            error!("{}", acq);
            eprintln!("Error: {}", acq);
            std::process::exit(acq.exit_code());
        }
        None => {
            error!("{:#}", err);
            eprintln!("Error: {:#}", err);
            std::process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.quiet {
        log::LevelFilter::Off
    } else if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    if args.list_ports {
        let ports = acquisition::list_ports()?;
        println!("Available serial ports:");
        for port in ports {
            println!("- {}", port);
        }
        return Ok(());
    }

    if args.show_config_schema {
        return config::output_config_schema();
    }

    if let Some(validate_path) = args.validate_config {
        if !validate_path.exists() {
            return Err(anyhow::anyhow!(
                "Configuration file does not exist: {}",
                validate_path.display()
            ));
        }
        Config::from_file(&validate_path)
            .map_err(|err| anyhow::anyhow!("Configuration validation failed: {}", err))?;
        println!("Configuration file is valid: {}", validate_path.display());
        return Ok(());
    }

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from("config.yaml"));
    let mut config = Config::from_file(&config_path)?;

    config.apply_args(
        args.port.clone(),
        args.baud_rate,
        args.output.clone(),
        args.max_time,
        args.simulate,
    );
    // Overrides bypass the schema, check them again
    config::validate_specific_rules(&config)?;

    info!(
        "Logging {} channels from {} at {} baud",
        config.acquisition.channel_count(),
        config.serial.port,
        config.serial.baud_rate
    );

    let mut daemon = Daemon::new();
    if let Err(err) = daemon.launch(&config).await {
        exit_with(err);
    }

    tokio::select! {
        result = signal::ctrl_c() => {
            match result {
                Ok(()) => info!("Received shutdown signal, stopping acquisition"),
                Err(err) => error!("Error waiting for shutdown signal: {}", err),
            }
            daemon.shutdown();
        }
        _ = daemon.stopped() => {
            info!("Acquisition stopped");
        }
    }

    match daemon.join().await {
        Ok(summary) => {
            info!(
                "Session started {} recorded {} rows to {}",
                summary.started_at.format("%Y-%m-%d %H:%M:%S"),
                summary.records,
                config.storage.output_path
            );
            if let Some(last) = summary.last_timestamp {
                info!(
                    "Last record at {:.3}s, accumulated elapsed time {:.3}s",
                    last.as_secs_f64(),
                    summary.elapsed_total.as_secs_f64()
                );
            }
            Ok(())
        }
        Err(err) => exit_with(err),
    }
}
