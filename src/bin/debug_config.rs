// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-sensor-logger project and is licensed under the
// SCTG Development Non-Commercial License v1.0.

// Load a configuration file and print the effective settings
use anyhow::Result;
use clap::Parser;
use rust_sensor_logger::config::Config;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(author, version, about = "Print the effective logger configuration")]
struct Args {
    /// Configuration file to load
    #[arg(default_value = "config.yaml")]
    path: PathBuf,
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Debug)
        .init();
    let args = Args::parse();

    println!("Testing file: {:?}", args.path);
    println!("File exists: {}", args.path.exists());

    match Config::from_file(&args.path) {
        Ok(config) => {
            println!("Validation succeeded");
            println!("{}", serde_yml::to_string(&config)?);
            println!("Columns: {}", config.acquisition.header_labels().join(", "));
        }
        Err(e) => println!("Validation failed: {:#}", e),
    }

    Ok(())
}
