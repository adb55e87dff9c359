// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-sensor-logger project and is licensed under the
// SCTG Development Non-Commercial License v1.0.

use anyhow::Result;
use rust_sensor_logger::config;

#[test]
fn test_config_schema_output() -> Result<()> {
    // Output goes to stdout; only check that the embedded schema parses
    config::output_config_schema()?;
    Ok(())
}
