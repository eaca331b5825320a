// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Configuration management commands
//!
//! Commands: show, validate, generate

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use fieldwatch_core::domain::mission_config::MissionManifest;

/// Mission manifest without comments.
pub const MINIMAL_TEMPLATE: &str = include_str!("../../templates/mission-minimal.yaml");

/// Mission manifest documenting every option.
pub const EXAMPLES_TEMPLATE: &str = include_str!("../../templates/mission-with-examples.yaml");

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Show config file paths checked
        #[arg(long)]
        paths: bool,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (default: discover)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Generate sample configuration
    Generate {
        /// Output path (default: ./fieldwatch.yaml)
        #[arg(short, long, default_value = "./fieldwatch.yaml")]
        output: PathBuf,

        /// Include examples and comments
        #[arg(long)]
        examples: bool,
    },
}

pub async fn handle_command(
    command: ConfigCommand,
    config_override: Option<PathBuf>,
) -> Result<()> {
    match command {
        ConfigCommand::Show { paths } => show(config_override, paths).await,
        ConfigCommand::Validate { file } => validate(file.or(config_override)).await,
        ConfigCommand::Generate { output, examples } => generate(output, examples).await,
    }
}

async fn show(config_override: Option<PathBuf>, show_paths: bool) -> Result<()> {
    let config = MissionManifest::load_or_default(config_override.clone())
        .context("Failed to load configuration")?;

    if show_paths {
        println!("{}", "Configuration discovery paths:".bold());
        if let Some(path) = &config_override {
            println!("  1. --config flag: {}", path.display());
        } else {
            println!("  1. --config flag: {}", "(not set)".dimmed());
        }
        println!(
            "  2. FIELDWATCH_CONFIG_PATH: {}",
            std::env::var("FIELDWATCH_CONFIG_PATH")
                .unwrap_or_else(|_| "(not set)".to_string())
                .dimmed()
        );
        println!("  3. ./fieldwatch.yaml");
        println!("  4. ~/.fieldwatch/config.yaml");
        println!("  5. /etc/fieldwatch/config.yaml");
        println!();
    }

    let spec = &config.spec;
    println!("{}", "Current configuration:".bold());
    println!("  Mission: {}", config.metadata.name);
    println!();

    println!("{}", "Field:".bold());
    println!("  Name: {}", spec.field.name);
    println!("  Dimensions: {}", config.bounds());
    println!("  Region patches: {}", spec.field.regions.len());
    println!();

    println!("{}", "Vehicles:".bold());
    for vehicle in &spec.vehicles {
        println!(
            "  {} ({}) at {}",
            vehicle.name.bold(),
            vehicle.kind,
            vehicle.start
        );
        println!("    Speed: {}", vehicle.speed);
        println!("    Battery: {}", vehicle.battery);
        let sensors: Vec<String> = vehicle.sensors.iter().map(ToString::to_string).collect();
        println!("    Sensors: {}", sensors.join(", "));
    }
    println!();

    println!("{}", "Battery:".bold());
    println!("  Move cost: {}", spec.battery.move_cost);
    println!("  Read cost: {}", spec.battery.read_cost);
    println!("  Low water: {}", spec.battery.low_water);
    println!();

    println!("{}", "Timing (ms):".bold());
    println!("  Step: {}", spec.timing.step_ms);
    println!("  Recharge: {}", spec.timing.recharge_ms);
    println!("  Sensor read: {}", spec.timing.sensor_read_ms);
    println!("  Analysis: {}", spec.timing.analysis_ms);
    println!();

    println!("{}", "Output:".bold());
    println!("  Results: {}", spec.output.results_path.display());

    Ok(())
}

async fn validate(config_path: Option<PathBuf>) -> Result<()> {
    println!("Validating configuration...");

    let config = MissionManifest::load_or_default(config_path)
        .context("Failed to load configuration")?;

    config
        .validate()
        .context("Configuration validation failed")?;

    println!("{}", "✓ Configuration is valid".green());

    Ok(())
}

async fn generate(output: PathBuf, with_examples: bool) -> Result<()> {
    let sample = if with_examples {
        EXAMPLES_TEMPLATE
    } else {
        MINIMAL_TEMPLATE
    };

    std::fs::write(&output, sample)
        .with_context(|| format!("Failed to write config to {:?}", output))?;

    println!(
        "{}",
        format!("✓ Configuration generated: {}", output.display()).green()
    );

    Ok(())
}
