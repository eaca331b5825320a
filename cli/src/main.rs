// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # fieldwatch CLI
//!
//! The `fieldwatch` binary runs a field survey mission: a small fleet of
//! vehicles visits every planted cell, reads its sensors, and a single
//! analysis worker turns the readings into per-cell verdicts.
//!
//! ## Commands
//!
//! - `fieldwatch run` - Run the configured mission and write the verdicts
//! - `fieldwatch field show` - Print the configured field grids
//! - `fieldwatch config show|validate|generate` - Configuration management

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

use fieldwatch::commands::{self, ConfigCommand, FieldCommand, RunArgs};
use fieldwatch::telemetry;

/// fieldwatch - Coordinate grid vehicles surveying a field
#[derive(Parser)]
#[command(name = "fieldwatch")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to mission manifest (overrides discovery)
    #[arg(
        short,
        long,
        global = true,
        env = "FIELDWATCH_CONFIG_PATH",
        value_name = "FILE"
    )]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "FIELDWATCH_LOG_LEVEL", default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the mission and write the analysis results
    Run(RunArgs),

    /// Inspect the configured field
    #[command(name = "field")]
    Field {
        #[command(subcommand)]
        command: FieldCommand,
    },

    /// Manage configuration
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    telemetry::init_logging(&cli.log_level)?;

    match cli.command {
        Some(Commands::Run(args)) => commands::run::execute(args, cli.config).await,
        Some(Commands::Field { command }) => {
            commands::field::handle_command(command, cli.config).await
        }
        Some(Commands::Config { command }) => {
            commands::config::handle_command(command, cli.config).await
        }
        None => {
            println!(
                "{}",
                "No command specified. Use --help for usage information.".yellow()
            );
            std::process::exit(1);
        }
    }
}
