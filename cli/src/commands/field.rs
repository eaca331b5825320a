// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Field inspection commands

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use fieldwatch_core::domain::mission_config::MissionManifest;

#[derive(Subcommand)]
pub enum FieldCommand {
    /// Print the field's soil types and plant layout
    Show,
}

pub async fn handle_command(command: FieldCommand, config_override: Option<PathBuf>) -> Result<()> {
    match command {
        FieldCommand::Show => show(config_override).await,
    }
}

async fn show(config_override: Option<PathBuf>) -> Result<()> {
    let manifest = MissionManifest::load_or_default(config_override)
        .context("Failed to load configuration")?;
    let field = manifest.build_field().context("Failed to build field")?;

    println!("{}", field);
    println!();
    println!("{}", "Soil types:".bold());
    println!("{}", field.render_soil_types());
    println!();
    println!("{}", "Plants:".bold());
    println!("{}", field.render_plants());
    println!();
    println!("{} planted cells", field.plant_positions().len());

    Ok(())
}
