// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Mission run command

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use fieldwatch_core::domain::mission_config::MissionManifest;
use fieldwatch_core::infrastructure::result_sink::FileResultSink;

use crate::mission::{run_mission, MissionReport};
use crate::telemetry;

#[derive(Args)]
pub struct RunArgs {
    /// Results file (overrides spec.output.results_path)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Write Prometheus metrics to this file when the mission ends
    #[arg(long, value_name = "FILE")]
    pub metrics_out: Option<PathBuf>,
}

pub async fn execute(args: RunArgs, config_override: Option<PathBuf>) -> Result<()> {
    let mut manifest = MissionManifest::load_or_default(config_override)
        .context("Failed to load configuration")?;
    if let Some(output) = args.output {
        manifest.spec.output.results_path = output;
    }

    let metrics = match &args.metrics_out {
        Some(_) => Some(telemetry::install_recorder()?),
        None => None,
    };

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling mission");
            interrupt.cancel();
        }
    });

    let sink = FileResultSink::new(manifest.spec.output.results_path.clone());
    let report = run_mission(&manifest, &sink, cancel).await?;
    print_report(&report, &sink);

    if let (Some(path), Some(handle)) = (&args.metrics_out, &metrics) {
        telemetry::write_metrics(handle, path)?;
    }

    Ok(())
}

fn print_report(report: &MissionReport, sink: &FileResultSink) {
    println!(
        "{}",
        format!("✓ Mission '{}' complete", report.mission).green()
    );
    println!();

    println!("{}", "Vehicles:".bold());
    for outcome in &report.vehicles {
        let work = &outcome.work;
        let line = format!(
            "  {} [{}] visited {}/{} cells, {} reads, ended at {} with battery {:.1}",
            outcome.name.bold(),
            work.agent_id,
            work.visited,
            work.targets,
            work.reads,
            outcome.final_state.position,
            outcome.final_state.battery,
        );
        println!("{}", line);
        if work.failures > 0 {
            println!("    {}", format!("{} targets skipped", work.failures).yellow());
        }
    }
    println!();

    println!("{}", "Analysis:".bold());
    println!("  Batches analyzed: {}", report.analysis.batches_analyzed);
    println!("  Batches skipped: {}", report.analysis.batches_skipped);
    println!("  Verdicts: {}", report.results.len());
    println!("  Elapsed: {:.2?}", report.elapsed);
    println!();
    println!("Results written to {}", sink.path().display());
}
