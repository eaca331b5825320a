// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Mission Orchestration
//!
//! Wires one mission together from its manifest: the field, the vehicles and
//! their mailboxes, the measurement channel, the analysis worker and the
//! control center. Plant cells are split into one contiguous work list per
//! vehicle; results are flushed once, after analysis completes.

use anyhow::{bail, Context, Result};
use futures::future::join_all;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use fieldwatch_core::application::{spawn_vehicle, Vehicle};
use fieldwatch_core::domain::agent::{AgentIdAllocator, Position, VehicleSnapshot};
use fieldwatch_core::domain::evaluation::ThresholdEvaluator;
use fieldwatch_core::domain::mission_config::MissionManifest;
use fieldwatch_core::domain::sensor::MeasurementSink;
use fieldwatch_core::domain::terrain::Terrain;
use fieldwatch_core::infrastructure::result_sink::ResultSink;
use fieldwatch_swarm::application::{
    AnalysisLog, AnalysisSummary, AnalysisWorker, ControlCenter, WorkListReport,
};
use fieldwatch_swarm::{CellReservation, CompletionCoordinator, MeasurementChannel};

/// Final state of one vehicle after its work list ended.
#[derive(Debug, Clone)]
pub struct VehicleOutcome {
    pub name: String,
    pub work: WorkListReport,
    pub final_state: VehicleSnapshot,
}

#[derive(Debug, Clone)]
pub struct MissionReport {
    pub mission: String,
    pub vehicles: Vec<VehicleOutcome>,
    pub analysis: AnalysisSummary,
    pub results: Vec<String>,
    pub elapsed: Duration,
}

/// Split `targets` into `vehicles` contiguous chunks, preserving order.
/// Chunk sizes differ by at most one; earlier chunks are never larger.
pub fn split_work(targets: &[Position], vehicles: usize) -> Vec<Vec<Position>> {
    if vehicles == 0 {
        return Vec::new();
    }
    let total = targets.len();
    (0..vehicles)
        .map(|i| targets[i * total / vehicles..(i + 1) * total / vehicles].to_vec())
        .collect()
}

/// Run the manifest's mission to completion and flush the verdicts to `sink`.
///
/// Fails if the manifest is invalid, a vehicle cannot be placed, or the run
/// is cancelled before analysis completes. A cancelled run flushes nothing.
pub async fn run_mission(
    manifest: &MissionManifest,
    sink: &dyn ResultSink,
    cancel: CancellationToken,
) -> Result<MissionReport> {
    manifest.validate().context("Mission manifest validation failed")?;
    let started = Instant::now();
    let spec = &manifest.spec;

    let field = Arc::new(manifest.build_field().context("Failed to build field")?);
    let completion = Arc::new(CompletionCoordinator::new(spec.vehicles.len()));
    let channel = Arc::new(MeasurementChannel::new(completion.clone()));
    let center = Arc::new(ControlCenter::new(
        field.bounds(),
        Arc::new(CellReservation::new()),
        completion.clone(),
        cancel.clone(),
    ));
    let log = Arc::new(AnalysisLog::new());

    info!(
        mission = %manifest.metadata.name,
        field = %field.bounds(),
        vehicles = spec.vehicles.len(),
        "Starting mission"
    );

    let ids = AgentIdAllocator::new();
    let measurement_sink: Arc<dyn MeasurementSink> = channel.clone();
    let mut handles = Vec::with_capacity(spec.vehicles.len());
    let mut vehicle_tasks = Vec::with_capacity(spec.vehicles.len());
    for vehicle_spec in &spec.vehicles {
        let vehicle = Vehicle::new(
            ids.allocate(),
            vehicle_spec,
            spec.battery,
            spec.timing,
            field.clone(),
        )
        .with_context(|| format!("Failed to create vehicle '{}'", vehicle_spec.name))?;
        let (handle, task) = spawn_vehicle(vehicle, measurement_sink.clone(), cancel.clone());
        center
            .register(&handle)
            .with_context(|| format!("Failed to place vehicle '{}'", vehicle_spec.name))?;
        handles.push(handle);
        vehicle_tasks.push(task);
    }

    let analysis = AnalysisWorker::new(
        channel.clone(),
        field.clone(),
        Arc::new(ThresholdEvaluator::default()),
        log.clone(),
    )
    .with_analysis_delay(spec.timing.analysis())
    .start(cancel.clone());

    let work = split_work(&field.plant_positions(), handles.len());
    let work_lists = handles.iter().cloned().zip(work).map(|(vehicle, targets)| {
        let center = center.clone();
        tokio::spawn(async move { center.run_work_list(&vehicle, &targets).await })
    });

    let mut reports = Vec::with_capacity(handles.len());
    for joined in join_all(work_lists).await {
        reports.push(joined.context("Work list task panicked")?);
    }

    let summary = match analysis.await.context("Analysis worker panicked")? {
        Ok(summary) => summary,
        Err(e) => {
            warn!("Mission ended before analysis completed: {}", e);
            bail!("Mission cancelled before analysis completed");
        }
    };

    for handle in &handles {
        handle
            .wait_until_idle()
            .await
            .with_context(|| format!("Vehicle '{}' did not settle", handle.name()))?;
    }

    // Every mailbox sender is gone once the handles drop, so each vehicle task
    // returns its vehicle.
    drop(handles);
    let mut vehicles = Vec::with_capacity(reports.len());
    for (work, task) in reports.into_iter().zip(vehicle_tasks) {
        let vehicle = task.await.context("Vehicle task panicked")?;
        vehicles.push(VehicleOutcome {
            name: vehicle.name().to_string(),
            work,
            final_state: vehicle.snapshot(),
        });
    }

    let results = log.snapshot();
    sink.flush(&results).await.context("Failed to flush analysis results")?;

    let elapsed = started.elapsed();
    info!(
        mission = %manifest.metadata.name,
        results = results.len(),
        elapsed_ms = elapsed.as_millis() as u64,
        "Mission complete"
    );

    Ok(MissionReport {
        mission: manifest.metadata.name.clone(),
        vehicles,
        analysis: summary,
        results,
        elapsed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(n: i32) -> Vec<Position> {
        (0..n).map(|i| Position::new(i, 0)).collect()
    }

    #[test]
    fn split_is_contiguous_and_balanced() {
        let work = split_work(&cells(10), 2);
        assert_eq!(work[0], cells(5));
        assert_eq!(work[1], (5..10).map(|i| Position::new(i, 0)).collect::<Vec<_>>());

        let sizes: Vec<usize> = split_work(&cells(7), 3).iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![2, 2, 3]);
    }

    #[test]
    fn more_vehicles_than_targets_leaves_some_idle() {
        let work = split_work(&cells(1), 3);
        assert_eq!(work.len(), 3);
        assert_eq!(work.iter().map(Vec::len).sum::<usize>(), 1);
        assert!(split_work(&cells(4), 0).is_empty());
    }
}
