// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Control Center
//!
//! Dispatches commands to vehicles. A movement command first reserves the
//! destination cell, then drives the vehicle there and records where it ended
//! up. A work list is a sequence of move-then-read pairs; when it ends, for
//! whatever reason, the vehicle's reservation is released and the vehicle is
//! reported done exactly once.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use fieldwatch_core::application::VehicleHandle;
use fieldwatch_core::domain::agent::{AgentId, FieldBounds, Position};

use crate::domain::completion::CompletionCoordinator;
use crate::domain::error::SwarmError;
use crate::domain::reservation::CellReservation;

/// What one vehicle got through of its work list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkListReport {
    pub agent_id: AgentId,
    pub targets: usize,
    pub visited: usize,
    pub reads: usize,
    pub failures: usize,
    pub cancelled: bool,
}

pub struct ControlCenter {
    bounds: FieldBounds,
    reservations: Arc<CellReservation>,
    completion: Arc<CompletionCoordinator>,
    cancel: CancellationToken,
}

impl ControlCenter {
    pub fn new(
        bounds: FieldBounds,
        reservations: Arc<CellReservation>,
        completion: Arc<CompletionCoordinator>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            bounds,
            reservations,
            completion,
            cancel,
        }
    }

    pub fn reservations(&self) -> &Arc<CellReservation> {
        &self.reservations
    }

    pub fn completion(&self) -> &Arc<CompletionCoordinator> {
        &self.completion
    }

    /// Reserve the vehicle's current cell before the run starts.
    pub fn register(&self, vehicle: &VehicleHandle) -> Result<(), SwarmError> {
        self.reservations
            .try_acquire(vehicle.id(), vehicle.position())
    }

    /// Reserve `target`, move the vehicle there and record its final cell.
    pub async fn send_movement_command(
        &self,
        vehicle: &VehicleHandle,
        target: Position,
    ) -> Result<Position, SwarmError> {
        if !self.bounds.contains(target) {
            return Err(SwarmError::OutOfBounds {
                position: target,
                bounds: self.bounds,
            });
        }

        self.reservations
            .acquire(vehicle.id(), target, &self.cancel)
            .await?;

        match vehicle.move_to(target).await {
            Ok(reached) => {
                self.reservations.update(vehicle.id(), reached);
                Ok(reached)
            }
            Err(e) => {
                // The move stopped short; keep the claim on the target if the
                // vehicle's actual cell is taken.
                self.reservations.update(vehicle.id(), vehicle.position());
                Err(e.into())
            }
        }
    }

    /// Read at the vehicle's current cell and push the batch downstream.
    pub async fn command_data_read(&self, vehicle: &VehicleHandle) -> Result<usize, SwarmError> {
        Ok(vehicle.read_and_send().await?)
    }

    /// Visit every target in order, reading at each one. Failed targets are
    /// logged and skipped; cancellation ends the list early.
    pub async fn run_work_list(
        &self,
        vehicle: &VehicleHandle,
        targets: &[Position],
    ) -> WorkListReport {
        let mut report = WorkListReport {
            agent_id: vehicle.id(),
            targets: targets.len(),
            visited: 0,
            reads: 0,
            failures: 0,
            cancelled: false,
        };
        info!(agent_id = %vehicle.id(), name = vehicle.name(), targets = targets.len(), "Starting work list");

        for &target in targets {
            if self.cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }

            let step = match self.send_movement_command(vehicle, target).await {
                Ok(_) => {
                    report.visited += 1;
                    self.command_data_read(vehicle).await.map(|_| ())
                }
                Err(e) => Err(e),
            };

            match step {
                Ok(()) => report.reads += 1,
                Err(e) if e.is_cancelled() => {
                    report.cancelled = true;
                    break;
                }
                Err(e) => {
                    report.failures += 1;
                    warn!(agent_id = %vehicle.id(), target = %target, "Skipping target: {}", e);
                }
            }
        }

        self.reservations.release(vehicle.id());
        self.completion.mark_agent_done();
        info!(
            agent_id = %vehicle.id(),
            visited = report.visited,
            reads = report.reads,
            failures = report.failures,
            cancelled = report.cancelled,
            "Work list finished"
        );
        report
    }
}
