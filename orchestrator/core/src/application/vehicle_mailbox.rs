// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Single-slot command mailbox in front of a [`Vehicle`].
//!
//! Each vehicle runs in its own task and owns its state. Callers hold a
//! cloneable [`VehicleHandle`]; every command is "send and await completion",
//! so commands to one vehicle are executed strictly one after another.

use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::application::vehicle::Vehicle;
use crate::domain::agent::{AgentError, AgentId, AgentState, Position, VehicleSnapshot};
use crate::domain::sensor::MeasurementSink;

type Reply<T> = oneshot::Sender<Result<T, AgentError>>;

#[derive(Debug)]
pub enum VehicleCommand {
    MoveTo { target: Position, reply: Reply<Position> },
    ReadAndSend { reply: Reply<usize> },
    Recharge { reply: Reply<()> },
}

#[derive(Debug, Clone)]
pub struct VehicleHandle {
    id: AgentId,
    name: Arc<str>,
    home: Position,
    commands: mpsc::Sender<VehicleCommand>,
    snapshots: watch::Receiver<VehicleSnapshot>,
    cancel: CancellationToken,
}

impl VehicleHandle {
    pub fn id(&self) -> AgentId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn home(&self) -> Position {
        self.home
    }

    /// Latest published state, position and battery.
    pub fn snapshot(&self) -> VehicleSnapshot {
        *self.snapshots.borrow()
    }

    pub fn position(&self) -> Position {
        self.snapshot().position
    }

    pub fn subscribe(&self) -> watch::Receiver<VehicleSnapshot> {
        self.snapshots.clone()
    }

    pub async fn move_to(&self, target: Position) -> Result<Position, AgentError> {
        let (reply, response) = oneshot::channel();
        self.dispatch(VehicleCommand::MoveTo { target, reply }, response)
            .await
    }

    pub async fn read_and_send(&self) -> Result<usize, AgentError> {
        let (reply, response) = oneshot::channel();
        self.dispatch(VehicleCommand::ReadAndSend { reply }, response)
            .await
    }

    pub async fn recharge(&self) -> Result<(), AgentError> {
        let (reply, response) = oneshot::channel();
        self.dispatch(VehicleCommand::Recharge { reply }, response)
            .await
    }

    /// Resolves once the vehicle reports `Idle`.
    pub async fn wait_until_idle(&self) -> Result<(), AgentError> {
        let mut snapshots = self.snapshots.clone();
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(AgentError::Cancelled(self.id)),
            idle = snapshots.wait_for(|s| s.state == AgentState::Idle) => {
                idle.map(|_| ()).map_err(|_| AgentError::MailboxClosed(self.id))
            }
        }
    }

    async fn dispatch<T>(
        &self,
        command: VehicleCommand,
        response: oneshot::Receiver<Result<T, AgentError>>,
    ) -> Result<T, AgentError> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(AgentError::Cancelled(self.id)),
            sent = self.commands.send(command) => {
                sent.map_err(|_| self.closed())?;
            }
        }
        response.await.map_err(|_| self.closed())?
    }

    fn closed(&self) -> AgentError {
        if self.cancel.is_cancelled() {
            AgentError::Cancelled(self.id)
        } else {
            AgentError::MailboxClosed(self.id)
        }
    }
}

/// Move `vehicle` into its own task. The task stops when every handle is
/// dropped or `cancel` fires, and hands the vehicle back through the join
/// handle.
pub fn spawn_vehicle(
    mut vehicle: Vehicle,
    sink: Arc<dyn MeasurementSink>,
    cancel: CancellationToken,
) -> (VehicleHandle, JoinHandle<Vehicle>) {
    let (commands, mut inbox) = mpsc::channel(1);
    let handle = VehicleHandle {
        id: vehicle.id(),
        name: Arc::from(vehicle.name()),
        home: vehicle.home(),
        commands,
        snapshots: vehicle.subscribe(),
        cancel: cancel.clone(),
    };

    let task = tokio::spawn(async move {
        loop {
            let command = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                command = inbox.recv() => match command {
                    Some(command) => command,
                    None => break,
                },
            };

            // A dropped reply receiver just means the caller stopped waiting.
            match command {
                VehicleCommand::MoveTo { target, reply } => {
                    let _ = reply.send(vehicle.move_to(target, &cancel).await);
                }
                VehicleCommand::ReadAndSend { reply } => {
                    let _ = reply.send(vehicle.read_and_send(sink.as_ref(), &cancel).await);
                }
                VehicleCommand::Recharge { reply } => {
                    let _ = reply.send(vehicle.recharge(&cancel).await);
                }
            }
        }
        debug!(agent_id = %vehicle.id(), "Vehicle task stopped");
        vehicle
    });

    (handle, task)
}
