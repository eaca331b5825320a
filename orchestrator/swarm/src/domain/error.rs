// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use fieldwatch_core::domain::agent::{AgentError, AgentId, FieldBounds, Position};
use thiserror::Error;

/// Errors that can occur during swarm coordination.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SwarmError {
    #[error("Coordination was cancelled")]
    Cancelled,

    #[error("Position {position} is outside the {bounds} field")]
    OutOfBounds {
        position: Position,
        bounds: FieldBounds,
    },

    #[error("Cell {position} is already reserved by vehicle {held_by}")]
    CellOccupied { position: Position, held_by: AgentId },

    #[error(transparent)]
    Agent(#[from] AgentError),
}

impl SwarmError {
    /// True for both coordination-level and vehicle-level cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            SwarmError::Cancelled | SwarmError::Agent(AgentError::Cancelled(_))
        )
    }
}
