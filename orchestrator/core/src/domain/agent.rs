// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Vehicle Identity, Grid Positions & Runtime States
//!
//! Value objects shared by every layer of the mission:
//!
//! - [`AgentId`] - immutable vehicle identifier handed out by an [`AgentIdAllocator`].
//! - [`Position`] / [`FieldBounds`] - discrete grid cells and the field rectangle.
//! - [`AgentState`] - the Idle / Moving / Recharging state machine of one vehicle.
//! - [`VehicleSnapshot`] - the observable part of a vehicle (state, cell, battery).
//! - [`AgentError`] - every way a vehicle command can be rejected.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use thiserror::Error;

/// Unique identifier of a vehicle, fixed for its whole lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(pub u32);

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monotonic id sequence owned by whoever builds the vehicles.
///
/// Replaces a process-wide counter: two missions built in the same process
/// (e.g. in tests) each get their own sequence.
#[derive(Debug)]
pub struct AgentIdAllocator {
    next: AtomicU32,
}

impl AgentIdAllocator {
    pub const DEFAULT_FIRST_ID: u32 = 10_000;

    pub fn new() -> Self {
        Self::starting_at(Self::DEFAULT_FIRST_ID)
    }

    pub fn starting_at(first: u32) -> Self {
        Self {
            next: AtomicU32::new(first),
        }
    }

    /// Hand out the next id. Never returns the same id twice.
    pub fn allocate(&self) -> AgentId {
        AgentId(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for AgentIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

/// One grid cell. `x` indexes the field length (rows), `y` the width (columns).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const ORIGIN: Position = Position { x: 0, y: 0 };

    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Number of grid steps between two cells when diagonal moves are allowed.
    pub fn chebyshev_distance(&self, other: &Position) -> u32 {
        self.x.abs_diff(other.x).max(self.y.abs_diff(other.y))
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

impl From<(i32, i32)> for Position {
    fn from((x, y): (i32, i32)) -> Self {
        Self { x, y }
    }
}

/// The field rectangle `[0, length) × [0, width)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldBounds {
    pub length: i32,
    pub width: i32,
}

impl FieldBounds {
    pub const fn new(length: i32, width: i32) -> Self {
        Self { length, width }
    }

    pub fn contains(&self, position: Position) -> bool {
        (0..self.length).contains(&position.x) && (0..self.width).contains(&position.y)
    }

    pub fn cell_count(&self) -> usize {
        (self.length.max(0) as usize) * (self.width.max(0) as usize)
    }
}

impl fmt::Display for FieldBounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.length, self.width)
    }
}

/// Runtime state of a vehicle. A vehicle is in exactly one state at a time and
/// only accepts a new command while `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentState {
    Idle,
    Moving,
    Recharging,
}

impl fmt::Display for AgentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AgentState::Idle => "idle",
            AgentState::Moving => "moving",
            AgentState::Recharging => "recharging",
        };
        f.write_str(label)
    }
}

/// Ground rover or drone. Informational only: both move and read the same way.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleKind {
    #[default]
    Field,
    Aerial,
}

impl fmt::Display for VehicleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VehicleKind::Field => f.write_str("Field vehicle"),
            VehicleKind::Aerial => f.write_str("Aerial vehicle"),
        }
    }
}

/// Point-in-time view of a vehicle, published after every mutation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VehicleSnapshot {
    pub id: AgentId,
    pub state: AgentState,
    pub position: Position,
    pub battery: f64,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AgentError {
    #[error("Position {position} is outside the {bounds} field")]
    OutOfBounds {
        position: Position,
        bounds: FieldBounds,
    },

    #[error("Invalid vehicle configuration: {0}")]
    InvalidConfiguration(String),

    #[error("No soil data available at {0}")]
    SoilUnavailable(Position),

    #[error("Vehicle {agent_id} is busy ({state})")]
    Busy { agent_id: AgentId, state: AgentState },

    #[error("Target {target} cannot be reached from home cell {home} on a full battery")]
    OutOfRange { target: Position, home: Position },

    #[error("Command for vehicle {0} was cancelled")]
    Cancelled(AgentId),

    #[error("Mailbox of vehicle {0} is closed")]
    MailboxClosed(AgentId),
}
