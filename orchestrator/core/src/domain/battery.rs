// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Battery Model
//!
//! Every grid step and every read event drains a fixed cost. Before an
//! operation would leave less than the walk home above the low-water mark,
//! the vehicle has to fit in a return-to-home recharge first (see
//! [`crate::domain::navigation::Excursion`]).

use serde::{Deserialize, Serialize};

use crate::domain::agent::AgentError;

pub const FULL_CHARGE: f64 = 100.0;

/// Per-operation battery costs, shared by all vehicles of a mission.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BatteryConfig {
    /// Drained by each grid step (including steps of a recharge excursion)
    #[serde(default = "default_move_cost")]
    pub move_cost: f64,

    /// Drained once per read event
    #[serde(default = "default_read_cost")]
    pub read_cost: f64,

    /// Level that must never be reached by a planned operation
    #[serde(default = "default_low_water")]
    pub low_water: f64,
}

impl BatteryConfig {
    pub fn validate(&self) -> Result<(), AgentError> {
        if !(self.move_cost >= 0.0 && self.read_cost >= 0.0) {
            return Err(AgentError::InvalidConfiguration(format!(
                "battery costs must be non-negative (move {}, read {})",
                self.move_cost, self.read_cost
            )));
        }
        if !(0.0..FULL_CHARGE).contains(&self.low_water) {
            return Err(AgentError::InvalidConfiguration(format!(
                "low-water mark {} must lie in [0, {})",
                self.low_water, FULL_CHARGE
            )));
        }
        Ok(())
    }

    /// Charge a full battery can spend before touching the low-water mark.
    pub fn usable_budget(&self) -> f64 {
        FULL_CHARGE - self.low_water
    }
}

impl Default for BatteryConfig {
    fn default() -> Self {
        Self {
            move_cost: default_move_cost(),
            read_cost: default_read_cost(),
            low_water: default_low_water(),
        }
    }
}

/// Charge level, always within `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Battery {
    level: f64,
}

impl Battery {
    /// Initial charge must lie in `(0, 100]`.
    pub fn new(level: f64) -> Result<Self, AgentError> {
        if level > 0.0 && level <= FULL_CHARGE {
            Ok(Self { level })
        } else {
            Err(AgentError::InvalidConfiguration(format!(
                "battery level {} must lie in (0, {}]",
                level, FULL_CHARGE
            )))
        }
    }

    pub fn full() -> Self {
        Self { level: FULL_CHARGE }
    }

    pub fn level(&self) -> f64 {
        self.level
    }

    /// True when spending `cost` would leave the level at or below `low_water`.
    pub fn would_cross(&self, cost: f64, low_water: f64) -> bool {
        cost > 0.0 && self.level - cost <= low_water
    }

    /// Drains `amount`, saturating at zero. Returns the part of `amount` the
    /// battery could not cover, which is zero unless the caller overdrew it.
    #[must_use]
    pub fn drain(&mut self, amount: f64) -> f64 {
        let amount = amount.max(0.0);
        let shortfall = (amount - self.level).max(0.0);
        self.level = (self.level - amount).clamp(0.0, FULL_CHARGE);
        shortfall
    }

    pub fn recharge(&mut self) {
        self.level = FULL_CHARGE;
    }
}

fn default_move_cost() -> f64 {
    1.0
}

fn default_read_cost() -> f64 {
    2.0
}

fn default_low_water() -> f64 {
    10.0
}
