// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Vehicle Runtime
//!
//! One [`Vehicle`] owns its state, position and battery. Only its own commands
//! mutate them; everyone else observes the published [`VehicleSnapshot`].
//!
//! ```text
//!   Idle ──move_to / read_and_send──▶ Moving ──▶ Idle
//!   Idle ──recharge (at home)───────▶ Recharging ──▶ Idle
//!   Moving ──low battery──▶ walk home ──▶ Recharging ──▶ Moving (resume)
//! ```
//!
//! Every simulated delay observes the mission's [`CancellationToken`], so a
//! cancelled command returns [`AgentError::Cancelled`] and the vehicle is back
//! to `Idle` in bounded time.

use metrics::{counter, gauge};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::domain::agent::{
    AgentError, AgentId, AgentState, Position, VehicleKind, VehicleSnapshot,
};
use crate::domain::battery::{Battery, BatteryConfig, FULL_CHARGE};
use crate::domain::mission_config::{TimingConfig, VehicleSpec};
use crate::domain::navigation::{next_step, Excursion, ExcursionStep};
use crate::domain::sensor::{MeasurementBatch, MeasurementSample, MeasurementSink, SensorKind};
use crate::domain::terrain::Terrain;
use crate::metrics::{
    FORCED_RECHARGES_TOTAL, VEHICLE_BATTERY_LEVEL, VEHICLE_COMMAND_ERRORS_TOTAL,
    VEHICLE_READS_TOTAL, VEHICLE_STEPS_TOTAL,
};

pub struct Vehicle {
    id: AgentId,
    name: String,
    kind: VehicleKind,
    home: Position,
    position: Position,
    speed: f64,
    step_delay: Duration,
    battery: Battery,
    sensors: Vec<SensorKind>,
    state: AgentState,
    battery_config: BatteryConfig,
    timing: TimingConfig,
    terrain: Arc<dyn Terrain>,
    snapshots: watch::Sender<VehicleSnapshot>,
}

impl Vehicle {
    /// Validates the vehicle settings against the terrain. The start cell becomes the
    /// vehicle's home cell.
    pub fn new(
        id: AgentId,
        spec: &VehicleSpec,
        battery_config: BatteryConfig,
        timing: TimingConfig,
        terrain: Arc<dyn Terrain>,
    ) -> Result<Self, AgentError> {
        if !(spec.speed > 0.0 && spec.speed.is_finite()) {
            return Err(AgentError::InvalidConfiguration(format!(
                "speed of '{}' must be positive (got {})",
                spec.name, spec.speed
            )));
        }
        let step_delay = timing.step_duration(spec.speed).ok_or_else(|| {
            AgentError::InvalidConfiguration(format!(
                "speed {} of '{}' gives an unrepresentable step duration",
                spec.speed, spec.name
            ))
        })?;
        let battery = Battery::new(spec.battery)?;
        battery_config.validate()?;

        let bounds = terrain.bounds();
        if !bounds.contains(spec.start) {
            return Err(AgentError::OutOfBounds {
                position: spec.start,
                bounds,
            });
        }

        let snapshot = VehicleSnapshot {
            id,
            state: AgentState::Idle,
            position: spec.start,
            battery: battery.level(),
        };
        let (snapshots, _) = watch::channel(snapshot);

        Ok(Self {
            id,
            name: spec.name.clone(),
            kind: spec.kind,
            home: spec.start,
            position: spec.start,
            speed: spec.speed,
            step_delay,
            battery,
            sensors: spec.sensors.clone(),
            state: AgentState::Idle,
            battery_config,
            timing,
            terrain,
            snapshots,
        })
    }

    pub fn id(&self) -> AgentId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> VehicleKind {
        self.kind
    }

    pub fn home(&self) -> Position {
        self.home
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn battery_level(&self) -> f64 {
        self.battery.level()
    }

    pub fn state(&self) -> AgentState {
        self.state
    }

    pub fn sensors(&self) -> &[SensorKind] {
        &self.sensors
    }

    pub fn snapshot(&self) -> VehicleSnapshot {
        VehicleSnapshot {
            id: self.id,
            state: self.state,
            position: self.position,
            battery: self.battery.level(),
        }
    }

    /// Receiver that always holds the latest snapshot.
    pub fn subscribe(&self) -> watch::Receiver<VehicleSnapshot> {
        self.snapshots.subscribe()
    }

    /// Walk to `target`, stepping one cell per `step_ms / speed`.
    ///
    /// Returns the final position. Fails without touching position or battery
    /// when the target is outside the field or out of range from home.
    pub async fn move_to(
        &mut self,
        target: Position,
        cancel: &CancellationToken,
    ) -> Result<Position, AgentError> {
        self.ensure_idle()?;
        let outcome = match self.check_target(target, 0.0) {
            Ok(()) => {
                info!(agent_id = %self.id, from = %self.position, to = %target, "Moving vehicle");
                self.set_state(AgentState::Moving);
                let walked = self.walk_to(target, cancel).await;
                self.settle();
                walked.map(|()| self.position)
            }
            Err(e) => Err(e),
        };
        self.record_failure(&outcome);
        outcome
    }

    /// Read every attached sensor at the current cell and push the resulting
    /// batch to `sink`. Returns the number of samples sent.
    pub async fn read_and_send(
        &mut self,
        sink: &dyn MeasurementSink,
        cancel: &CancellationToken,
    ) -> Result<usize, AgentError> {
        self.ensure_idle()?;
        let outcome = match self.check_target(self.position, self.battery_config.read_cost) {
            Ok(()) => {
                self.set_state(AgentState::Moving);
                let read = self.read_cycle(sink, cancel).await;
                self.settle();
                read
            }
            Err(e) => Err(e),
        };
        self.record_failure(&outcome);
        outcome
    }

    /// Return to the home cell (if needed) and charge to full.
    pub async fn recharge(&mut self, cancel: &CancellationToken) -> Result<(), AgentError> {
        self.ensure_idle()?;
        let busy = if self.position == self.home {
            AgentState::Recharging
        } else {
            AgentState::Moving
        };
        self.set_state(busy);
        let outcome = self.run_excursion(cancel).await;
        self.settle();
        self.record_failure(&outcome);
        outcome
    }

    fn ensure_idle(&self) -> Result<(), AgentError> {
        match self.state {
            AgentState::Idle => Ok(()),
            state => Err(AgentError::Busy {
                agent_id: self.id,
                state,
            }),
        }
    }

    /// Bounds and range check. A destination is in range when a full battery
    /// covers the round trip from home plus `extra` without reaching low water,
    /// which keeps every command to at most one recharge excursion.
    fn check_target(&self, target: Position, extra: f64) -> Result<(), AgentError> {
        let bounds = self.terrain.bounds();
        if !bounds.contains(target) {
            return Err(AgentError::OutOfBounds {
                position: target,
                bounds,
            });
        }
        let trip = 2.0 * self.reserve_from(target) + extra;
        if trip > 0.0 && trip >= self.battery_config.usable_budget() {
            return Err(AgentError::OutOfRange {
                target,
                home: self.home,
            });
        }
        Ok(())
    }

    async fn walk_to(&mut self, target: Position, cancel: &CancellationToken) -> Result<(), AgentError> {
        while self.position != target {
            let next = next_step(self.position, target);
            if self.needs_recharge(self.battery_config.move_cost, next) {
                if self.position == self.home && self.battery.level() >= FULL_CHARGE {
                    return Err(AgentError::OutOfRange {
                        target,
                        home: self.home,
                    });
                }
                self.forced_recharge(cancel).await?;
                continue;
            }
            self.step(next, cancel).await?;
        }
        Ok(())
    }

    /// Charge needed to walk from `cell` back home.
    fn reserve_from(&self, cell: Position) -> f64 {
        f64::from(cell.chebyshev_distance(&self.home)) * self.battery_config.move_cost
    }

    /// True when spending `cost` and then standing on `cell` would leave too
    /// little charge to walk home without reaching low water.
    fn needs_recharge(&self, cost: f64, cell: Position) -> bool {
        self.battery
            .would_cross(cost + self.reserve_from(cell), self.battery_config.low_water)
    }

    async fn read_cycle(
        &mut self,
        sink: &dyn MeasurementSink,
        cancel: &CancellationToken,
    ) -> Result<usize, AgentError> {
        let at = self.position;
        let soil = self
            .terrain
            .soil_at(at)
            .ok_or(AgentError::SoilUnavailable(at))?;

        if self.needs_recharge(self.battery_config.read_cost, at) {
            self.forced_recharge(cancel).await?;
            self.walk_to(at, cancel).await?;
        }

        let mut samples = Vec::with_capacity(self.sensors.len());
        for sensor in &self.sensors {
            self.pause(self.timing.sensor_read(), cancel).await?;
            samples.push(MeasurementSample {
                position: at,
                sensor: *sensor,
                value: sensor.read(&soil),
            });
        }

        self.spend(self.battery_config.read_cost);
        self.publish();

        let batch = MeasurementBatch::new(self.id, at, samples);
        let sent = batch.len();
        sink.push(batch);

        counter!(VEHICLE_READS_TOTAL, "agent_id" => self.id.to_string()).increment(1);
        info!(agent_id = %self.id, position = %at, samples = sent, "Measurement batch sent");
        Ok(sent)
    }

    async fn forced_recharge(&mut self, cancel: &CancellationToken) -> Result<(), AgentError> {
        info!(
            agent_id = %self.id,
            position = %self.position,
            home = %self.home,
            battery = self.battery.level(),
            "Battery low, returning home to recharge"
        );
        counter!(FORCED_RECHARGES_TOTAL, "agent_id" => self.id.to_string()).increment(1);
        self.run_excursion(cancel).await
    }

    async fn run_excursion(&mut self, cancel: &CancellationToken) -> Result<(), AgentError> {
        let mut excursion = Excursion::plan(self.position, self.home);
        loop {
            match excursion.advance() {
                ExcursionStep::Move(cell) => self.step(cell, cancel).await?,
                ExcursionStep::Recharge => self.charge_at_home(cancel).await?,
                ExcursionStep::Done => return Ok(()),
            }
        }
    }

    async fn charge_at_home(&mut self, cancel: &CancellationToken) -> Result<(), AgentError> {
        let resume = self.state;
        self.set_state(AgentState::Recharging);
        self.pause(self.timing.recharge(), cancel).await?;
        self.battery.recharge();
        info!(agent_id = %self.id, "Battery recharged");
        self.set_state(resume);
        Ok(())
    }

    async fn step(&mut self, next: Position, cancel: &CancellationToken) -> Result<(), AgentError> {
        self.pause(self.step_delay, cancel).await?;
        self.position = next;
        self.spend(self.battery_config.move_cost);
        self.publish();
        counter!(VEHICLE_STEPS_TOTAL, "agent_id" => self.id.to_string()).increment(1);
        debug!(agent_id = %self.id, x = next.x, y = next.y, battery = self.battery.level(), "Step");
        Ok(())
    }

    async fn pause(&self, duration: Duration, cancel: &CancellationToken) -> Result<(), AgentError> {
        if cancel.is_cancelled() {
            return Err(AgentError::Cancelled(self.id));
        }
        if duration.is_zero() {
            tokio::task::yield_now().await;
            return Ok(());
        }
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(AgentError::Cancelled(self.id)),
            _ = tokio::time::sleep(duration) => Ok(()),
        }
    }

    fn spend(&mut self, cost: f64) {
        let shortfall = self.battery.drain(cost);
        if shortfall > 0.0 {
            warn!(
                agent_id = %self.id,
                position = %self.position,
                shortfall,
                "Battery overdrawn"
            );
        }
    }

    fn set_state(&mut self, state: AgentState) {
        self.state = state;
        self.publish();
    }

    fn settle(&mut self) {
        self.set_state(AgentState::Idle);
    }

    fn publish(&self) {
        let snapshot = self.snapshot();
        gauge!(VEHICLE_BATTERY_LEVEL, "agent_id" => self.id.to_string()).set(snapshot.battery);
        self.snapshots.send_replace(snapshot);
    }

    fn record_failure<T>(&self, outcome: &Result<T, AgentError>) {
        if let Err(e) = outcome {
            let reason = match e {
                AgentError::OutOfBounds { .. } => "out_of_bounds",
                AgentError::InvalidConfiguration(_) => "invalid_configuration",
                AgentError::SoilUnavailable(_) => "soil_unavailable",
                AgentError::Busy { .. } => "busy",
                AgentError::OutOfRange { .. } => "out_of_range",
                AgentError::Cancelled(_) => "cancelled",
                AgentError::MailboxClosed(_) => "mailbox_closed",
            };
            counter!(VEHICLE_COMMAND_ERRORS_TOTAL, "agent_id" => self.id.to_string(), "reason" => reason)
                .increment(1);
            warn!(agent_id = %self.id, error = %e, "Vehicle command failed");
        }
    }
}

impl std::fmt::Debug for Vehicle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vehicle")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("state", &self.state)
            .field("position", &self.position)
            .field("battery", &self.battery.level())
            .finish()
    }
}
