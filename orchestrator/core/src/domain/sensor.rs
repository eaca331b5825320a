// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Sensors, measurement samples and the batches vehicles send to analysis.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::domain::agent::{AgentId, Position};
use crate::domain::terrain::SoilReading;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorKind {
    SoilMoisture,
    SoilTemperature,
    AirHumidity,
    AirTemperature,
}

impl SensorKind {
    pub const ALL: [SensorKind; 4] = [
        SensorKind::SoilMoisture,
        SensorKind::SoilTemperature,
        SensorKind::AirHumidity,
        SensorKind::AirTemperature,
    ];

    /// Observed quantity, as used in verdicts ("Optimal soil moisture").
    pub fn quantity(&self) -> &'static str {
        match self {
            SensorKind::SoilMoisture => "soil moisture",
            SensorKind::SoilTemperature => "soil temperature",
            SensorKind::AirHumidity => "air humidity",
            SensorKind::AirTemperature => "air temperature",
        }
    }

    /// Critical labels for readings below / above the acceptable band.
    pub fn critical_labels(&self) -> (&'static str, &'static str) {
        match self {
            SensorKind::SoilMoisture => ("Too dry", "Too wet"),
            SensorKind::SoilTemperature => ("Too cold soil", "Too hot soil"),
            SensorKind::AirHumidity => ("Too dry air", "Too humid"),
            SensorKind::AirTemperature => ("Air too cold", "Air too hot"),
        }
    }

    pub fn read(&self, soil: &SoilReading) -> f64 {
        match self {
            SensorKind::SoilMoisture => soil.soil_moisture,
            SensorKind::SoilTemperature => soil.soil_temperature,
            SensorKind::AirHumidity => soil.air_humidity,
            SensorKind::AirTemperature => soil.air_temperature,
        }
    }
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SensorKind::SoilMoisture => "Moisture sensor",
            SensorKind::SoilTemperature => "Soil temperature sensor",
            SensorKind::AirHumidity => "Humidity sensor",
            SensorKind::AirTemperature => "Air temperature sensor",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MeasurementSample {
    pub position: Position,
    pub sensor: SensorKind,
    pub value: f64,
}

/// All samples of one read event at one cell. Moved through the pipeline as a
/// unit, never split or merged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementBatch {
    pub agent_id: AgentId,
    pub position: Position,
    pub samples: Vec<MeasurementSample>,
    pub collected_at: DateTime<Utc>,
}

impl MeasurementBatch {
    pub fn new(agent_id: AgentId, position: Position, samples: Vec<MeasurementSample>) -> Self {
        Self {
            agent_id,
            position,
            samples,
            collected_at: Utc::now(),
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Values grouped by sensor kind. Several samples of the same kind are
    /// summed, not averaged.
    pub fn totals_by_sensor(&self) -> BTreeMap<SensorKind, f64> {
        let mut totals = BTreeMap::new();
        for sample in &self.samples {
            *totals.entry(sample.sensor).or_insert(0.0) += sample.value;
        }
        totals
    }
}

/// Where vehicles deliver their batches. Pushing never blocks.
pub trait MeasurementSink: Send + Sync {
    fn push(&self, batch: MeasurementBatch);
}
