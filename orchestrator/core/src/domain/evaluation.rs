// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Threshold Evaluation
//!
//! Turns one aggregated sensor value into a qualitative verdict. Each soil type
//! has its own optimal and acceptable ("discrete") band per sensor kind:
//!
//! | Sensor            | Sand            | Clay            | Silt            | Loam            |
//! |-------------------|-----------------|-----------------|-----------------|-----------------|
//! | Soil moisture     | 10–30 / 5–40    | 40–60 / 30–70   | 30–50 / 20–60   | 25–50 / 20–60   |
//! | Soil temperature  | 18–25 / 10–30   | 15–22 / 10–28   | 16–24 / 10–30   | 18–25 / 15–30   |
//! | Air humidity      | 40–60 / 30–70   | 50–70 / 40–80   | 40–65 / 30–75   | 50–70 / 40–80   |
//! | Air temperature   | 20–30 / 15–35   | 18–25 / 15–30   | 18–26 / 15–30   | 20–28 / 15–32   |
//!
//! Unknown combinations never fail: they produce an "Unrecognized ..." verdict
//! so a single bad sample cannot stop the analysis loop.

use std::collections::HashMap;

use crate::domain::sensor::SensorKind;
use crate::domain::terrain::SoilType;

pub const UNRECOGNIZED_SOIL: &str = "Unrecognized soil type";
pub const UNRECOGNIZED_SENSOR: &str = "Unrecognized sensor type";

/// Evaluation collaborator consumed by the analysis worker. Must be pure.
pub trait Evaluator: Send + Sync {
    fn evaluate(&self, soil_type: SoilType, sensor: SensorKind, value: f64) -> String;
}

/// Inclusive optimal band nested in an inclusive acceptable band.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Band {
    pub optimal: [f64; 2],
    pub discrete: [f64; 2],
    pub low_label: &'static str,
    pub high_label: &'static str,
}

impl Band {
    pub fn new(sensor: SensorKind, optimal: [f64; 2], discrete: [f64; 2]) -> Self {
        let (low_label, high_label) = sensor.critical_labels();
        Self {
            optimal,
            discrete,
            low_label,
            high_label,
        }
    }

    fn classify(&self, sensor: SensorKind, value: f64) -> String {
        let within = |[lo, hi]: [f64; 2]| value >= lo && value <= hi;
        if within(self.optimal) {
            format!("Optimal {}", sensor.quantity())
        } else if within(self.discrete) {
            format!("Discrete {}", sensor.quantity())
        } else if value < self.discrete[0] {
            format!("Critical: {}", self.low_label)
        } else {
            format!("Critical: {}", self.high_label)
        }
    }
}

#[derive(Debug, Clone)]
pub struct ThresholdEvaluator {
    bands: HashMap<(SoilType, SensorKind), Band>,
}

impl ThresholdEvaluator {
    /// Evaluator with no bands at all; every lookup is unrecognized.
    pub fn empty() -> Self {
        Self {
            bands: HashMap::new(),
        }
    }

    pub fn insert(&mut self, soil_type: SoilType, sensor: SensorKind, band: Band) -> Option<Band> {
        self.bands.insert((soil_type, sensor), band)
    }

    pub fn remove(&mut self, soil_type: SoilType, sensor: SensorKind) -> Option<Band> {
        self.bands.remove(&(soil_type, sensor))
    }

    pub fn band(&self, soil_type: SoilType, sensor: SensorKind) -> Option<&Band> {
        self.bands.get(&(soil_type, sensor))
    }
}

impl Default for ThresholdEvaluator {
    fn default() -> Self {
        use SensorKind::*;
        use SoilType::*;

        #[rustfmt::skip]
        let table: [(SoilType, SensorKind, [f64; 2], [f64; 2]); 16] = [
            (Sand, SoilMoisture,    [10.0, 30.0], [5.0, 40.0]),
            (Clay, SoilMoisture,    [40.0, 60.0], [30.0, 70.0]),
            (Silt, SoilMoisture,    [30.0, 50.0], [20.0, 60.0]),
            (Loam, SoilMoisture,    [25.0, 50.0], [20.0, 60.0]),
            (Sand, SoilTemperature, [18.0, 25.0], [10.0, 30.0]),
            (Clay, SoilTemperature, [15.0, 22.0], [10.0, 28.0]),
            (Silt, SoilTemperature, [16.0, 24.0], [10.0, 30.0]),
            (Loam, SoilTemperature, [18.0, 25.0], [15.0, 30.0]),
            (Sand, AirHumidity,     [40.0, 60.0], [30.0, 70.0]),
            (Clay, AirHumidity,     [50.0, 70.0], [40.0, 80.0]),
            (Silt, AirHumidity,     [40.0, 65.0], [30.0, 75.0]),
            (Loam, AirHumidity,     [50.0, 70.0], [40.0, 80.0]),
            (Sand, AirTemperature,  [20.0, 30.0], [15.0, 35.0]),
            (Clay, AirTemperature,  [18.0, 25.0], [15.0, 30.0]),
            (Silt, AirTemperature,  [18.0, 26.0], [15.0, 30.0]),
            (Loam, AirTemperature,  [20.0, 28.0], [15.0, 32.0]),
        ];

        let mut evaluator = Self::empty();
        for (soil_type, sensor, optimal, discrete) in table {
            evaluator.insert(soil_type, sensor, Band::new(sensor, optimal, discrete));
        }
        evaluator
    }
}

impl Evaluator for ThresholdEvaluator {
    fn evaluate(&self, soil_type: SoilType, sensor: SensorKind, value: f64) -> String {
        match self.band(soil_type, sensor) {
            Some(band) => band.classify(sensor, value),
            None if self.bands.keys().any(|(soil, _)| *soil == soil_type) => {
                UNRECOGNIZED_SENSOR.to_string()
            }
            None => UNRECOGNIZED_SOIL.to_string(),
        }
    }
}
