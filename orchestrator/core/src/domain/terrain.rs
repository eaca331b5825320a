// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Field & Soil Model
//!
//! The field is a `length × width` matrix of [`Soil`] cells. It starts filled
//! with the default soil and is then patched region by region while the
//! mission is being configured; during a run it is shared read-only through
//! the [`Terrain`] trait.
//!
//! Soil temperature is never set directly. It is derived from the air
//! temperature, soil moisture and air humidity with a per-soil-type
//! conductivity formula.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::domain::agent::{FieldBounds, Position};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SoilType {
    Clay,
    Sand,
    Loam,
    Silt,
}

impl SoilType {
    pub const ALL: [SoilType; 4] = [SoilType::Clay, SoilType::Sand, SoilType::Loam, SoilType::Silt];

    pub fn as_str(&self) -> &'static str {
        match self {
            SoilType::Clay => "Clay",
            SoilType::Sand => "Sand",
            SoilType::Loam => "Loam",
            SoilType::Silt => "Silt",
        }
    }
}

impl fmt::Display for SoilType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TerrainError {
    #[error("Humidity and moisture must be between 0 and 100 (got {0})")]
    InvalidHumidity(f64),

    #[error("Region rows {row_start}..={row_end}, cols {col_start}..={col_end} is outside the {bounds} field")]
    RegionOutOfBounds {
        row_start: i32,
        row_end: i32,
        col_start: i32,
        col_end: i32,
        bounds: FieldBounds,
    },

    #[error("Invalid field dimensions {length}x{width}")]
    InvalidDimensions { length: i32, width: i32 },
}

/// Everything a sensor can observe at one cell.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SoilReading {
    pub soil_type: SoilType,
    pub has_plants: bool,
    pub soil_moisture: f64,
    pub soil_temperature: f64,
    pub air_temperature: f64,
    pub air_humidity: f64,
}

/// Terrain collaborator consumed by vehicles and the analysis worker.
pub trait Terrain: Send + Sync {
    fn bounds(&self) -> FieldBounds;

    /// `None` when the position is not part of the field.
    fn soil_at(&self, position: Position) -> Option<SoilReading>;
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Soil {
    soil_type: SoilType,
    plants: bool,
    soil_moisture: f64,
    air_temperature: f64,
    air_humidity: f64,
}

impl Default for Soil {
    fn default() -> Self {
        Self {
            soil_type: SoilType::Loam,
            plants: false,
            soil_moisture: 50.0,
            air_temperature: 20.0,
            air_humidity: 50.0,
        }
    }
}

impl Soil {
    pub fn new(
        soil_type: SoilType,
        plants: bool,
        soil_moisture: f64,
        air_temperature: f64,
        air_humidity: f64,
    ) -> Result<Self, TerrainError> {
        check_percentage(soil_moisture)?;
        check_percentage(air_humidity)?;
        Ok(Self {
            soil_type,
            plants,
            soil_moisture,
            air_temperature,
            air_humidity,
        })
    }

    pub fn soil_type(&self) -> SoilType {
        self.soil_type
    }

    pub fn has_plants(&self) -> bool {
        self.plants
    }

    pub fn soil_moisture(&self) -> f64 {
        self.soil_moisture
    }

    pub fn air_temperature(&self) -> f64 {
        self.air_temperature
    }

    pub fn air_humidity(&self) -> f64 {
        self.air_humidity
    }

    pub fn set_soil_type(&mut self, soil_type: SoilType) {
        self.soil_type = soil_type;
    }

    pub fn set_plants(&mut self, plants: bool) {
        self.plants = plants;
    }

    pub fn set_soil_moisture(&mut self, soil_moisture: f64) -> Result<(), TerrainError> {
        check_percentage(soil_moisture)?;
        self.soil_moisture = soil_moisture;
        Ok(())
    }

    pub fn set_air_temperature(&mut self, air_temperature: f64) {
        self.air_temperature = air_temperature;
    }

    pub fn set_air_humidity(&mut self, air_humidity: f64) -> Result<(), TerrainError> {
        check_percentage(air_humidity)?;
        self.air_humidity = air_humidity;
        Ok(())
    }

    /// Soil temperature in °C, derived from the air and the water content.
    pub fn soil_temperature(&self) -> f64 {
        let (t, m, h) = (self.air_temperature, self.soil_moisture, self.air_humidity);
        match self.soil_type {
            SoilType::Clay => 0.6 * t + 0.006 * m + 0.001 * h + 2.0,
            SoilType::Sand => 0.8 * t + 0.0015 * m + 0.0005 * h + 3.0,
            SoilType::Loam => 0.7 * t + 0.002 * m + 0.001 * h + 2.5,
            SoilType::Silt => 0.65 * t + 0.0025 * m + 0.001 * h + 2.0,
        }
    }

    pub fn reading(&self) -> SoilReading {
        SoilReading {
            soil_type: self.soil_type,
            has_plants: self.plants,
            soil_moisture: self.soil_moisture,
            soil_temperature: self.soil_temperature(),
            air_temperature: self.air_temperature,
            air_humidity: self.air_humidity,
        }
    }
}

fn check_percentage(value: f64) -> Result<(), TerrainError> {
    if (0.0..=100.0).contains(&value) {
        Ok(())
    } else {
        Err(TerrainError::InvalidHumidity(value))
    }
}

/// Inclusive rectangular block of cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldRegion {
    pub row_start: i32,
    pub row_end: i32,
    pub col_start: i32,
    pub col_end: i32,
}

impl FieldRegion {
    pub const fn new(row_start: i32, row_end: i32, col_start: i32, col_end: i32) -> Self {
        Self {
            row_start,
            row_end,
            col_start,
            col_end,
        }
    }

    pub const fn cell(position: Position) -> Self {
        Self::new(position.x, position.x, position.y, position.y)
    }

    fn fits(&self, bounds: FieldBounds) -> bool {
        self.row_start <= self.row_end
            && self.col_start <= self.col_end
            && bounds.contains(Position::new(self.row_start, self.col_start))
            && bounds.contains(Position::new(self.row_end, self.col_end))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    name: String,
    bounds: FieldBounds,
    cells: Vec<Vec<Soil>>,
}

impl Field {
    pub fn new(name: impl Into<String>, length: i32, width: i32) -> Result<Self, TerrainError> {
        if length <= 0 || width <= 0 {
            return Err(TerrainError::InvalidDimensions { length, width });
        }
        Ok(Self {
            name: name.into(),
            bounds: FieldBounds::new(length, width),
            cells: vec![vec![Soil::default(); width as usize]; length as usize],
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn length(&self) -> i32 {
        self.bounds.length
    }

    pub fn width(&self) -> i32 {
        self.bounds.width
    }

    pub fn soil(&self, position: Position) -> Option<&Soil> {
        if !self.bounds.contains(position) {
            return None;
        }
        self.cells
            .get(position.x as usize)
            .and_then(|row| row.get(position.y as usize))
    }

    /// Overwrite every cell of `region` with `soil`.
    pub fn set_soil(&mut self, soil: Soil, region: FieldRegion) -> Result<(), TerrainError> {
        self.modify_region(region, |cell| {
            *cell = soil;
            Ok(())
        })
    }

    /// Apply `patch` to every cell of `region`. Either every cell is patched or,
    /// if the patch fails on any cell, none is.
    pub fn modify_region<F>(&mut self, region: FieldRegion, mut patch: F) -> Result<(), TerrainError>
    where
        F: FnMut(&mut Soil) -> Result<(), TerrainError>,
    {
        if !region.fits(self.bounds) {
            return Err(TerrainError::RegionOutOfBounds {
                row_start: region.row_start,
                row_end: region.row_end,
                col_start: region.col_start,
                col_end: region.col_end,
                bounds: self.bounds,
            });
        }

        let rows = region.row_start as usize..=region.row_end as usize;
        let cols = region.col_start as usize..=region.col_end as usize;

        let mut patched = Vec::with_capacity(rows.clone().count());
        for row in rows.clone() {
            let mut cells = self.cells[row][cols.clone()].to_vec();
            for cell in cells.iter_mut() {
                patch(cell)?;
            }
            patched.push(cells);
        }

        for (row, cells) in rows.zip(patched) {
            self.cells[row][cols.clone()].copy_from_slice(&cells);
        }
        Ok(())
    }

    /// Grow or shrink the field. New cells get the default soil.
    pub fn resize(&mut self, length_change: i32, width_change: i32) -> Result<(), TerrainError> {
        let length = self.bounds.length + length_change;
        let width = self.bounds.width + width_change;
        if length <= 0 || width <= 0 {
            return Err(TerrainError::InvalidDimensions { length, width });
        }

        self.cells.resize(length as usize, vec![Soil::default(); width as usize]);
        for row in self.cells.iter_mut() {
            row.resize(width as usize, Soil::default());
        }
        self.bounds = FieldBounds::new(length, width);
        Ok(())
    }

    /// Planted cells in row-major order.
    pub fn plant_positions(&self) -> Vec<Position> {
        self.cells
            .iter()
            .enumerate()
            .flat_map(|(x, row)| {
                row.iter()
                    .enumerate()
                    .filter(|(_, soil)| soil.has_plants())
                    .map(move |(y, _)| Position::new(x as i32, y as i32))
            })
            .collect()
    }

    /// One line per row, `P` for planted cells and `x` otherwise.
    pub fn render_plants(&self) -> String {
        self.render(|soil| if soil.has_plants() { "P" } else { "x" })
    }

    pub fn render_soil_types(&self) -> String {
        self.render(|soil| soil.soil_type().as_str())
    }

    fn render(&self, label: impl Fn(&Soil) -> &'static str) -> String {
        self.cells
            .iter()
            .map(|row| row.iter().map(&label).collect::<Vec<_>>().join(" "))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Terrain for Field {
    fn bounds(&self) -> FieldBounds {
        self.bounds
    }

    fn soil_at(&self, position: Position) -> Option<SoilReading> {
        self.soil(position).map(Soil::reading)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Field name: {}", self.name)?;
        write!(f, "Field dimensions: {}", self.bounds)
    }
}
