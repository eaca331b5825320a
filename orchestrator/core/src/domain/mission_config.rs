// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Mission Configuration Types
//
// Defines the configuration schema for a fieldwatch mission, including:
// - Kubernetes-style manifest format (apiVersion/kind/metadata/spec)
// - Field dimensions and the region patches applied to the default soil
// - Vehicle fleet (start cell, speed, initial battery, attached sensors)
// - Battery costs and simulated timing
// - Output location of the analysis results

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::domain::agent::{FieldBounds, Position, VehicleKind};
use crate::domain::battery::{BatteryConfig, FULL_CHARGE};
use crate::domain::sensor::SensorKind;
use crate::domain::terrain::{Field, FieldRegion, SoilType, TerrainError};

pub const API_VERSION: &str = "fieldwatch/v1";
pub const KIND: &str = "MissionConfig";

/// Top-level Kubernetes-style mission manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissionManifest {
    /// API version (must be "fieldwatch/v1")
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Resource kind (must be "MissionConfig")
    pub kind: String,

    pub metadata: ManifestMetadata,

    pub spec: MissionSpec,
}

/// Manifest metadata (Kubernetes-style)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestMetadata {
    /// Human-readable mission name
    pub name: String,

    /// Optional: Labels for categorization
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<HashMap<String, String>>,
}

/// Mission specification (content under spec:)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissionSpec {
    pub field: FieldSpec,

    /// Vehicle fleet; its size is fixed for the whole run
    pub vehicles: Vec<VehicleSpec>,

    #[serde(default)]
    pub battery: BatteryConfig,

    #[serde(default)]
    pub timing: TimingConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub length: i32,
    pub width: i32,

    /// Patches applied in order on top of the default soil
    #[serde(default)]
    pub regions: Vec<RegionSpec>,
}

/// Inclusive block of cells and the soil properties to overwrite in it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegionSpec {
    /// First and last row (inclusive)
    pub rows: [i32; 2],

    /// First and last column (inclusive)
    pub cols: [i32; 2],

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub soil_type: Option<SoilType>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plants: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub soil_moisture: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub air_temperature: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub air_humidity: Option<f64>,
}

impl RegionSpec {
    pub fn region(&self) -> FieldRegion {
        FieldRegion::new(self.rows[0], self.rows[1], self.cols[0], self.cols[1])
    }

    pub fn apply(&self, field: &mut Field) -> Result<(), TerrainError> {
        field.modify_region(self.region(), |soil| {
            if let Some(soil_type) = self.soil_type {
                soil.set_soil_type(soil_type);
            }
            if let Some(plants) = self.plants {
                soil.set_plants(plants);
            }
            if let Some(moisture) = self.soil_moisture {
                soil.set_soil_moisture(moisture)?;
            }
            if let Some(temperature) = self.air_temperature {
                soil.set_air_temperature(temperature);
            }
            if let Some(humidity) = self.air_humidity {
                soil.set_air_humidity(humidity)?;
            }
            Ok(())
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleSpec {
    pub name: String,

    #[serde(default)]
    pub kind: VehicleKind,

    /// Start cell, also the home cell used for recharging
    pub start: Position,

    /// Grid steps per simulated time unit (must be > 0)
    #[serde(default = "default_speed")]
    pub speed: f64,

    /// Initial charge in (0, 100]
    #[serde(default = "default_battery")]
    pub battery: f64,

    #[serde(default = "default_sensors")]
    pub sensors: Vec<SensorKind>,
}

/// Simulated durations in milliseconds. Zero is valid and skips the delay.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Duration of one grid step at speed 1.0
    #[serde(default = "default_step_ms")]
    pub step_ms: u64,

    #[serde(default = "default_recharge_ms")]
    pub recharge_ms: u64,

    /// Latency of each individual sensor during a read event
    #[serde(default = "default_sensor_read_ms")]
    pub sensor_read_ms: u64,

    /// Evaluation time per analyzed batch
    #[serde(default = "default_analysis_ms")]
    pub analysis_ms: u64,
}

impl TimingConfig {
    /// All delays disabled.
    pub const fn instant() -> Self {
        Self {
            step_ms: 0,
            recharge_ms: 0,
            sensor_read_ms: 0,
            analysis_ms: 0,
        }
    }

    /// Multiply every duration by `factor` (clamped at zero).
    pub fn scaled(&self, factor: f64) -> Self {
        let scale = |ms: u64| (ms as f64 * factor.max(0.0)).round() as u64;
        Self {
            step_ms: scale(self.step_ms),
            recharge_ms: scale(self.recharge_ms),
            sensor_read_ms: scale(self.sensor_read_ms),
            analysis_ms: scale(self.analysis_ms),
        }
    }

    /// `step_ms / speed`, or `None` when the speed is not positive or the
    /// result does not fit in a `Duration`.
    pub fn step_duration(&self, speed: f64) -> Option<Duration> {
        if !(speed > 0.0 && speed.is_finite()) {
            return None;
        }
        Duration::try_from_secs_f64(self.step_ms as f64 / speed / 1000.0).ok()
    }

    pub fn recharge(&self) -> Duration {
        Duration::from_millis(self.recharge_ms)
    }

    pub fn sensor_read(&self) -> Duration {
        Duration::from_millis(self.sensor_read_ms)
    }

    pub fn analysis(&self) -> Duration {
        Duration::from_millis(self.analysis_ms)
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            step_ms: default_step_ms(),
            recharge_ms: default_recharge_ms(),
            sensor_read_ms: default_sensor_read_ms(),
            analysis_ms: default_analysis_ms(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// File receiving one verdict per line once analysis completes
    #[serde(default = "default_results_path")]
    pub results_path: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            results_path: default_results_path(),
        }
    }
}

impl Default for MissionSpec {
    fn default() -> Self {
        let region = |rows: [i32; 2], cols: [i32; 2]| RegionSpec {
            rows,
            cols,
            ..RegionSpec::default()
        };

        Self {
            field: FieldSpec {
                name: "Farm".to_string(),
                length: 5,
                width: 4,
                regions: vec![
                    RegionSpec { plants: Some(true), ..region([0, 2], [1, 3]) },
                    RegionSpec { plants: Some(true), ..region([3, 3], [3, 3]) },
                    RegionSpec { soil_moisture: Some(95.0), ..region([1, 2], [0, 1]) },
                    RegionSpec { soil_moisture: Some(5.0), ..region([3, 4], [0, 1]) },
                    RegionSpec { air_temperature: Some(30.0), ..region([0, 1], [2, 3]) },
                    RegionSpec { air_temperature: Some(10.0), ..region([3, 4], [2, 3]) },
                    RegionSpec { air_humidity: Some(80.0), ..region([0, 1], [0, 1]) },
                    RegionSpec { soil_type: Some(SoilType::Clay), ..region([3, 4], [0, 1]) },
                    RegionSpec { soil_type: Some(SoilType::Sand), ..region([0, 1], [2, 3]) },
                    RegionSpec { soil_type: Some(SoilType::Loam), ..region([3, 4], [2, 3]) },
                ],
            },
            vehicles: vec![
                VehicleSpec {
                    name: "rover-1".to_string(),
                    kind: VehicleKind::Field,
                    start: Position::new(2, 2),
                    speed: 1.0,
                    battery: FULL_CHARGE,
                    sensors: default_sensors(),
                },
                VehicleSpec {
                    name: "rover-2".to_string(),
                    kind: VehicleKind::Field,
                    start: Position::new(3, 3),
                    speed: 1.2,
                    battery: FULL_CHARGE,
                    sensors: default_sensors(),
                },
            ],
            battery: BatteryConfig::default(),
            timing: TimingConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

impl Default for MissionManifest {
    fn default() -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            metadata: ManifestMetadata {
                name: "default-mission".to_string(),
                labels: None,
            },
            spec: MissionSpec::default(),
        }
    }
}

impl MissionManifest {
    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to YAML file
    pub fn to_yaml_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Discover configuration file using precedence order
    /// 1. FIELDWATCH_CONFIG_PATH environment variable
    /// 2. ./fieldwatch.yaml (working directory)
    /// 3. ~/.fieldwatch/config.yaml (user home)
    /// 4. /etc/fieldwatch/config.yaml (system, Unix) or C:\ProgramData\Fieldwatch\config.yaml (Windows)
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("FIELDWATCH_CONFIG_PATH") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./fieldwatch.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".fieldwatch").join("config.yaml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        #[cfg(unix)]
        let system_config = PathBuf::from("/etc/fieldwatch/config.yaml");
        #[cfg(windows)]
        let system_config = PathBuf::from("C:\\ProgramData\\Fieldwatch\\config.yaml");

        if system_config.exists() {
            return Some(system_config);
        }

        None
    }

    /// Load configuration with discovery, fallback to the built-in mission
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        // Explicit CLI path (fail if missing/invalid)
        if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            let mut config = Self::from_yaml_file(&path)
                .map_err(|e| anyhow::anyhow!("Failed to load config at {:?}: {}", path, e))?;
            config.apply_env_overrides();
            return Ok(config);
        }

        if let Some(config_path) = Self::discover_config() {
            tracing::info!("Loading configuration from discovered path: {:?}", config_path);
            let mut config = Self::from_yaml_file(config_path)?;
            config.apply_env_overrides();
            Ok(config)
        } else {
            tracing::info!("No configuration file found in standard locations. Using the built-in mission.");
            let mut config = Self::default();
            config.apply_env_overrides();
            Ok(config)
        }
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("FIELDWATCH_RESULTS_PATH") {
            tracing::info!("Environment override: FIELDWATCH_RESULTS_PATH={}", path);
            self.spec.output.results_path = PathBuf::from(path);
        }

        if let Ok(val) = std::env::var("FIELDWATCH_TIME_SCALE") {
            match val.parse::<f64>() {
                Ok(factor) if factor >= 0.0 && factor.is_finite() => {
                    tracing::info!("Environment override: FIELDWATCH_TIME_SCALE={}", factor);
                    self.spec.timing = self.spec.timing.scaled(factor);
                }
                _ => {
                    tracing::warn!(
                        "Invalid value for FIELDWATCH_TIME_SCALE: '{}'. Expected a non-negative number. Ignoring.",
                        val
                    );
                }
            }
        }
    }

    pub fn bounds(&self) -> FieldBounds {
        FieldBounds::new(self.spec.field.length, self.spec.field.width)
    }

    /// Build the field and apply every region patch in order.
    pub fn build_field(&self) -> Result<Field, TerrainError> {
        let spec = &self.spec.field;
        let mut field = Field::new(spec.name.clone(), spec.length, spec.width)?;
        for region in &spec.regions {
            region.apply(&mut field)?;
        }
        Ok(field)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_version != API_VERSION {
            anyhow::bail!(
                "Invalid apiVersion: '{}'. Must be '{}'",
                self.api_version,
                API_VERSION
            );
        }

        if self.kind != KIND {
            anyhow::bail!("Invalid kind: '{}'. Must be '{}'", self.kind, KIND);
        }

        if self.metadata.name.is_empty() {
            anyhow::bail!("metadata.name cannot be empty");
        }

        let field = &self.spec.field;
        if field.length <= 0 || field.width <= 0 {
            anyhow::bail!(
                "spec.field dimensions must be positive (got {}x{})",
                field.length,
                field.width
            );
        }
        // Catches out-of-range regions and invalid humidity values
        self.build_field()
            .map_err(|e| anyhow::anyhow!("Invalid spec.field: {}", e))?;

        if self.spec.vehicles.is_empty() {
            anyhow::bail!("spec.vehicles must contain at least one vehicle");
        }

        let bounds = self.bounds();
        let mut names = HashSet::new();
        let mut starts = HashSet::new();
        for vehicle in &self.spec.vehicles {
            if vehicle.name.is_empty() {
                anyhow::bail!("Vehicle name cannot be empty");
            }
            if !names.insert(vehicle.name.as_str()) {
                anyhow::bail!("Duplicate vehicle name: '{}'", vehicle.name);
            }
            if !bounds.contains(vehicle.start) {
                anyhow::bail!(
                    "Vehicle '{}' starts at {} outside the {} field",
                    vehicle.name,
                    vehicle.start,
                    bounds
                );
            }
            if !starts.insert(vehicle.start) {
                anyhow::bail!(
                    "Vehicle '{}' shares its start cell {} with another vehicle",
                    vehicle.name,
                    vehicle.start
                );
            }
            if !(vehicle.speed > 0.0 && vehicle.speed.is_finite()) {
                anyhow::bail!("Vehicle '{}' speed must be positive", vehicle.name);
            }
            if self.spec.timing.step_duration(vehicle.speed).is_none() {
                anyhow::bail!(
                    "Vehicle '{}' speed {} is too low for a {} ms step",
                    vehicle.name,
                    vehicle.speed,
                    self.spec.timing.step_ms
                );
            }
            if !(vehicle.battery > 0.0 && vehicle.battery <= FULL_CHARGE) {
                anyhow::bail!(
                    "Vehicle '{}' battery must lie in (0, {}]",
                    vehicle.name,
                    FULL_CHARGE
                );
            }
        }

        self.spec
            .battery
            .validate()
            .map_err(|e| anyhow::anyhow!("Invalid spec.battery: {}", e))?;

        Ok(())
    }
}

fn default_speed() -> f64 {
    1.0
}

fn default_battery() -> f64 {
    FULL_CHARGE
}

fn default_sensors() -> Vec<SensorKind> {
    SensorKind::ALL.to_vec()
}

fn default_step_ms() -> u64 {
    500
}

fn default_recharge_ms() -> u64 {
    2000
}

fn default_sensor_read_ms() -> u64 {
    100
}

fn default_analysis_ms() -> u64 {
    250
}

fn default_results_path() -> PathBuf {
    PathBuf::from("analysis_results.txt")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_manifest() {
        let manifest = MissionManifest::default();
        assert_eq!(manifest.api_version, API_VERSION);
        assert_eq!(manifest.kind, KIND);
        assert_eq!(manifest.spec.vehicles.len(), 2);
        assert!(manifest.validate().is_ok());
    }

    #[test]
    fn test_default_field_matches_scenario() {
        let field = MissionManifest::default().build_field().unwrap();
        assert_eq!(field.length(), 5);
        assert_eq!(field.width(), 4);

        let plants = field.plant_positions();
        let expected: Vec<Position> = [(0, 1), (0, 2), (0, 3), (1, 1), (1, 2), (1, 3), (2, 1), (2, 2), (2, 3), (3, 3)]
            .into_iter()
            .map(Position::from)
            .collect();
        assert_eq!(plants, expected);

        let clay = field.soil(Position::new(3, 0)).unwrap();
        assert_eq!(clay.soil_type(), SoilType::Clay);
        assert_eq!(clay.soil_moisture(), 5.0);
        let sand = field.soil(Position::new(0, 2)).unwrap();
        assert_eq!(sand.soil_type(), SoilType::Sand);
        assert_eq!(sand.air_temperature(), 30.0);
    }

    #[test]
    fn test_yaml_roundtrip() {
        let yaml = r#"
apiVersion: fieldwatch/v1
kind: MissionConfig
metadata:
  name: north-field
spec:
  field:
    name: North
    length: 3
    width: 3
    regions:
      - rows: [0, 2]
        cols: [1, 1]
        plants: true
        soil_type: silt
  vehicles:
    - name: drone
      kind: aerial
      start: { x: 0, y: 0 }
      speed: 2.0
      sensors: [soil_moisture, air_temperature]
  timing:
    step_ms: 0
"#;
        let manifest = MissionManifest::from_yaml_str(yaml).unwrap();
        assert!(manifest.validate().is_ok());
        let vehicle = &manifest.spec.vehicles[0];
        assert_eq!(vehicle.kind, VehicleKind::Aerial);
        assert_eq!(vehicle.battery, FULL_CHARGE);
        assert_eq!(vehicle.sensors.len(), 2);
        assert_eq!(manifest.spec.timing.step_ms, 0);
        assert_eq!(manifest.spec.timing.recharge_ms, 2000);
        assert_eq!(manifest.spec.output.results_path, PathBuf::from("analysis_results.txt"));

        let field = manifest.build_field().unwrap();
        assert_eq!(field.plant_positions().len(), 3);

        let yaml = serde_yaml::to_string(&manifest).unwrap();
        let reparsed = MissionManifest::from_yaml_str(&yaml).unwrap();
        assert_eq!(reparsed.spec.vehicles, manifest.spec.vehicles);
    }

    #[test]
    fn test_validation() {
        let mut manifest = MissionManifest::default();
        manifest.kind = "NodeConfig".to_string();
        assert!(manifest.validate().is_err());

        let mut manifest = MissionManifest::default();
        manifest.spec.vehicles[1].start = manifest.spec.vehicles[0].start;
        assert!(manifest.validate().is_err());

        let mut manifest = MissionManifest::default();
        manifest.spec.vehicles[0].speed = 0.0;
        assert!(manifest.validate().is_err());

        let mut manifest = MissionManifest::default();
        manifest.spec.vehicles[0].start = Position::new(5, 0);
        assert!(manifest.validate().is_err());

        let mut manifest = MissionManifest::default();
        manifest.spec.field.regions.push(RegionSpec {
            rows: [0, 9],
            cols: [0, 0],
            plants: Some(true),
            ..RegionSpec::default()
        });
        assert!(manifest.validate().is_err());

        let mut manifest = MissionManifest::default();
        manifest.spec.vehicles.clear();
        assert!(manifest.validate().is_err());
    }

    #[test]
    fn test_timing_scale_and_step_duration() {
        let timing = TimingConfig::default().scaled(0.5);
        assert_eq!(timing.step_ms, 250);
        assert_eq!(timing.recharge_ms, 1000);
        assert_eq!(timing.step_duration(1.0), Some(Duration::from_millis(250)));
        assert_eq!(
            TimingConfig::default().step_duration(2.0),
            Some(Duration::from_millis(250))
        );
        assert_eq!(TimingConfig::instant().step_duration(1.2), Some(Duration::ZERO));
    }

    #[test]
    fn test_tiny_speed_is_rejected_instead_of_overflowing() {
        assert_eq!(TimingConfig::default().step_duration(1e-20), None);
        assert_eq!(TimingConfig::default().step_duration(0.0), None);
        assert_eq!(TimingConfig::instant().step_duration(1e-20), Some(Duration::ZERO));

        let mut manifest = MissionManifest::default();
        manifest.spec.vehicles[0].speed = 1e-20;
        let err = manifest.validate().unwrap_err();
        assert!(err.to_string().contains("too low"), "{err}");
    }
}
