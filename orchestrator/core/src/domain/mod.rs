// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Domain
//!
//! Pure value types and rules of a fieldwatch mission. Nothing in here
//! spawns tasks or waits.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Vehicles, battery, navigation, terrain, sensors, evaluation, configuration

pub mod agent;
pub mod battery;
pub mod evaluation;
pub mod mission_config;
pub mod navigation;
pub mod sensor;
pub mod terrain;
