// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Fieldwatch Core
//!
//! Domain model and per-vehicle runtime of the fieldwatch mission system.
//!
//! # Architecture
//!
//! - **Layer:** Core System
//! - **Purpose:** Vehicles, terrain, sensors, evaluation and result sinks

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod metrics;

pub use domain::*;
