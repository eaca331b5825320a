// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # `fieldwatch-swarm` - Vehicle Coordination Crate
//!
//! Lets several vehicles share one field and one analysis worker without
//! stepping on each other.
//!
//! ## Crate Layout
//!
//! | Module | Layer | Contents |
//! |--------|-------|----------|
//! | [`domain`] | Domain | `CellReservation`, `MeasurementChannel`, `CompletionCoordinator`, `SwarmError` |
//! | [`application`] | Application | `AnalysisWorker`, `AnalysisLog`, `ControlCenter` |
//! | [`metrics`] | - | Metric names recorded by this crate and the vehicle runtime |
//!
//! ## Key Concepts
//!
//! - **Reservation**: exclusive claim on a grid cell, taken before a vehicle is
//!   sent there. A vehicle holds one cell at a time.
//! - **Batch**: the samples of one read event, moved through the channel as a unit.
//! - **Completion**: the active-vehicle count reaching zero is a one-way event;
//!   the analysis worker drains what is left and stops.
//! - **Cancellation**: every wait takes a `CancellationToken` and returns
//!   `SwarmError::Cancelled` promptly once it fires.

pub mod application;
pub mod domain;
pub mod metrics;

pub use domain::*;
