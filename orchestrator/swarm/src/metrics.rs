// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Metric names for the whole mission.
//!
//! Coordination metrics are defined here; vehicle metrics come from
//! `fieldwatch_core::metrics` and are re-exported so the binary has one place
//! to look.

pub use fieldwatch_core::metrics::{
    FORCED_RECHARGES_TOTAL, VEHICLE_BATTERY_LEVEL, VEHICLE_COMMAND_ERRORS_TOTAL,
    VEHICLE_READS_TOTAL, VEHICLE_STEPS_TOTAL,
};

/// Batches pushed into the measurement channel (counter).
pub const BATCHES_PUSHED_TOTAL: &str = "fieldwatch_batches_pushed_total";
/// Batches popped and evaluated (counter).
pub const BATCHES_ANALYZED_TOTAL: &str = "fieldwatch_batches_analyzed_total";
/// Batches popped but not evaluated (counter, labels: reason).
pub const BATCHES_SKIPPED_TOTAL: &str = "fieldwatch_batches_skipped_total";
/// Verdicts appended to the analysis log (counter).
pub const VERDICTS_RECORDED_TOTAL: &str = "fieldwatch_verdicts_recorded_total";
/// Acquires that had to wait for another vehicle's cell (counter).
pub const RESERVATION_WAITS_TOTAL: &str = "fieldwatch_reservation_waits_total";
/// Vehicles that have not finished their work list yet (gauge).
pub const ACTIVE_AGENTS: &str = "fieldwatch_active_agents";
/// Batches waiting in the measurement channel (gauge).
pub const QUEUE_DEPTH: &str = "fieldwatch_queue_depth";

pub const COORDINATION: [&str; 7] = [
    BATCHES_PUSHED_TOTAL,
    BATCHES_ANALYZED_TOTAL,
    BATCHES_SKIPPED_TOTAL,
    VERDICTS_RECORDED_TOTAL,
    RESERVATION_WAITS_TOTAL,
    ACTIVE_AGENTS,
    QUEUE_DEPTH,
];
