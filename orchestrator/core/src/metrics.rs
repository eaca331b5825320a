// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Metric names recorded by the vehicle runtime.
//!
//! Recorded through the `metrics` facade; nothing is exported unless the
//! binary installs a recorder.

/// Grid steps taken (counter, labels: agent_id).
pub const VEHICLE_STEPS_TOTAL: &str = "fieldwatch_vehicle_steps_total";
/// Read events completed (counter, labels: agent_id).
pub const VEHICLE_READS_TOTAL: &str = "fieldwatch_vehicle_reads_total";
/// Return-to-home recharge excursions (counter, labels: agent_id).
pub const FORCED_RECHARGES_TOTAL: &str = "fieldwatch_forced_recharges_total";
/// Commands rejected by a vehicle (counter, labels: agent_id, reason).
pub const VEHICLE_COMMAND_ERRORS_TOTAL: &str = "fieldwatch_vehicle_command_errors_total";
/// Last observed battery level (gauge, labels: agent_id).
pub const VEHICLE_BATTERY_LEVEL: &str = "fieldwatch_vehicle_battery_level";

pub const ALL: [&str; 5] = [
    VEHICLE_STEPS_TOTAL,
    VEHICLE_READS_TOTAL,
    FORCED_RECHARGES_TOTAL,
    VEHICLE_COMMAND_ERRORS_TOTAL,
    VEHICLE_BATTERY_LEVEL,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_names_are_prefixed_snake_case() {
        for name in ALL {
            assert!(name.starts_with("fieldwatch_"), "{name}");
            assert!(
                name.chars().all(|c| c.is_ascii_lowercase() || c == '_'),
                "{name}"
            );
        }
    }
}
