// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod vehicle;
pub mod vehicle_mailbox;

pub use vehicle::Vehicle;
pub use vehicle_mailbox::{spawn_vehicle, VehicleCommand, VehicleHandle};
