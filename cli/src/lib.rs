// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! fieldwatch CLI library - exposes testable components
//!
//! # Architecture
//!
//! - **Layer:** Interface / Presentation Layer
//! - **Purpose:** Mission orchestration, command handlers and telemetry setup

pub mod commands;
pub mod mission;
pub mod telemetry;
