// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Command implementations for the fieldwatch CLI

pub mod config;
pub mod field;
pub mod run;

pub use self::config::ConfigCommand;
pub use self::field::FieldCommand;
pub use self::run::RunArgs;
