// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Swarm Domain Layer
//!
//! Shared coordination primitives. Each owns exactly one lock and none of them
//! holds it across an `.await`.
//!
//! | Module | Key Types |
//! |--------|-----------|
//! | [`reservation`] | `CellReservation`, `CellClaim` |
//! | [`channel`] | `MeasurementChannel` |
//! | [`completion`] | `CompletionCoordinator` |
//! | [`error`] | `SwarmError` |

pub mod channel;
pub mod completion;
pub mod error;
pub mod reservation;

pub use channel::MeasurementChannel;
pub use completion::CompletionCoordinator;
pub use error::SwarmError;
pub use reservation::{CellClaim, CellReservation};
