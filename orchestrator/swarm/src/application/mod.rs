// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Application layer: the analysis worker and the control center that drives
//! vehicles through their work lists.

pub mod analysis;
pub mod control_center;

pub use analysis::{AnalysisLog, AnalysisSummary, AnalysisWorker, WorkerState};
pub use control_center::{ControlCenter, WorkListReport};
