// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
// Analysis Worker - single consumer of the measurement channel
//
// Pops batches in push order, sums each batch's samples per sensor kind,
// evaluates planted cells and appends one verdict per sensor kind to the
// shared log. Stops once collection is complete and the channel is drained.
//
// Unknown cells are skipped with a warning; unplanted cells are skipped
// silently. Neither stops the loop.

use metrics::counter;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use fieldwatch_core::domain::evaluation::Evaluator;
use fieldwatch_core::domain::sensor::MeasurementBatch;
use fieldwatch_core::domain::terrain::Terrain;

use crate::domain::channel::MeasurementChannel;
use crate::domain::completion::CompletionCoordinator;
use crate::domain::error::SwarmError;
use crate::metrics::{BATCHES_ANALYZED_TOTAL, BATCHES_SKIPPED_TOTAL, VERDICTS_RECORDED_TOTAL};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    Idle,
    Analyzing,
    Stopped,
}

/// Append-only verdict log shared between the worker and the orchestrator.
#[derive(Debug, Default)]
pub struct AnalysisLog {
    entries: Mutex<Vec<String>>,
}

impl AnalysisLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, entry: String) {
        self.entries.lock().push(entry);
    }

    pub fn extend(&self, entries: impl IntoIterator<Item = String>) {
        self.entries.lock().extend(entries);
    }

    pub fn snapshot(&self) -> Vec<String> {
        self.entries.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub batches_analyzed: usize,
    pub batches_skipped: usize,
    pub verdicts: usize,
}

enum BatchOutcome {
    Analyzed(usize),
    Skipped(&'static str),
}

pub struct AnalysisWorker {
    channel: Arc<MeasurementChannel>,
    completion: Arc<CompletionCoordinator>,
    terrain: Arc<dyn Terrain>,
    evaluator: Arc<dyn Evaluator>,
    log: Arc<AnalysisLog>,
    analysis_delay: Duration,
    state: watch::Sender<WorkerState>,
}

impl AnalysisWorker {
    pub fn new(
        channel: Arc<MeasurementChannel>,
        terrain: Arc<dyn Terrain>,
        evaluator: Arc<dyn Evaluator>,
        log: Arc<AnalysisLog>,
    ) -> Self {
        let (state, _) = watch::channel(WorkerState::Idle);
        Self {
            completion: channel.completion().clone(),
            channel,
            terrain,
            evaluator,
            log,
            analysis_delay: Duration::ZERO,
            state,
        }
    }

    /// Simulated evaluation time per batch.
    pub fn with_analysis_delay(mut self, delay: Duration) -> Self {
        self.analysis_delay = delay;
        self
    }

    pub fn log(&self) -> &Arc<AnalysisLog> {
        &self.log
    }

    pub fn state(&self) -> WorkerState {
        *self.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<WorkerState> {
        self.state.subscribe()
    }

    /// Start the worker loop in the background
    pub fn start(self, cancel: CancellationToken) -> JoinHandle<Result<AnalysisSummary, SwarmError>> {
        tokio::spawn(async move { self.run(&cancel).await })
    }

    /// Consume batches until the stream ends. Sets analysis-complete on a
    /// normal stop; a cancelled run leaves it unset.
    pub async fn run(&self, cancel: &CancellationToken) -> Result<AnalysisSummary, SwarmError> {
        info!("Analysis worker started");
        let mut summary = AnalysisSummary::default();

        let outcome = loop {
            self.state.send_replace(WorkerState::Idle);
            let batch = match self.channel.pop(cancel).await {
                Ok(Some(batch)) => batch,
                Ok(None) => break Ok(()),
                Err(e) => break Err(e),
            };

            self.state.send_replace(WorkerState::Analyzing);
            if let Err(e) = self.pause(cancel).await {
                break Err(e);
            }

            match self.analyze(&batch) {
                BatchOutcome::Analyzed(verdicts) => {
                    summary.batches_analyzed += 1;
                    summary.verdicts += verdicts;
                    counter!(BATCHES_ANALYZED_TOTAL).increment(1);
                    counter!(VERDICTS_RECORDED_TOTAL).increment(verdicts as u64);
                }
                BatchOutcome::Skipped(reason) => {
                    summary.batches_skipped += 1;
                    counter!(BATCHES_SKIPPED_TOTAL, "reason" => reason).increment(1);
                }
            }
        };

        self.state.send_replace(WorkerState::Stopped);
        match outcome {
            Ok(()) => {
                self.completion.mark_analysis_complete();
                info!(
                    analyzed = summary.batches_analyzed,
                    skipped = summary.batches_skipped,
                    verdicts = summary.verdicts,
                    "Analysis complete"
                );
                Ok(summary)
            }
            Err(e) => {
                warn!("Analysis worker stopped early: {}", e);
                Err(e)
            }
        }
    }

    fn analyze(&self, batch: &MeasurementBatch) -> BatchOutcome {
        let Some(soil) = self.terrain.soil_at(batch.position) else {
            warn!(agent_id = %batch.agent_id, position = %batch.position, "No soil data for batch position, skipping");
            return BatchOutcome::Skipped("unknown_cell");
        };
        if !soil.has_plants {
            debug!(position = %batch.position, "No plants at position, skipping analysis");
            return BatchOutcome::Skipped("no_plants");
        }

        let verdicts: Vec<String> = batch
            .totals_by_sensor()
            .into_iter()
            .map(|(sensor, value)| {
                let verdict = self.evaluator.evaluate(soil.soil_type, sensor, value);
                format!("{} at position {}", verdict, batch.position)
            })
            .collect();

        let count = verdicts.len();
        self.log.extend(verdicts);
        debug!(agent_id = %batch.agent_id, position = %batch.position, verdicts = count, "Batch analyzed");
        BatchOutcome::Analyzed(count)
    }

    async fn pause(&self, cancel: &CancellationToken) -> Result<(), SwarmError> {
        if self.analysis_delay.is_zero() {
            return Ok(());
        }
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(SwarmError::Cancelled),
            _ = tokio::time::sleep(self.analysis_delay) => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldwatch_core::domain::agent::{AgentId, Position};
    use fieldwatch_core::domain::evaluation::ThresholdEvaluator;
    use fieldwatch_core::domain::sensor::{MeasurementSample, SensorKind};
    use fieldwatch_core::domain::terrain::{Field, FieldRegion};

    fn planted_field() -> Arc<Field> {
        let mut field = Field::new("test", 3, 3).unwrap();
        field
            .modify_region(FieldRegion::new(0, 0, 0, 2), |soil| {
                soil.set_plants(true);
                Ok(())
            })
            .unwrap();
        Arc::new(field)
    }

    fn sample(position: Position, sensor: SensorKind, value: f64) -> MeasurementSample {
        MeasurementSample { position, sensor, value }
    }

    #[tokio::test]
    async fn sums_samples_per_sensor_and_skips_unplanted_cells() {
        let completion = Arc::new(CompletionCoordinator::new(1));
        let channel = Arc::new(MeasurementChannel::new(completion.clone()));
        let log = Arc::new(AnalysisLog::new());
        let worker = AnalysisWorker::new(
            channel.clone(),
            planted_field(),
            Arc::new(ThresholdEvaluator::default()),
            log.clone(),
        );

        let planted = Position::new(0, 1);
        channel.push(MeasurementBatch::new(
            AgentId(1),
            planted,
            vec![
                sample(planted, SensorKind::SoilMoisture, 20.0),
                sample(planted, SensorKind::SoilMoisture, 15.0),
                sample(planted, SensorKind::AirTemperature, 22.0),
            ],
        ));
        let bare = Position::new(2, 2);
        channel.push(MeasurementBatch::new(
            AgentId(1),
            bare,
            vec![sample(bare, SensorKind::SoilMoisture, 40.0)],
        ));
        let outside = Position::new(9, 9);
        channel.push(MeasurementBatch::new(AgentId(1), outside, vec![]));
        completion.mark_agent_done();

        let summary = worker.run(&CancellationToken::new()).await.unwrap();
        assert_eq!(
            summary,
            AnalysisSummary {
                batches_analyzed: 1,
                batches_skipped: 2,
                verdicts: 2
            }
        );
        // 20 + 15 = 35 on loam: optimal band is 25-50.
        assert_eq!(
            log.snapshot(),
            vec![
                "Optimal soil moisture at position (0, 1)".to_string(),
                "Optimal air temperature at position (0, 1)".to_string(),
            ]
        );
        assert_eq!(worker.state(), WorkerState::Stopped);
        assert!(completion.is_analysis_complete());
    }

    #[tokio::test]
    async fn cancelled_worker_does_not_mark_analysis_complete() {
        let completion = Arc::new(CompletionCoordinator::new(1));
        let channel = Arc::new(MeasurementChannel::new(completion.clone()));
        let worker = AnalysisWorker::new(
            channel,
            planted_field(),
            Arc::new(ThresholdEvaluator::default()),
            Arc::new(AnalysisLog::new()),
        );
        let cancel = CancellationToken::new();
        let handle = worker.start(cancel.clone());
        cancel.cancel();

        assert_eq!(handle.await.unwrap(), Err(SwarmError::Cancelled));
        assert!(!completion.is_analysis_complete());
    }
}
