// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Unbounded FIFO of measurement batches: many vehicles push, one analysis
//! worker pops.
//!
//! `pop` blocks until a batch is available or collection is complete and the
//! queue is empty. A vehicle pushes its last batch before reporting done, so
//! once completion is observed one more look at the queue is enough to know
//! nothing is left.

use metrics::{counter, gauge};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use fieldwatch_core::domain::sensor::{MeasurementBatch, MeasurementSink};

use crate::domain::completion::CompletionCoordinator;
use crate::domain::error::SwarmError;
use crate::metrics::{BATCHES_PUSHED_TOTAL, QUEUE_DEPTH};

#[derive(Debug)]
pub struct MeasurementChannel {
    queue: Mutex<VecDeque<MeasurementBatch>>,
    available: Notify,
    completion: Arc<CompletionCoordinator>,
}

impl MeasurementChannel {
    pub fn new(completion: Arc<CompletionCoordinator>) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            available: Notify::new(),
            completion,
        }
    }

    pub fn completion(&self) -> &Arc<CompletionCoordinator> {
        &self.completion
    }

    /// Append to the tail and wake the consumer. Never blocks.
    pub fn push(&self, batch: MeasurementBatch) {
        let (agent_id, position) = (batch.agent_id, batch.position);
        let depth = {
            let mut queue = self.queue.lock();
            queue.push_back(batch);
            queue.len()
        };
        self.available.notify_one();

        counter!(BATCHES_PUSHED_TOTAL).increment(1);
        gauge!(QUEUE_DEPTH).set(depth as f64);
        debug!(agent_id = %agent_id, position = %position, depth, "Batch queued");
    }

    /// Next batch in push order, or `None` once collection is complete and the
    /// queue is drained.
    pub async fn pop(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Option<MeasurementBatch>, SwarmError> {
        let mut complete = self.completion.subscribe_collection();
        loop {
            let available = self.available.notified();
            tokio::pin!(available);
            available.as_mut().enable();

            if cancel.is_cancelled() {
                return Err(SwarmError::Cancelled);
            }
            if let Some(batch) = self.try_pop() {
                return Ok(Some(batch));
            }
            if *complete.borrow_and_update() {
                return Ok(self.try_pop());
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(SwarmError::Cancelled),
                _ = &mut available => {}
                changed = complete.changed() => {
                    // The coordinator outlives this channel; a closed signal
                    // can only mean it is being torn down.
                    if changed.is_err() {
                        return Ok(self.try_pop());
                    }
                }
            }
        }
    }

    pub fn try_pop(&self) -> Option<MeasurementBatch> {
        let (batch, depth) = {
            let mut queue = self.queue.lock();
            let batch = queue.pop_front();
            (batch, queue.len())
        };
        if batch.is_some() {
            gauge!(QUEUE_DEPTH).set(depth as f64);
        }
        batch
    }

    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }
}

impl MeasurementSink for MeasurementChannel {
    fn push(&self, batch: MeasurementBatch) {
        MeasurementChannel::push(self, batch);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldwatch_core::domain::agent::{AgentId, Position};

    fn batch(n: i32) -> MeasurementBatch {
        MeasurementBatch::new(AgentId(1), Position::new(n, 0), vec![])
    }

    #[tokio::test]
    async fn pops_in_push_order() {
        let channel = MeasurementChannel::new(Arc::new(CompletionCoordinator::new(1)));
        let cancel = CancellationToken::new();
        for n in 0..3 {
            channel.push(batch(n));
        }
        for n in 0..3 {
            let popped = channel.pop(&cancel).await.unwrap().unwrap();
            assert_eq!(popped.position, Position::new(n, 0));
        }
        assert!(channel.is_empty());
    }

    #[tokio::test]
    async fn drains_before_reporting_end_of_stream() {
        let completion = Arc::new(CompletionCoordinator::new(1));
        let channel = MeasurementChannel::new(completion.clone());
        let cancel = CancellationToken::new();

        channel.push(batch(7));
        completion.mark_agent_done();

        assert_eq!(channel.pop(&cancel).await.unwrap().map(|b| b.position), Some(Position::new(7, 0)));
        assert_eq!(channel.pop(&cancel).await.unwrap(), None);
        assert_eq!(channel.pop(&cancel).await.unwrap(), None);
    }

    #[tokio::test]
    async fn blocked_pop_wakes_on_completion() {
        let completion = Arc::new(CompletionCoordinator::new(1));
        let channel = Arc::new(MeasurementChannel::new(completion.clone()));
        let cancel = CancellationToken::new();

        let consumer = {
            let channel = channel.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { channel.pop(&cancel).await })
        };
        tokio::task::yield_now().await;
        completion.mark_agent_done();

        assert_eq!(consumer.await.unwrap(), Ok(None));
    }

    #[tokio::test]
    async fn cancelled_pop_returns_error() {
        let channel = MeasurementChannel::new(Arc::new(CompletionCoordinator::new(1)));
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert_eq!(channel.pop(&cancel).await, Err(SwarmError::Cancelled));
    }
}
