// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Active-vehicle counter and the two one-way completion signals.
//!
//! `collection complete` flips when the last vehicle reports done;
//! `analysis complete` flips when the analysis worker stops after draining.
//! Both start false, are set at most once and are never reset.

use metrics::gauge;
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::domain::error::SwarmError;
use crate::metrics::ACTIVE_AGENTS;

#[derive(Debug)]
pub struct CompletionCoordinator {
    active: Mutex<usize>,
    expected: usize,
    collection: watch::Sender<bool>,
    analysis: watch::Sender<bool>,
}

impl CompletionCoordinator {
    /// `agents` is the fixed number of vehicles of the run. With zero vehicles
    /// collection is complete from the start.
    pub fn new(agents: usize) -> Self {
        let (collection, _) = watch::channel(agents == 0);
        let (analysis, _) = watch::channel(false);
        gauge!(ACTIVE_AGENTS).set(agents as f64);
        Self {
            active: Mutex::new(agents),
            expected: agents,
            collection,
            analysis,
        }
    }

    pub fn expected_agents(&self) -> usize {
        self.expected
    }

    pub fn active_agents(&self) -> usize {
        *self.active.lock()
    }

    /// Record that one vehicle finished its work list. Returns `true` only for
    /// the call that brought the count to zero. Extra calls are ignored.
    pub fn mark_agent_done(&self) -> bool {
        let remaining = {
            let mut active = self.active.lock();
            if *active == 0 {
                None
            } else {
                *active -= 1;
                Some(*active)
            }
        };

        match remaining {
            None => {
                warn!("mark_agent_done called with no active vehicles left");
                false
            }
            Some(remaining) => {
                gauge!(ACTIVE_AGENTS).set(remaining as f64);
                if remaining > 0 {
                    return false;
                }
                let flipped = set_once(&self.collection);
                if flipped {
                    info!("All vehicles done, data collection complete");
                }
                flipped
            }
        }
    }

    pub fn is_collection_complete(&self) -> bool {
        *self.collection.borrow()
    }

    pub fn subscribe_collection(&self) -> watch::Receiver<bool> {
        self.collection.subscribe()
    }

    pub async fn wait_for_collection(&self, cancel: &CancellationToken) -> Result<(), SwarmError> {
        wait_until_set(self.collection.subscribe(), cancel).await
    }

    /// Returns `true` only for the first call.
    pub fn mark_analysis_complete(&self) -> bool {
        set_once(&self.analysis)
    }

    pub fn is_analysis_complete(&self) -> bool {
        *self.analysis.borrow()
    }

    pub async fn wait_for_analysis(&self, cancel: &CancellationToken) -> Result<(), SwarmError> {
        wait_until_set(self.analysis.subscribe(), cancel).await
    }
}

fn set_once(flag: &watch::Sender<bool>) -> bool {
    flag.send_if_modified(|done| {
        if *done {
            false
        } else {
            *done = true;
            true
        }
    })
}

async fn wait_until_set(
    mut flag: watch::Receiver<bool>,
    cancel: &CancellationToken,
) -> Result<(), SwarmError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(SwarmError::Cancelled),
        set = flag.wait_for(|done| *done) => set.map(|_| ()).map_err(|_| SwarmError::Cancelled),
    }
}
