// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Cell Reservations
//!
//! Exclusive claims on grid cells, so that two vehicles are never commanded to
//! the same destination at the same time.
//!
//! # Invariants
//!
//! - At most one vehicle holds a given cell.
//! - A vehicle holds at most one cell. Claiming a new cell gives up the old one.
//! - A vehicle waiting in [`CellReservation::acquire`] holds nothing, so no
//!   chain of waiting vehicles can close into a cycle.
//!
//! Every release wakes all waiters (they may be waiting on different cells);
//! each one re-checks its own cell under the lock.

use chrono::{DateTime, Utc};
use metrics::counter;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use fieldwatch_core::domain::agent::{AgentId, Position};

use crate::domain::error::SwarmError;
use crate::metrics::RESERVATION_WAITS_TOTAL;

/// Claim held by a vehicle on one cell.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellClaim {
    pub position: Position,
    pub held_by: AgentId,
    pub acquired_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct ClaimTable {
    by_cell: HashMap<Position, CellClaim>,
    by_agent: HashMap<AgentId, Position>,
}

impl ClaimTable {
    /// Claim `position` for `agent`, dropping its previous claim. Returns the
    /// current holder when the cell belongs to someone else.
    fn claim(&mut self, agent: AgentId, position: Position) -> Result<bool, AgentId> {
        match self.by_cell.get(&position) {
            Some(claim) if claim.held_by == agent => return Ok(false),
            Some(claim) => return Err(claim.held_by),
            None => {}
        }
        let freed = self.remove(agent).is_some();
        self.by_cell.insert(
            position,
            CellClaim {
                position,
                held_by: agent,
                acquired_at: Utc::now(),
            },
        );
        self.by_agent.insert(agent, position);
        Ok(freed)
    }

    fn remove(&mut self, agent: AgentId) -> Option<Position> {
        let position = self.by_agent.remove(&agent)?;
        self.by_cell.remove(&position);
        Some(position)
    }
}

#[derive(Debug, Default)]
pub struct CellReservation {
    table: Mutex<ClaimTable>,
    released: Notify,
}

impl CellReservation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `position` without waiting.
    pub fn try_acquire(&self, agent: AgentId, position: Position) -> Result<(), SwarmError> {
        let claimed = self.table.lock().claim(agent, position);
        match claimed {
            Ok(freed) => {
                if freed {
                    self.released.notify_waiters();
                }
                Ok(())
            }
            Err(held_by) => Err(SwarmError::CellOccupied { position, held_by }),
        }
    }

    /// Wait until no other vehicle holds `position`, then claim it.
    ///
    /// While waiting, the caller's previous claim is given up. Returns
    /// [`SwarmError::Cancelled`] as soon as `cancel` fires.
    pub async fn acquire(
        &self,
        agent: AgentId,
        position: Position,
        cancel: &CancellationToken,
    ) -> Result<(), SwarmError> {
        let mut waited = false;
        loop {
            let released = self.released.notified();
            tokio::pin!(released);
            released.as_mut().enable();

            if cancel.is_cancelled() {
                return Err(SwarmError::Cancelled);
            }

            let blocked_by = {
                let mut table = self.table.lock();
                match table.claim(agent, position) {
                    Ok(freed) => Ok(freed),
                    Err(held_by) => {
                        let dropped = table.remove(agent).is_some();
                        Err((held_by, dropped))
                    }
                }
            };

            match blocked_by {
                Ok(freed) => {
                    if freed {
                        self.released.notify_waiters();
                    }
                    debug!(agent_id = %agent, cell = %position, "Cell reserved");
                    return Ok(());
                }
                Err((held_by, dropped)) => {
                    if dropped {
                        self.released.notify_waiters();
                    }
                    if !waited {
                        waited = true;
                        counter!(RESERVATION_WAITS_TOTAL).increment(1);
                        debug!(agent_id = %agent, cell = %position, held_by = %held_by, "Waiting for cell");
                    }
                }
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(SwarmError::Cancelled),
                _ = &mut released => {}
            }
        }
    }

    /// Move `agent`'s claim to `position`. Returns `false`, keeping the old
    /// claim, when another vehicle holds `position`.
    pub fn update(&self, agent: AgentId, position: Position) -> bool {
        self.try_acquire(agent, position).is_ok()
    }

    /// Drop `agent`'s claim and wake every waiter.
    pub fn release(&self, agent: AgentId) -> Option<Position> {
        let released = self.table.lock().remove(agent);
        if released.is_some() {
            self.released.notify_waiters();
        }
        released
    }

    /// Last recorded cell of `agent`; `None` when it holds nothing.
    pub fn query(&self, agent: AgentId) -> Option<Position> {
        self.table.lock().by_agent.get(&agent).copied()
    }

    pub fn holder(&self, position: Position) -> Option<AgentId> {
        self.table.lock().by_cell.get(&position).map(|claim| claim.held_by)
    }

    /// Snapshot of every claim, ordered by cell.
    pub fn claims(&self) -> Vec<CellClaim> {
        let mut claims: Vec<CellClaim> = self.table.lock().by_cell.values().cloned().collect();
        claims.sort_by_key(|claim| claim.position);
        claims
    }

    pub fn len(&self) -> usize {
        self.table.lock().by_cell.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claiming_a_new_cell_frees_the_old_one() {
        let cells = CellReservation::new();
        let a = AgentId(1);
        cells.try_acquire(a, Position::new(0, 0)).unwrap();
        cells.try_acquire(a, Position::new(1, 1)).unwrap();
        assert_eq!(cells.query(a), Some(Position::new(1, 1)));
        assert_eq!(cells.holder(Position::new(0, 0)), None);
        assert_eq!(cells.len(), 1);
    }

    #[test]
    fn occupied_cell_is_rejected_and_old_claim_kept() {
        let cells = CellReservation::new();
        cells.try_acquire(AgentId(1), Position::new(2, 2)).unwrap();
        cells.try_acquire(AgentId(2), Position::new(3, 3)).unwrap();

        assert_eq!(
            cells.try_acquire(AgentId(2), Position::new(2, 2)),
            Err(SwarmError::CellOccupied {
                position: Position::new(2, 2),
                held_by: AgentId(1)
            })
        );
        assert!(!cells.update(AgentId(2), Position::new(2, 2)));
        assert_eq!(cells.query(AgentId(2)), Some(Position::new(3, 3)));
    }

    #[test]
    fn release_and_query_unknown_agent() {
        let cells = CellReservation::new();
        assert_eq!(cells.query(AgentId(9)), None);
        assert_eq!(cells.release(AgentId(9)), None);

        cells.try_acquire(AgentId(9), Position::new(4, 1)).unwrap();
        assert_eq!(cells.release(AgentId(9)), Some(Position::new(4, 1)));
        assert!(cells.is_empty());
    }

    #[tokio::test]
    async fn acquire_own_cell_returns_immediately() {
        let cells = CellReservation::new();
        let cancel = CancellationToken::new();
        cells.try_acquire(AgentId(1), Position::new(1, 1)).unwrap();
        cells
            .acquire(AgentId(1), Position::new(1, 1), &cancel)
            .await
            .unwrap();
        assert_eq!(cells.claims().len(), 1);
    }

    #[tokio::test]
    async fn waiting_vehicle_gives_up_its_claim() {
        let cells = std::sync::Arc::new(CellReservation::new());
        let cancel = CancellationToken::new();
        cells.try_acquire(AgentId(1), Position::new(0, 0)).unwrap();
        cells.try_acquire(AgentId(2), Position::new(1, 1)).unwrap();

        // Vehicle 1 wants (1, 1), vehicle 2 wants (0, 0): neither may deadlock.
        let first = {
            let cells = cells.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { cells.acquire(AgentId(1), Position::new(1, 1), &cancel).await })
        };
        let second = {
            let cells = cells.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { cells.acquire(AgentId(2), Position::new(0, 0), &cancel).await })
        };

        let (first, second) = tokio::time::timeout(std::time::Duration::from_secs(5), async {
            (first.await.unwrap(), second.await.unwrap())
        })
        .await
        .unwrap();
        assert!(first.is_ok() && second.is_ok());
        assert_eq!(cells.query(AgentId(1)), Some(Position::new(1, 1)));
        assert_eq!(cells.query(AgentId(2)), Some(Position::new(0, 0)));
    }

    #[tokio::test]
    async fn cancelled_acquire_returns_promptly() {
        let cells = CellReservation::new();
        let cancel = CancellationToken::new();
        cells.try_acquire(AgentId(1), Position::new(0, 0)).unwrap();

        let waiter = cells.acquire(AgentId(2), Position::new(0, 0), &cancel);
        cancel.cancel();
        assert_eq!(waiter.await, Err(SwarmError::Cancelled));
        assert_eq!(cells.holder(Position::new(0, 0)), Some(AgentId(1)));
    }
}
