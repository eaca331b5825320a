// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Grid stepping and the forced-recharge excursion.
//!
//! Both are pure: they only plan cells, the vehicle runtime decides when to
//! walk them and what each step costs.

use crate::domain::agent::Position;

/// One grid unit from `from` toward `to`. Diagonal moves are allowed, so both
/// coordinates may change in the same step.
pub fn next_step(from: Position, to: Position) -> Position {
    Position::new(
        from.x + (to.x - from.x).signum(),
        from.y + (to.y - from.y).signum(),
    )
}

/// Cells visited when walking from `from` to `to`, excluding the start and
/// including the destination. Its length is the Chebyshev distance.
pub fn route(from: Position, to: Position) -> Vec<Position> {
    let mut cells = Vec::with_capacity(from.chebyshev_distance(&to) as usize);
    let mut current = from;
    while current != to {
        current = next_step(current, to);
        cells.push(current);
    }
    cells
}

/// What a vehicle should do next while on a recharge excursion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ExcursionStep {
    /// Walk one cell closer to home.
    Move(Position),
    /// Home reached: charge to full.
    Recharge,
    /// Excursion over; the interrupted command resumes from home.
    Done,
}

/// Return-home-and-recharge plan.
///
/// Yields exactly `route_len + 1` actionable steps (one `Move` per cell, then a
/// single `Recharge`) followed by `Done` forever.
#[derive(Debug, Clone, PartialEq)]
pub struct Excursion {
    home: Position,
    path: Vec<Position>,
    cursor: usize,
    recharged: bool,
}

impl Excursion {
    pub fn plan(from: Position, home: Position) -> Self {
        Self {
            home,
            path: route(from, home),
            cursor: 0,
            recharged: false,
        }
    }

    pub fn home(&self) -> Position {
        self.home
    }

    pub fn path(&self) -> &[Position] {
        &self.path
    }

    /// Upper bound on the number of steps this excursion will take.
    pub fn step_count(&self) -> usize {
        self.path.len() + 1
    }

    pub fn advance(&mut self) -> ExcursionStep {
        if let Some(cell) = self.path.get(self.cursor) {
            self.cursor += 1;
            return ExcursionStep::Move(*cell);
        }
        if !self.recharged {
            self.recharged = true;
            return ExcursionStep::Recharge;
        }
        ExcursionStep::Done
    }
}
