// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Board Model
//!
//! Each agent keeps its own copy of the board: one column position per queen
//! index, `None` while the queen is unassigned. Only the owning queen and the
//! queens it has heard from (its parents) are ever recorded, so
//! [`Board::check_constraints`] evaluates exactly the agent's view.
//!
//! Pure and deterministic; no I/O.

use std::fmt;

use thiserror::Error;

use crate::domain::nogood::NoGood;

/// Contract violations raised by [`Board`] mutators.
///
/// These indicate a bug in the caller; a correctly driven protocol never
/// produces them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BoardError {
    #[error("Queen index {queen} is outside the board (size {size})")]
    InvalidQueen { queen: usize, size: usize },

    #[error("Position {position} is outside the board (size {size})")]
    InvalidPosition { position: usize, size: usize },
}

/// Column assignment of every queen on an `size × size` board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    positions: Vec<Option<usize>>,
}

impl Board {
    pub fn new(size: usize) -> Self {
        Self {
            positions: vec![None; size],
        }
    }

    pub fn size(&self) -> usize {
        self.positions.len()
    }

    /// Record `position` for `queen`; `None` unassigns it.
    pub fn set_position(&mut self, queen: usize, position: Option<usize>) -> Result<(), BoardError> {
        let size = self.size();
        if queen >= size {
            return Err(BoardError::InvalidQueen { queen, size });
        }
        if let Some(position) = position {
            if position >= size {
                return Err(BoardError::InvalidPosition { position, size });
            }
        }
        self.positions[queen] = position;
        Ok(())
    }

    /// Forget the position of `queen`. Out-of-range indices are ignored.
    pub fn clear(&mut self, queen: usize) {
        if let Some(slot) = self.positions.get_mut(queen) {
            *slot = None;
        }
    }

    /// Current position of `queen`, `None` if unassigned or out of range.
    pub fn position(&self, queen: usize) -> Option<usize> {
        self.positions.get(queen).copied().flatten()
    }

    /// Iterator over `(queen, position)` for every assigned queen.
    pub fn assigned(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.positions
            .iter()
            .enumerate()
            .filter_map(|(queen, position)| position.map(|p| (queen, p)))
    }

    /// Full snapshot of the board, index = queen.
    pub fn positions(&self) -> &[Option<usize>] {
        &self.positions
    }

    /// `true` iff no two assigned queens share a column or a diagonal.
    pub fn check_constraints(&self) -> bool {
        let assigned: Vec<(usize, usize)> = self.assigned().collect();
        for (i, &(queen, position)) in assigned.iter().enumerate() {
            for &(other, other_position) in &assigned[i + 1..] {
                if attacks(queen, position, other, other_position) {
                    return false;
                }
            }
        }
        true
    }

    /// Every other assigned queen that conflicts with `queen`'s current
    /// position, as `queen index → position`. Empty when `queen` is
    /// unassigned or unattacked.
    pub fn violations_for(&self, queen: usize) -> NoGood {
        let mut violations = NoGood::new();
        let Some(position) = self.position(queen) else {
            return violations;
        };

        for (other, other_position) in self.assigned() {
            if other != queen && attacks(queen, position, other, other_position) {
                violations.set(other, other_position);
            }
        }
        violations
    }
}

/// Column or diagonal attack between two placed queens.
fn attacks(queen: usize, position: usize, other: usize, other_position: usize) -> bool {
    position == other_position || queen.abs_diff(other) == position.abs_diff(other_position)
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let size = self.size();
        for position in &self.positions {
            let row: String = match position {
                Some(column) => (0..size)
                    .map(|c| if c == *column { 'Q' } else { '~' })
                    .collect(),
                None => "?".repeat(size),
            };
            writeln!(f, "{}", row)?;
        }
        Ok(())
    }
}
