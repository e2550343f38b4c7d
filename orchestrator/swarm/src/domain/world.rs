// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Simulated World
//!
//! Square grid holding one avatar per agent. Avatar `i` starts in column 0 of
//! row `row_offset + i`; moves are clamped to the grid.

use abt_core::domain::agent::{Action, Coordinate, Perception};
use abt_core::domain::board::Board;

#[derive(Debug, Clone)]
pub struct World {
    size: usize,
    row_offset: usize,
    avatars: Vec<Coordinate>,
}

impl World {
    pub fn new(size: usize, row_offset: usize) -> Self {
        let avatars = (0..size).map(|i| Coordinate::new(0, row_offset + i)).collect();
        Self {
            size,
            row_offset,
            avatars,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn coordinate(&self, avatar: usize) -> Option<Coordinate> {
        self.avatars.get(avatar).copied()
    }

    pub fn perception(&self, avatar: usize, step: u64) -> Option<Perception> {
        self.coordinate(avatar).map(|coordinate| Perception { coordinate, step })
    }

    /// Apply one movement. North and South stay within the rows of the board.
    pub fn apply(&mut self, avatar: usize, action: Action) {
        let max_x = self.size.saturating_sub(1);
        let min_y = self.row_offset;
        let max_y = self.row_offset + max_x;
        let Some(cell) = self.avatars.get_mut(avatar) else {
            return;
        };
        match action {
            Action::Skip => {}
            Action::West => cell.x = cell.x.saturating_sub(1),
            Action::East => cell.x = (cell.x + 1).min(max_x),
            Action::North => cell.y = cell.y.saturating_sub(1).max(min_y),
            Action::South => cell.y = (cell.y + 1).min(max_y),
        }
    }

    /// Column of every avatar, in row order.
    pub fn columns(&self) -> Vec<usize> {
        self.avatars.iter().map(|c| c.x).collect()
    }

    /// The avatars currently spell out a solution.
    pub fn is_solved(&self) -> bool {
        let mut board = Board::new(self.size);
        for (queen, column) in self.columns().into_iter().enumerate() {
            if board.set_position(queen, Some(column)).is_err() {
                return false;
            }
        }
        board.check_constraints()
    }
}
