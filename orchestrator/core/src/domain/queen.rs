// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Queen Domain
//!
//! Per-agent variable: the queen's fixed priority rank, the set of columns it
//! still considers possible, and the column it currently holds.
//!
//! # Invariants
//!
//! - An assigned position is always a member of the domain.
//! - Removing the held value from the domain clears the position.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Order in which [`Queen::next_position`] visits the domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScanPolicy {
    /// Lowest available column first.
    Forward,
    /// Continue in the direction of the previous move, starting from the
    /// last held column, then turn around. Keeps picks close to the
    /// avatar and avoids flip-flopping between two distant values.
    #[default]
    Bidirectional,
}

impl std::str::FromStr for ScanPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "forward" => Ok(ScanPolicy::Forward),
            "bidirectional" => Ok(ScanPolicy::Bidirectional),
            other => Err(format!(
                "Unknown scan policy '{}'. Supported: forward, bidirectional",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Heading {
    Up,
    Down,
}

#[derive(Debug, Clone)]
pub struct Queen {
    number: usize,
    domain: Vec<bool>,
    position: Option<usize>,
    /// Last column held, kept after the position is cleared.
    last: Option<usize>,
    heading: Heading,
    policy: ScanPolicy,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueenError {
    #[error("Queen {number} is outside a board of size {size}")]
    OutOfBoard { number: usize, size: usize },
}

impl Queen {
    /// Create queen `number` on a `board_size` board with a full domain.
    pub fn new(number: usize, board_size: usize, policy: ScanPolicy) -> Result<Self, QueenError> {
        if number >= board_size {
            return Err(QueenError::OutOfBoard {
                number,
                size: board_size,
            });
        }
        Ok(Self {
            number,
            domain: vec![true; board_size],
            position: None,
            last: None,
            heading: Heading::Up,
            policy,
        })
    }

    pub fn number(&self) -> usize {
        self.number
    }

    pub fn position(&self) -> Option<usize> {
        self.position
    }

    pub fn has_position(&self) -> bool {
        self.position.is_some()
    }

    pub fn is_available(&self, position: usize) -> bool {
        self.domain.get(position).copied().unwrap_or(false)
    }

    pub fn reset_domain(&mut self) {
        self.domain.iter_mut().for_each(|slot| *slot = true);
    }

    /// Remove `positions` from the domain. Out-of-range values are ignored.
    pub fn mark_unavailable(&mut self, positions: &[usize]) {
        for &p in positions {
            if let Some(slot) = self.domain.get_mut(p) {
                *slot = false;
                if self.position == Some(p) {
                    self.position = None;
                }
            }
        }
    }

    /// Restore `positions` to the domain. Out-of-range values are ignored.
    pub fn mark_available(&mut self, positions: &[usize]) {
        for &p in positions {
            if let Some(slot) = self.domain.get_mut(p) {
                *slot = true;
            }
        }
    }

    pub fn has_next_position(&self) -> bool {
        self.domain.iter().any(|available| *available)
    }

    /// Move to another available column and return it, or `None` (leaving
    /// the queen unassigned) when the domain is empty.
    pub fn next_position(&mut self) -> Option<usize> {
        let candidate = match self.policy {
            ScanPolicy::Forward => self.scan_forward(),
            ScanPolicy::Bidirectional => self.scan_bidirectional(),
        };

        match candidate {
            Some(next) => {
                if let Some(anchor) = self.position.or(self.last) {
                    self.heading = if next >= anchor { Heading::Up } else { Heading::Down };
                }
                self.position = Some(next);
                self.last = Some(next);
            }
            None => self.position = None,
        }
        candidate
    }

    fn scan_forward(&self) -> Option<usize> {
        let start = self.position.map(|p| p + 1).unwrap_or(0);
        // The held column, if any, is visited last.
        (start..self.domain.len())
            .chain(0..start)
            .find(|p| self.domain[*p])
    }

    fn scan_bidirectional(&self) -> Option<usize> {
        let size = self.domain.len();
        let Some(anchor) = self.position.or(self.last) else {
            return self.scan_forward();
        };

        // A cleared queen may return to its last column once it is restored.
        if self.position.is_none() && self.is_available(anchor) {
            return Some(anchor);
        }

        let up = (anchor + 1..size).find(|p| self.domain[*p]);
        let down = (0..anchor).rev().find(|p| self.domain[*p]);
        let turned = match self.heading {
            Heading::Up => up.or(down),
            Heading::Down => down.or(up),
        };
        turned.or_else(|| self.position.filter(|p| self.is_available(*p)))
    }

    /// `other` outranks this queen (smaller index).
    pub fn is_parent_queen(&self, other: usize) -> bool {
        other < self.number
    }

    /// This queen outranks `other` (larger index).
    pub fn is_child_queen(&self, other: usize) -> bool {
        other > self.number
    }
}

impl std::fmt::Display for Queen {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.position {
            Some(p) => write!(f, "Q{}:{}", self.number, p),
            None => write!(f, "Q{}:-", self.number),
        }
    }
}
