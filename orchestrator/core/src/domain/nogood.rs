// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # No-Goods and the No-Good Store
//!
//! A [`NoGood`] is a *context record*: `queen index → position` pairs that
//! must all still hold on the live board for the no-good to apply. The store
//! keys each record by the position it forbids for the owning queen.
//!
//! On the wire a no-good additionally carries the receiver's own entry (the
//! value being forbidden); the receiver strips it with
//! [`NoGood::create_derived`] before storing, so a stored record never names
//! the owning queen.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::board::Board;

/// Ordered `queen index → position` record.
///
/// Serialized as a list of `[queen, position]` pairs. Map keys would become
/// JSON strings, which do not decode back to integers inside the internally
/// tagged message payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<(usize, usize)>", into = "Vec<(usize, usize)>")]
pub struct NoGood(BTreeMap<usize, usize>);

impl NoGood {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn contains(&self, queen: usize) -> bool {
        self.0.contains_key(&queen)
    }

    pub fn get(&self, queen: usize) -> Option<usize> {
        self.0.get(&queen).copied()
    }

    pub fn set(&mut self, queen: usize, position: usize) {
        self.0.insert(queen, position);
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.0.iter().map(|(q, p)| (*q, *p))
    }

    /// Entry with the highest priority (smallest queen index).
    pub fn highest_priority(&self) -> Option<(usize, usize)> {
        self.0.first_key_value().map(|(q, p)| (*q, *p))
    }

    /// Entry with the lowest priority (largest queen index). This is the
    /// queen a resolved no-good is sent to.
    pub fn lowest_priority(&self) -> Option<(usize, usize)> {
        self.0.last_key_value().map(|(q, p)| (*q, *p))
    }

    /// Union of two records. Entries of `other` win on key collisions, which
    /// cannot happen for records verified against the same board.
    pub fn merge(&mut self, other: &NoGood) {
        for (queen, position) in other.iter() {
            self.0.insert(queen, position);
        }
    }

    /// `true` iff every recorded pair still matches `board`.
    pub fn verify_context(&self, board: &Board) -> bool {
        self.iter()
            .all(|(queen, position)| board.position(queen) == Some(position))
    }

    /// Copy of `received` without the entry for `exclude_queen`.
    pub fn create_derived(received: &NoGood, exclude_queen: usize) -> NoGood {
        NoGood(
            received
                .0
                .iter()
                .filter(|(queen, _)| **queen != exclude_queen)
                .map(|(q, p)| (*q, *p))
                .collect(),
        )
    }
}

impl FromIterator<(usize, usize)> for NoGood {
    fn from_iter<I: IntoIterator<Item = (usize, usize)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl From<Vec<(usize, usize)>> for NoGood {
    fn from(entries: Vec<(usize, usize)>) -> Self {
        entries.into_iter().collect()
    }
}

impl From<NoGood> for Vec<(usize, usize)> {
    fn from(nogood: NoGood) -> Self {
        nogood.0.into_iter().collect()
    }
}

impl fmt::Display for NoGood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries: Vec<String> = self.iter().map(|(q, p)| format!("Q{}={}", q, p)).collect();
        write!(f, "[{}]", entries.join(", "))
    }
}

/// Learned no-goods of one queen, keyed by the position they forbid.
#[derive(Debug, Clone, Default)]
pub struct NoGoodStore {
    records: BTreeMap<usize, NoGood>,
}

impl NoGoodStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `position` is forbidden while `context` holds.
    /// Replaces any earlier record for the same position.
    pub fn put(&mut self, position: usize, context: NoGood) {
        self.records.insert(position, context);
    }

    pub fn remove(&mut self, position: usize) -> Option<NoGood> {
        self.records.remove(&position)
    }

    pub fn get(&self, position: usize) -> Option<&NoGood> {
        self.records.get(&position)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Drop every record whose context no longer matches `board` and return
    /// the positions that became available again.
    pub fn release_stale(&mut self, board: &Board) -> Vec<usize> {
        let stale: Vec<usize> = self
            .records
            .iter()
            .filter(|(_, context)| !context.verify_context(board))
            .map(|(position, _)| *position)
            .collect();

        for position in &stale {
            self.records.remove(position);
        }
        stale
    }

    /// Union of every stored context: the explanation for an exhausted domain.
    pub fn resolve(&self) -> NoGood {
        let mut resolved = NoGood::new();
        for context in self.records.values() {
            resolved.merge(context);
        }
        resolved
    }
}
