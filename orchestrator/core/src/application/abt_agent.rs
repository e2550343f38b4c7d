// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! ABT Agent
//!
//! One queen agent running Asynchronous Backtracking. The agent owns exactly
//! one queen (one board row) and talks to its peers only through a
//! [`Transport`].
//!
//! # Lifecycle
//!
//! ```text
//! Init -> InitI -> InitII -> Working <-> Idle -> Finished
//! ```
//!
//! The three start-up phases guarantee that nobody starts searching before
//! every agent knows every other agent's priority. `Finished` is absorbing.
//!
//! # Protocol
//!
//! - `Ok?` flows from a queen to every lower-priority queen (its children).
//! - `NoGood` flows from a queen whose domain ran dry to the lowest-priority
//!   queen named in the explanation.
//! - A resolved explanation that names nobody proves the puzzle infeasible
//!   and ends the run with `Terminate { success: false }`.
//! - Success is detected by the token ring in
//!   [`TerminationDetector`](crate::application::termination_detector::TerminationDetector).

use std::collections::BTreeMap;

use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::application::termination_detector::{DetectorAction, TerminationDetector};
use crate::domain::agent::{Action, AgentMetadata, AgentName, AgentState, Coordinate, Perception};
use crate::domain::board::{Board, BoardError};
use crate::domain::config::SolverSpec;
use crate::domain::message::{Envelope, Payload};
use crate::domain::nogood::{NoGood, NoGoodStore};
use crate::domain::queen::{Queen, QueenError, ScanPolicy};
use crate::domain::transport::{QueenAgent, Transport};

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Row {row} does not map to a queen (row offset {row_offset}, board size {size})")]
    InvalidRow { row: usize, row_offset: usize, size: usize },

    #[error(transparent)]
    Board(#[from] BoardError),

    #[error(transparent)]
    Queen(#[from] QueenError),
}

/// Per-agent tuning derived from the solver configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgentSettings {
    pub board_size: usize,
    pub row_offset: usize,
    pub idle_threshold: u32,
    pub scan_policy: ScanPolicy,
}

impl AgentSettings {
    pub fn from_spec(spec: &SolverSpec) -> Self {
        Self {
            board_size: spec.agents,
            row_offset: spec.row_offset,
            idle_threshold: spec.idle_threshold,
            scan_policy: spec.scan_policy,
        }
    }
}

/// Outcome of one pass of the working cycle.
enum Revision {
    /// The queen holds a consistent column. `announce` is set when the column
    /// was newly picked and the children have to hear about it.
    Consistent { position: usize, announce: bool },
    /// Domain exhausted; `record` goes to the queen at `target`.
    Backtrack { target: usize, record: NoGood },
    Infeasible,
}

pub struct AbtAgent<T: Transport> {
    name: AgentName,
    transport: T,
    settings: AgentSettings,
    coordinate: Option<Coordinate>,
    queen: Option<Queen>,
    board: Board,
    nogoods: NoGoodStore,
    peers: BTreeMap<AgentName, AgentMetadata>,
    /// Every agent in priority order, fixed once the hierarchy is known
    sequence: Vec<AgentName>,
    state: AgentState,
    announced: bool,
    detector: TerminationDetector,
    outcome: Option<bool>,
}

impl<T: Transport> AbtAgent<T> {
    pub fn new(name: AgentName, transport: T, settings: AgentSettings) -> Self {
        Self {
            name,
            transport,
            board: Board::new(settings.board_size),
            detector: TerminationDetector::new(settings.idle_threshold),
            settings,
            coordinate: None,
            queen: None,
            nogoods: NoGoodStore::new(),
            peers: BTreeMap::new(),
            sequence: Vec::new(),
            state: AgentState::Init,
            announced: false,
            outcome: None,
        }
    }

    pub fn state(&self) -> AgentState {
        self.state
    }

    pub fn queen(&self) -> Option<&Queen> {
        self.queen.as_ref()
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn nogoods(&self) -> &NoGoodStore {
        &self.nogoods
    }

    pub fn peer(&self, name: &AgentName) -> Option<&AgentMetadata> {
        self.peers.get(name)
    }

    pub fn detector(&self) -> &TerminationDetector {
        &self.detector
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn queen_number(&self) -> Option<usize> {
        self.queen.as_ref().map(Queen::number)
    }

    fn envelope(&self, payload: Payload) -> Envelope {
        Envelope {
            sender: self.name.clone(),
            queen: self.queen_number(),
            state: self.state,
            coordinate: self.coordinate,
            payload,
        }
    }

    fn send(&mut self, to: &AgentName, payload: Payload) {
        if payload.is_abt() {
            self.detector.record_sent();
        }
        metrics::counter!("abt_messages_sent_total", "kind" => payload.kind()).increment(1);
        let envelope = self.envelope(payload);
        if let Err(e) = self.transport.send(to, envelope) {
            warn!(agent = %self.name, to = %to, "Failed to send message: {}", e);
        }
    }

    fn broadcast(&mut self, payload: Payload) {
        metrics::counter!("abt_messages_sent_total", "kind" => payload.kind()).increment(1);
        let envelope = self.envelope(payload);
        if let Err(e) = self.transport.broadcast(envelope) {
            warn!(agent = %self.name, "Failed to broadcast message: {}", e);
        }
    }

    /// Create the queen from the row the avatar stands on.
    fn place_queen(&mut self, coordinate: Coordinate) -> Result<(), AgentError> {
        let size = self.settings.board_size;
        let number = coordinate
            .y
            .checked_sub(self.settings.row_offset)
            .filter(|n| *n < size)
            .ok_or(AgentError::InvalidRow {
                row: coordinate.y,
                row_offset: self.settings.row_offset,
                size,
            })?;

        let queen = Queen::new(number, size, self.settings.scan_policy)?;
        for meta in self.peers.values_mut() {
            meta.derive_relationship(&queen);
        }
        info!(agent = %self.name, queen = number, "Queen placed");
        self.queen = Some(queen);
        Ok(())
    }

    fn handle(&mut self, envelope: Envelope) {
        if self.state == AgentState::Finished || envelope.sender == self.name {
            return;
        }

        self.update_peer(&envelope);
        let sender = envelope.sender;
        match envelope.payload {
            Payload::MyQueen { .. } | Payload::MyPosition { .. } | Payload::MyState { .. } => {}
            Payload::Ok { position } => {
                self.detector.record_received();
                self.on_ok(&sender, position);
            }
            Payload::NoGood { record } => {
                self.detector.record_received();
                self.on_nogood(&sender, record);
            }
            Payload::Token { token } => self.detector.accept(token),
            Payload::Terminate { success } => {
                info!(agent = %self.name, from = %sender, success, "Termination announced");
                self.finish(success);
            }
        }
    }

    /// Refresh what we know about the sender. Re-applying the same message
    /// leaves the metadata unchanged.
    fn update_peer(&mut self, envelope: &Envelope) {
        let meta = self
            .peers
            .entry(envelope.sender.clone())
            .or_insert_with(|| AgentMetadata::new(envelope.sender.clone()));

        if envelope.queen.is_some() {
            meta.queen = envelope.queen;
        }
        if envelope.coordinate.is_some() {
            meta.coordinate = envelope.coordinate;
        }
        meta.state = envelope.state;

        match &envelope.payload {
            Payload::MyQueen { index } => meta.queen = Some(*index),
            Payload::MyPosition { x, y } => meta.coordinate = Some(Coordinate::new(*x, *y)),
            Payload::MyState { state } => meta.state = *state,
            _ => {}
        }

        if let Some(queen) = &self.queen {
            meta.derive_relationship(queen);
        }
    }

    fn on_ok(&mut self, sender: &AgentName, position: usize) {
        let Some(meta) = self.peers.get(sender) else {
            return;
        };
        let (Some(parent), true) = (meta.queen, meta.is_parent) else {
            warn!(agent = %self.name, from = %sender, "Ignoring ok? from a queen that is not a parent");
            return;
        };

        if let Err(e) = self.board.set_position(parent, Some(position)) {
            error!(agent = %self.name, from = %sender, "Rejected ok?: {}", e);
            return;
        }
        debug!(agent = %self.name, parent, position, "Parent moved");

        if matches!(self.state, AgentState::Working | AgentState::Idle) {
            self.enter_working();
        }
    }

    fn on_nogood(&mut self, sender: &AgentName, record: NoGood) {
        let is_child = self.peers.get(sender).is_some_and(|meta| meta.is_child);
        if !is_child {
            warn!(agent = %self.name, from = %sender, "Ignoring no-good from a queen that is not a child");
            return;
        }
        let Some(queen) = self.queen.as_mut() else {
            return;
        };
        let number = queen.number();
        let Some(forbidden) = record.get(number) else {
            warn!(agent = %self.name, from = %sender, %record, "No-good does not name this queen");
            return;
        };

        let current = queen.position();
        if current != Some(forbidden) {
            debug!(agent = %self.name, from = %sender, %record, "Ignoring no-good about an abandoned position");
            return;
        }

        let context = NoGood::create_derived(&record, number);
        if context.verify_context(&self.board) {
            debug!(agent = %self.name, from = %sender, position = forbidden, %context, "No-good accepted");
            metrics::counter!("abt_nogoods_learned_total", "source" => "child").increment(1);
            self.nogoods.put(forbidden, context);
            queen.mark_unavailable(&[forbidden]);
            self.board.clear(number);
            self.enter_working();
        } else {
            // The child decided on an outdated view and dropped our value
            // from its board; tell it again.
            debug!(agent = %self.name, from = %sender, %context, "No-good context is stale, re-sending ok?");
            self.send(sender, Payload::Ok { position: forbidden });
        }
    }

    fn enter_working(&mut self) {
        if self.state != AgentState::Working {
            debug!(agent = %self.name, from = %self.state, "Entering working state");
        }
        self.state = AgentState::Working;
        self.detector.reset_idle();
    }

    fn finish(&mut self, success: bool) {
        if self.state == AgentState::Finished {
            return;
        }
        self.state = AgentState::Finished;
        self.outcome = Some(success);
        metrics::counter!("abt_agents_finished_total", "success" => success.to_string()).increment(1);
        info!(agent = %self.name, success, queen = ?self.queen_number(), position = ?self.target_column(), "Agent finished");
        self.transport.notify_finished(success);
    }

    fn on_init(&mut self) {
        let Some(number) = self.queen_number() else {
            return;
        };
        if !self.announced {
            self.broadcast(Payload::MyQueen { index: number });
            if let Some(coordinate) = self.coordinate {
                self.broadcast(Payload::MyPosition { x: coordinate.x, y: coordinate.y });
            }
            self.announced = true;
        }

        let expected = self.settings.board_size.saturating_sub(1);
        let known = self.peers.values().filter(|meta| meta.queen.is_some()).count();
        if known < expected {
            return;
        }

        let mut ranked: Vec<(usize, AgentName)> = self
            .peers
            .values()
            .filter_map(|meta| meta.queen.map(|q| (q, meta.name.clone())))
            .collect();
        ranked.push((number, self.name.clone()));
        ranked.sort();
        if ranked.windows(2).any(|pair| pair[0].0 == pair[1].0) {
            warn!(agent = %self.name, "Two agents claim the same queen; waiting for corrections");
            return;
        }
        self.sequence = ranked.into_iter().map(|(_, name)| name).collect();

        self.state = AgentState::InitI;
        info!(agent = %self.name, queen = number, "Hierarchy established");
        self.broadcast(Payload::MyState { state: AgentState::InitI });
    }

    fn all_peers_reached(&self, state: AgentState) -> bool {
        self.peers.len() >= self.settings.board_size.saturating_sub(1)
            && self.peers.values().all(|meta| meta.state >= state)
    }

    fn on_init_i(&mut self) {
        if self.all_peers_reached(AgentState::InitI) {
            self.state = AgentState::InitII;
            self.broadcast(Payload::MyState { state: AgentState::InitII });
        }
    }

    fn on_init_ii(&mut self) {
        if !self.all_peers_reached(AgentState::InitII) {
            return;
        }
        if let Some(queen) = self.queen.as_mut() {
            queen.reset_domain();
        }
        info!(agent = %self.name, "Search started");
        self.enter_working();
    }

    /// Run the working cycle until the queen holds a consistent column or
    /// the puzzle is proven infeasible. Every backtrack forgets one parent,
    /// so the loop is bounded by the board size.
    fn work(&mut self) {
        for _ in 0..=self.settings.board_size {
            let revision = match self.revise() {
                Ok(revision) => revision,
                Err(e) => {
                    error!(agent = %self.name, "Working cycle aborted: {}", e);
                    return;
                }
            };

            match revision {
                Revision::Consistent { position, announce } => {
                    if announce {
                        debug!(agent = %self.name, position, "Announcing new position");
                        let children: Vec<AgentName> = self
                            .peers
                            .values()
                            .filter(|meta| meta.is_child)
                            .map(|meta| meta.name.clone())
                            .collect();
                        for child in &children {
                            self.send(child, Payload::Ok { position });
                        }
                    }
                    self.state = AgentState::Idle;
                    self.detector.reset_idle();
                    return;
                }
                Revision::Backtrack { target, record } => {
                    let recipient = self
                        .peers
                        .values()
                        .find(|meta| meta.queen == Some(target))
                        .map(|meta| meta.name.clone());
                    let Some(recipient) = recipient else {
                        error!(agent = %self.name, target, "No agent holds the queen to backtrack to");
                        return;
                    };
                    info!(agent = %self.name, to = %recipient, %record, "Backtracking");
                    metrics::counter!("abt_backtracks_total").increment(1);
                    self.send(&recipient, Payload::NoGood { record });
                }
                Revision::Infeasible => {
                    info!(agent = %self.name, "Domain exhausted without conditions; no solution exists");
                    self.broadcast(Payload::Terminate { success: false });
                    self.finish(false);
                    return;
                }
            }
        }
        debug!(agent = %self.name, "Working cycle continues next turn");
    }

    fn revise(&mut self) -> Result<Revision, BoardError> {
        let Some(queen) = self.queen.as_mut() else {
            return Ok(Revision::Infeasible);
        };
        let number = queen.number();

        let released = self.nogoods.release_stale(&self.board);
        if !released.is_empty() {
            debug!(agent = %self.name, ?released, "Released stale no-goods");
            queen.mark_available(&released);
        }

        let mut announce = false;
        let mut candidate = queen.position();
        if candidate.is_none() {
            candidate = queen.next_position();
            announce = true;
        }

        while let Some(column) = candidate {
            self.board.set_position(number, Some(column))?;
            let violations = self.board.violations_for(number);
            let Some((parent, parent_position)) = violations.highest_priority() else {
                return Ok(Revision::Consistent { position: column, announce });
            };

            let context: NoGood = [(parent, parent_position)].into_iter().collect();
            metrics::counter!("abt_nogoods_learned_total", "source" => "conflict").increment(1);
            self.nogoods.put(column, context);
            queen.mark_unavailable(&[column]);
            self.board.clear(number);

            candidate = queen.next_position();
            announce = true;
        }

        self.board.clear(number);
        let resolved = self.nogoods.resolve();
        match resolved.lowest_priority() {
            None => Ok(Revision::Infeasible),
            Some((target, _)) => {
                self.board.clear(target);
                Ok(Revision::Backtrack { target, record: resolved })
            }
        }
    }

    fn on_idle(&mut self) {
        self.detector.tick_idle();
        let ready = self.at_target();
        let action = self.detector.poll(&self.name, &self.sequence, ready);
        match action {
            Some(DetectorAction::Forward { to, token }) => {
                debug!(agent = %self.name, to = %to, counter = token.message_counter(), "Passing termination token");
                self.send(&to, Payload::Token { token });
            }
            Some(DetectorAction::Conclude) => {
                info!(agent = %self.name, "Swarm is quiescent, solution found");
                self.broadcast(Payload::Terminate { success: true });
                self.finish(true);
            }
            None => {}
        }
    }

    fn at_target(&self) -> bool {
        match (self.coordinate, self.target_column()) {
            (Some(coordinate), Some(column)) => coordinate.x == column,
            _ => false,
        }
    }

    fn next_move(&self) -> Action {
        match (self.coordinate, self.target_column()) {
            (Some(coordinate), Some(column)) => Action::toward(coordinate.x, column),
            _ => Action::Skip,
        }
    }
}

impl<T: Transport> QueenAgent for AbtAgent<T> {
    fn name(&self) -> &AgentName {
        &self.name
    }

    fn deliberate(&mut self, perception: &Perception) -> Action {
        self.coordinate = Some(perception.coordinate);
        if self.queen.is_none() && self.state != AgentState::Finished {
            if let Err(e) = self.place_queen(perception.coordinate) {
                error!(agent = %self.name, "Cannot take part in the search: {}", e);
                return Action::Skip;
            }
        }

        for envelope in self.transport.receive() {
            self.handle(envelope);
        }

        match self.state {
            AgentState::Init => self.on_init(),
            AgentState::InitI => self.on_init_i(),
            AgentState::InitII => self.on_init_ii(),
            AgentState::Working => self.work(),
            AgentState::Idle => self.on_idle(),
            AgentState::Finished => {}
        }

        if self.state == AgentState::Finished {
            return Action::Skip;
        }
        self.next_move()
    }

    fn is_finished(&self) -> bool {
        self.state == AgentState::Finished
    }

    fn outcome(&self) -> Option<bool> {
        self.outcome
    }

    fn target_column(&self) -> Option<usize> {
        self.queen.as_ref().and_then(Queen::position)
    }
}
