// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Protocol tests for a single ABT agent driven turn by turn against a
//! recording transport.
//!
//! Covers the start-up handshake, `ok?` and `no-good` handling, backtracking,
//! infeasibility and the handling of `terminate` in any state. The last tests
//! run whole swarms over the JSON mailbox transport.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use abt_core::application::{AbtAgent, AgentSettings};
use abt_core::domain::agent::{Action, AgentName, AgentState, Coordinate, Perception};
use abt_core::domain::message::{Envelope, Payload};
use abt_core::domain::nogood::NoGood;
use abt_core::domain::queen::ScanPolicy;
use abt_core::domain::transport::{QueenAgent, Transport, TransportError};
use abt_core::infrastructure::transport::{MailboxNetwork, MailboxTransport};

#[derive(Default)]
struct Recording {
    inbox: VecDeque<Envelope>,
    /// `None` recipient means broadcast
    sent: Vec<(Option<AgentName>, Envelope)>,
    finished: Vec<bool>,
}

#[derive(Clone, Default)]
struct RecordingTransport {
    inner: Arc<Mutex<Recording>>,
}

impl RecordingTransport {
    fn push(&self, envelope: Envelope) {
        self.inner.lock().unwrap().inbox.push_back(envelope);
    }

    fn take_sent(&self) -> Vec<(Option<AgentName>, Envelope)> {
        std::mem::take(&mut self.inner.lock().unwrap().sent)
    }

    fn finished(&self) -> Vec<bool> {
        self.inner.lock().unwrap().finished.clone()
    }
}

impl Transport for RecordingTransport {
    fn send(&self, to: &AgentName, envelope: Envelope) -> Result<(), TransportError> {
        self.inner.lock().unwrap().sent.push((Some(to.clone()), envelope));
        Ok(())
    }

    fn broadcast(&self, envelope: Envelope) -> Result<(), TransportError> {
        self.inner.lock().unwrap().sent.push((None, envelope));
        Ok(())
    }

    fn receive(&mut self) -> Vec<Envelope> {
        self.inner.lock().unwrap().inbox.drain(..).collect()
    }

    fn notify_finished(&self, success: bool) {
        self.inner.lock().unwrap().finished.push(success);
    }
}

fn envelope(sender: &str, queen: usize, state: AgentState, payload: Payload) -> Envelope {
    Envelope {
        sender: AgentName::from(sender),
        queen: Some(queen),
        state,
        coordinate: None,
        payload,
    }
}

fn record(entries: &[(usize, usize)]) -> NoGood {
    entries.iter().copied().collect()
}

struct Harness {
    agent: AbtAgent<RecordingTransport>,
    transport: RecordingTransport,
    coordinate: Coordinate,
    step: u64,
}

impl Harness {
    fn new(name: &str, row: usize, size: usize, policy: ScanPolicy) -> Self {
        let transport = RecordingTransport::default();
        let settings = AgentSettings {
            board_size: size,
            row_offset: 1,
            idle_threshold: 3,
            scan_policy: policy,
        };
        let agent = AbtAgent::new(AgentName::from(name), transport.clone(), settings);
        Self {
            agent,
            transport,
            coordinate: Coordinate::new(0, row),
            step: 0,
        }
    }

    fn turn(&mut self) -> Action {
        self.step += 1;
        let action = self.agent.deliberate(&Perception {
            coordinate: self.coordinate,
            step: self.step,
        });
        match action {
            Action::East => self.coordinate.x += 1,
            Action::West => self.coordinate.x -= 1,
            _ => {}
        }
        action
    }

    /// Walk through the start-up handshake with the given peers and run the
    /// first working cycle. Clears the record of sent messages.
    fn start(&mut self, peers: &[(&str, usize)]) {
        for (name, queen) in peers {
            self.transport
                .push(envelope(name, *queen, AgentState::Init, Payload::MyQueen { index: *queen }));
        }
        self.turn();
        assert_eq!(self.agent.state(), AgentState::InitI);

        for (name, queen) in peers {
            self.transport.push(envelope(
                name,
                *queen,
                AgentState::InitII,
                Payload::MyState { state: AgentState::InitII },
            ));
        }
        self.turn();
        assert_eq!(self.agent.state(), AgentState::InitII);
        self.turn();
        assert_eq!(self.agent.state(), AgentState::Working);
        self.turn();
        assert_eq!(self.agent.state(), AgentState::Idle);
        self.transport.take_sent();
    }
}

const FOUR_PEERS: [(&str, usize); 3] = [("a1", 0), ("a2", 2), ("b2", 3)];

fn ok_recipients(sent: &[(Option<AgentName>, Envelope)]) -> Vec<(String, usize)> {
    sent.iter()
        .filter_map(|(to, envelope)| match (&to, &envelope.payload) {
            (Some(to), Payload::Ok { position }) => Some((to.to_string(), *position)),
            _ => None,
        })
        .collect()
}

#[test]
fn test_handshake_announces_queen_and_states() {
    let mut harness = Harness::new("b1", 2, 4, ScanPolicy::Forward);
    for (name, queen) in FOUR_PEERS {
        harness
            .transport
            .push(envelope(name, queen, AgentState::Init, Payload::MyQueen { index: queen }));
    }
    harness.turn();

    let sent = harness.transport.take_sent();
    let payloads: Vec<&Payload> = sent.iter().map(|(_, e)| &e.payload).collect();
    assert!(sent.iter().all(|(to, _)| to.is_none()));
    assert_eq!(payloads[0], &Payload::MyQueen { index: 1 });
    assert_eq!(payloads[1], &Payload::MyPosition { x: 0, y: 2 });
    assert_eq!(payloads[2], &Payload::MyState { state: AgentState::InitI });

    let a1 = harness.agent.peer(&"a1".into()).unwrap();
    assert!(a1.is_parent && !a1.is_child);
    let b2 = harness.agent.peer(&"b2".into()).unwrap();
    assert!(b2.is_child && !b2.is_parent);
}

#[test]
fn test_init_waits_for_every_peer() {
    let mut harness = Harness::new("b1", 2, 4, ScanPolicy::Forward);
    harness
        .transport
        .push(envelope("a1", 0, AgentState::Init, Payload::MyQueen { index: 0 }));
    harness.turn();
    harness.turn();
    assert_eq!(harness.agent.state(), AgentState::Init);

    // MyQueen is only broadcast once.
    let announcements = harness
        .transport
        .take_sent()
        .into_iter()
        .filter(|(_, e)| matches!(e.payload, Payload::MyQueen { .. }))
        .count();
    assert_eq!(announcements, 1);
}

#[test]
fn test_first_cycle_announces_to_children_only() {
    let mut harness = Harness::new("b1", 2, 4, ScanPolicy::Forward);
    for (name, queen) in FOUR_PEERS {
        harness
            .transport
            .push(envelope(name, queen, AgentState::Init, Payload::MyQueen { index: queen }));
    }
    harness.turn();
    for (name, queen) in FOUR_PEERS {
        harness.transport.push(envelope(
            name,
            queen,
            AgentState::Working,
            Payload::MyState { state: AgentState::InitII },
        ));
    }
    harness.turn();
    harness.turn();
    harness.transport.take_sent();
    harness.turn();

    assert_eq!(harness.agent.target_column(), Some(0));
    let oks = ok_recipients(&harness.transport.take_sent());
    assert_eq!(oks, vec![("a2".to_string(), 0), ("b2".to_string(), 0)]);
    assert_eq!(harness.agent.detector().balance(), 2);
}

#[test]
fn test_repeated_metadata_messages_are_idempotent() {
    let mut harness = Harness::new("b1", 2, 4, ScanPolicy::Forward);
    harness.start(&FOUR_PEERS);

    let mut status = envelope("b2", 3, AgentState::Idle, Payload::MyState { state: AgentState::Idle });
    status.coordinate = Some(Coordinate::new(2, 4));
    let position = envelope("b2", 3, AgentState::Idle, Payload::MyPosition { x: 2, y: 4 });

    harness.transport.push(status.clone());
    harness.transport.push(position.clone());
    harness.turn();
    let once = harness.agent.peer(&"b2".into()).cloned();
    let board_once = harness.agent.board().clone();

    harness.transport.push(status);
    harness.transport.push(position);
    harness.turn();

    assert_eq!(harness.agent.peer(&"b2".into()).cloned(), once);
    assert_eq!(harness.agent.board(), &board_once);
    assert_eq!(harness.agent.state(), AgentState::Idle);
    assert!(ok_recipients(&harness.transport.take_sent()).is_empty());
}

#[test]
fn test_conflicting_parent_forces_new_position() {
    let mut harness = Harness::new("b1", 2, 4, ScanPolicy::Forward);
    harness.start(&FOUR_PEERS);
    assert_eq!(harness.agent.target_column(), Some(0));

    harness
        .transport
        .push(envelope("a1", 0, AgentState::Idle, Payload::Ok { position: 0 }));
    harness.turn();

    // Column 0 clashes with Q0 on the column, column 1 on the diagonal.
    assert_eq!(harness.agent.target_column(), Some(2));
    assert_eq!(harness.agent.nogoods().get(0), Some(&record(&[(0, 0)])));
    assert_eq!(harness.agent.nogoods().get(1), Some(&record(&[(0, 0)])));
    assert!(harness.agent.board().check_constraints());
    assert_eq!(
        ok_recipients(&harness.transport.take_sent()),
        vec![("a2".to_string(), 2), ("b2".to_string(), 2)]
    );
}

#[test]
fn test_consistent_parent_move_keeps_position_quietly() {
    let mut harness = Harness::new("b1", 2, 4, ScanPolicy::Forward);
    harness.start(&FOUR_PEERS);

    harness
        .transport
        .push(envelope("a1", 0, AgentState::Idle, Payload::Ok { position: 3 }));
    harness.turn();

    assert_eq!(harness.agent.target_column(), Some(0));
    assert_eq!(harness.agent.state(), AgentState::Idle);
    assert!(harness.transport.take_sent().is_empty());
}

#[test]
fn test_ok_from_child_is_ignored() {
    let mut harness = Harness::new("b1", 2, 4, ScanPolicy::Forward);
    harness.start(&FOUR_PEERS);

    harness
        .transport
        .push(envelope("b2", 3, AgentState::Idle, Payload::Ok { position: 1 }));
    harness.turn();

    assert_eq!(harness.agent.board().position(3), None);
    assert_eq!(harness.agent.state(), AgentState::Idle);
}

#[test]
fn test_valid_nogood_from_child_is_learned() {
    let mut harness = Harness::new("b1", 2, 4, ScanPolicy::Forward);
    harness.start(&FOUR_PEERS);

    harness.transport.push(envelope(
        "a2",
        2,
        AgentState::Working,
        Payload::NoGood { record: record(&[(1, 0)]) },
    ));
    harness.turn();

    assert_eq!(harness.agent.nogoods().get(0), Some(&NoGood::new()));
    assert!(!harness.agent.queen().unwrap().is_available(0));
    assert_eq!(harness.agent.target_column(), Some(1));
    assert_eq!(
        ok_recipients(&harness.transport.take_sent()),
        vec![("a2".to_string(), 1), ("b2".to_string(), 1)]
    );
}

#[test]
fn test_stale_nogood_resends_ok_to_sender() {
    let mut harness = Harness::new("b1", 2, 4, ScanPolicy::Forward);
    harness.start(&FOUR_PEERS);
    harness
        .transport
        .push(envelope("a1", 0, AgentState::Idle, Payload::Ok { position: 3 }));
    harness.turn();
    harness.transport.take_sent();

    // The child still believes Q0 is on column 2.
    harness.transport.push(envelope(
        "a2",
        2,
        AgentState::Working,
        Payload::NoGood { record: record(&[(0, 2), (1, 0)]) },
    ));
    harness.turn();

    assert!(harness.agent.nogoods().is_empty());
    assert_eq!(harness.agent.target_column(), Some(0));
    assert_eq!(
        ok_recipients(&harness.transport.take_sent()),
        vec![("a2".to_string(), 0)]
    );
}

#[test]
fn test_nogood_about_abandoned_position_is_ignored() {
    let mut harness = Harness::new("b1", 2, 4, ScanPolicy::Forward);
    harness.start(&FOUR_PEERS);

    harness.transport.push(envelope(
        "b2",
        3,
        AgentState::Working,
        Payload::NoGood { record: record(&[(1, 2)]) },
    ));
    harness.turn();

    assert!(harness.agent.nogoods().is_empty());
    assert_eq!(harness.agent.target_column(), Some(0));
    assert!(harness.transport.take_sent().is_empty());
}

#[test]
fn test_exhausted_domain_backtracks_to_lowest_priority_parent() {
    let mut harness = Harness::new("b1", 2, 4, ScanPolicy::Forward);
    harness.start(&FOUR_PEERS);

    harness
        .transport
        .push(envelope("a1", 0, AgentState::Idle, Payload::Ok { position: 1 }));
    harness.turn();
    assert_eq!(harness.agent.target_column(), Some(3));
    harness.transport.take_sent();

    harness.transport.push(envelope(
        "a2",
        2,
        AgentState::Working,
        Payload::NoGood { record: record(&[(0, 1), (1, 3)]) },
    ));
    harness.turn();

    let sent = harness.transport.take_sent();
    let backtrack = sent
        .iter()
        .find(|(_, e)| matches!(e.payload, Payload::NoGood { .. }))
        .expect("a no-good must be sent");
    assert_eq!(backtrack.0, Some(AgentName::from("a1")));
    assert_eq!(backtrack.1.payload, Payload::NoGood { record: record(&[(0, 1)]) });

    // Q0 is forgotten until it speaks again, which frees the whole domain.
    assert_eq!(harness.agent.board().position(0), None);
    assert_eq!(harness.agent.target_column(), Some(0));
    assert_eq!(harness.agent.state(), AgentState::Idle);
    assert!(ok_recipients(&sent).contains(&("a2".to_string(), 0)));
}

#[test]
fn test_unconditional_exhaustion_terminates_with_failure() {
    let mut harness = Harness::new("a1", 1, 2, ScanPolicy::Forward);
    harness.start(&[("b1", 1)]);
    assert_eq!(harness.agent.target_column(), Some(0));

    harness.transport.push(envelope(
        "b1",
        1,
        AgentState::Working,
        Payload::NoGood { record: record(&[(0, 0)]) },
    ));
    harness.turn();
    assert_eq!(harness.agent.target_column(), Some(1));

    harness.transport.push(envelope(
        "b1",
        1,
        AgentState::Working,
        Payload::NoGood { record: record(&[(0, 1)]) },
    ));
    assert_eq!(harness.turn(), Action::Skip);

    assert!(harness.agent.is_finished());
    assert_eq!(harness.agent.outcome(), Some(false));
    assert_eq!(harness.transport.finished(), vec![false]);
    let sent = harness.transport.take_sent();
    assert!(sent
        .iter()
        .any(|(to, e)| to.is_none() && e.payload == Payload::Terminate { success: false }));
}

#[test]
fn test_terminate_is_honored_in_any_state() {
    let mut harness = Harness::new("b1", 2, 4, ScanPolicy::Bidirectional);
    harness
        .transport
        .push(envelope("a1", 0, AgentState::Finished, Payload::Terminate { success: false }));
    assert_eq!(harness.turn(), Action::Skip);
    assert_eq!(harness.agent.state(), AgentState::Finished);
    assert_eq!(harness.transport.finished(), vec![false]);

    let mut harness = Harness::new("b1", 2, 4, ScanPolicy::Bidirectional);
    harness.start(&FOUR_PEERS);
    harness
        .transport
        .push(envelope("b2", 3, AgentState::Finished, Payload::Terminate { success: true }));
    harness.turn();
    assert_eq!(harness.agent.outcome(), Some(true));

    // Later traffic is ignored.
    harness
        .transport
        .push(envelope("a1", 0, AgentState::Idle, Payload::Ok { position: 0 }));
    assert_eq!(harness.turn(), Action::Skip);
    assert_eq!(harness.transport.finished(), vec![true]);
}

#[test]
fn test_agent_walks_to_its_column() {
    let mut harness = Harness::new("b1", 2, 4, ScanPolicy::Forward);
    harness.start(&FOUR_PEERS);
    harness
        .transport
        .push(envelope("a1", 0, AgentState::Idle, Payload::Ok { position: 0 }));

    assert_eq!(harness.turn(), Action::East);
    assert_eq!(harness.turn(), Action::East);
    assert_eq!(harness.turn(), Action::Skip);
    assert_eq!(harness.coordinate.x, 2);
}

#[test]
fn test_single_agent_solves_alone() {
    let mut harness = Harness::new("a1", 1, 1, ScanPolicy::Bidirectional);
    for _ in 0..20 {
        harness.turn();
        if harness.agent.is_finished() {
            break;
        }
    }
    assert_eq!(harness.agent.outcome(), Some(true));
    assert_eq!(harness.agent.target_column(), Some(0));
    assert_eq!(harness.transport.finished(), vec![true]);
}

/// Drive a whole swarm over JSON mailboxes in lock-step, avatars starting on
/// row `1 + i` in column 0. Returns every agent once all have finished.
fn run_over_mailboxes(size: usize, max_turns: u64) -> Vec<AbtAgent<MailboxTransport>> {
    let settings = AgentSettings {
        board_size: size,
        row_offset: 1,
        idle_threshold: 3,
        scan_policy: ScanPolicy::Bidirectional,
    };
    let names: Vec<AgentName> = (0..size).map(|i| AgentName::new(format!("q{}", i))).collect();
    let mut network = MailboxNetwork::connect(&names);
    let mut agents: Vec<_> = network
        .transports
        .drain(..)
        .zip(names)
        .map(|(transport, name)| AbtAgent::new(name, transport, settings))
        .collect();
    let mut coordinates: Vec<Coordinate> = (0..size).map(|i| Coordinate::new(0, 1 + i)).collect();

    for step in 1..=max_turns {
        let actions: Vec<Action> = agents
            .iter_mut()
            .zip(&coordinates)
            .map(|(agent, coordinate)| {
                agent.deliberate(&Perception {
                    coordinate: *coordinate,
                    step,
                })
            })
            .collect();
        for (coordinate, action) in coordinates.iter_mut().zip(actions) {
            match action {
                Action::East => coordinate.x = (coordinate.x + 1).min(size - 1),
                Action::West => coordinate.x = coordinate.x.saturating_sub(1),
                _ => {}
            }
        }
        if agents.iter().all(|agent| agent.is_finished()) {
            break;
        }
    }
    agents
}

#[test]
fn test_two_queens_prove_infeasibility_over_mailboxes() {
    let agents = run_over_mailboxes(2, 500);
    for agent in &agents {
        assert_eq!(agent.outcome(), Some(false), "{} did not finish infeasible", agent.name());
    }
    // The root only concludes after learning a no-good for each column from
    // its child.
    assert_eq!(agents[0].nogoods().len(), 2);
}

#[test]
fn test_four_queens_backtrack_to_a_solution_over_mailboxes() {
    let agents = run_over_mailboxes(4, 5_000);
    let columns: Vec<Option<usize>> = agents.iter().map(|agent| agent.target_column()).collect();
    assert!(agents.iter().all(|agent| agent.outcome() == Some(true)), "columns {:?}", columns);
    assert!(
        columns == vec![Some(1), Some(3), Some(0), Some(2)] || columns == vec![Some(2), Some(0), Some(3), Some(1)],
        "columns {:?}",
        columns
    );
}
