// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod event_bus;
pub mod transport;

pub use event_bus::{EventBus, EventBusError, EventReceiver, RunEventReceiver};
pub use transport::{CodecError, FinishNotice, MailboxNetwork, MailboxTransport};
