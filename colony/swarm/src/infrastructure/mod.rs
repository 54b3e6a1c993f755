// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod directory;
pub mod transport;

pub use directory::InMemoryDirectory;
pub use transport::{MailboxTransport, MessageHub};
