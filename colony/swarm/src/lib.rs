// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # `antcolony-swarm`: In-Process Colony Runtime
//!
//! Runs a colony of tour-finding workers inside one tokio runtime, providing
//! the collaborators the round coordinator expects from its environment.
//!
//! ## Crate Layout
//!
//! | Module | Layer | Contents |
//! |--------|-------|----------|
//! | [`domain`] | Domain | `ColonyOutcome`, worker naming |
//! | [`infrastructure`] | Infrastructure | `InMemoryDirectory`, `MessageHub`, `MailboxTransport` |
//! | [`application`] | Application | `Colony` runner |
//!
//! ## Key Concepts
//!
//! - **Directory**: service tag → registered workers. Workers are registered
//!   before any of them starts and taken down once all have finished.
//! - **Mailbox**: one unbounded queue per worker; polled without blocking
//!   between search steps.
//! - **Worker task**: one tokio task per worker alternating one coordinator
//!   tick with one inbox drain, yielding in between.

pub mod domain;
pub mod infrastructure;
pub mod application;

pub use application::Colony;
pub use domain::*;
