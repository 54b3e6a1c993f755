// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Colony Domain Layer
//!
//! Pure types describing a colony run. No I/O dependencies.
//!
//! | Module | Key Types |
//! |--------|-----------|
//! | [`outcome`] | `ColonyOutcome`, worker naming |

pub mod outcome;

pub use outcome::*;
