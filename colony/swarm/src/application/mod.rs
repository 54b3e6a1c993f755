// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Colony runner use case.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Form a colony, run every worker to completion, take it down

pub mod colony;

pub use colony::Colony;
