// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod event_bus;
pub mod graph_loader;
pub mod results_writer;

pub use event_bus::{EventBus, EventBusError, EventReceiver};
pub use graph_loader::GraphLoader;
pub use results_writer::{FileResultsWriter, MemoryResultsWriter};
