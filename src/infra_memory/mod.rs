//! In-process gateway used by the `memory` backend and by tests.

mod memory_gateway;

pub use memory_gateway::*;
