//! Process-wide `tracing` subscriber. Starts at `info` so settings parsing can
//! log, then takes the configured filter once settings are loaded.

mod logger;
pub use logger::*;

pub use tracing::{debug, error, info, trace, warn};
