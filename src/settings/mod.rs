//! TOML settings plus `SIGNCHAT__SECTION__KEY` environment overrides, and the
//! command line that selects the file and the command to run.

mod cli;
pub use clap::Parser;
pub use cli::*;

mod settings;
pub use settings::*;
