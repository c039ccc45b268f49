mod app;
pub use app::*;

mod commands;
pub use commands::*;
