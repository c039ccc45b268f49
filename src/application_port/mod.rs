mod chat_service;
mod gateway_error;
mod progress_service;

pub use chat_service::*;
pub use gateway_error::*;
pub use progress_service::*;
