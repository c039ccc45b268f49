mod chat_service_impl;
mod progress_service_impl;

pub use chat_service_impl::*;
pub use progress_service_impl::*;
