mod client;

pub use client::*;

mod attachment_store_rest;
mod chat_repo_rest;
mod message_feed_realtime;
mod message_repo_rest;
mod message_status_repo_rest;
mod quiz_repo_rest;
mod tutorial_progress_repo_rest;

pub use attachment_store_rest::*;
pub use chat_repo_rest::*;
pub use message_feed_realtime::*;
pub use message_repo_rest::*;
pub use message_status_repo_rest::*;
pub use quiz_repo_rest::*;
pub use tutorial_progress_repo_rest::*;
