// chat

mod attachment_store;
mod chat_repo;
mod message_feed;
mod message_repo;
mod message_status_repo;

pub use attachment_store::*;
pub use chat_repo::*;
pub use message_feed::*;
pub use message_repo::*;
pub use message_status_repo::*;

// learning progress

mod quiz_repo;
mod tutorial_progress_repo;

pub use quiz_repo::*;
pub use tutorial_progress_repo::*;
