//! View state behind the chat screens. Nothing here talks to the gateway;
//! callers feed it rows fetched through `ChatService`.

mod chat_list;
mod format;
mod thread;

pub use chat_list::*;
pub use format::*;
pub use thread::*;
