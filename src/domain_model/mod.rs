mod attachment;
mod chat;
mod message;
mod progress;
mod quiz;
mod read_status;
mod user;

pub use attachment::*;
pub use chat::*;
pub use message::*;
pub use progress::*;
pub use quiz::*;
pub use read_status::*;
pub use user::*;
