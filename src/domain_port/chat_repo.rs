use crate::application_port::*;
use crate::domain_model::*;
use chrono::{DateTime, Utc};

#[async_trait::async_trait]
pub trait ChatRepo: Send + Sync {
    /// Chats visible to the caller with participants and their profile names,
    /// order by (last_message_at DESC), NULL last
    async fn list_with_participants(&self) -> Result<Vec<Chat>, GatewayError>;

    /// Single remote procedure; the gateway creates chat and participants atomically.
    async fn create_with_participants(
        &self,
        user_ids: &[UserId],
        is_group: bool,
    ) -> Result<Chat, GatewayError>;

    /// Sets last_message_at to `at` unless it is already later.
    async fn touch_last_message_at(
        &self,
        chat_id: ChatId,
        at: DateTime<Utc>,
    ) -> Result<(), GatewayError>;
}
