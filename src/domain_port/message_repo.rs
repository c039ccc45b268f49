use crate::application_port::*;
use crate::domain_model::*;

#[async_trait::async_trait]
pub trait MessageRepo: Send + Sync {
    /// Order by (created_at ASC), sender profile embedded
    async fn list_for_chat(&self, chat_id: ChatId) -> Result<Vec<Message>, GatewayError>;
    async fn insert(&self, message: &NewMessage) -> Result<Message, GatewayError>;
}
