use crate::application_port::*;
use crate::domain_model::*;

#[async_trait::async_trait]
pub trait MessageStatusRepo: Send + Sync {
    /// Upsert keyed on (message_id, user_id); later writes replace is_read/read_at.
    async fn upsert(&self, statuses: &[MessageReadStatus]) -> Result<(), GatewayError>;
    async fn list_for_messages(
        &self,
        message_ids: &[MessageId],
    ) -> Result<Vec<MessageReadStatus>, GatewayError>;
}
