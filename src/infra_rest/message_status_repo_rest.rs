use super::client::RestClient;
use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;

pub struct RestMessageStatusRepo {
    client: RestClient,
}

impl RestMessageStatusRepo {
    pub fn new(client: RestClient) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl MessageStatusRepo for RestMessageStatusRepo {
    async fn upsert(&self, statuses: &[MessageReadStatus]) -> Result<(), GatewayError> {
        self.client
            .from("message_status")
            .on_conflict("message_id,user_id")
            .upsert_quietly(statuses)
            .await
    }

    async fn list_for_messages(
        &self,
        message_ids: &[MessageId],
    ) -> Result<Vec<MessageReadStatus>, GatewayError> {
        self.client
            .from("message_status")
            .select("message_id,user_id,is_read,read_at")
            .in_list("message_id", message_ids)
            .fetch()
            .await
    }
}
