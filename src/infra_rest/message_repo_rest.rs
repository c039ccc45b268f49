use super::client::RestClient;
use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;

const MESSAGE_WITH_SENDER: &str = "*,sender:user_profiles(name)";

pub struct RestMessageRepo {
    client: RestClient,
}

impl RestMessageRepo {
    pub fn new(client: RestClient) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl MessageRepo for RestMessageRepo {
    async fn list_for_chat(&self, chat_id: ChatId) -> Result<Vec<Message>, GatewayError> {
        self.client
            .from("messages")
            .select(MESSAGE_WITH_SENDER)
            .eq("chat_id", chat_id)
            .order("created_at.asc")
            .fetch()
            .await
    }

    async fn insert(&self, message: &NewMessage) -> Result<Message, GatewayError> {
        let rows: Vec<Message> = self
            .client
            .from("messages")
            .select(MESSAGE_WITH_SENDER)
            .insert(message)
            .await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| GatewayError::Decode("insert into messages returned no row".into()))
    }
}
