use super::client::RestClient;
use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;
use serde_json::json;

const CHAT_WITH_PARTICIPANTS: &str =
    "*,participants:chat_participants(user_id,user:user_profiles(name))";

/// Shapes `create_chat_with_participants` may answer with.
#[derive(Deserialize)]
#[serde(untagged)]
enum CreatedChat {
    Row(Chat),
    Rows(Vec<Chat>),
    Id(ChatId),
}

pub struct RestChatRepo {
    client: RestClient,
}

impl RestChatRepo {
    pub fn new(client: RestClient) -> Self {
        Self { client }
    }

    async fn get_with_participants(&self, chat_id: ChatId) -> Result<Chat, GatewayError> {
        self.client
            .from("chats")
            .select(CHAT_WITH_PARTICIPANTS)
            .eq("id", chat_id)
            .single()
            .fetch()
            .await
    }
}

#[async_trait::async_trait]
impl ChatRepo for RestChatRepo {
    async fn list_with_participants(&self) -> Result<Vec<Chat>, GatewayError> {
        self.client
            .from("chats")
            .select(CHAT_WITH_PARTICIPANTS)
            .order("last_message_at.desc.nullslast")
            .fetch()
            .await
    }

    async fn create_with_participants(
        &self,
        user_ids: &[UserId],
        is_group: bool,
    ) -> Result<Chat, GatewayError> {
        let created: CreatedChat = self
            .client
            .rpc(
                "create_chat_with_participants",
                &json!({ "user_ids": user_ids, "is_group": is_group }),
            )
            .await?;

        let chat_id = match created {
            CreatedChat::Row(chat) if !chat.participants.is_empty() => return Ok(chat),
            CreatedChat::Row(chat) => chat.id,
            CreatedChat::Rows(rows) => rows.into_iter().next().ok_or(GatewayError::NoRows)?.id,
            CreatedChat::Id(chat_id) => chat_id,
        };
        tracing::trace!("chat {chat_id} created, loading participants");
        self.get_with_participants(chat_id).await
    }

    async fn touch_last_message_at(
        &self,
        chat_id: ChatId,
        at: DateTime<Utc>,
    ) -> Result<(), GatewayError> {
        let ts = at.to_rfc3339_opts(SecondsFormat::Micros, true);
        // only move forward
        self.client
            .from("chats")
            .eq("id", chat_id)
            .or(&format!(
                "last_message_at.is.null,last_message_at.lt.\"{ts}\""
            ))
            .update_quietly(&json!({ "last_message_at": ts }))
            .await
    }
}
