use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

pub struct RealChatService {
    chat_repo: Arc<dyn ChatRepo>,
    message_repo: Arc<dyn MessageRepo>,
    message_status_repo: Arc<dyn MessageStatusRepo>,
    attachment_store: Arc<dyn AttachmentStore>,
    message_feed: Arc<dyn MessageFeed>,
    last_upload_millis: AtomicI64,
}

impl RealChatService {
    pub fn new(
        chat_repo: Arc<dyn ChatRepo>,
        message_repo: Arc<dyn MessageRepo>,
        message_status_repo: Arc<dyn MessageStatusRepo>,
        attachment_store: Arc<dyn AttachmentStore>,
        message_feed: Arc<dyn MessageFeed>,
    ) -> Self {
        Self {
            chat_repo,
            message_repo,
            message_status_repo,
            attachment_store,
            message_feed,
            last_upload_millis: AtomicI64::new(0),
        }
    }

    /// Wall-clock millis, bumped past the previous upload so two uploads in the
    /// same millisecond still get distinct object paths.
    fn next_upload_millis(&self) -> i64 {
        let now = Utc::now().timestamp_millis();
        let mut prev = self.last_upload_millis.load(Ordering::Relaxed);
        loop {
            let next = now.max(prev + 1);
            match self.last_upload_millis.compare_exchange_weak(
                prev,
                next,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return next,
                Err(actual) => prev = actual,
            }
        }
    }
}

#[async_trait::async_trait]
impl ChatService for RealChatService {
    async fn list_chats(&self) -> Result<Vec<Chat>, GatewayError> {
        self.chat_repo
            .list_with_participants()
            .await
            .inspect_err(|e| error!("list chats: {e}"))
    }

    async fn list_messages(&self, chat_id: ChatId) -> Result<Vec<Message>, GatewayError> {
        self.message_repo
            .list_for_chat(chat_id)
            .await
            .inspect_err(|e| error!("list messages of chat {chat_id}: {e}"))
    }

    async fn send_message(&self, message: NewMessage) -> Result<Message, GatewayError> {
        let record = self
            .message_repo
            .insert(&message)
            .await
            .inspect_err(|e| error!("send message to chat {}: {e}", message.chat_id))?;
        debug!("message {} sent to chat {}", record.id, record.chat_id);
        Ok(record)
    }

    async fn mark_messages_as_read(
        &self,
        messages: &[Message],
        user_id: UserId,
    ) -> Result<usize, GatewayError> {
        let read_at = Utc::now();
        // one row per message; a repeated key would fail the whole upsert
        let statuses: Vec<MessageReadStatus> = messages
            .iter()
            .filter(|m| m.sender_id != user_id)
            .map(|m| MessageReadStatus::read_now(m.id, user_id, read_at))
            .map(|s| (s.key(), s))
            .collect::<BTreeMap<_, _>>()
            .into_values()
            .collect();

        if statuses.is_empty() {
            return Ok(0);
        }

        self.message_status_repo
            .upsert(&statuses)
            .await
            .inspect_err(|e| error!("mark {} messages as read: {e}", statuses.len()))?;

        Ok(statuses.len())
    }

    async fn read_receipts(
        &self,
        message_ids: &[MessageId],
    ) -> Result<Vec<MessageReadStatus>, GatewayError> {
        if message_ids.is_empty() {
            return Ok(vec![]);
        }
        self.message_status_repo
            .list_for_messages(message_ids)
            .await
            .inspect_err(|e| error!("read receipts: {e}"))
    }

    async fn upload_attachment(
        &self,
        attachment: &Attachment,
        user_id: UserId,
    ) -> Result<String, GatewayError> {
        let path = ObjectPath::for_upload(
            user_id,
            self.next_upload_millis(),
            &attachment.extension(),
        );

        self.attachment_store
            .upload(&path, attachment)
            .await
            .inspect_err(|e| error!("upload attachment {path}: {e}"))?;

        Ok(self.attachment_store.public_url(&path))
    }

    async fn subscribe_to_messages(
        &self,
        chat_id: ChatId,
        mut callback: MessageCallback,
    ) -> Result<MessageSubscription, GatewayError> {
        let cancel = CancellationToken::new();
        let mut feed = self
            .message_feed
            .open(chat_id, cancel.clone())
            .await
            .inspect_err(|e| error!("subscribe to chat {chat_id}: {e}"))?;

        let token = cancel.clone();
        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    next = feed.recv() => match next {
                        Some(message) if message.chat_id == chat_id => callback(message),
                        Some(message) => {
                            warn!(
                                "dropping message {} of chat {} on feed of chat {chat_id}",
                                message.id, message.chat_id
                            );
                        }
                        None => {
                            debug!("feed of chat {chat_id} closed by gateway");
                            break;
                        }
                    }
                }
            }
        });

        Ok(MessageSubscription::new(chat_id, cancel, handle))
    }

    async fn create_chat(
        &self,
        user_ids: &[UserId],
        is_group: bool,
    ) -> Result<Chat, GatewayError> {
        self.chat_repo
            .create_with_participants(user_ids, is_group)
            .await
            .inspect_err(|e| error!("create chat: {e}"))
    }

    async fn update_last_message_time(&self, chat_id: ChatId) -> Result<(), GatewayError> {
        self.chat_repo
            .touch_last_message_at(chat_id, Utc::now())
            .await
            .inspect_err(|e| error!("update last message time of chat {chat_id}: {e}"))
    }
}
