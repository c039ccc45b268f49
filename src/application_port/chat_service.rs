use crate::application_port::GatewayError;
use crate::domain_model::*;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub type MessageCallback = Box<dyn FnMut(Message) + Send + 'static>;

/// Live INSERT feed for one chat. Release it once with [`unsubscribe`];
/// dropping the handle cancels delivery without waiting.
///
/// [`unsubscribe`]: MessageSubscription::unsubscribe
pub struct MessageSubscription {
    chat_id: ChatId,
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl MessageSubscription {
    pub(crate) fn new(chat_id: ChatId, cancel: CancellationToken, handle: JoinHandle<()>) -> Self {
        Self {
            chat_id,
            cancel,
            handle: Some(handle),
        }
    }

    pub fn chat_id(&self) -> ChatId {
        self.chat_id
    }

    /// False once cancelled or once the gateway closed the feed.
    pub fn is_active(&self) -> bool {
        !self.cancel.is_cancelled()
            && self
                .handle
                .as_ref()
                .is_some_and(|handle| !handle.is_finished())
    }

    pub async fn unsubscribe(mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                tracing::warn!("subscription task for chat {} ended abnormally: {e}", self.chat_id);
            }
        }
    }
}

impl Drop for MessageSubscription {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[async_trait::async_trait]
pub trait ChatService: Send + Sync {
    /// Order by (last_message_at DESC), untouched chats last
    async fn list_chats(&self) -> Result<Vec<Chat>, GatewayError>;

    /// Order by (created_at ASC)
    async fn list_messages(&self, chat_id: ChatId) -> Result<Vec<Message>, GatewayError>;

    /// Inserts one row. Does not touch the chat's last_message_at.
    async fn send_message(&self, message: NewMessage) -> Result<Message, GatewayError>;

    /// Returns how many read-status rows were written.
    async fn mark_messages_as_read(
        &self,
        messages: &[Message],
        user_id: UserId,
    ) -> Result<usize, GatewayError>;

    async fn read_receipts(
        &self,
        message_ids: &[MessageId],
    ) -> Result<Vec<MessageReadStatus>, GatewayError>;

    /// Returns the public URL of the stored object.
    async fn upload_attachment(
        &self,
        attachment: &Attachment,
        user_id: UserId,
    ) -> Result<String, GatewayError>;

    async fn subscribe_to_messages(
        &self,
        chat_id: ChatId,
        callback: MessageCallback,
    ) -> Result<MessageSubscription, GatewayError>;

    async fn create_chat(
        &self,
        user_ids: &[UserId],
        is_group: bool,
    ) -> Result<Chat, GatewayError>;

    async fn update_last_message_time(&self, chat_id: ChatId) -> Result<(), GatewayError>;
}
