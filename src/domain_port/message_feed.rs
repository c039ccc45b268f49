use crate::application_port::*;
use crate::domain_model::*;
use tokio::sync::mpsc::Receiver;
use tokio_util::sync::CancellationToken;

#[async_trait::async_trait]
pub trait MessageFeed: Send + Sync {
    /// Joins the INSERT feed of `messages` filtered to one chat. Returns once the
    /// gateway accepted the join. Delivery stops when `cancel` fires or the
    /// receiver is dropped; the channel is released either way.
    async fn open(
        &self,
        chat_id: ChatId,
        cancel: CancellationToken,
    ) -> Result<Receiver<Message>, GatewayError>;
}
