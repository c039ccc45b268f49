use crate::domain_model::*;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Row of `message_status`, unique on (message_id, user_id).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageReadStatus {
    pub message_id: MessageId,
    pub user_id: UserId,
    pub is_read: bool,
    pub read_at: DateTime<Utc>,
}

impl MessageReadStatus {
    pub fn read_now(message_id: MessageId, user_id: UserId, read_at: DateTime<Utc>) -> Self {
        Self {
            message_id,
            user_id,
            is_read: true,
            read_at,
        }
    }

    pub fn key(&self) -> (MessageId, UserId) {
        (self.message_id, self.user_id)
    }
}
