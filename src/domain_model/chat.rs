use crate::domain_model::*;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Ord, PartialOrd, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatId(pub uuid::Uuid);

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ChatId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        uuid::Uuid::from_str(s).map(ChatId)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatParticipant {
    pub user_id: UserId,
    #[serde(default, rename = "user")]
    pub profile: Option<UserProfile>,
}

impl ChatParticipant {
    pub fn name(&self) -> Option<&str> {
        self.profile.as_ref().map(|p| p.name.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chat {
    pub id: ChatId,
    pub is_group: bool,
    #[serde(default)]
    pub last_message_at: Option<DateTime<Utc>>, // NULL before the first touch
    #[serde(default)]
    pub participants: Vec<ChatParticipant>,
}

impl Chat {
    /// First participant that is not `me`.
    pub fn other_participant(&self, me: UserId) -> Option<&ChatParticipant> {
        self.participants.iter().find(|p| p.user_id != me)
    }

    pub fn has_participant(&self, user_id: UserId) -> bool {
        self.participants.iter().any(|p| p.user_id == user_id)
    }
}
