use crate::domain_model::*;
use std::collections::HashSet;

/// Messages of one chat in `created_at` order, each id at most once.
///
/// History, the row returned by a send and the realtime echo of that same
/// send all funnel through [`MessageThread::push`].
#[derive(Debug, Clone)]
pub struct MessageThread {
    chat_id: ChatId,
    messages: Vec<Message>,
    seen: HashSet<MessageId>,
}

impl MessageThread {
    pub fn new(chat_id: ChatId) -> Self {
        Self {
            chat_id,
            messages: Vec::new(),
            seen: HashSet::new(),
        }
    }

    pub fn chat_id(&self) -> ChatId {
        self.chat_id
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn extend_history(&mut self, history: impl IntoIterator<Item = Message>) -> usize {
        let mut added = 0;
        for message in history {
            if self.push(message) {
                added += 1;
            }
        }
        added
    }

    /// Returns false when the message was already present or belongs to
    /// another chat. A duplicate that carries a sender profile fills in the
    /// one the stored copy is missing.
    pub fn push(&mut self, message: Message) -> bool {
        if message.chat_id != self.chat_id {
            return false;
        }
        if !self.seen.insert(message.id) {
            if message.sender.is_some()
                && let Some(stored) = self
                    .messages
                    .iter_mut()
                    .find(|m| m.id == message.id && m.sender.is_none())
            {
                stored.sender = message.sender;
            }
            return false;
        }

        let at = self
            .messages
            .partition_point(|m| (m.created_at, m.id.0) <= (message.created_at, message.id.0));
        self.messages.insert(at, message);
        true
    }

    pub fn unread_from_others(&self, me: UserId) -> impl Iterator<Item = &Message> {
        self.messages.iter().filter(move |m| m.sender_id != me)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use uuid::Uuid;

    fn chat() -> ChatId {
        ChatId(Uuid::from_u128(1))
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap() + Duration::seconds(secs)
    }

    fn message(n: u128, secs: i64) -> Message {
        Message {
            id: MessageId(Uuid::from_u128(n)),
            chat_id: chat(),
            sender_id: UserId(Uuid::from_u128(7)),
            content: format!("m{n}"),
            file_url: None,
            created_at: at(secs),
            is_edited: false,
            reply_to_id: None,
            sender: None,
        }
    }

    #[test]
    fn keeps_created_at_order() {
        let mut thread = MessageThread::new(chat());
        thread.push(message(3, 30));
        thread.push(message(1, 10));
        thread.push(message(2, 20));

        let contents: Vec<_> = thread.messages().iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["m1", "m2", "m3"]);
    }

    #[test]
    fn send_and_echo_collapse() {
        let mut thread = MessageThread::new(chat());
        assert_eq!(thread.extend_history(vec![message(1, 10)]), 1);

        let mut sent = message(2, 20);
        sent.sender = Some(UserProfile {
            name: "Ann".into(),
        });
        let echo = message(2, 20);

        assert!(thread.push(echo));
        assert!(!thread.push(sent));
        assert_eq!(thread.len(), 2);
        assert_eq!(thread.messages()[1].sender_name(), Some("Ann"));
    }

    #[test]
    fn rejects_other_chats() {
        let mut thread = MessageThread::new(chat());
        let mut stray = message(1, 10);
        stray.chat_id = ChatId(Uuid::from_u128(2));
        assert!(!thread.push(stray));
        assert!(thread.is_empty());
    }

    #[test]
    fn unread_skips_own_messages() {
        let mut thread = MessageThread::new(chat());
        let mut mine = message(1, 10);
        mine.sender_id = UserId(Uuid::from_u128(9));
        thread.push(mine);
        thread.push(message(2, 20));

        let ids: Vec<_> = thread
            .unread_from_others(UserId(Uuid::from_u128(9)))
            .map(|m| m.id)
            .collect();
        assert_eq!(ids, vec![MessageId(Uuid::from_u128(2))]);
    }
}
