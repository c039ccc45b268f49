use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc::{self, Receiver, Sender};
use tokio_util::sync::CancellationToken;

const FEED_CAP: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

struct ChatRow {
    id: ChatId,
    is_group: bool,
    last_message_at: Option<DateTime<Utc>>,
    participants: Vec<UserId>,
}

struct FeedSubscriber {
    sender: Sender<Message>,
    cancel: CancellationToken,
}

impl FeedSubscriber {
    fn is_live(&self) -> bool {
        !self.cancel.is_cancelled() && !self.sender.is_closed()
    }
}

#[derive(Default)]
struct MemoryState {
    profiles: HashMap<UserId, String>,
    chats: Vec<ChatRow>, // creation order
    messages: Vec<Message>,
    statuses: BTreeMap<(MessageId, UserId), MessageReadStatus>,
    objects: HashMap<String, StoredObject>,
    tutorial_progress: HashMap<(UserId, TutorialId), TutorialProgress>,
    answer_keys: HashMap<QuizSetId, Vec<AnswerKey>>,
    quiz_progress: HashMap<(UserId, QuizSetId), QuizProgress>,
    last_created_at: Option<DateTime<Utc>>,
}

impl MemoryState {
    fn chat(&self, chat_id: ChatId) -> Option<&ChatRow> {
        self.chats.iter().find(|c| c.id == chat_id)
    }

    fn profile(&self, user_id: UserId) -> Option<UserProfile> {
        self.profiles
            .get(&user_id)
            .map(|name| UserProfile { name: name.clone() })
    }

    fn hydrate(&self, row: &ChatRow) -> Chat {
        Chat {
            id: row.id,
            is_group: row.is_group,
            last_message_at: row.last_message_at,
            participants: row
                .participants
                .iter()
                .map(|user_id| ChatParticipant {
                    user_id: *user_id,
                    profile: self.profile(*user_id),
                })
                .collect(),
        }
    }

    /// Insert timestamps never repeat and never go backwards.
    fn next_created_at(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let at = match self.last_created_at {
            Some(last) if now <= last => last + TimeDelta::microseconds(1),
            _ => now,
        };
        self.last_created_at = Some(at);
        at
    }
}

/// In-process stand-in for the hosted gateway. Enforces the constraints the
/// hosted schema declares (foreign keys, upsert keys, RPC validation) and
/// counts calls per table operation.
pub struct MemoryGateway {
    state: Mutex<MemoryState>,
    feeds: DashMap<ChatId, Vec<FeedSubscriber>>,
    calls: DashMap<&'static str, usize>,
    bucket: String,
}

impl Default for MemoryGateway {
    fn default() -> Self {
        Self::new("chat_attachments")
    }
}

impl MemoryGateway {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            state: Mutex::new(MemoryState::default()),
            feeds: DashMap::new(),
            calls: DashMap::new(),
            bucket: bucket.into(),
        }
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Drops cancelled or abandoned subscribers of a chat, returns how many
    /// are left.
    fn prune_feeds(&self, chat_id: ChatId) -> usize {
        let live = {
            let Some(mut subs) = self.feeds.get_mut(&chat_id) else {
                return 0;
            };
            subs.retain(FeedSubscriber::is_live);
            subs.len()
        };
        if live == 0 {
            self.feeds.remove_if(&chat_id, |_, subs| subs.is_empty());
        }
        live
    }

    fn record(&self, op: &'static str) {
        *self.calls.entry(op).or_insert(0) += 1;
    }

    // region seeding and inspection

    pub fn register_user(&self, user_id: UserId, name: impl Into<String>) {
        self.state().profiles.insert(user_id, name.into());
    }

    pub fn seed_quiz(&self, quiz_set_id: QuizSetId, key: Vec<AnswerKey>) {
        self.state().answer_keys.insert(quiz_set_id, key);
    }

    /// Number of calls made for one operation, e.g. `"message_status.upsert"`.
    pub fn calls(&self, op: &str) -> usize {
        self.calls.get(op).map(|n| *n).unwrap_or(0)
    }

    pub fn active_feeds(&self, chat_id: ChatId) -> usize {
        self.prune_feeds(chat_id)
    }

    pub fn object(&self, path: &str) -> Option<StoredObject> {
        self.state().objects.get(path).cloned()
    }

    pub fn read_statuses(&self) -> Vec<MessageReadStatus> {
        self.state().statuses.values().cloned().collect()
    }

    // endregion
}

fn foreign_key_violation(details: String) -> GatewayError {
    ApiFault::new(409, "insert or update violates foreign key constraint")
        .with_code("23503")
        .with_details(details)
        .into()
}

fn raised(message: &str) -> GatewayError {
    ApiFault::new(400, message).with_code("P0001").into()
}

fn no_rows() -> GatewayError {
    ApiFault::new(406, "JSON object requested, multiple (or no) rows returned")
        .with_code(NO_ROWS_CODE)
        .with_details("The result contains 0 rows")
        .into()
}

#[async_trait::async_trait]
impl ChatRepo for MemoryGateway {
    async fn list_with_participants(&self) -> Result<Vec<Chat>, GatewayError> {
        self.record("chats.select");
        let state = self.state();

        let mut rows: Vec<&ChatRow> = state.chats.iter().collect();
        rows.sort_by(|a, b| match (a.last_message_at, b.last_message_at) {
            (Some(x), Some(y)) => y.cmp(&x),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        });

        Ok(rows.into_iter().map(|row| state.hydrate(row)).collect())
    }

    async fn create_with_participants(
        &self,
        user_ids: &[UserId],
        is_group: bool,
    ) -> Result<Chat, GatewayError> {
        self.record("chats.rpc");
        if user_ids.is_empty() {
            return Err(raised("user_ids must not be empty"));
        }

        let mut participants: Vec<UserId> = Vec::with_capacity(user_ids.len());
        for user_id in user_ids {
            if !participants.contains(user_id) {
                participants.push(*user_id);
            }
        }

        let mut state = self.state();
        if let Some(unknown) = participants.iter().find(|u| !state.profiles.contains_key(*u)) {
            return Err(foreign_key_violation(format!(
                "Key (user_id)=({unknown}) is not present in table \"user_profiles\"."
            )));
        }
        match (is_group, participants.len()) {
            (false, 2) => {}
            (false, _) => return Err(raised("a direct chat needs exactly two participants")),
            (true, n) if n >= 2 => {}
            (true, _) => return Err(raised("a group chat needs at least two participants")),
        }

        let row = ChatRow {
            id: ChatId(uuid::Uuid::new_v4()),
            is_group,
            last_message_at: None,
            participants,
        };
        let chat = state.hydrate(&row);
        state.chats.push(row);
        Ok(chat)
    }

    async fn touch_last_message_at(
        &self,
        chat_id: ChatId,
        at: DateTime<Utc>,
    ) -> Result<(), GatewayError> {
        self.record("chats.update");
        let mut state = self.state();
        if let Some(row) = state.chats.iter_mut().find(|c| c.id == chat_id) {
            if row.last_message_at.is_none_or(|last| last < at) {
                row.last_message_at = Some(at);
            }
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl MessageRepo for MemoryGateway {
    async fn list_for_chat(&self, chat_id: ChatId) -> Result<Vec<Message>, GatewayError> {
        self.record("messages.select");
        let state = self.state();
        if state.chat(chat_id).is_none() {
            return Err(GatewayError::NoRows);
        }

        let mut messages: Vec<Message> = state
            .messages
            .iter()
            .filter(|m| m.chat_id == chat_id)
            .map(|m| Message {
                sender: state.profile(m.sender_id),
                ..m.clone()
            })
            .collect();
        messages.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(messages)
    }

    async fn insert(&self, message: &NewMessage) -> Result<Message, GatewayError> {
        self.record("messages.insert");
        let mut state = self.state();
        if state.chat(message.chat_id).is_none() {
            return Err(foreign_key_violation(format!(
                "Key (chat_id)=({}) is not present in table \"chats\".",
                message.chat_id
            )));
        }
        if !state.profiles.contains_key(&message.sender_id) {
            return Err(foreign_key_violation(format!(
                "Key (sender_id)=({}) is not present in table \"user_profiles\".",
                message.sender_id
            )));
        }

        let row = Message {
            id: MessageId(uuid::Uuid::new_v4()),
            chat_id: message.chat_id,
            sender_id: message.sender_id,
            content: message.content.clone(),
            file_url: message.file_url.clone(),
            created_at: state.next_created_at(),
            is_edited: false,
            reply_to_id: None,
            sender: None,
        };
        state.messages.push(row.clone());

        // fan out under the state lock so delivery order matches insert order
        if let Some(mut subs) = self.feeds.get_mut(&row.chat_id) {
            subs.retain(FeedSubscriber::is_live);
            for sub in subs.iter() {
                if let Err(e) = sub.sender.try_send(row.clone()) {
                    tracing::warn!("memory feed dropped message {}: {e}", row.id);
                }
            }
        }

        Ok(Message {
            sender: state.profile(row.sender_id),
            ..row
        })
    }
}

#[async_trait::async_trait]
impl MessageStatusRepo for MemoryGateway {
    async fn upsert(&self, statuses: &[MessageReadStatus]) -> Result<(), GatewayError> {
        self.record("message_status.upsert");
        let mut state = self.state();
        if let Some(orphan) = statuses
            .iter()
            .find(|s| !state.messages.iter().any(|m| m.id == s.message_id))
        {
            return Err(foreign_key_violation(format!(
                "Key (message_id)=({}) is not present in table \"messages\".",
                orphan.message_id
            )));
        }
        let mut keys = BTreeSet::new();
        if let Some(repeated) = statuses.iter().find(|s| !keys.insert(s.key())) {
            return Err(ApiFault::new(
                500,
                "ON CONFLICT DO UPDATE command cannot affect row a second time",
            )
            .with_code("21000")
            .with_details(format!(
                "Key (message_id, user_id)=({}, {}) appears twice in the batch.",
                repeated.message_id, repeated.user_id
            ))
            .into());
        }

        for status in statuses {
            state.statuses.insert(status.key(), status.clone());
        }
        Ok(())
    }

    async fn list_for_messages(
        &self,
        message_ids: &[MessageId],
    ) -> Result<Vec<MessageReadStatus>, GatewayError> {
        self.record("message_status.select");
        let state = self.state();
        Ok(state
            .statuses
            .values()
            .filter(|s| message_ids.contains(&s.message_id))
            .cloned()
            .collect())
    }
}

#[async_trait::async_trait]
impl AttachmentStore for MemoryGateway {
    async fn upload(&self, path: &ObjectPath, attachment: &Attachment) -> Result<(), GatewayError> {
        self.record("storage.upload");
        let mut state = self.state();
        if state.objects.contains_key(path.as_str()) {
            return Err(ApiFault::new(409, "The resource already exists")
                .with_code("Duplicate")
                .into());
        }
        state.objects.insert(
            path.as_str().to_owned(),
            StoredObject {
                bytes: attachment.bytes.clone(),
                content_type: attachment.content_type(),
            },
        );
        Ok(())
    }

    fn public_url(&self, path: &ObjectPath) -> String {
        format!("memory://{}/{}", self.bucket, path)
    }
}

#[async_trait::async_trait]
impl MessageFeed for MemoryGateway {
    async fn open(
        &self,
        chat_id: ChatId,
        cancel: CancellationToken,
    ) -> Result<Receiver<Message>, GatewayError> {
        self.record("realtime.join");
        self.prune_feeds(chat_id);
        let (sender, receiver) = mpsc::channel(FEED_CAP);
        self.feeds
            .entry(chat_id)
            .or_default()
            .push(FeedSubscriber { sender, cancel });
        Ok(receiver)
    }
}

#[async_trait::async_trait]
impl TutorialProgressRepo for MemoryGateway {
    async fn upsert_started(
        &self,
        user_id: UserId,
        tutorial_id: TutorialId,
        at: DateTime<Utc>,
    ) -> Result<TutorialProgress, GatewayError> {
        self.record("tutorial_progress.upsert");
        let progress = TutorialProgress {
            user_id,
            tutorial_id,
            status: TutorialStatus::Started,
            last_watched_at: Some(at),
            updated_at: Some(at),
        };
        self.state()
            .tutorial_progress
            .insert((user_id, tutorial_id), progress.clone());
        Ok(progress)
    }

    async fn update_completed(
        &self,
        user_id: UserId,
        tutorial_id: TutorialId,
        at: DateTime<Utc>,
    ) -> Result<TutorialProgress, GatewayError> {
        self.record("tutorial_progress.update");
        let mut state = self.state();
        let progress = state
            .tutorial_progress
            .get_mut(&(user_id, tutorial_id))
            .ok_or_else(no_rows)?;
        progress.status = TutorialStatus::Completed;
        progress.last_watched_at = Some(at);
        progress.updated_at = Some(at);
        Ok(progress.clone())
    }

    async fn insert_completed(
        &self,
        user_id: UserId,
        tutorial_id: TutorialId,
        at: DateTime<Utc>,
    ) -> Result<TutorialProgress, GatewayError> {
        self.record("tutorial_progress.insert");
        let mut state = self.state();
        if state.tutorial_progress.contains_key(&(user_id, tutorial_id)) {
            return Err(ApiFault::new(409, "duplicate key value violates unique constraint")
                .with_code("23505")
                .into());
        }
        let progress = TutorialProgress {
            user_id,
            tutorial_id,
            status: TutorialStatus::Completed,
            last_watched_at: Some(at),
            updated_at: Some(at),
        };
        state
            .tutorial_progress
            .insert((user_id, tutorial_id), progress.clone());
        Ok(progress)
    }

    async fn list_statuses(&self, user_id: UserId) -> Result<Vec<TutorialStatus>, GatewayError> {
        self.record("tutorial_progress.select");
        Ok(self
            .state()
            .tutorial_progress
            .values()
            .filter(|p| p.user_id == user_id)
            .map(|p| p.status)
            .collect())
    }
}

#[async_trait::async_trait]
impl QuizRepo for MemoryGateway {
    async fn answer_key(&self, quiz_set_id: QuizSetId) -> Result<Vec<AnswerKey>, GatewayError> {
        self.record("quiz_questions.select");
        Ok(self
            .state()
            .answer_keys
            .get(&quiz_set_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn upsert_progress(&self, progress: &QuizProgress) -> Result<(), GatewayError> {
        self.record("quiz_progress.upsert");
        self.state()
            .quiz_progress
            .insert((progress.user_id, progress.quiz_set_id), progress.clone());
        Ok(())
    }

    async fn get_progress(
        &self,
        user_id: UserId,
        quiz_set_id: QuizSetId,
    ) -> Result<QuizProgress, GatewayError> {
        self.record("quiz_progress.select");
        self.state()
            .quiz_progress
            .get(&(user_id, quiz_set_id))
            .cloned()
            .ok_or_else(no_rows)
    }

    async fn list_progress(&self, user_id: UserId) -> Result<Vec<QuizProgress>, GatewayError> {
        self.record("quiz_progress.select");
        let mut rows: Vec<QuizProgress> = self
            .state()
            .quiz_progress
            .values()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.last_attempted_at.cmp(&a.last_attempted_at));
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(n: u128) -> UserId {
        UserId(uuid::Uuid::from_u128(n))
    }

    #[tokio::test]
    async fn rejects_message_for_unknown_chat() {
        let gateway = MemoryGateway::default();
        gateway.register_user(user(1), "Ana");

        let err = gateway
            .insert(&NewMessage::text(ChatId(uuid::Uuid::nil()), user(1), "hi"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), Some("23503"));
    }

    #[tokio::test]
    async fn direct_chat_needs_two_distinct_participants() {
        let gateway = MemoryGateway::default();
        gateway.register_user(user(1), "Ana");
        gateway.register_user(user(2), "Ben");

        let err = gateway
            .create_with_participants(&[user(1), user(1)], false)
            .await
            .unwrap_err();
        assert_eq!(err.code(), Some("P0001"));

        let chat = gateway
            .create_with_participants(&[user(1), user(2)], false)
            .await
            .unwrap();
        assert_eq!(chat.participants.len(), 2);
        assert_eq!(chat.participants[1].name(), Some("Ben"));
    }

    #[tokio::test]
    async fn touch_never_moves_backwards() {
        let gateway = MemoryGateway::default();
        gateway.register_user(user(1), "Ana");
        gateway.register_user(user(2), "Ben");
        let chat = gateway
            .create_with_participants(&[user(1), user(2)], false)
            .await
            .unwrap();

        let later = Utc::now();
        let earlier = later - TimeDelta::seconds(30);
        gateway.touch_last_message_at(chat.id, later).await.unwrap();
        gateway.touch_last_message_at(chat.id, earlier).await.unwrap();

        let chats = gateway.list_with_participants().await.unwrap();
        assert_eq!(chats[0].last_message_at, Some(later));
    }

    #[tokio::test]
    async fn cancelled_feed_stops_receiving() {
        let gateway = MemoryGateway::default();
        gateway.register_user(user(1), "Ana");
        gateway.register_user(user(2), "Ben");
        let chat = gateway
            .create_with_participants(&[user(1), user(2)], false)
            .await
            .unwrap();

        let cancel = CancellationToken::new();
        let mut feed = gateway.open(chat.id, cancel.clone()).await.unwrap();
        assert_eq!(gateway.active_feeds(chat.id), 1);

        gateway
            .insert(&NewMessage::text(chat.id, user(1), "first"))
            .await
            .unwrap();
        assert_eq!(feed.recv().await.unwrap().content, "first");

        cancel.cancel();
        assert_eq!(gateway.active_feeds(chat.id), 0);
        gateway
            .insert(&NewMessage::text(chat.id, user(1), "second"))
            .await
            .unwrap();
        assert!(feed.try_recv().is_err());
    }

    #[tokio::test]
    async fn quiet_chats_release_closed_feeds() {
        let gateway = MemoryGateway::default();
        let chat = ChatId(uuid::Uuid::from_u128(77));

        let dropped = gateway.open(chat, CancellationToken::new()).await.unwrap();
        let cancel = CancellationToken::new();
        let _cancelled = gateway.open(chat, cancel.clone()).await.unwrap();
        drop(dropped);
        cancel.cancel();

        let kept = gateway.open(chat, CancellationToken::new()).await.unwrap();
        assert_eq!(gateway.feeds.get(&chat).map(|subs| subs.len()), Some(1));

        drop(kept);
        assert_eq!(gateway.active_feeds(chat), 0);
        assert!(gateway.feeds.get(&chat).is_none());
    }

    #[tokio::test]
    async fn status_batch_with_repeated_key_is_rejected() {
        let gateway = MemoryGateway::default();
        gateway.register_user(user(1), "Ana");
        gateway.register_user(user(2), "Ben");
        let chat = gateway
            .create_with_participants(&[user(1), user(2)], false)
            .await
            .unwrap();
        let message = gateway
            .insert(&NewMessage::text(chat.id, user(1), "hi"))
            .await
            .unwrap();
        let status = MessageReadStatus::read_now(message.id, user(2), Utc::now());

        let err = gateway
            .upsert(&[status.clone(), status])
            .await
            .unwrap_err();
        assert_eq!(err.code(), Some("21000"));
        assert!(gateway.read_statuses().is_empty());
    }
}
