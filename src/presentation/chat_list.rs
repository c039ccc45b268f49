use super::{initials, relative_time};
use crate::domain_model::*;
use chrono::{DateTime, Utc};

pub const GROUP_CHAT_NAME: &str = "Group Chat";
pub const UNKNOWN_USER_NAME: &str = "Unknown User";
pub const NO_CHATS_HINT: &str = "No chats found. Start a new conversation!";

pub fn chat_display_name(chat: &Chat, current_user: UserId) -> String {
    if chat.is_group {
        return GROUP_CHAT_NAME.to_owned();
    }
    chat.other_participant(current_user)
        .and_then(ChatParticipant::name)
        .filter(|name| !name.is_empty())
        .unwrap_or(UNKNOWN_USER_NAME)
        .to_owned()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRow {
    pub chat_id: ChatId,
    pub name: String,
    pub initials: String,
    pub last_activity: Option<String>,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatListContent {
    Loading,
    Empty,
    Rows(Vec<ChatRow>),
}

#[derive(Debug, Clone)]
pub struct ChatListView {
    current_user: UserId,
    chats: Option<Vec<Chat>>,
    selected: Option<ChatId>,
    new_chat_dialog_open: bool,
}

impl ChatListView {
    pub fn new(current_user: UserId) -> Self {
        Self {
            current_user,
            chats: None,
            selected: None,
            new_chat_dialog_open: false,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.chats.is_none()
    }

    pub fn set_chats(&mut self, chats: Vec<Chat>) {
        if let Some(selected) = self.selected
            && !chats.iter().any(|c| c.id == selected)
        {
            self.selected = None;
        }
        self.chats = Some(chats);
    }

    pub fn chats(&self) -> &[Chat] {
        self.chats.as_deref().unwrap_or_default()
    }

    /// Selects a listed chat. Unknown ids leave the selection unchanged.
    pub fn select(&mut self, chat_id: ChatId) -> Option<&Chat> {
        self.chats().iter().find(|c| c.id == chat_id)?;
        self.selected = Some(chat_id);
        self.selected()
    }

    pub fn selected(&self) -> Option<&Chat> {
        let selected = self.selected?;
        self.chats().iter().find(|c| c.id == selected)
    }

    pub fn open_new_chat_dialog(&mut self) {
        self.new_chat_dialog_open = true;
    }

    pub fn is_new_chat_dialog_open(&self) -> bool {
        self.new_chat_dialog_open
    }

    /// A chat was created from the dialog: close it, put the chat on top and
    /// select it.
    pub fn on_chat_created(&mut self, chat: Chat) {
        self.new_chat_dialog_open = false;
        let chats = self.chats.get_or_insert_with(Vec::new);
        chats.retain(|c| c.id != chat.id);
        self.selected = Some(chat.id);
        chats.insert(0, chat);
    }

    /// Records activity on a chat and keeps the list newest-first.
    pub fn touch(&mut self, chat_id: ChatId, at: DateTime<Utc>) {
        let Some(chats) = self.chats.as_mut() else {
            return;
        };
        let Some(chat) = chats.iter_mut().find(|c| c.id == chat_id) else {
            return;
        };
        if chat.last_message_at.is_none_or(|prev| prev < at) {
            chat.last_message_at = Some(at);
        }
        chats.sort_by(|a, b| match (a.last_message_at, b.last_message_at) {
            (Some(a), Some(b)) => b.cmp(&a),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        });
    }

    pub fn content(&self, now: DateTime<Utc>) -> ChatListContent {
        let Some(chats) = self.chats.as_ref() else {
            return ChatListContent::Loading;
        };
        if chats.is_empty() {
            return ChatListContent::Empty;
        }
        let rows = chats
            .iter()
            .map(|chat| {
                let name = chat_display_name(chat, self.current_user);
                ChatRow {
                    chat_id: chat.id,
                    initials: initials(&name),
                    last_activity: chat.last_message_at.map(|at| relative_time(at, now)),
                    selected: self.selected == Some(chat.id),
                    name,
                }
            })
            .collect();
        ChatListContent::Rows(rows)
    }
}
