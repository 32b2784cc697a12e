use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

pub const DEFAULT_TITLE: &str = "New Chat";
pub const ELLIPSIS: char = '…';

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Chat {
    pub id: String,
    pub owner: Option<String>,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub messages: Vec<Message>,
}

impl Chat {
    pub fn new(id: String, owner: Option<String>, title: String) -> Self {
        Self {
            id,
            owner,
            title,
            created_at: Utc::now(),
            messages: Vec::new(),
        }
    }

    /// Appends one exchange. The first exchange also names the chat.
    pub fn push_pair(&mut self, user: Message, assistant: Message, title_max_chars: usize) {
        if self.messages.is_empty() {
            self.title = derive_title(&user.content, title_max_chars);
        }
        self.messages.push(user);
        self.messages.push(assistant);
    }

    pub fn summary(&self) -> ChatSummary {
        ChatSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            created_at: self.created_at,
        }
    }

    pub fn is_owned_by(&self, uid: &str) -> bool {
        self.owner.as_deref() == Some(uid)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ChatSummary {
    pub id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

/// Newest first; equal timestamps fall back to id order.
pub fn sort_newest_first(chats: &mut [ChatSummary]) {
    chats.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
}

/// Title taken from the first user message, cut to `max_chars` characters.
pub fn derive_title(text: &str, max_chars: usize) -> String {
    let mut chars = text.chars();
    let mut title: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        title.push(ELLIPSIS);
    }
    title
}

/// Title for a freshly created chat, from an optional caller-supplied value.
pub fn initial_title(requested: Option<&str>, max_chars: usize) -> String {
    match requested.map(str::trim) {
        Some(t) if !t.is_empty() => derive_title(t, max_chars),
        _ => DEFAULT_TITLE.to_string(),
    }
}

/// Accepts RFC 3339 as well as offset-less timestamps, which are read as UTC.
pub fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    if let Ok(ts) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(serde::de::Error::custom)
}
