use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

use super::{new_chat_id, ChatStore, StoreError};
use crate::modules::chat::model::{
    deserialize_timestamp, initial_title, sort_newest_first, Chat, ChatSummary, Message,
};

/// On-disk value for one chat; the id is the key of the enclosing object.
#[derive(Debug, Serialize, Deserialize)]
struct StoredChat {
    title: String,
    #[serde(deserialize_with = "deserialize_timestamp")]
    created_at: DateTime<Utc>,
    #[serde(default)]
    messages: Vec<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    uid: Option<String>,
}

impl StoredChat {
    fn into_chat(self, id: String) -> Chat {
        Chat {
            id,
            owner: self.uid,
            title: self.title,
            created_at: self.created_at,
            messages: self.messages,
        }
    }

    fn from_chat(chat: Chat) -> (String, Self) {
        (
            chat.id,
            Self {
                title: chat.title,
                created_at: chat.created_at,
                messages: chat.messages,
                uid: chat.owner,
            },
        )
    }
}

type ChatFile = BTreeMap<String, StoredChat>;

/// Keeps every chat in a single JSON document that is rewritten on each
/// mutation. Read-modify-write cycles hold `lock` for their whole duration.
pub struct FileChatStore {
    path: PathBuf,
    title_max_chars: usize,
    lock: Mutex<()>,
}

impl FileChatStore {
    pub fn new(path: impl Into<PathBuf>, title_max_chars: usize) -> Self {
        Self {
            path: path.into(),
            title_max_chars,
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<ChatFile, StoreError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(ChatFile::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(ChatFile::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Writes to a sibling temp file, then renames it over the data file.
    async fn save(&self, chats: &ChatFile) -> Result<(), StoreError> {
        let json = serde_json::to_vec_pretty(chats)?;
        let path = self.path.clone();

        tokio::task::spawn_blocking(move || -> Result<(), StoreError> {
            let dir = match path.parent() {
                Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
                _ => PathBuf::from("."),
            };
            let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
            tmp.write_all(&json)?;
            tmp.as_file().sync_all()?;
            tmp.persist(&path).map_err(|e| e.error)?;
            Ok(())
        })
        .await?
    }
}

#[async_trait]
impl ChatStore for FileChatStore {
    async fn list(&self, owner: Option<&str>) -> Result<Vec<ChatSummary>, StoreError> {
        let _guard = self.lock.lock().await;
        let chats = self.load().await?;

        let mut summaries: Vec<ChatSummary> = chats
            .iter()
            .filter(|(_, c)| owner.is_none() || c.uid.as_deref() == owner)
            .map(|(id, c)| ChatSummary {
                id: id.clone(),
                title: c.title.clone(),
                created_at: c.created_at,
            })
            .collect();
        sort_newest_first(&mut summaries);

        Ok(summaries)
    }

    async fn create(
        &self,
        owner: Option<String>,
        title: Option<String>,
    ) -> Result<ChatSummary, StoreError> {
        let _guard = self.lock.lock().await;
        let mut chats = self.load().await?;

        let mut id = new_chat_id();
        while chats.contains_key(&id) {
            id = new_chat_id();
        }

        let chat = Chat::new(id, owner, initial_title(title.as_deref(), self.title_max_chars));
        let summary = chat.summary();
        let (id, stored) = StoredChat::from_chat(chat);
        chats.insert(id, stored);
        self.save(&chats).await?;

        Ok(summary)
    }

    async fn get(&self, id: &str) -> Result<Option<Chat>, StoreError> {
        let _guard = self.lock.lock().await;
        let mut chats = self.load().await?;

        Ok(chats.remove(id).map(|c| c.into_chat(id.to_string())))
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let _guard = self.lock.lock().await;
        let mut chats = self.load().await?;

        if chats.remove(id).is_none() {
            return Ok(false);
        }
        self.save(&chats).await?;

        Ok(true)
    }

    async fn append_pair(
        &self,
        id: &str,
        user: Message,
        assistant: Message,
    ) -> Result<bool, StoreError> {
        let _guard = self.lock.lock().await;
        let mut chats = self.load().await?;

        let Some(stored) = chats.remove(id) else {
            return Ok(false);
        };
        let mut chat = stored.into_chat(id.to_string());
        chat.push_pair(user, assistant, self.title_max_chars);

        let (id, stored) = StoredChat::from_chat(chat);
        chats.insert(id, stored);
        self.save(&chats).await?;

        Ok(true)
    }
}
