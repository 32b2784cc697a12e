use async_trait::async_trait;
use bson::doc;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::{Collection, Database};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};

use super::{new_chat_id, ChatStore, StoreError};
use crate::modules::chat::model::{derive_title, initial_title, Chat, ChatSummary, Message};

pub const COLLECTION_NAME: &str = "chats";
const CACHE_TTL: u64 = 3600; // 1 hour
const STALE_TTL: u64 = 30;
const STALE_MARKER: &str = "__stale__";

#[derive(Debug, Serialize, Deserialize, Clone)]
struct ChatDocument {
    #[serde(rename = "_id")]
    id: String,
    #[serde(default)]
    uid: Option<String>,
    title: String,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    created_at: DateTime<Utc>,
    #[serde(default)]
    messages: Vec<Message>,
}

impl From<ChatDocument> for Chat {
    fn from(d: ChatDocument) -> Self {
        Chat {
            id: d.id,
            owner: d.uid,
            title: d.title,
            created_at: d.created_at,
            messages: d.messages,
        }
    }
}

/// One document per chat. Message pairs are pushed atomically, and the
/// first pair names the chat in the same write.
///
/// With a cache configured, every write replaces the cached entry with a
/// short-lived stale marker. Reads treat the marker as a miss, and cache
/// fills never overwrite an existing key, so a read that raced a write
/// cannot put the older document back.
pub struct MongoChatStore {
    collection: Collection<ChatDocument>,
    cache: Option<ConnectionManager>,
    title_max_chars: usize,
}

impl MongoChatStore {
    pub fn new(db: &Database, cache: Option<ConnectionManager>, title_max_chars: usize) -> Self {
        Self {
            collection: db.collection(COLLECTION_NAME),
            cache,
            title_max_chars,
        }
    }

    fn cache_key(id: &str) -> String {
        format!("chat:{}", id)
    }

    async fn cached(&self, id: &str) -> Option<Chat> {
        let mut redis = self.cache.clone()?;
        let cached: String = redis.get(Self::cache_key(id)).await.ok()?;
        if cached == STALE_MARKER {
            return None;
        }
        serde_json::from_str(&cached).ok()
    }

    async fn remember(&self, chat: &Chat) {
        let Some(mut redis) = self.cache.clone() else {
            return;
        };
        if let Ok(json) = serde_json::to_string(chat) {
            let _: Result<(), _> = redis::cmd("SET")
                .arg(Self::cache_key(&chat.id))
                .arg(json)
                .arg("NX")
                .arg("EX")
                .arg(CACHE_TTL)
                .query_async(&mut redis)
                .await;
        }
    }

    async fn mark_stale(&self, id: &str) {
        if let Some(mut redis) = self.cache.clone() {
            let _: Result<(), _> = redis.set_ex(Self::cache_key(id), STALE_MARKER, STALE_TTL).await;
        }
    }

    /// Inserts a new chat under `id`. Returns `false`, leaving the stored
    /// document untouched, when the id is already taken.
    async fn insert_with_id(
        &self,
        id: &str,
        owner: Option<String>,
        title: &str,
        created_at: bson::DateTime,
    ) -> Result<bool, StoreError> {
        let result = self
            .collection
            .update_one(
                doc! { "_id": id },
                doc! {
                    "$setOnInsert": {
                        "uid": owner,
                        "title": title,
                        "created_at": created_at,
                        "messages": [],
                    },
                },
            )
            .upsert(true)
            .await?;

        Ok(result.upserted_id.is_some())
    }
}

#[async_trait]
impl ChatStore for MongoChatStore {
    async fn list(&self, owner: Option<&str>) -> Result<Vec<ChatSummary>, StoreError> {
        let filter = match owner {
            Some(uid) => doc! { "uid": uid },
            None => doc! {},
        };

        let cursor = self
            .collection
            .find(filter)
            .projection(doc! { "messages": 0 })
            .sort(doc! { "created_at": -1, "_id": 1 })
            .await?;
        let docs: Vec<ChatDocument> = cursor.try_collect().await?;

        Ok(docs
            .into_iter()
            .map(|d| ChatSummary {
                id: d.id,
                title: d.title,
                created_at: d.created_at,
            })
            .collect())
    }

    async fn create(
        &self,
        owner: Option<String>,
        title: Option<String>,
    ) -> Result<ChatSummary, StoreError> {
        let title = initial_title(title.as_deref(), self.title_max_chars);
        let created_at = bson::DateTime::now();

        let mut id = new_chat_id();
        while !self.insert_with_id(&id, owner.clone(), &title, created_at).await? {
            id = new_chat_id();
        }

        Ok(ChatSummary {
            id,
            title,
            created_at: created_at.to_chrono(),
        })
    }

    async fn get(&self, id: &str) -> Result<Option<Chat>, StoreError> {
        if let Some(chat) = self.cached(id).await {
            return Ok(Some(chat));
        }

        let chat = self
            .collection
            .find_one(doc! { "_id": id })
            .await?
            .map(Chat::from);

        if let Some(ref c) = chat {
            self.remember(c).await;
        }

        Ok(chat)
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let result = self.collection.delete_one(doc! { "_id": id }).await?;
        self.mark_stale(id).await;

        Ok(result.deleted_count > 0)
    }

    async fn append_pair(
        &self,
        id: &str,
        user: Message,
        assistant: Message,
    ) -> Result<bool, StoreError> {
        let pair = vec![bson::to_bson(&user)?, bson::to_bson(&assistant)?];
        let title = derive_title(&user.content, self.title_max_chars);

        let first = self
            .collection
            .update_one(
                doc! { "_id": id, "messages": { "$size": 0 } },
                doc! {
                    "$push": { "messages": { "$each": pair.clone() } },
                    "$set": { "title": title },
                },
            )
            .await?;

        let appended = first.matched_count > 0
            || self
                .collection
                .update_one(
                    doc! { "_id": id },
                    doc! { "$push": { "messages": { "$each": pair } } },
                )
                .await?
                .matched_count
                > 0;

        if appended {
            self.mark_stale(id).await;
        }

        Ok(appended)
    }
}
