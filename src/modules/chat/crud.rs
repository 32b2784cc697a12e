use async_trait::async_trait;
use thiserror::Error;

use crate::modules::chat::model::{Chat, ChatSummary, Message};

mod file;
mod mongo;

pub use file::FileChatStore;
pub use mongo::{MongoChatStore, COLLECTION_NAME};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Malformed chat data: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Database error: {0}")]
    Database(#[from] mongodb::error::Error),
    #[error("BSON encoding error: {0}")]
    Bson(#[from] bson::ser::Error),
    #[error("Storage task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Persistence for chats. `None`/`false` results mean the chat does not exist.
#[async_trait]
pub trait ChatStore: Send + Sync {
    /// Summaries, newest first. `owner` restricts the listing to one user.
    async fn list(&self, owner: Option<&str>) -> Result<Vec<ChatSummary>, StoreError>;

    async fn create(
        &self,
        owner: Option<String>,
        title: Option<String>,
    ) -> Result<ChatSummary, StoreError>;

    async fn get(&self, id: &str) -> Result<Option<Chat>, StoreError>;

    async fn delete(&self, id: &str) -> Result<bool, StoreError>;

    /// Appends a user/assistant exchange in one write and names the chat
    /// after its first user message.
    async fn append_pair(
        &self,
        id: &str,
        user: Message,
        assistant: Message,
    ) -> Result<bool, StoreError>;
}

pub(crate) fn new_chat_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
