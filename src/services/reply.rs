use async_trait::async_trait;
use thiserror::Error;

use crate::modules::chat::model::Message;

pub const PLACEHOLDER_REPLY: &str = "Gemma reply here";

#[derive(Error, Debug)]
pub enum ReplyError {
    #[error("Model unavailable: {0}")]
    Unavailable(String),
    #[error("Generation failed: {0}")]
    Failed(String),
}

/// Produces the assistant's answer to `user_message`. `history` holds the
/// exchanges that came before it, oldest first.
#[async_trait]
pub trait ReplyGenerator: Send + Sync {
    async fn generate(&self, user_message: &str, history: &[Message]) -> Result<String, ReplyError>;
}

/// Stands in for a real model: always answers with the same text.
#[derive(Debug, Default, Clone)]
pub struct PlaceholderReply;

#[async_trait]
impl ReplyGenerator for PlaceholderReply {
    async fn generate(&self, _user_message: &str, _history: &[Message]) -> Result<String, ReplyError> {
        Ok(PLACEHOLDER_REPLY.to_string())
    }
}
