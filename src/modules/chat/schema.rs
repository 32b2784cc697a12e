use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::modules::chat::model::{Chat, ChatSummary, Message};

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank").with_message("Empty message".into()));
    }
    Ok(())
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct CreateChatRequest {
    #[validate(length(max = 200, message = "Title too long"))]
    pub title: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SendMessageRequest {
    #[serde(default)]
    #[validate(custom(function = "not_blank"))]
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ChatSummaryResponse {
    pub id: String,
    pub title: String,
    pub created_at: String,
}

impl From<ChatSummary> for ChatSummaryResponse {
    fn from(c: ChatSummary) -> Self {
        Self {
            id: c.id,
            title: c.title,
            created_at: c.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CreatedChatResponse {
    pub id: String,
    pub title: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub id: String,
    pub title: String,
    pub created_at: String,
    pub messages: Vec<Message>,
}

impl From<Chat> for ChatResponse {
    fn from(c: Chat) -> Self {
        Self {
            id: c.id,
            title: c.title,
            created_at: c.created_at.to_rfc3339(),
            messages: c.messages,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ExchangeResponse {
    pub user: String,
    pub assistant: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}
