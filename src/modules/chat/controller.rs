use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::error::AppError;
use crate::modules::auth::session::Caller;
use crate::modules::chat::{
    model::{Chat, Message},
    schema::{
        ChatResponse, ChatSummaryResponse, CreateChatRequest, CreatedChatResponse,
        ExchangeResponse, MessageResponse, SendMessageRequest,
    },
};
use crate::AppState;

/// Loads a chat the caller is allowed to see. A chat owned by someone else
/// is `Forbidden`, never `NotFound`.
async fn load_owned(state: &AppState, caller: &Caller, id: &str) -> Result<Chat, AppError> {
    let chat = state.store.get(id).await?.ok_or(AppError::NotFound)?;

    match caller.uid() {
        Some(uid) if !chat.is_owned_by(uid) => Err(AppError::Forbidden),
        _ => Ok(chat),
    }
}

pub async fn list_chats(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<Json<Vec<ChatSummaryResponse>>, AppError> {
    let chats = state.store.list(caller.uid()).await?;

    Ok(Json(chats.into_iter().map(ChatSummaryResponse::from).collect()))
}

pub async fn create_chat(
    State(state): State<AppState>,
    caller: Caller,
    body: Bytes,
) -> Result<(StatusCode, Json<CreatedChatResponse>), AppError> {
    let payload = if body.iter().all(u8::is_ascii_whitespace) {
        CreateChatRequest::default()
    } else {
        serde_json::from_slice::<CreateChatRequest>(&body)
            .map_err(|e| AppError::BadRequest(format!("Invalid JSON body: {}", e)))?
    };
    payload.validate()?;

    let owner = caller.0.map(|p| p.uid);
    let chat = state.store.create(owner, payload.title).await?;
    tracing::info!(chat_id = %chat.id, "chat created");

    Ok((
        StatusCode::CREATED,
        Json(CreatedChatResponse {
            id: chat.id,
            title: chat.title,
        }),
    ))
}

pub async fn get_chat(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
) -> Result<Json<ChatResponse>, AppError> {
    let chat = load_owned(&state, &caller, &id).await?;

    Ok(Json(ChatResponse::from(chat)))
}

pub async fn delete_chat(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    load_owned(&state, &caller, &id).await?;

    if !state.store.delete(&id).await? {
        return Err(AppError::NotFound);
    }
    tracing::info!(chat_id = %id, "chat deleted");

    Ok(Json(MessageResponse { message: "Deleted".to_string() }))
}

pub async fn send_message(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
    payload: Result<Json<SendMessageRequest>, JsonRejection>,
) -> Result<Json<ExchangeResponse>, AppError> {
    let Json(payload) = payload?;
    payload.validate()?;
    let user_message = payload.message.trim().to_string();

    let chat = load_owned(&state, &caller, &id).await?;

    let reply = state.replies.generate(&user_message, &chat.messages).await?;

    let appended = state
        .store
        .append_pair(&id, Message::user(user_message.clone()), Message::assistant(reply.clone()))
        .await?;
    if !appended {
        return Err(AppError::NotFound);
    }

    Ok(Json(ExchangeResponse {
        user: user_message,
        assistant: reply,
    }))
}
