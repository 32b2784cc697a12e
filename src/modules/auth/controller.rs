use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderMap},
    response::IntoResponse,
    Json,
};
use validator::Validate;

use crate::error::AppError;
use crate::modules::auth::{
    schema::{LoginRequest, MessageResponse, UserResponse},
    session::{clear_cookie, current_user, session_cookie},
};
use crate::AppState;

pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;
    payload.validate()?;

    let identity = state.identity.as_ref().ok_or(AppError::NotFound)?;
    let principal = identity.verify(&payload.id_token).await?;
    tracing::info!(uid = %principal.uid, "user signed in");

    let cookie = session_cookie(&state.cookie, &payload.id_token);

    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(UserResponse::from(principal)),
    ))
}

pub async fn logout(State(state): State<AppState>) -> impl IntoResponse {
    tracing::info!("user signed out");

    (
        [(header::SET_COOKIE, clear_cookie(&state.cookie))],
        Json(MessageResponse { message: "Logged out".to_string() }),
    )
}

/// Accounts are created client-side with the identity provider; the server
/// only acknowledges so the front end has a uniform flow.
pub async fn signup() -> Json<MessageResponse> {
    Json(MessageResponse { message: "Signup handled by identity provider".to_string() })
}

pub async fn me(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<UserResponse>, AppError> {
    current_user(&headers, &state)
        .await
        .map(|p| Json(UserResponse::from(p)))
        .ok_or(AppError::Unauthorized)
}
