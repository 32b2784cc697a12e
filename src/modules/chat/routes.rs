use axum::{
    routing::{get, post},
    Router,
};

use crate::modules::chat::controller;
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/chats", get(controller::list_chats).post(controller::create_chat))
        .route(
            "/api/chats/{id}",
            get(controller::get_chat).delete(controller::delete_chat),
        )
        .route("/api/chats/{id}/messages", post(controller::send_message))
}
