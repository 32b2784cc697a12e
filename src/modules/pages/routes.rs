use axum::{routing::get, Router};

use crate::modules::pages::controller;
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(controller::home))
        .route("/c/", get(controller::chat_index))
        .route("/c/{id}", get(controller::chat_page))
}
