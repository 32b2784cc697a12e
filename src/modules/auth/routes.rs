use axum::{
    routing::{get, post},
    Router,
};

use crate::modules::auth::controller;
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/login", post(controller::login))
        .route("/api/auth/logout", post(controller::logout))
        .route("/api/auth/signup", post(controller::signup))
        .route("/api/auth/me", get(controller::me))
}
