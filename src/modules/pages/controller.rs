use axum::{extract::Path, response::Html};

use crate::modules::auth::{model::Principal, session::MaybeUser};

const INDEX_TEMPLATE: &str = include_str!("../../../templates/index.html");
const CHAT_TEMPLATE: &str = include_str!("../../../templates/chat.html");
const USER_SLOT: &str = "{{ current_user }}";

/// Fills the user slot with the signed-in principal as JSON, or `null`.
pub fn render(template: &str, user: Option<&Principal>) -> String {
    let user_json = serde_json::to_string(&user)
        .unwrap_or_else(|_| "null".to_string())
        .replace('<', "\\u003c");
    template.replace(USER_SLOT, &user_json)
}

pub async fn home(MaybeUser(user): MaybeUser) -> Html<String> {
    Html(render(INDEX_TEMPLATE, user.as_ref()))
}

pub async fn chat_index(MaybeUser(user): MaybeUser) -> Html<String> {
    Html(render(CHAT_TEMPLATE, user.as_ref()))
}

/// The chat id is read by the page script from the URL.
pub async fn chat_page(MaybeUser(user): MaybeUser, Path(_id): Path<String>) -> Html<String> {
    Html(render(CHAT_TEMPLATE, user.as_ref()))
}
