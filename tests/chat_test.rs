use async_trait::async_trait;
use axum::http::StatusCode;
use axum_test::TestServer;
use gemchat::config::CookieSettings;
use gemchat::modules::chat::crud::FileChatStore;
use gemchat::modules::chat::model::Message;
use gemchat::services::reply::{PlaceholderReply, ReplyError, ReplyGenerator, PLACEHOLDER_REPLY};
use gemchat::{app, AppState};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::Arc;
use tempfile::TempDir;

fn state_with(dir: &TempDir, replies: Arc<dyn ReplyGenerator>) -> AppState {
    AppState {
        store: Arc::new(FileChatStore::new(dir.path().join("chats.json"), 45)),
        identity: None,
        replies,
        cookie: Arc::new(CookieSettings::default()),
    }
}

fn setup_test_server() -> (TestServer, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let state = state_with(&dir, Arc::new(PlaceholderReply));

    (TestServer::new(app(state)).unwrap(), dir)
}

async fn create_chat(server: &TestServer) -> String {
    let response = server.post("/api/chats").await;
    response.assert_status(StatusCode::CREATED);

    let body: Value = response.json();
    body["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_create_chat() {
    let (server, _dir) = setup_test_server();

    let response = server.post("/api/chats").await;

    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    assert!(!body["id"].as_str().unwrap().is_empty());
    assert_eq!(body["title"], "New Chat");
}

#[tokio::test]
async fn test_create_chat_with_title() {
    let (server, _dir) = setup_test_server();

    let response = server
        .post("/api/chats")
        .json(&json!({ "title": "  Holiday plans  " }))
        .await;

    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    assert_eq!(body["title"], "Holiday plans");
}

#[tokio::test]
async fn test_create_chat_rejects_malformed_body() {
    let (server, _dir) = setup_test_server();

    let response = server.post("/api/chats").text("{not json").await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_ids_are_unique_and_stable() {
    let (server, _dir) = setup_test_server();

    let mut ids = HashSet::new();
    for _ in 0..10 {
        ids.insert(create_chat(&server).await);
    }
    assert_eq!(ids.len(), 10);

    for id in &ids {
        let response = server.get(&format!("/api/chats/{}", id)).await;
        response.assert_status(StatusCode::OK);
        let chat: Value = response.json();
        assert_eq!(chat["id"], id.as_str());
    }
}

#[tokio::test]
async fn test_get_chat() {
    let (server, _dir) = setup_test_server();
    let id = create_chat(&server).await;

    let response = server.get(&format!("/api/chats/{}", id)).await;

    response.assert_status(StatusCode::OK);
    let chat: Value = response.json();
    assert_eq!(chat["id"], id);
    assert_eq!(chat["title"], "New Chat");
    assert!(chat["created_at"].is_string());
    assert_eq!(chat["messages"], json!([]));
}

#[tokio::test]
async fn test_get_chat_not_found() {
    let (server, _dir) = setup_test_server();

    let response = server.get("/api/chats/does-not-exist").await;

    response.assert_status(StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body["error"], "Not found");
}

#[tokio::test]
async fn test_list_chats_newest_first() {
    let (server, dir) = setup_test_server();
    std::fs::write(
        dir.path().join("chats.json"),
        json!({
            "middle": { "title": "m", "created_at": "2024-02-01T00:00:00", "messages": [] },
            "oldest": { "title": "o", "created_at": "2024-01-01T00:00:00", "messages": [] },
            "newest": { "title": "n", "created_at": "2024-03-01T00:00:00+00:00", "messages": [] },
        })
        .to_string(),
    )
    .unwrap();

    let response = server.get("/api/chats").await;

    response.assert_status(StatusCode::OK);
    let chats: Vec<Value> = response.json();
    let ids: Vec<&str> = chats.iter().map(|c| c["id"].as_str().unwrap()).collect();
    assert_eq!(ids, ["newest", "middle", "oldest"]);
    assert!(chats[0]["created_at"].as_str().unwrap().starts_with("2024-03-01T00:00:00"));
    assert!(chats[0].get("messages").is_none());
}

#[tokio::test]
async fn test_list_includes_created_chats() {
    let (server, _dir) = setup_test_server();
    let first = create_chat(&server).await;
    let second = create_chat(&server).await;

    let chats: Vec<Value> = server.get("/api/chats").await.json();

    assert_eq!(chats.len(), 2);
    let ids: HashSet<&str> = chats.iter().map(|c| c["id"].as_str().unwrap()).collect();
    assert!(ids.contains(first.as_str()) && ids.contains(second.as_str()));
    assert!(chats[0]["created_at"].as_str() >= chats[1]["created_at"].as_str());
}

#[tokio::test]
async fn test_delete_chat() {
    let (server, _dir) = setup_test_server();
    let id = create_chat(&server).await;

    let response = server.delete(&format!("/api/chats/{}", id)).await;
    response.assert_status(StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["message"], "Deleted");

    server
        .get(&format!("/api/chats/{}", id))
        .await
        .assert_status(StatusCode::NOT_FOUND);
    server
        .delete(&format!("/api/chats/{}", id))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_missing_chat() {
    let (server, _dir) = setup_test_server();

    server
        .delete("/api/chats/does-not-exist")
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_send_message() {
    let (server, _dir) = setup_test_server();
    let id = create_chat(&server).await;

    let response = server
        .post(&format!("/api/chats/{}/messages", id))
        .json(&json!({ "message": "  Hello there  " }))
        .await;

    response.assert_status(StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["user"], "Hello there");
    assert_eq!(body["assistant"], PLACEHOLDER_REPLY);

    let chat: Value = server.get(&format!("/api/chats/{}", id)).await.json();
    assert_eq!(
        chat["messages"],
        json!([
            { "role": "user", "content": "Hello there" },
            { "role": "assistant", "content": PLACEHOLDER_REPLY },
        ])
    );
}

#[tokio::test]
async fn test_send_message_to_missing_chat() {
    let (server, dir) = setup_test_server();
    create_chat(&server).await;
    let before = std::fs::read(dir.path().join("chats.json")).unwrap();

    let response = server
        .post("/api/chats/does-not-exist/messages")
        .json(&json!({ "message": "Hello" }))
        .await;

    response.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(std::fs::read(dir.path().join("chats.json")).unwrap(), before);
}

#[tokio::test]
async fn test_send_empty_message_fails() {
    let (server, _dir) = setup_test_server();
    let id = create_chat(&server).await;

    for body in [json!({ "message": "" }), json!({ "message": " \n\t " }), json!({})] {
        let response = server
            .post(&format!("/api/chats/{}/messages", id))
            .json(&body)
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let error: Value = response.json();
        assert_eq!(error["error"], "Empty message");
    }

    let chat: Value = server.get(&format!("/api/chats/{}", id)).await.json();
    assert_eq!(chat["messages"], json!([]));
    assert_eq!(chat["title"], "New Chat");
}

#[tokio::test]
async fn test_first_message_names_the_chat() {
    let (server, _dir) = setup_test_server();
    let id = create_chat(&server).await;
    let long = "What is the tallest mountain in the solar system, and how was it formed?";

    server
        .post(&format!("/api/chats/{}/messages", id))
        .json(&json!({ "message": long }))
        .await
        .assert_status(StatusCode::OK);

    let chat: Value = server.get(&format!("/api/chats/{}", id)).await.json();
    let expected: String = long.chars().take(45).collect::<String>() + "…";
    assert_eq!(chat["title"], expected);

    server
        .post(&format!("/api/chats/{}/messages", id))
        .json(&json!({ "message": "Another question" }))
        .await
        .assert_status(StatusCode::OK);

    let chat: Value = server.get(&format!("/api/chats/{}", id)).await.json();
    assert_eq!(chat["title"], expected);
}

#[tokio::test]
async fn test_short_first_message_has_no_ellipsis() {
    let (server, _dir) = setup_test_server();
    let id = create_chat(&server).await;

    server
        .post(&format!("/api/chats/{}/messages", id))
        .json(&json!({ "message": "Quick question" }))
        .await
        .assert_status(StatusCode::OK);

    let chats: Vec<Value> = server.get("/api/chats").await.json();
    assert_eq!(chats[0]["title"], "Quick question");
}

#[tokio::test]
async fn test_multi_turn_conversation() {
    let (server, _dir) = setup_test_server();
    let id = create_chat(&server).await;

    for i in 0..5 {
        server
            .post(&format!("/api/chats/{}/messages", id))
            .json(&json!({ "message": format!("message {}", i) }))
            .await
            .assert_status(StatusCode::OK);
    }

    let chat: Value = server.get(&format!("/api/chats/{}", id)).await.json();
    let messages = chat["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 10);
    for (i, pair) in messages.chunks(2).enumerate() {
        assert_eq!(pair[0]["role"], "user");
        assert_eq!(pair[0]["content"], format!("message {}", i));
        assert_eq!(pair[1]["role"], "assistant");
    }
}

struct HistoryEcho;

#[async_trait]
impl ReplyGenerator for HistoryEcho {
    async fn generate(&self, user_message: &str, history: &[Message]) -> Result<String, ReplyError> {
        Ok(format!("{}:{}", history.len(), user_message))
    }
}

#[tokio::test]
async fn test_generator_sees_prior_history() {
    let dir = tempfile::tempdir().unwrap();
    let server = TestServer::new(app(state_with(&dir, Arc::new(HistoryEcho)))).unwrap();
    let id = create_chat(&server).await;

    let first: Value = server
        .post(&format!("/api/chats/{}/messages", id))
        .json(&json!({ "message": "a" }))
        .await
        .json();
    let second: Value = server
        .post(&format!("/api/chats/{}/messages", id))
        .json(&json!({ "message": "b" }))
        .await
        .json();

    assert_eq!(first["assistant"], "0:a");
    assert_eq!(second["assistant"], "2:b");
}

struct Unavailable;

#[async_trait]
impl ReplyGenerator for Unavailable {
    async fn generate(&self, _user_message: &str, _history: &[Message]) -> Result<String, ReplyError> {
        Err(ReplyError::Unavailable("model not loaded".to_string()))
    }
}

#[tokio::test]
async fn test_failed_reply_persists_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let server = TestServer::new(app(state_with(&dir, Arc::new(Unavailable)))).unwrap();
    let id = create_chat(&server).await;

    let response = server
        .post(&format!("/api/chats/{}/messages", id))
        .json(&json!({ "message": "Hello" }))
        .await;

    response.assert_status(StatusCode::BAD_GATEWAY);
    let chat: Value = server.get(&format!("/api/chats/{}", id)).await.json();
    assert_eq!(chat["messages"], json!([]));
    assert_eq!(chat["title"], "New Chat");
}

#[tokio::test]
async fn test_auth_routes_absent_without_identity_provider() {
    let (server, _dir) = setup_test_server();

    server
        .post("/api/auth/login")
        .json(&json!({ "idToken": "anything" }))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_send_message_rejects_malformed_json() {
    let (server, _dir) = setup_test_server();
    let id = create_chat(&server).await;

    let wrong_type = server
        .post(&format!("/api/chats/{}/messages", id))
        .json(&json!({ "message": 42 }))
        .await;
    wrong_type.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = wrong_type.json();
    assert!(body["error"].is_string());

    let not_json = server
        .post(&format!("/api/chats/{}/messages", id))
        .text("Hello")
        .await;
    not_json.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = not_json.json();
    assert!(body["error"].is_string());

    let chat: Value = server.get(&format!("/api/chats/{}", id)).await.json();
    assert_eq!(chat["messages"], json!([]));
}
