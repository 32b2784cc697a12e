use axum::Router;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::{AuthBackend, CookieSettings, Settings, StoreBackend};
use crate::modules::chat::crud::{ChatStore, FileChatStore, MongoChatStore};
use crate::services::identity::{FirebaseVerifier, IdentityVerifier};
use crate::services::reply::{PlaceholderReply, ReplyGenerator};

pub mod config;
pub mod error;
pub mod modules;
pub mod services;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ChatStore>,
    /// `None` runs the server without accounts: every chat is visible to everyone.
    pub identity: Option<Arc<dyn IdentityVerifier>>,
    pub replies: Arc<dyn ReplyGenerator>,
    pub cookie: Arc<CookieSettings>,
}

impl AppState {
    pub async fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let store: Arc<dyn ChatStore> = match &settings.store {
            StoreBackend::File { path } => {
                tracing::info!(path = %path.display(), "using file chat store");
                Arc::new(FileChatStore::new(path.clone(), settings.title_max_chars))
            }
            StoreBackend::Mongo { uri, database } => {
                let db = config::database::connect(uri, database).await?;
                let cache = match &settings.redis_uri {
                    Some(uri) => Some(config::redis::connect(uri).await?),
                    None => None,
                };
                tracing::info!(database = %database, cached = cache.is_some(), "using MongoDB chat store");
                Arc::new(MongoChatStore::new(&db, cache, settings.title_max_chars))
            }
        };

        let identity: Option<Arc<dyn IdentityVerifier>> = match &settings.auth {
            AuthBackend::Disabled => None,
            AuthBackend::Firebase { api_key, base_url } => {
                if !settings.cookie.secure {
                    tracing::warn!("session cookie is not marked Secure; set SESSION_COOKIE_SECURE=true behind HTTPS");
                }
                Some(Arc::new(FirebaseVerifier::new(api_key.clone(), base_url.clone())))
            }
        };

        Ok(Self {
            store,
            identity,
            replies: Arc::new(PlaceholderReply),
            cookie: Arc::new(settings.cookie.clone()),
        })
    }
}

/// All routes for the given state. Auth endpoints exist only when an
/// identity provider is configured.
pub fn app(state: AppState) -> Router {
    let mut router = Router::new()
        .merge(modules::pages::routes::routes())
        .merge(modules::chat::routes::routes());

    if state.identity.is_some() {
        router = router.merge(modules::auth::routes::routes());
    }

    router
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
