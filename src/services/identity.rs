use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::modules::auth::model::Principal;

/// Every verification failure looks the same to callers.
#[derive(Error, Debug)]
pub enum IdentityError {
    #[error("Invalid or expired credential")]
    Invalid,
}

#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, id_token: &str) -> Result<Principal, IdentityError>;
}

#[derive(Debug, Serialize)]
struct LookupRequest<'a> {
    #[serde(rename = "idToken")]
    id_token: &'a str,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupUser {
    local_id: String,
    email: Option<String>,
    #[serde(default)]
    disabled: bool,
}

#[derive(Debug, Error)]
enum LookupFailure {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },
    #[error("no active user for token")]
    NoUser,
}

/// Verifies Firebase ID tokens through the Identity Toolkit REST API.
#[derive(Clone)]
pub struct FirebaseVerifier {
    client: Client,
    base_url: String,
    api_key: String,
}

impl FirebaseVerifier {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    async fn lookup(&self, id_token: &str) -> Result<Principal, LookupFailure> {
        let response = self
            .client
            .post(format!("{}/v1/accounts:lookup", self.base_url))
            .query(&[("key", self.api_key.as_str())])
            .json(&LookupRequest { id_token })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(LookupFailure::Api { status, body });
        }

        let lookup: LookupResponse = response.json().await?;
        let user = lookup
            .users
            .into_iter()
            .find(|u| !u.disabled)
            .ok_or(LookupFailure::NoUser)?;

        Ok(Principal {
            uid: user.local_id,
            email: user.email,
        })
    }
}

#[async_trait]
impl IdentityVerifier for FirebaseVerifier {
    async fn verify(&self, id_token: &str) -> Result<Principal, IdentityError> {
        if id_token.is_empty() {
            return Err(IdentityError::Invalid);
        }

        self.lookup(id_token).await.map_err(|e| {
            tracing::debug!(error = %e, "id token rejected");
            IdentityError::Invalid
        })
    }
}
