use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};
use std::convert::Infallible;

use crate::config::CookieSettings;
use crate::error::AppError;
use crate::modules::auth::model::Principal;
use crate::AppState;

/// Reads a cookie value from every `Cookie` header on the request.
pub fn read_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
        .filter(|value| !value.is_empty())
}

pub fn session_cookie(settings: &CookieSettings, token: &str) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax",
        settings.name, token, settings.max_age_secs
    );
    if settings.secure {
        cookie.push_str("; Secure");
    }
    cookie
}

pub fn clear_cookie(settings: &CookieSettings) -> String {
    let mut cookie = format!("{}=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax", settings.name);
    if settings.secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// The signed-in user behind the request's session cookie, if any.
pub async fn current_user(headers: &HeaderMap, state: &AppState) -> Option<Principal> {
    let identity = state.identity.as_ref()?;
    let token = read_cookie(headers, &state.cookie.name)?;

    identity.verify(token).await.ok()
}

/// Who is calling a chat endpoint. Without an identity provider every caller
/// is anonymous and may touch every chat; with one, a valid session is
/// required and the principal owns what it creates.
#[derive(Debug, Clone)]
pub struct Caller(pub Option<Principal>);

impl Caller {
    pub fn uid(&self) -> Option<&str> {
        self.0.as_ref().map(|p| p.uid.as_str())
    }
}

impl FromRequestParts<AppState> for Caller {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if state.identity.is_none() {
            return Ok(Caller(None));
        }

        current_user(&parts.headers, state)
            .await
            .map(|p| Caller(Some(p)))
            .ok_or(AppError::Unauthorized)
    }
}

/// Optional session for page routes, which render a logged-out view instead
/// of rejecting.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<Principal>);

impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(current_user(&parts.headers, state).await))
    }
}
