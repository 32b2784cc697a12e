use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::modules::auth::model::Principal;

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[serde(rename = "idToken", default)]
    #[validate(length(min = 1, message = "Missing idToken"))]
    pub id_token: String,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub uid: String,
    pub email: Option<String>,
}

impl From<Principal> for UserResponse {
    fn from(p: Principal) -> Self {
        Self {
            uid: p.uid,
            email: p.email,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}
