use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginReq {
    pub email: String,
    pub password: String,
}

/// A signed-in session. `access_token` is sent back as `Authorization: Bearer <token>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SessionRes {
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// RFC 3339 timestamp.
    pub expires_at: Option<String>,
    pub user_id: Option<String>,
    pub email: Option<String>,
}
