//! The route guard.

use crate::error::ApiError;
use api_shared::auth::bearer_token;
use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use trauma_core::{Session, TraumaError};

/// The caller's session, taken from `Authorization: Bearer <token>`.
///
/// Rejects with 401 `unauthenticated` when the header is missing or malformed. Whether the
/// token is still valid is for the store to decide on first use.
pub struct AuthSession(pub Session);

#[async_trait]
impl<S> FromRequestParts<S> for AuthSession
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(bearer_token)
            .ok_or(ApiError::Core(TraumaError::Unauthenticated))?;

        Ok(AuthSession(Session::from_access_token(token)))
    }
}
