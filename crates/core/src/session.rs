//! The signed-in session and the route guard.
//!
//! A process (or CLI invocation) holds at most one session, in a [`SessionContext`].
//! Protected operations call [`SessionContext::guard`] first. Any operation that comes back
//! with [`TraumaError::SessionExpired`] is passed through [`SessionContext::observe`], which
//! tears the session down.

use crate::repositories::AuthProvider;
use crate::{TraumaError, TraumaResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub user: Option<SessionUser>,
}

impl Session {
    /// A session known only by its bearer token, as presented to the REST facade.
    pub fn from_access_token(token: impl Into<String>) -> Self {
        Self {
            access_token: token.into(),
            refresh_token: None,
            expires_at: None,
            user: None,
        }
    }

    /// True once `now` has reached the recorded expiry. Sessions without one never expire
    /// locally; the store decides.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

pub struct SessionContext {
    auth: Arc<dyn AuthProvider>,
    current: RwLock<Option<Session>>,
}

impl SessionContext {
    pub fn new(auth: Arc<dyn AuthProvider>) -> Self {
        Self {
            auth,
            current: RwLock::new(None),
        }
    }

    /// Restores a previously stored session. An already expired one is discarded.
    pub async fn init(&self, stored: Option<Session>) -> bool {
        let restored = stored.filter(|s| !s.is_expired(Utc::now()));
        let ok = restored.is_some();
        *self.current.write().await = restored;
        ok
    }

    pub async fn session(&self) -> Option<Session> {
        self.current.read().await.clone()
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> TraumaResult<Session> {
        let session = self.auth.sign_in(email, password).await?;
        tracing::info!(
            user = session.user.as_ref().map(|u| u.id.as_str()).unwrap_or("-"),
            "signed in"
        );
        *self.current.write().await = Some(session.clone());
        Ok(session)
    }

    /// Ends the session. The local session is cleared even when the store call fails.
    pub async fn sign_out(&self) {
        let previous = self.current.write().await.take();
        if let Some(session) = previous {
            if let Err(e) = self.auth.sign_out(&session).await {
                tracing::warn!("sign out request failed: {}", e);
            }
            tracing::info!("signed out");
        }
    }

    /// Returns the current session, or fails when there is none or it has expired.
    pub async fn guard(&self) -> TraumaResult<Session> {
        let session = self.session().await.ok_or(TraumaError::Unauthenticated)?;
        if session.is_expired(Utc::now()) {
            self.teardown().await;
            return Err(TraumaError::SessionExpired);
        }
        Ok(session)
    }

    /// Passes a result through, tearing the session down if the store reported expiry.
    pub async fn observe<T>(&self, result: TraumaResult<T>) -> TraumaResult<T> {
        if let Err(e) = &result {
            if e.is_session_expired() {
                self.teardown().await;
            }
        }
        result
    }

    async fn teardown(&self) {
        if self.current.write().await.take().is_some() {
            tracing::warn!("session expired; signed out");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::memory::MemoryBackend;
    use crate::repositories::Backend;
    use chrono::Duration;

    fn context() -> (MemoryBackend, SessionContext) {
        let backend = MemoryBackend::new().with_user("desk@trauma.one", "secret");
        let ctx = SessionContext::new(backend.auth());
        (backend, ctx)
    }

    #[tokio::test]
    async fn guard_requires_a_session() {
        let (_, ctx) = context();
        assert!(matches!(ctx.guard().await, Err(TraumaError::Unauthenticated)));

        ctx.sign_in("desk@trauma.one", "secret").await.unwrap();
        assert!(ctx.guard().await.is_ok());
    }

    #[tokio::test]
    async fn wrong_password_leaves_no_session() {
        let (_, ctx) = context();
        assert!(ctx.sign_in("desk@trauma.one", "nope").await.is_err());
        assert!(ctx.session().await.is_none());
    }

    #[tokio::test]
    async fn expired_error_clears_session() {
        let (_, ctx) = context();
        ctx.sign_in("desk@trauma.one", "secret").await.unwrap();

        let result: TraumaResult<()> = ctx.observe(Err(TraumaError::SessionExpired)).await;
        assert!(result.is_err());
        assert!(ctx.session().await.is_none());
    }

    #[tokio::test]
    async fn other_errors_keep_session() {
        let (_, ctx) = context();
        ctx.sign_in("desk@trauma.one", "secret").await.unwrap();

        let _ = ctx
            .observe::<()>(Err(TraumaError::store(None, "boom")))
            .await;
        assert!(ctx.session().await.is_some());
    }

    #[tokio::test]
    async fn init_discards_expired_stored_session() {
        let (_, ctx) = context();
        let mut stored = Session::from_access_token("old");
        stored.expires_at = Some(Utc::now() - Duration::minutes(5));
        assert!(!ctx.init(Some(stored.clone())).await);
        assert!(ctx.session().await.is_none());

        stored.expires_at = Some(Utc::now() + Duration::minutes(5));
        assert!(ctx.init(Some(stored)).await);
        assert!(ctx.session().await.is_some());
    }

    #[tokio::test]
    async fn sign_out_always_clears() {
        let (backend, ctx) = context();
        let session = ctx.sign_in("desk@trauma.one", "secret").await.unwrap();
        backend.expire_session(&session.access_token);

        ctx.sign_out().await;
        assert!(ctx.session().await.is_none());
    }
}
