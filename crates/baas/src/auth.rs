//! Password sign-in, current user and sign-out against the auth service.

use crate::client::BaasClient;
use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use trauma_core::{AuthProvider, Session, SessionUser, TraumaResult};

pub struct BaasAuth {
    client: BaasClient,
}

impl BaasAuth {
    pub fn new(client: BaasClient) -> Self {
        Self { client }
    }
}

#[derive(Serialize)]
struct PasswordGrant<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    #[serde(default)]
    user: Option<UserResponse>,
}

#[derive(Deserialize)]
struct UserResponse {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

impl From<UserResponse> for SessionUser {
    fn from(user: UserResponse) -> Self {
        SessionUser {
            id: user.id,
            email: user.email,
        }
    }
}

impl TokenResponse {
    fn expiry(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match (self.expires_at, self.expires_in) {
            (Some(at), _) => Utc.timestamp_opt(at, 0).single(),
            (None, Some(secs)) => Some(now + Duration::seconds(secs)),
            (None, None) => None,
        }
    }

    fn into_session(self, now: DateTime<Utc>) -> Session {
        let expires_at = self.expiry(now);
        Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
            user: self.user.map(SessionUser::from),
        }
    }
}

#[async_trait]
impl AuthProvider for BaasAuth {
    async fn sign_in(&self, email: &str, password: &str) -> TraumaResult<Session> {
        let request = self
            .client
            .request(Method::POST, "/auth/v1/token")
            .query(&[("grant_type", "password")])
            .json(&PasswordGrant {
                email: email.trim(),
                password,
            });
        let token: TokenResponse = self.client.send_json(request).await?;
        Ok(token.into_session(Utc::now()))
    }

    async fn current_user(&self, session: &Session) -> TraumaResult<SessionUser> {
        let client = self.client.with_session(session);
        let request = client.request(Method::GET, "/auth/v1/user");
        let user: UserResponse = client.send_json(request).await?;
        Ok(user.into())
    }

    async fn sign_out(&self, session: &Session) -> TraumaResult<()> {
        let client = self.client.with_session(session);
        let request = client.request(Method::POST, "/auth/v1/logout");
        client.send(request).await?;
        Ok(())
    }
}
