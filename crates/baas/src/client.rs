//! Shared HTTP plumbing for every BaaS endpoint.
//!
//! Every request carries the project's anon key as `apikey`, and a bearer token: the
//! session's access token when there is one, the anon key otherwise. Non-success responses
//! are turned into [`TraumaError`] here, including detection of expired sessions.

use reqwest::{Method, RequestBuilder, Response};
use serde_json::Value;
use std::time::Duration;
use trauma_core::constants::SESSION_EXPIRED_CODE;
use trauma_core::{BaasEndpoint, Session, TraumaError, TraumaResult};

const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Clone, Debug)]
pub struct BaasClient {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
    access_token: Option<String>,
}

impl BaasClient {
    pub fn new(endpoint: &BaasEndpoint) -> TraumaResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| TraumaError::InvalidInput(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: endpoint.url().to_string(),
            anon_key: endpoint.anon_key().to_string(),
            access_token: None,
        })
    }

    /// A copy of this client that authenticates as `session`.
    pub fn with_session(&self, session: &Session) -> Self {
        Self {
            access_token: Some(session.access_token.clone()),
            ..self.clone()
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let bearer = self.access_token.as_deref().unwrap_or(&self.anon_key);
        self.http
            .request(method, format!("{}{}", self.base_url, path))
            .header("apikey", &self.anon_key)
            .bearer_auth(bearer)
    }

    /// Sends the request and returns the response if its status is a success.
    pub(crate) async fn send(&self, request: RequestBuilder) -> TraumaResult<Response> {
        let response = request.send().await.map_err(|e| {
            if e.is_connect() {
                TraumaError::store(None, format!("could not reach backend at {}", self.base_url))
            } else if e.is_timeout() {
                TraumaError::store(
                    None,
                    format!("backend request timed out after {REQUEST_TIMEOUT_SECS}s"),
                )
            } else {
                TraumaError::store(None, e.to_string())
            }
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let err = error_from_body(status.as_u16(), &body);
        if err.is_session_expired() {
            tracing::warn!(status = status.as_u16(), "backend reported an expired session");
        } else {
            tracing::debug!(status = status.as_u16(), body = %body, "backend request failed");
        }
        Err(err)
    }

    /// Sends the request and decodes a JSON body.
    pub(crate) async fn send_json<T: serde::de::DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> TraumaResult<T> {
        let response = self.send(request).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| TraumaError::store(None, format!("unexpected backend response: {e}")))
    }
}

fn text_field(value: &Value, key: &str) -> Option<String> {
    match value.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Maps an error response to a [`TraumaError`].
///
/// The row store answers `{code, message}`, the auth service `{error, error_description}`
/// or `{error_code, msg}`, and storage `{statusCode, error, message}`. The message is kept
/// verbatim; the raw body is used when it is not JSON.
pub(crate) fn error_from_body(status: u16, body: &str) -> TraumaError {
    let parsed: Option<Value> = serde_json::from_str(body).ok();

    let (code, message) = match &parsed {
        Some(value) => {
            let code = text_field(value, "code")
                .filter(|c| c.parse::<u16>().is_err())
                .or_else(|| text_field(value, "error_code"))
                .or_else(|| text_field(value, "error"))
                .or_else(|| text_field(value, "code"));
            let message = ["message", "msg", "error_description", "error"]
                .iter()
                .find_map(|key| text_field(value, key))
                .unwrap_or_else(|| body.to_string());
            (code, message)
        }
        None => (None, body.to_string()),
    };

    let message = if message.trim().is_empty() {
        format!("backend request failed with status {status}")
    } else {
        message
    };

    let expired = code.as_deref() == Some(SESSION_EXPIRED_CODE)
        || (matches!(status, 400..=403) && message.to_ascii_lowercase().contains("jwt expired"));
    if expired {
        return TraumaError::SessionExpired;
    }

    TraumaError::store(code, message)
}
