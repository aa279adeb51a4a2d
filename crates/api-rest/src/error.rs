use api_shared::ErrorRes;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use trauma_core::{TraumaError, ValidationError};

/// A failure on its way out of a handler.
///
/// | error              | status | code                          |
/// |--------------------|--------|-------------------------------|
/// | validation         | 400    | `validation`                  |
/// | invalid input      | 400    | `invalid_input`               |
/// | not signed in      | 401    | `unauthenticated`             |
/// | session expired    | 401    | `session_expired`             |
/// | sign-in rejected   | 401    | auth code, or `invalid_credentials` |
/// | not found          | 404    | `not_found`                   |
/// | picture too large  | 413    | `payload_too_large`           |
/// | store              | 502    | store code, or `store_error`  |
#[derive(Debug)]
pub enum ApiError {
    Core(TraumaError),
    /// The auth service turned the credentials down.
    SignInRejected {
        code: Option<String>,
        message: String,
    },
    /// An uploaded picture exceeded the route's body limit.
    PictureTooLarge { limit_bytes: usize },
}

impl From<TraumaError> for ApiError {
    fn from(err: TraumaError) -> Self {
        Self::Core(err)
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        Self::Core(err.into())
    }
}

impl ApiError {
    /// Classifies a sign-in failure. Coded store answers come from the auth service and
    /// mean the credentials were refused; uncoded ones are transport failures.
    pub fn from_sign_in(err: TraumaError) -> Self {
        match err {
            TraumaError::Store {
                code: Some(code),
                message,
            } => Self::SignInRejected {
                code: Some(code),
                message,
            },
            other => Self::Core(other),
        }
    }

    fn status_and_code(&self) -> (StatusCode, String) {
        let err = match self {
            ApiError::SignInRejected { code, .. } => {
                return (
                    StatusCode::UNAUTHORIZED,
                    code.clone()
                        .unwrap_or_else(|| "invalid_credentials".into()),
                )
            }
            ApiError::PictureTooLarge { .. } => {
                return (StatusCode::PAYLOAD_TOO_LARGE, "payload_too_large".into())
            }
            ApiError::Core(err) => err,
        };

        match err {
            TraumaError::Validation(_) => (StatusCode::BAD_REQUEST, "validation".into()),
            TraumaError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "invalid_input".into()),
            TraumaError::Unauthenticated => (StatusCode::UNAUTHORIZED, "unauthenticated".into()),
            TraumaError::SessionExpired => (StatusCode::UNAUTHORIZED, "session_expired".into()),
            TraumaError::NotFound { .. } => (StatusCode::NOT_FOUND, "not_found".into()),
            TraumaError::Store { code, .. } => (
                StatusCode::BAD_GATEWAY,
                code.clone().unwrap_or_else(|| "store_error".into()),
            ),
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::SignInRejected { message, .. } => message.clone(),
            ApiError::PictureTooLarge { limit_bytes } => format!(
                "Picture is larger than the {} MB upload limit.",
                limit_bytes / (1024 * 1024)
            ),
            ApiError::Core(err) => err.user_message(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        match &self {
            ApiError::Core(err @ TraumaError::Store { .. }) => {
                tracing::error!("Store error: {:?}", err)
            }
            ApiError::Core(TraumaError::SessionExpired) => {
                tracing::warn!("Rejected expired session")
            }
            ApiError::SignInRejected { message, .. } => {
                tracing::warn!("Sign in rejected: {}", message)
            }
            ApiError::PictureTooLarge { .. } => tracing::warn!("Rejected oversized picture"),
            ApiError::Core(err) => tracing::debug!("Request rejected: {}", err),
        }

        let body = ErrorRes {
            code,
            message: self.message(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_error_kind() {
        let cases = [
            (
                ApiError::from(ValidationError::MissingChiefComplaint),
                StatusCode::BAD_REQUEST,
                "validation",
            ),
            (
                ApiError::from(TraumaError::SessionExpired),
                StatusCode::UNAUTHORIZED,
                "session_expired",
            ),
            (
                ApiError::from(TraumaError::not_found("patient", "p-1")),
                StatusCode::NOT_FOUND,
                "not_found",
            ),
            (
                ApiError::from(TraumaError::store(Some("23503".into()), "fk violation")),
                StatusCode::BAD_GATEWAY,
                "23503",
            ),
            (
                ApiError::from(TraumaError::store(None, "down")),
                StatusCode::BAD_GATEWAY,
                "store_error",
            ),
            (
                ApiError::PictureTooLarge {
                    limit_bytes: 10 * 1024 * 1024,
                },
                StatusCode::PAYLOAD_TOO_LARGE,
                "payload_too_large",
            ),
        ];

        for (err, status, code) in cases {
            let (s, c) = err.status_and_code();
            assert_eq!(s, status);
            assert_eq!(c, code);
        }
    }

    #[test]
    fn sign_in_failures_split_on_store_code() {
        let refused = ApiError::from_sign_in(TraumaError::store(
            Some("invalid_grant".into()),
            "Invalid login credentials",
        ));
        assert_eq!(refused.status_and_code().0, StatusCode::UNAUTHORIZED);
        assert_eq!(refused.message(), "Invalid login credentials");

        let unreachable = ApiError::from_sign_in(TraumaError::store(None, "could not reach backend"));
        assert_eq!(unreachable.status_and_code().0, StatusCode::BAD_GATEWAY);
    }
}
