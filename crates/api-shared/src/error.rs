use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Body of every non-2xx response.
///
/// `code` is a stable machine-readable tag (`validation`, `not_found`, `unauthenticated`,
/// `session_expired`, `invalid_input`, or the store's own error code); `message` is the text
/// to show the operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ErrorRes {
    pub code: String,
    pub message: String,
}
