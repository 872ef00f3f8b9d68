use reqwest::StatusCode;
use thiserror::Error;

use crate::wizard::ValidationError;

/// Failures surfaced by `AdminApi` calls and the controllers built on it.
///
/// Every variant is terminal for the triggering action only: callers keep
/// their state and may simply re-trigger the action. No retries happen here.
#[derive(Debug, Error)]
pub enum ApiClientError {
    /// The draft or payload failed a local rule before any network traffic.
    #[error("{0}")]
    Validation(#[from] ValidationError),
    /// The request never produced a usable response (connect, timeout, TLS).
    #[error("request failed: {0}")]
    Transport(#[source] reqwest::Error),
    /// The server answered with a non-success status. `message` is the
    /// server-reported text when the body carried one, otherwise a fallback.
    #[error("{message}")]
    Api { status: StatusCode, message: String },
    /// The response arrived but its payload did not match the expected
    /// shape. Deliberately distinct from an empty result.
    #[error("unexpected response payload: {0}")]
    Format(String),
    /// The listing behind a pager has no delete endpoint.
    #[error("delete is not supported for the {0} listing")]
    DeleteUnsupported(&'static str),
}

impl ApiClientError {
    /// True when the server rejected the session token itself; hosts decide
    /// whether to drop the session and prompt for a fresh login.
    pub fn requires_reauth(&self) -> bool {
        matches!(self, ApiClientError::Api { status, .. } if *status == StatusCode::UNAUTHORIZED)
    }
}

impl From<reqwest::Error> for ApiClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiClientError::Format(err.to_string())
        } else {
            ApiClientError::Transport(err)
        }
    }
}
