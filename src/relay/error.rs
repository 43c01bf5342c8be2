//! Request-level failures and their HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Everything that can end a relay request early.
///
/// The `Display` text is what the client sees; sources are only logged.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("Invalid target URL")]
    InvalidTarget,

    #[error("Missing Host header")]
    MissingHost,

    #[error("Failed to create request")]
    RequestBuild(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("Failed to reach target")]
    UpstreamUnreachable(#[source] reqwest::Error),

    #[error("Failed to decode gzip body")]
    Decode(#[source] std::io::Error),

    #[error("Failed to read response body")]
    BodyRead(#[source] reqwest::Error),
}

impl RelayError {
    /// Status code sent to the client for this failure.
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::InvalidTarget | RelayError::MissingHost => StatusCode::BAD_REQUEST,
            RelayError::UpstreamUnreachable(_) => StatusCode::BAD_GATEWAY,
            RelayError::RequestBuild(_) | RelayError::Decode(_) | RelayError::BodyRead(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}
