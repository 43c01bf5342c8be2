//! Request identification for logging.
//!
//! The ID is a log field only. It is never added to the forwarded headers,
//! which must match what the client sent.

use axum::http::HeaderMap;
use uuid::Uuid;

/// Header clients (or an outer proxy) may use to supply their own ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// The inbound `X-Request-ID`, or a fresh UUID v4.
pub fn request_id(headers: &HeaderMap) -> String {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}
