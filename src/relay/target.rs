//! Target extraction from the inbound request path.
//!
//! The request target after the leading `/` is the upstream URL verbatim:
//! `/https://example.com/a?b=1` relays to `https://example.com/a?b=1`.
//! No decoding beyond what the transport already did.

use url::Url;

use crate::relay::error::RelayError;

/// Extract and validate the upstream URL from a request path-and-query.
pub fn resolve_target(path_and_query: &str) -> Result<Url, RelayError> {
    let raw = path_and_query.strip_prefix('/').unwrap_or(path_and_query);
    if raw.is_empty() {
        return Err(RelayError::InvalidTarget);
    }

    let url = Url::parse(raw).map_err(|e| {
        tracing::debug!(raw = %raw, error = %e, "Target does not parse as a URL");
        RelayError::InvalidTarget
    })?;

    match url.scheme() {
        "http" | "https" => {}
        scheme => {
            tracing::debug!(raw = %raw, scheme = %scheme, "Unsupported target scheme");
            return Err(RelayError::InvalidTarget);
        }
    }

    tracing::info!(upstream = %url, "Relaying");
    Ok(url)
}
