//! The relay's own origin, as seen by the client.

use std::fmt;

use axum::http::{header, HeaderMap, Uri};

use crate::relay::error::RelayError;

const X_FORWARDED_PROTO: &str = "x-forwarded-proto";

/// `<scheme>://<host>/`, prepended to every rewritten link.
///
/// Derived per request: several DNS names may point at one relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayPrefix(String);

impl RelayPrefix {
    pub fn new(scheme: &str, host: &str) -> Self {
        Self(format!("{}://{}/", scheme, host))
    }

    /// Build the prefix from an inbound request.
    ///
    /// `listener_scheme` is `https` when the listener terminates TLS.
    /// With `trust_forwarded_proto`, an `X-Forwarded-Proto` of `http` or
    /// `https` overrides it.
    pub fn from_request(
        headers: &HeaderMap,
        uri: &Uri,
        listener_scheme: &str,
        trust_forwarded_proto: bool,
    ) -> Result<Self, RelayError> {
        let host = headers
            .get(header::HOST)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .or_else(|| uri.authority().map(|a| a.as_str()))
            .ok_or(RelayError::MissingHost)?;

        let forwarded: Option<&str> = trust_forwarded_proto
            .then(|| forwarded_proto(headers))
            .flatten();
        let scheme = forwarded.unwrap_or(listener_scheme);

        Ok(Self::new(scheme, host))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RelayPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn forwarded_proto(headers: &HeaderMap) -> Option<&'static str> {
    // proxies append, so the first entry is the client-facing one
    let first = headers
        .get(X_FORWARDED_PROTO)?
        .to_str()
        .ok()?
        .split(',')
        .next()?
        .trim();

    if first.eq_ignore_ascii_case("https") {
        Some("https")
    } else if first.eq_ignore_ascii_case("http") {
        Some("http")
    } else {
        None
    }
}
