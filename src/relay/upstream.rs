//! Outbound request construction and dispatch.
//!
//! # Responsibilities
//! - Mirror the inbound method, headers and body onto the target URL
//! - Stream the inbound body; it is never held in memory
//! - Drop `Host` so the client derives it from the target
//! - Issue exactly one attempt; failures are terminal
//!
//! # Design Decisions
//! - Automatic decompression is off (reqwest's `gzip` feature is not enabled);
//!   the body decoder owns that step so headers stay consistent
//! - Redirect following and timeouts come from `UpstreamConfig`

use std::time::Duration;

use axum::body::{Body, Bytes, HttpBody};
use axum::http::{header, HeaderMap, Method};
use reqwest::redirect::Policy;
use url::Url;

use crate::config::UpstreamConfig;
use crate::relay::error::RelayError;

/// Shared outbound HTTP client.
///
/// Cloning is cheap; clones share one connection pool.
#[derive(Debug, Clone)]
pub struct Upstream {
    client: reqwest::Client,
}

impl Upstream {
    /// Build the client from configuration.
    pub fn from_config(config: &UpstreamConfig) -> Result<Self, reqwest::Error> {
        let redirect = if config.follow_redirects {
            Policy::limited(config.max_redirects)
        } else {
            Policy::none()
        };

        let mut builder = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .redirect(redirect);

        if !config.system_proxy {
            builder = builder.no_proxy();
        }
        if config.request_timeout_secs > 0 {
            builder = builder.timeout(Duration::from_secs(config.request_timeout_secs));
        }

        Ok(Self {
            client: builder.build()?,
        })
    }

    /// Build the outbound request for `target`.
    pub fn build_request(
        &self,
        method: Method,
        target: Url,
        inbound_headers: &HeaderMap,
        body: Body,
    ) -> Result<reqwest::Request, RelayError> {
        let headers = forwarded_headers(inbound_headers);

        let mut builder = self.client.request(method, target).headers(headers);
        // A bodiless GET must not grow a `Content-Length: 0`.
        if declares_body(inbound_headers) {
            builder = builder.body(outbound_body(body));
        }

        builder
            .build()
            .map_err(|e| RelayError::RequestBuild(e.into()))
    }

    /// Send the request. The response body is left unread.
    pub async fn send(&self, request: reqwest::Request) -> Result<reqwest::Response, RelayError> {
        self.client
            .execute(request)
            .await
            .map_err(RelayError::UpstreamUnreachable)
    }
}

fn declares_body(inbound: &HeaderMap) -> bool {
    inbound.contains_key(header::CONTENT_LENGTH) || inbound.contains_key(header::TRANSFER_ENCODING)
}

/// Empty bodies go out as bytes so the length stays known; anything else is
/// streamed chunk by chunk as the client sends it.
fn outbound_body(body: Body) -> reqwest::Body {
    if HttpBody::size_hint(&body).exact() == Some(0) {
        reqwest::Body::from(Bytes::new())
    } else {
        reqwest::Body::wrap_stream(body.into_data_stream())
    }
}

/// Copy every inbound header except `Host`, keeping repeated values.
pub fn forwarded_headers(inbound: &HeaderMap) -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(inbound.len());
    for (name, value) in inbound.iter() {
        // HeaderName is already lowercase, so this is case-insensitive.
        if *name == header::HOST {
            continue;
        }
        headers.append(name.clone(), value.clone());
    }
    headers
}
