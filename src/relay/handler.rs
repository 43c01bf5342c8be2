//! The relay pipeline for one request.
//!
//! ```text
//! resolve target → send upstream → decode (gzip) → rewrite links → assemble
//! ```
//!
//! The inbound body is streamed to the upstream. Response bodies that need
//! neither decoding nor rewriting are streamed back instead of buffered, and
//! responses that cannot carry a body (HEAD, 1xx, 204, 304) skip both steps.
//! Dropping the returned future (client gone) drops the upstream
//! request and its body with it.

use std::borrow::Cow;

use axum::body::{Body, Bytes};
use axum::http::{Method, Request, StatusCode};
use axum::response::Response;

use crate::config::RelayConfig;
use crate::relay::assemble;
use crate::relay::decode::{self, BodyEncoding};
use crate::relay::error::RelayError;
use crate::relay::prefix::RelayPrefix;
use crate::relay::rewrite::{ContentKind, Rewriter};
use crate::relay::target::resolve_target;
use crate::relay::upstream::Upstream;

/// Per-process relay settings plus the shared upstream client.
///
/// Holds no per-request state; each call to [`Relay::handle`] is independent.
#[derive(Debug, Clone)]
pub struct Relay {
    upstream: Upstream,
    listener_scheme: &'static str,
    trust_forwarded_proto: bool,
}

impl Relay {
    pub fn from_config(config: &RelayConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            upstream: Upstream::from_config(&config.upstream)?,
            listener_scheme: if config.listener.tls.is_some() {
                "https"
            } else {
                "http"
            },
            trust_forwarded_proto: config.listener.trust_forwarded_proto,
        })
    }

    /// Relay one inbound request.
    pub async fn handle(&self, request: Request<Body>) -> Result<Response, RelayError> {
        let (parts, body) = request.into_parts();

        let raw_target = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        let target = resolve_target(raw_target)?;
        let prefix = RelayPrefix::from_request(
            &parts.headers,
            &parts.uri,
            self.listener_scheme,
            self.trust_forwarded_proto,
        )?;

        let outbound = self.upstream.build_request(
            parts.method.clone(),
            target.clone(),
            &parts.headers,
            body,
        )?;
        let response = self.upstream.send(outbound).await?;

        if !carries_body(&parts.method, response.status()) {
            tracing::debug!(status = %response.status(), "Upstream responded without a body");
            return Ok(assemble::bodiless(response));
        }

        let kind = ContentKind::from_headers(response.headers());
        let encoding = BodyEncoding::from_headers(response.headers());
        tracing::debug!(
            status = %response.status(),
            kind = ?kind,
            encoding = ?encoding,
            "Upstream responded"
        );

        if !needs_buffering(kind, encoding) {
            return Ok(assemble::passthrough(response));
        }

        let buffered = decode::buffer_response(response).await?;
        let body = match Rewriter::new(&target, &prefix).rewrite(&buffered.body, kind) {
            Cow::Borrowed(_) => buffered.body.clone(),
            Cow::Owned(rewritten) => Bytes::from(rewritten),
        };

        Ok(assemble::assemble(buffered.status, buffered.headers, body))
    }
}

/// Whether a response to `method` with `status` can have a body at all.
///
/// Headers on the others still describe the entity (`Content-Encoding: gzip`
/// on a 304, the full `Content-Length` on a HEAD), so they are relayed as-is.
fn carries_body(method: &Method, status: StatusCode) -> bool {
    !(*method == Method::HEAD
        || status.is_informational()
        || status == StatusCode::NO_CONTENT
        || status == StatusCode::NOT_MODIFIED)
}

/// Buffer when the body must be decoded or rewritten.
///
/// Bodies in an encoding other than gzip are never rewritten, since the
/// grammars would be matching compressed bytes.
fn needs_buffering(kind: ContentKind, encoding: BodyEncoding) -> bool {
    match encoding {
        BodyEncoding::Gzip => true,
        BodyEncoding::Identity => kind.is_rewritable(),
        BodyEncoding::Other => false,
    }
}
