//! Link rewriting for relayed bodies.
//!
//! # Responsibilities
//! - Pick a link grammar from the upstream `Content-Type`
//! - Find link spans in the body (`LinkExtractor`)
//! - Absolutize each link against the target and prefix it with the relay
//!
//! # Grammars
//! - HTML: a double-quoted absolute `http(s)://` URL or root-relative `/` path
//!   with no whitespace, quotes, angle brackets or `)` inside
//! - Playlist: a whole line that is such a URL or path (M3U8 / HLS)
//!
//! # Design Decisions
//! - Matching is byte-oriented so non-UTF-8 bodies pass through intact
//! - Links already carrying the relay prefix are left alone, so feeding
//!   relay output back in changes nothing
//! - A link that does not parse is kept verbatim; it never fails the request

use std::borrow::Cow;
use std::ops::Range;

use axum::http::{header, HeaderMap};
use once_cell::sync::Lazy;
use regex::bytes::Regex;
use url::Url;

use crate::relay::prefix::RelayPrefix;

static HTML_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?-u)"(https?://[^\s"'<>)]+|/[^\s"'<>)]+)""#).expect("valid HTML link pattern")
});

static PLAYLIST_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?mR-u)^(https?://[^\s"'<>)]+|/[^\s"'<>)]+)$"#)
        .expect("valid playlist link pattern")
});

/// True if `s` contains a quoted link the HTML grammar would rewrite.
pub fn is_html_url_match(s: &str) -> bool {
    HTML_URL.is_match(s.as_bytes())
}

/// True if some line of `s` is a link the playlist grammar would rewrite.
pub fn is_playlist_url_match(s: &str) -> bool {
    PLAYLIST_URL.is_match(s.as_bytes())
}

/// A link found in a body: where it sits and its raw bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkSpan<'b> {
    pub range: Range<usize>,
    pub url: &'b [u8],
}

/// Finds rewritable links in a body.
///
/// Spans must be yielded in ascending, non-overlapping order.
pub trait LinkExtractor: Send + Sync {
    fn links<'b>(&self, body: &'b [u8]) -> Box<dyn Iterator<Item = LinkSpan<'b>> + 'b>;
}

/// Quoted URLs in HTML-like text. The span excludes the quotes.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlAttributeLinks;

impl LinkExtractor for HtmlAttributeLinks {
    fn links<'b>(&self, body: &'b [u8]) -> Box<dyn Iterator<Item = LinkSpan<'b>> + 'b> {
        Box::new(HTML_URL.captures_iter(body).filter_map(|caps| {
            let m = caps.get(1)?;
            Some(LinkSpan {
                range: m.range(),
                url: m.as_bytes(),
            })
        }))
    }
}

/// Whole-line URLs in M3U8 playlists.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaylistLineLinks;

impl LinkExtractor for PlaylistLineLinks {
    fn links<'b>(&self, body: &'b [u8]) -> Box<dyn Iterator<Item = LinkSpan<'b>> + 'b> {
        Box::new(PLAYLIST_URL.find_iter(body).map(|m| LinkSpan {
            range: m.range(),
            url: m.as_bytes(),
        }))
    }
}

static HTML_LINKS: HtmlAttributeLinks = HtmlAttributeLinks;
static PLAYLIST_LINKS: PlaylistLineLinks = PlaylistLineLinks;

/// Body families the relay knows how to rewrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Html,
    Playlist,
    /// Passed through untouched.
    Opaque,
}

impl ContentKind {
    /// Classify by media type. Parameters such as `charset` are ignored and
    /// the comparison is case-insensitive, but there is no prefix matching.
    pub fn from_content_type(value: &str) -> Self {
        let essence = value.split(';').next().unwrap_or_default().trim();
        if essence.eq_ignore_ascii_case("text/html") {
            ContentKind::Html
        } else if essence.eq_ignore_ascii_case("application/x-mpegurl")
            || essence.eq_ignore_ascii_case("application/vnd.apple.mpegurl")
        {
            ContentKind::Playlist
        } else {
            ContentKind::Opaque
        }
    }

    pub fn from_headers(headers: &HeaderMap) -> Self {
        headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(Self::from_content_type)
            .unwrap_or(ContentKind::Opaque)
    }

    pub fn is_rewritable(self) -> bool {
        self != ContentKind::Opaque
    }

    /// The link grammar for this kind, if any.
    pub fn extractor(self) -> Option<&'static dyn LinkExtractor> {
        match self {
            ContentKind::Html => Some(&HTML_LINKS),
            ContentKind::Playlist => Some(&PLAYLIST_LINKS),
            ContentKind::Opaque => None,
        }
    }
}

/// Rewrites links so they route back through the relay.
#[derive(Debug, Clone, Copy)]
pub struct Rewriter<'a> {
    target: &'a Url,
    prefix: &'a RelayPrefix,
}

impl<'a> Rewriter<'a> {
    pub fn new(target: &'a Url, prefix: &'a RelayPrefix) -> Self {
        Self { target, prefix }
    }

    /// Rewrite `body` according to `kind`. Borrowed if nothing changed.
    pub fn rewrite<'b>(&self, body: &'b [u8], kind: ContentKind) -> Cow<'b, [u8]> {
        match kind.extractor() {
            Some(extractor) => self.rewrite_with(body, extractor),
            None => Cow::Borrowed(body),
        }
    }

    /// Rewrite every span `extractor` yields.
    pub fn rewrite_with<'b>(&self, body: &'b [u8], extractor: &dyn LinkExtractor) -> Cow<'b, [u8]> {
        let mut out: Option<Vec<u8>> = None;
        let mut last = 0;
        let mut rewritten = 0usize;

        for span in extractor.links(body) {
            let Some(replacement) = self.relay_link(span.url) else {
                continue;
            };
            let buf = out.get_or_insert_with(|| Vec::with_capacity(body.len() + body.len() / 8));
            buf.extend_from_slice(&body[last..span.range.start]);
            buf.extend_from_slice(replacement.as_bytes());
            last = span.range.end;
            rewritten += 1;
        }

        match out {
            Some(mut buf) => {
                buf.extend_from_slice(&body[last..]);
                tracing::debug!(links = rewritten, "Rewrote body links");
                Cow::Owned(buf)
            }
            None => Cow::Borrowed(body),
        }
    }

    /// The relayed form of one link, or `None` to leave it as is.
    pub fn relay_link(&self, raw: &[u8]) -> Option<String> {
        let raw = std::str::from_utf8(raw).ok()?;
        if raw.starts_with(self.prefix.as_str()) {
            return None;
        }

        // `join` keeps absolute URLs and resolves everything else per RFC 3986.
        match self.target.join(raw) {
            Ok(resolved) => Some(format!("{}{}", self.prefix, resolved)),
            Err(e) => {
                tracing::trace!(link = %raw, error = %e, "Leaving unparsable link");
                None
            }
        }
    }
}
