//! URL relay core.
//!
//! # Data Flow
//! ```text
//! inbound request
//!     → target.rs (path → validated http(s) URL)
//!     → prefix.rs (scheme + Host → relay prefix)
//!     → upstream.rs (same method/headers/body, minus Host)
//!     → decode.rs (buffer, reverse gzip)
//!     → rewrite.rs (content-type gated link rewriting)
//!     → assemble.rs (status + headers + final body)
//! ```
//!
//! # Design Decisions
//! - Stateless: nothing survives a request except the pooled client
//! - Every failure is terminal for its request; no retries
//! - Malformed links inside a body are skipped, not surfaced

pub mod assemble;
pub mod decode;
pub mod error;
pub mod handler;
pub mod prefix;
pub mod rewrite;
pub mod target;
pub mod upstream;

pub use error::RelayError;
pub use handler::Relay;
pub use prefix::RelayPrefix;
pub use rewrite::{ContentKind, LinkExtractor, LinkSpan, Rewriter};
