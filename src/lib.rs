//! URL relay library.
//!
//! Relays `/<absolute-url>` requests to the embedded URL and rewrites links in
//! HTML and HLS playlist responses so they route back through the relay.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod relay;

pub use config::RelayConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use relay::{Relay, RelayError};
