//! Network layer subsystem.
//!
//! Plain TCP listeners are bound directly with Tokio; this module only
//! covers the optional TLS listener material.

pub mod tls;

pub use tls::load_tls_config;
