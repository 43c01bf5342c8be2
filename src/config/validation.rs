//! Configuration validation.
//!
//! Serde handles syntax; this checks values that parse but cannot work.
//! Every problem is reported, not just the first.

use std::net::SocketAddr;

use crate::config::schema::RelayConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("listener.bind_address `{0}` is not a socket address")]
    BindAddress(String),

    #[error("listener.tls.{0} must not be empty")]
    EmptyTlsPath(&'static str),

    #[error("upstream.max_redirects must be > 0 when follow_redirects is enabled")]
    ZeroRedirects,
}

/// Validate a parsed configuration.
pub fn validate_config(config: &RelayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    if let Some(tls) = &config.listener.tls {
        if tls.cert_path.trim().is_empty() {
            errors.push(ValidationError::EmptyTlsPath("cert_path"));
        }
        if tls.key_path.trim().is_empty() {
            errors.push(ValidationError::EmptyTlsPath("key_path"));
        }
    }

    if config.upstream.follow_redirects && config.upstream.max_redirects == 0 {
        errors.push(ValidationError::ZeroRedirects);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
