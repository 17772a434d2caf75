//! Endpoint validation for backend URL overrides
//!
//! Backend endpoints can be overridden through configuration (for regional
//! endpoints, proxies, or local mock servers in tests). This module makes sure
//! an override:
//! - Is a well-formed absolute URL
//! - Uses HTTPS, unless it points at a loopback host
//! - Has a host component

use std::net::IpAddr;
use thiserror::Error;
use tracing::warn;
use url::Url;

/// Errors that can occur during endpoint validation
#[derive(Debug, Error)]
pub enum EndpointValidationError {
    #[error("Invalid URL format: {0}")]
    InvalidFormat(#[from] url::ParseError),

    #[error("URL scheme must be HTTPS for non-loopback hosts, got: {0}")]
    HttpsRequired(String),

    #[error("URL must have a host")]
    MissingHost,
}

/// Returns true when the host is `localhost` or a loopback IP literal.
fn is_loopback_host(url: &Url) -> bool {
    match url.host_str() {
        Some("localhost") => true,
        Some(host) => host
            .trim_start_matches('[')
            .trim_end_matches(']')
            .parse::<IpAddr>()
            .map(|ip| ip.is_loopback())
            .unwrap_or(false),
        None => false,
    }
}

/// Validate an endpoint override and return the parsed URL.
///
/// Plain `http` is accepted only for loopback hosts so that local mock
/// servers keep working while remote endpoints always use TLS.
pub fn validate_endpoint(raw: &str) -> Result<Url, EndpointValidationError> {
    let url = Url::parse(raw)?;

    if url.host_str().is_none() {
        return Err(EndpointValidationError::MissingHost);
    }

    match url.scheme() {
        "https" => Ok(url),
        "http" if is_loopback_host(&url) => {
            warn!("Using plain HTTP endpoint on loopback host: {}", url);
            Ok(url)
        }
        other => Err(EndpointValidationError::HttpsRequired(other.to_string())),
    }
}
