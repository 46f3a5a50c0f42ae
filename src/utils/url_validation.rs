//! Validation for configured provider endpoint URLs
//!
//! Endpoints are overridable (other regions, local mock servers), so they are
//! checked once at startup instead of failing on the first request. A URL is
//! accepted when it:
//! - Uses the `http` or `https` scheme
//! - Has a host
//! - Carries no query string or fragment (signed parameters are appended)

use thiserror::Error;
use tracing::warn;
use url::Url;

/// Errors that can occur during endpoint URL validation
#[derive(Debug, Error)]
pub enum UrlValidationError {
    #[error("Invalid URL format: {0}")]
    InvalidFormat(#[from] url::ParseError),

    #[error("URL scheme must be http or https, got: {0}")]
    UnsupportedScheme(String),

    #[error("URL must have a host")]
    MissingHost,

    #[error("URL must not contain a query string or fragment")]
    QueryNotAllowed,
}

/// Validates a provider endpoint URL and returns it parsed
///
/// Plain `http` is accepted for loopback hosts only without a warning;
/// anything else over `http` is logged since credentials-derived tokens
/// would travel unencrypted.
pub fn validate_endpoint_url(url: &str) -> Result<Url, UrlValidationError> {
    let parsed = Url::parse(url)?;

    match parsed.scheme() {
        "https" => {}
        "http" => {
            let is_loopback = match parsed.host() {
                Some(url::Host::Ipv4(ip)) => ip.is_loopback(),
                Some(url::Host::Ipv6(ip)) => ip.is_loopback(),
                Some(url::Host::Domain(domain)) => domain == "localhost",
                None => false,
            };
            if !is_loopback {
                warn!(url = %parsed, "Provider endpoint uses plain HTTP");
            }
        }
        other => return Err(UrlValidationError::UnsupportedScheme(other.to_string())),
    }

    if parsed.host_str().is_none() {
        return Err(UrlValidationError::MissingHost);
    }

    if parsed.query().is_some() || parsed.fragment().is_some() {
        return Err(UrlValidationError::QueryNotAllowed);
    }

    Ok(parsed)
}
