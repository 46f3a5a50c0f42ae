use std::path::PathBuf;

use super::TlsConfig;
use crate::core::nls::SynthesisOptions;
use crate::utils::validate_endpoint_url;

/// Require a configuration value to be present and non-blank
pub fn validate_required(
    name: &str,
    value: Option<String>,
) -> Result<String, Box<dyn std::error::Error>> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(format!(
            "Missing required configuration: {name} must be set (env var or YAML)"
        )
        .into()),
    }
}

/// Validate TLS paths
///
/// Both paths must be given together, and both files must exist.
pub fn validate_tls(
    cert_path: Option<String>,
    key_path: Option<String>,
) -> Result<Option<TlsConfig>, Box<dyn std::error::Error>> {
    match (cert_path, key_path) {
        (None, None) => Ok(None),
        (Some(cert), Some(key)) => {
            let cert_path = PathBuf::from(cert);
            let key_path = PathBuf::from(key);
            if !cert_path.exists() {
                return Err(format!(
                    "TLS certificate file not found: {}",
                    cert_path.display()
                )
                .into());
            }
            if !key_path.exists() {
                return Err(format!("TLS key file not found: {}", key_path.display()).into());
            }
            Ok(Some(TlsConfig {
                cert_path,
                key_path,
            }))
        }
        _ => Err("TLS_CERT_PATH and TLS_KEY_PATH must be set together".into()),
    }
}

/// Validate both provider endpoints
pub fn validate_endpoints(
    token_url: &str,
    tts_url: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    validate_endpoint_url(token_url).map_err(|e| format!("Invalid NLS_TOKEN_URL: {e}"))?;
    validate_endpoint_url(tts_url).map_err(|e| format!("Invalid NLS_TTS_URL: {e}"))?;
    Ok(())
}

/// Validate default synthesis parameters
pub fn validate_tts_defaults(options: &SynthesisOptions) -> Result<(), Box<dyn std::error::Error>> {
    options
        .validate()
        .map_err(|e| format!("Invalid TTS defaults: {e}"))?;
    Ok(())
}

pub fn validate_rate_limit(
    requests_per_second: u32,
    burst_size: u32,
) -> Result<(), Box<dyn std::error::Error>> {
    if requests_per_second == 0 {
        return Err("RATE_LIMIT_REQUESTS_PER_SECOND must be greater than 0".into());
    }
    if burst_size == 0 {
        return Err("RATE_LIMIT_BURST_SIZE must be greater than 0".into());
    }
    Ok(())
}
