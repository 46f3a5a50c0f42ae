//! Configuration module for the NLS TTS proxy
//!
//! This module handles server configuration from various sources: .env files, YAML files,
//! and environment variables. Priority: YAML > ENV vars > .env values > defaults.
//!
//! # Modules
//! - `yaml`: YAML configuration file loading
//! - `env`: Environment variable loading
//! - `merge`: Merging YAML and environment configurations
//! - `validation`: Configuration validation logic
//! - `utils`: Utility functions for configuration parsing
//!
//! # Example
//! ```rust,no_run
//! use nls_tts_proxy::config::ServerConfig;
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load from environment variables only
//! let config = ServerConfig::from_env()?;
//!
//! // Load from YAML file with environment variable overrides
//! let config_path = PathBuf::from("config.yaml");
//! let config = ServerConfig::from_file(&config_path)?;
//!
//! println!("Server listening on {}", config.address());
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;
use std::time::Duration;

mod env;
mod merge;
mod utils;
mod validation;
mod yaml;

use crate::core::nls::{Credentials, NlsConfig, NlsResult, SynthesisOptions, Transport};

/// TLS configuration for HTTPS
#[derive(Debug, Clone)]
pub struct TlsConfig {
    /// Path to the TLS certificate file (PEM format)
    pub cert_path: PathBuf,
    /// Path to the TLS private key file (PEM format)
    pub key_path: PathBuf,
}

/// Server configuration
///
/// Contains all configuration needed to run the proxy:
/// - Server settings (host, port, TLS)
/// - Alibaba Cloud credentials and NLS endpoints
/// - Default synthesis parameters
/// - Security settings (CORS, rate limiting)
#[derive(Clone)]
pub struct ServerConfig {
    // Server settings
    pub host: String,
    pub port: u16,

    // TLS configuration (optional)
    pub tls: Option<TlsConfig>,

    // Credentials
    pub access_key_id: String,
    pub access_key_secret: String,
    /// NLS project app key
    pub app_key: String,

    // Provider endpoints
    pub nls_region: String,
    pub nls_token_url: String,
    pub nls_tts_url: String,
    pub request_timeout_seconds: u64,
    /// Reuse issued tokens until shortly before expiry
    pub token_cache: bool,

    // Synthesis defaults
    pub tts_transport: Transport,
    pub tts_defaults: SynthesisOptions,

    // Security configuration
    /// CORS allowed origins (comma-separated list or "*" for all)
    /// Default: None (CORS disabled, same-origin only)
    pub cors_allowed_origins: Option<String>,

    // Rate limiting configuration
    /// Maximum requests per second per IP address
    /// Default: 60
    pub rate_limit_requests_per_second: u32,
    /// Maximum burst size for rate limiting
    /// Default: 10
    pub rate_limit_burst_size: u32,
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("tls", &self.tls)
            .field("access_key_id", &self.access_key_id)
            .field("access_key_secret", &"<redacted>")
            .field("app_key", &"<redacted>")
            .field("nls_region", &self.nls_region)
            .field("nls_token_url", &self.nls_token_url)
            .field("nls_tts_url", &self.nls_tts_url)
            .field("request_timeout_seconds", &self.request_timeout_seconds)
            .field("token_cache", &self.token_cache)
            .field("tts_transport", &self.tts_transport)
            .field("tts_defaults", &self.tts_defaults)
            .field("cors_allowed_origins", &self.cors_allowed_origins)
            .field(
                "rate_limit_requests_per_second",
                &self.rate_limit_requests_per_second,
            )
            .field("rate_limit_burst_size", &self.rate_limit_burst_size)
            .finish()
    }
}

/// Zeroize secret fields when ServerConfig is dropped.
impl Drop for ServerConfig {
    fn drop(&mut self) {
        use zeroize::Zeroize;

        self.access_key_secret.zeroize();
        self.app_key.zeroize();
    }
}

impl ServerConfig {
    /// Load configuration from a YAML file with environment variable base
    ///
    /// Priority order (highest to lowest):
    /// 1. YAML file values
    /// 2. Environment variables (actual ENV vars override .env values)
    /// 3. .env file values
    /// 4. Default values
    ///
    /// # Errors
    /// Returns an error if:
    /// - The YAML file cannot be read or is malformed
    /// - Environment variables have invalid formats
    /// - Required credentials are missing
    /// - Configuration validation fails
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        // .env is loaded in main.rs at startup, so it already sits under real ENV vars here.
        let yaml_config = yaml::YamlConfig::from_file(path)?;
        merge::merge_config(Some(yaml_config))
    }

    /// Get the server address as a string
    ///
    /// Returns the address in the format "host:port"
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check if TLS is enabled
    pub fn is_tls_enabled(&self) -> bool {
        self.tls.is_some()
    }

    /// Build the provider client configuration.
    pub fn nls_config(&self) -> NlsResult<NlsConfig> {
        let credentials = Credentials::new(
            self.access_key_id.as_str(),
            self.access_key_secret.as_str(),
            self.app_key.as_str(),
        )?;

        Ok(NlsConfig {
            credentials,
            region: self.nls_region.clone(),
            token_url: self.nls_token_url.clone(),
            tts_url: self.nls_tts_url.clone(),
            request_timeout: Duration::from_secs(self.request_timeout_seconds),
            token_cache: self.token_cache,
            transport: self.tts_transport,
            defaults: self.tts_defaults.clone(),
        })
    }
}
