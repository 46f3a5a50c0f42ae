use serde::Deserialize;
use std::path::PathBuf;

/// Complete YAML configuration structure
///
/// All fields are optional to allow partial configuration. Anything left out
/// falls back to environment variables, then to defaults.
///
/// # Example YAML structure
/// ```yaml
/// server:
///   host: "0.0.0.0"
///   port: 8000
///   tls:
///     cert_path: "/etc/nls-tts-proxy/cert.pem"
///     key_path: "/etc/nls-tts-proxy/key.pem"
///
/// credentials:
///   access_key_id: "LTAI..."
///   access_key_secret: "your-access-key-secret"
///   app_key: "your-app-key"
///
/// nls:
///   region: "cn-shanghai"
///   token_url: "https://nls-meta.cn-shanghai.aliyuncs.com/"
///   tts_url: "https://nls-gateway.cn-shanghai.aliyuncs.com/stream/v1/tts"
///   request_timeout_seconds: 10
///   token_cache: true
///
/// tts:
///   transport: "post"
///   voice: "xiaoyun"
///   volume: 50
///   speech_rate: 0
///   pitch_rate: 0
///
/// security:
///   cors_allowed_origins: "*"
///   rate_limit_requests_per_second: 60
///   rate_limit_burst_size: 10
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub server: Option<ServerYaml>,
    pub credentials: Option<CredentialsYaml>,
    pub nls: Option<NlsYaml>,
    pub tts: Option<TtsYaml>,
    pub security: Option<SecurityYaml>,
}

/// Server configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ServerYaml {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub tls: Option<TlsYaml>,
}

/// TLS configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TlsYaml {
    pub cert_path: Option<String>,
    pub key_path: Option<String>,
}

/// Alibaba Cloud account credentials from YAML
#[derive(Clone, Deserialize, Default)]
#[serde(default)]
pub struct CredentialsYaml {
    pub access_key_id: Option<String>,
    pub access_key_secret: Option<String>,
    /// NLS project app key
    pub app_key: Option<String>,
}

impl std::fmt::Debug for CredentialsYaml {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialsYaml")
            .field("access_key_id", &self.access_key_id)
            .field(
                "access_key_secret",
                &self.access_key_secret.as_ref().map(|_| "<redacted>"),
            )
            .field("app_key", &self.app_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Provider endpoint settings from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct NlsYaml {
    pub region: Option<String>,
    /// Overrides the region-derived metadata endpoint
    pub token_url: Option<String>,
    /// Overrides the region-derived synthesis endpoint
    pub tts_url: Option<String>,
    pub request_timeout_seconds: Option<u64>,
    pub token_cache: Option<bool>,
}

/// Default synthesis parameters from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TtsYaml {
    /// "post" or "get"
    pub transport: Option<String>,
    pub voice: Option<String>,
    pub volume: Option<u32>,
    pub speech_rate: Option<i32>,
    pub pitch_rate: Option<i32>,
}

/// Security configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SecurityYaml {
    /// CORS allowed origins (comma-separated list or "*" for all)
    pub cors_allowed_origins: Option<String>,
    /// Maximum requests per second per IP address
    pub rate_limit_requests_per_second: Option<u32>,
    /// Maximum burst size for rate limiting
    pub rate_limit_burst_size: Option<u32>,
}

impl YamlConfig {
    /// Load configuration from a YAML file
    ///
    /// # Errors
    /// Returns an error if:
    /// - The file cannot be read
    /// - The YAML is malformed
    /// - Required fields have invalid types
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {}: {e}", path.display()))?;

        let config: YamlConfig = serde_yaml::from_str(&contents)
            .map_err(|e| format!("Failed to parse YAML config: {e}"))?;

        Ok(config)
    }
}
