use std::env;
use std::fmt::Display;
use std::str::FromStr;

use super::ServerConfig;
use super::utils::parse_flag;
use super::validation::{
    validate_endpoints, validate_rate_limit, validate_required, validate_tls,
    validate_tts_defaults,
};
use super::yaml::YamlConfig;
use crate::core::nls::config::{
    DEFAULT_REGION, DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_VOLUME, token_url_for_region,
    tts_url_for_region,
};
use crate::core::nls::{SynthesisOptions, Transport};

/// Parse an optional environment variable, reporting malformed values by name.
fn env_parse<T>(name: &str) -> Result<Option<T>, String>
where
    T: FromStr,
    T::Err: Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| format!("Invalid {name} environment variable '{raw}': {e}")),
        Err(_) => Ok(None),
    }
}

fn env_bool(name: &str) -> Result<Option<bool>, String> {
    match env::var(name) {
        Ok(raw) => parse_flag(name, &raw).map(Some),
        Err(_) => Ok(None),
    }
}

/// Merge YAML configuration with environment variables
///
/// Priority order (highest to lowest):
/// 1. YAML configuration values
/// 2. Environment variables
/// 3. Default values
///
/// The merged configuration is validated before it is returned.
pub fn merge_config(
    yaml_config: Option<YamlConfig>,
) -> Result<ServerConfig, Box<dyn std::error::Error>> {
    let yaml = yaml_config.unwrap_or_default();

    // Helper macro to get value with priority: YAML > ENV > Default
    macro_rules! get_value {
        ($env_var:expr, $yaml_value:expr, $default:expr) => {
            $yaml_value
                .or_else(|| env::var($env_var).ok())
                .unwrap_or_else(|| $default.to_string())
        };
    }

    // Helper macro for optional values: YAML > ENV
    macro_rules! get_optional {
        ($env_var:expr, $yaml_value:expr) => {
            $yaml_value.or_else(|| env::var($env_var).ok())
        };
    }

    // Helper macro for typed values: YAML > parsed ENV
    macro_rules! get_parsed {
        ($env_var:expr, $yaml_value:expr) => {
            match $yaml_value {
                Some(v) => Some(v),
                None => env_parse($env_var)?,
            }
        };
    }

    // Server configuration
    let host = get_value!(
        "HOST",
        yaml.server.as_ref().and_then(|s| s.host.clone()),
        "0.0.0.0"
    );
    let port: u16 = get_parsed!("PORT", yaml.server.as_ref().and_then(|s| s.port)).unwrap_or(8000);

    let tls_yaml = yaml.server.as_ref().and_then(|s| s.tls.as_ref());
    let tls = validate_tls(
        get_optional!(
            "TLS_CERT_PATH",
            tls_yaml.and_then(|t| t.cert_path.clone())
        ),
        get_optional!("TLS_KEY_PATH", tls_yaml.and_then(|t| t.key_path.clone())),
    )?;

    // Credentials (required)
    let credentials = yaml.credentials.as_ref();
    let access_key_id = validate_required(
        "ACCESS_KEY_ID",
        get_optional!(
            "ACCESS_KEY_ID",
            credentials.and_then(|c| c.access_key_id.clone())
        ),
    )?;
    let access_key_secret = validate_required(
        "ACCESS_KEY_SECRET",
        get_optional!(
            "ACCESS_KEY_SECRET",
            credentials.and_then(|c| c.access_key_secret.clone())
        ),
    )?;
    let app_key = validate_required(
        "APP_KEY",
        get_optional!("APP_KEY", credentials.and_then(|c| c.app_key.clone())),
    )?;

    // Provider endpoints
    let nls = yaml.nls.as_ref();
    let nls_region = get_value!(
        "NLS_REGION",
        nls.and_then(|n| n.region.clone()),
        DEFAULT_REGION
    );
    let nls_token_url = get_optional!("NLS_TOKEN_URL", nls.and_then(|n| n.token_url.clone()))
        .unwrap_or_else(|| token_url_for_region(&nls_region));
    let nls_tts_url = get_optional!("NLS_TTS_URL", nls.and_then(|n| n.tts_url.clone()))
        .unwrap_or_else(|| tts_url_for_region(&nls_region));
    validate_endpoints(&nls_token_url, &nls_tts_url)?;

    let request_timeout_seconds: u64 = get_parsed!(
        "NLS_REQUEST_TIMEOUT_SECONDS",
        nls.and_then(|n| n.request_timeout_seconds)
    )
    .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);
    if request_timeout_seconds == 0 {
        return Err("NLS_REQUEST_TIMEOUT_SECONDS must be greater than 0".into());
    }

    let token_cache = match nls.and_then(|n| n.token_cache) {
        Some(v) => v,
        None => env_bool("NLS_TOKEN_CACHE")?.unwrap_or(true),
    };

    // Synthesis defaults
    let tts = yaml.tts.as_ref();
    let tts_transport = match get_optional!("TTS_TRANSPORT", tts.and_then(|t| t.transport.clone()))
    {
        Some(raw) => raw.parse::<Transport>()?,
        None => Transport::default(),
    };
    let tts_defaults = SynthesisOptions {
        voice: get_optional!("TTS_VOICE", tts.and_then(|t| t.voice.clone())),
        volume: Some(
            get_parsed!("TTS_VOLUME", tts.and_then(|t| t.volume)).unwrap_or(DEFAULT_VOLUME),
        ),
        speech_rate: get_parsed!("TTS_SPEECH_RATE", tts.and_then(|t| t.speech_rate)),
        pitch_rate: get_parsed!("TTS_PITCH_RATE", tts.and_then(|t| t.pitch_rate)),
    };
    validate_tts_defaults(&tts_defaults)?;

    // Security configuration
    let security = yaml.security.as_ref();
    let cors_allowed_origins = get_optional!(
        "CORS_ALLOWED_ORIGINS",
        security.and_then(|s| s.cors_allowed_origins.clone())
    );
    let rate_limit_requests_per_second: u32 = get_parsed!(
        "RATE_LIMIT_REQUESTS_PER_SECOND",
        security.and_then(|s| s.rate_limit_requests_per_second)
    )
    .unwrap_or(60);
    let rate_limit_burst_size: u32 = get_parsed!(
        "RATE_LIMIT_BURST_SIZE",
        security.and_then(|s| s.rate_limit_burst_size)
    )
    .unwrap_or(10);
    validate_rate_limit(rate_limit_requests_per_second, rate_limit_burst_size)?;

    Ok(ServerConfig {
        host,
        port,
        tls,
        access_key_id,
        access_key_secret,
        app_key,
        nls_region,
        nls_token_url,
        nls_tts_url,
        request_timeout_seconds,
        token_cache,
        tts_transport,
        tts_defaults,
        cors_allowed_origins,
        rate_limit_requests_per_second,
        rate_limit_burst_size,
    })
}
