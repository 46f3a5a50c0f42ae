//! NLS provider configuration.
//!
//! Constants pinned to the provider's published contract, the credentials
//! value object and the per-request synthesis options.
//!
//! # References
//!
//! - [CreateToken (RPC, version 2019-02-28)](https://help.aliyun.com/document_detail/113251.html)
//! - [RESTful TTS API](https://help.aliyun.com/document_detail/94737.html)

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::error::{NlsError, NlsResult};
use crate::utils::mask_secret;

// =============================================================================
// Constants
// =============================================================================

/// Region hosting both the token and the gateway endpoints.
pub const DEFAULT_REGION: &str = "cn-shanghai";

/// Token issuance endpoint (signed GET, RPC style).
pub const DEFAULT_TOKEN_URL: &str = "https://nls-meta.cn-shanghai.aliyuncs.com/";

/// Streaming speech synthesis endpoint.
pub const DEFAULT_TTS_URL: &str = "https://nls-gateway.cn-shanghai.aliyuncs.com/stream/v1/tts";

/// RPC action that issues an NLS access token.
pub const TOKEN_ACTION: &str = "CreateToken";

/// API version accepted by the `nls-meta` CreateToken action.
///
/// Pinned; the token endpoint rejects other version strings.
pub const TOKEN_API_VERSION: &str = "2019-02-28";

/// Only signature scheme the RPC gateway supports for this call.
pub const SIGNATURE_METHOD: &str = "HMAC-SHA1";

/// Version of the signature scheme.
pub const SIGNATURE_VERSION: &str = "1.0";

/// Longest text forwarded to the synthesis endpoint, in characters.
pub const MAX_TEXT_CHARS: usize = 100;

/// Audio container requested from the provider.
pub const AUDIO_FORMAT: &str = "mp3";

/// Content type of the relayed audio.
pub const AUDIO_CONTENT_TYPE: &str = "audio/mpeg";

/// Sample rate requested from the provider (Hz).
pub const DEFAULT_SAMPLE_RATE: u32 = 16000;

/// Default output volume (0-100).
pub const DEFAULT_VOLUME: u32 = 50;

/// Default bound for each outbound call.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Token endpoint for a region.
pub fn token_url_for_region(region: &str) -> String {
    format!("https://nls-meta.{region}.aliyuncs.com/")
}

/// Synthesis endpoint for a region.
pub fn tts_url_for_region(region: &str) -> String {
    format!("https://nls-gateway.{region}.aliyuncs.com/stream/v1/tts")
}

// =============================================================================
// Credentials
// =============================================================================

/// Account credentials used to sign token requests and address the project.
///
/// Immutable once built. Secret fields are wiped on drop and masked in `Debug`.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Credentials {
    access_key_id: String,
    access_key_secret: String,
    app_key: String,
}

impl Credentials {
    /// Build credentials, rejecting empty fields.
    pub fn new(
        access_key_id: impl Into<String>,
        access_key_secret: impl Into<String>,
        app_key: impl Into<String>,
    ) -> NlsResult<Self> {
        let credentials = Self {
            access_key_id: access_key_id.into(),
            access_key_secret: access_key_secret.into(),
            app_key: app_key.into(),
        };

        for (name, value) in [
            ("access key id", &credentials.access_key_id),
            ("access key secret", &credentials.access_key_secret),
            ("app key", &credentials.app_key),
        ] {
            if value.trim().is_empty() {
                return Err(NlsError::Configuration(format!("{name} must not be empty")));
            }
        }

        Ok(credentials)
    }

    pub fn access_key_id(&self) -> &str {
        &self.access_key_id
    }

    pub fn access_key_secret(&self) -> &str {
        &self.access_key_secret
    }

    pub fn app_key(&self) -> &str {
        &self.app_key
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("access_key_secret", &mask_secret(&self.access_key_secret))
            .field("app_key", &mask_secret(&self.app_key))
            .finish()
    }
}

// =============================================================================
// Transport
// =============================================================================

/// Request shape used for the synthesis call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    /// JSON body; carries the full option set and has no URL length limit.
    #[default]
    Post,
    /// Everything in the query string, text percent-encoded.
    Get,
}

impl Transport {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Post => "post",
            Self::Get => "get",
        }
    }
}

impl FromStr for Transport {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "post" => Ok(Self::Post),
            "get" => Ok(Self::Get),
            other => Err(format!(
                "Invalid TTS transport '{other}'. Must be 'post' or 'get'"
            )),
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Synthesis options
// =============================================================================

/// Tuning parameters for a synthesis call.
///
/// Every field is optional so that per-request overrides can be layered on
/// top of the configured defaults with [`SynthesisOptions::overlay`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisOptions {
    /// Speaker name, e.g. `xiaoyun`.
    pub voice: Option<String>,
    /// 0-100, provider default 50.
    pub volume: Option<u32>,
    /// -500 to 500, 0 is normal speed.
    pub speech_rate: Option<i32>,
    /// -500 to 500, 0 is normal pitch.
    pub pitch_rate: Option<i32>,
}

impl SynthesisOptions {
    /// Values from `overrides` win; unset fields fall back to `self`.
    pub fn overlay(&self, overrides: &SynthesisOptions) -> SynthesisOptions {
        SynthesisOptions {
            voice: overrides.voice.clone().or_else(|| self.voice.clone()),
            volume: overrides.volume.or(self.volume),
            speech_rate: overrides.speech_rate.or(self.speech_rate),
            pitch_rate: overrides.pitch_rate.or(self.pitch_rate),
        }
    }

    /// Volume sent to the provider.
    pub fn effective_volume(&self) -> u32 {
        self.volume.unwrap_or(DEFAULT_VOLUME)
    }

    pub fn validate(&self) -> NlsResult<()> {
        if let Some(voice) = &self.voice
            && voice.trim().is_empty()
        {
            return Err(NlsError::InvalidInput("Voice must not be empty".to_string()));
        }

        if let Some(volume) = self.volume
            && volume > 100
        {
            return Err(NlsError::InvalidInput(format!(
                "Volume must be between 0 and 100, got {volume}"
            )));
        }

        for (name, value) in [
            ("Speech rate", self.speech_rate),
            ("Pitch rate", self.pitch_rate),
        ] {
            if let Some(rate) = value
                && !(-500..=500).contains(&rate)
            {
                return Err(NlsError::InvalidInput(format!(
                    "{name} must be between -500 and 500, got {rate}"
                )));
            }
        }

        Ok(())
    }
}

// =============================================================================
// Provider configuration
// =============================================================================

/// Everything the token provider and synthesizer need, built once at startup.
#[derive(Debug, Clone)]
pub struct NlsConfig {
    pub credentials: Credentials,
    pub region: String,
    pub token_url: String,
    pub tts_url: String,
    /// Bound applied to each outbound call.
    pub request_timeout: Duration,
    /// Reuse issued tokens until shortly before they expire.
    pub token_cache: bool,
    pub transport: Transport,
    /// Defaults applied under per-request overrides.
    pub defaults: SynthesisOptions,
}

impl NlsConfig {
    /// Configuration for the default region with default endpoints.
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            region: DEFAULT_REGION.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            tts_url: DEFAULT_TTS_URL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            token_cache: true,
            transport: Transport::default(),
            defaults: SynthesisOptions {
                volume: Some(DEFAULT_VOLUME),
                ..Default::default()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials() -> Credentials {
        Credentials::new("LTAI-test-id", "super-secret-value", "app-key-123").unwrap()
    }

    #[test]
    fn test_credentials_reject_empty_fields() {
        assert!(Credentials::new("", "secret", "app").is_err());
        assert!(Credentials::new("id", "  ", "app").is_err());
        assert!(Credentials::new("id", "secret", "").is_err());
        assert!(Credentials::new("id", "secret", "app").is_ok());
    }

    #[test]
    fn test_credentials_debug_masks_secret() {
        let debug = format!("{:?}", credentials());
        assert!(debug.contains("LTAI-test-id"));
        assert!(!debug.contains("super-secret-value"));
        assert!(!debug.contains("app-key-123"));
        assert!(debug.contains("supe"));
    }

    #[test]
    fn test_region_urls() {
        assert_eq!(token_url_for_region(DEFAULT_REGION), DEFAULT_TOKEN_URL);
        assert_eq!(tts_url_for_region(DEFAULT_REGION), DEFAULT_TTS_URL);
        assert_eq!(
            tts_url_for_region("cn-beijing"),
            "https://nls-gateway.cn-beijing.aliyuncs.com/stream/v1/tts"
        );
    }

    #[test]
    fn test_transport_from_str() {
        assert_eq!("post".parse::<Transport>().unwrap(), Transport::Post);
        assert_eq!("GET".parse::<Transport>().unwrap(), Transport::Get);
        assert_eq!(" Post ".parse::<Transport>().unwrap(), Transport::Post);
        assert!("put".parse::<Transport>().is_err());
        assert_eq!(Transport::default(), Transport::Post);
    }

    #[test]
    fn test_options_overlay() {
        let defaults = SynthesisOptions {
            voice: Some("xiaoyun".to_string()),
            volume: Some(50),
            speech_rate: Some(0),
            pitch_rate: None,
        };
        let overrides = SynthesisOptions {
            voice: Some("aixia".to_string()),
            pitch_rate: Some(-100),
            ..Default::default()
        };

        let merged = defaults.overlay(&overrides);
        assert_eq!(merged.voice.as_deref(), Some("aixia"));
        assert_eq!(merged.volume, Some(50));
        assert_eq!(merged.speech_rate, Some(0));
        assert_eq!(merged.pitch_rate, Some(-100));
    }

    #[test]
    fn test_options_validate_ranges() {
        let mut options = SynthesisOptions::default();
        assert!(options.validate().is_ok());
        assert_eq!(options.effective_volume(), DEFAULT_VOLUME);

        options.volume = Some(101);
        assert!(matches!(options.validate(), Err(NlsError::InvalidInput(_))));

        options.volume = Some(100);
        options.speech_rate = Some(-501);
        assert!(options.validate().is_err());

        options.speech_rate = Some(500);
        options.pitch_rate = Some(501);
        assert!(options.validate().is_err());

        options.pitch_rate = Some(-500);
        assert!(options.validate().is_ok());

        options.voice = Some(String::new());
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_nls_config_defaults() {
        let config = NlsConfig::new(credentials());
        assert_eq!(config.region, "cn-shanghai");
        assert_eq!(config.token_url, DEFAULT_TOKEN_URL);
        assert_eq!(config.tts_url, DEFAULT_TTS_URL);
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert!(config.token_cache);
        assert_eq!(config.transport, Transport::Post);
        assert_eq!(config.defaults.volume, Some(50));
    }
}
