//! Token acquisition and synthesis combined behind one call.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use reqwest::Client;
use tracing::{info, warn};

use super::config::{NlsConfig, SynthesisOptions};
use super::error::{NlsError, NlsResult};
use super::synthesizer::{AudioStream, SpeechSynthesizer, prepare_text};
use super::token::{TokenProvider, TokenSource};

const CONNECT_TIMEOUT_SECS: u64 = 5;
const POOL_IDLE_TIMEOUT_SECS: u64 = 90;
const USER_AGENT: &str = concat!("nls-tts-proxy/", env!("CARGO_PKG_VERSION"));

/// Shared HTTP client for both provider endpoints.
///
/// No overall request timeout is set on the client: the audio body may
/// stream for longer than the configured bound, which applies per call.
pub fn build_http_client() -> NlsResult<Client> {
    Client::builder()
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .pool_max_idle_per_host(4)
        .pool_idle_timeout(Duration::from_secs(POOL_IDLE_TIMEOUT_SECS))
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| NlsError::Configuration(format!("Failed to create HTTP client: {e}")))
}

/// Text in, audio stream out.
///
/// Each call obtains a token, then starts synthesis with it. A failed token
/// call means the synthesis endpoint is never contacted.
pub struct SpeechService {
    tokens: Arc<dyn TokenSource>,
    synthesizer: SpeechSynthesizer,
    defaults: SynthesisOptions,
    request_counter: AtomicU64,
}

impl SpeechService {
    pub fn new(config: &NlsConfig) -> NlsResult<Self> {
        let client = build_http_client()?;
        let tokens = Arc::new(TokenProvider::new(config, client.clone())?);
        Self::build(config, tokens, client)
    }

    /// Use a caller-supplied token source instead of the signed `CreateToken` call.
    pub fn with_token_source(config: &NlsConfig, tokens: Arc<dyn TokenSource>) -> NlsResult<Self> {
        Self::build(config, tokens, build_http_client()?)
    }

    fn build(config: &NlsConfig, tokens: Arc<dyn TokenSource>, client: Client) -> NlsResult<Self> {
        config.defaults.validate().map_err(|e| {
            NlsError::Configuration(format!("Invalid default synthesis options: {e}"))
        })?;

        Ok(Self {
            tokens,
            synthesizer: SpeechSynthesizer::new(config, client)?,
            defaults: config.defaults.clone(),
            request_counter: AtomicU64::new(0),
        })
    }

    pub fn defaults(&self) -> &SynthesisOptions {
        &self.defaults
    }

    /// Synthesize `text`, with `overrides` layered over the configured defaults.
    ///
    /// Input is validated before any network call.
    pub async fn synthesize(
        &self,
        text: &str,
        overrides: &SynthesisOptions,
    ) -> NlsResult<AudioStream> {
        let request_id = self.request_counter.fetch_add(1, Ordering::Relaxed) + 1;

        prepare_text(text)?;
        let options = self.defaults.overlay(overrides);
        options.validate()?;

        info!(
            request_id,
            text_chars = text.chars().count(),
            voice = ?options.voice,
            "Starting speech synthesis"
        );

        let token = self.tokens.token().await.inspect_err(|e| {
            warn!(request_id, error = %e, "Token acquisition failed");
        })?;

        self.synthesizer
            .synthesize(text, &token, &options)
            .await
            .inspect_err(|e| {
                warn!(request_id, error = %e, "Speech synthesis failed");
            })
    }
}
