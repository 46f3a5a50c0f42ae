//! Speech synthesis against the NLS streaming gateway.
//!
//! The gateway returns MP3 audio for a token-authorized request. Two request
//! shapes are supported:
//! - **POST** (default): JSON body with the full option set
//! - **GET**: every parameter in the query string, text percent-encoded
//!
//! The audio body is never buffered: the returned [`AudioStream`] yields
//! chunks as the provider produces them.

use std::fmt;
use std::pin::Pin;
use std::time::Duration;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use reqwest::{Client, StatusCode, header::CONTENT_TYPE};
use serde::Serialize;
use tracing::{debug, error};
use url::Url;

use super::config::{
    AUDIO_FORMAT, DEFAULT_SAMPLE_RATE, MAX_TEXT_CHARS, NlsConfig, SynthesisOptions, Transport,
};
use super::error::{NlsError, NlsResult};
use super::signing::percent_encode;
use super::token::AccessToken;
use crate::utils::{mask_secret, validate_endpoint_url};

/// Incrementally produced audio bytes.
pub type AudioStream = Pin<Box<dyn Stream<Item = NlsResult<Bytes>> + Send>>;

/// Validate and truncate caller text.
///
/// Empty or whitespace-only text is rejected. Longer text is cut to the first
/// [`MAX_TEXT_CHARS`] characters without error.
pub fn prepare_text(text: &str) -> NlsResult<String> {
    if text.trim().is_empty() {
        return Err(NlsError::InvalidInput("Text cannot be empty".to_string()));
    }
    Ok(text.chars().take(MAX_TEXT_CHARS).collect())
}

/// Body of a POST synthesis call; also the source of GET query pairs.
#[derive(Clone, Serialize, PartialEq, Eq)]
pub struct SynthesisRequest {
    pub appkey: String,
    pub token: String,
    pub text: String,
    pub format: &'static str,
    pub sample_rate: u32,
    pub volume: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speech_rate: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pitch_rate: Option<i32>,
}

impl SynthesisRequest {
    pub fn new(
        app_key: &str,
        token: &AccessToken,
        text: &str,
        options: &SynthesisOptions,
    ) -> NlsResult<Self> {
        options.validate()?;
        Ok(Self {
            appkey: app_key.to_string(),
            token: token.id().to_string(),
            text: prepare_text(text)?,
            format: AUDIO_FORMAT,
            sample_rate: DEFAULT_SAMPLE_RATE,
            volume: options.effective_volume(),
            voice: options.voice.clone(),
            speech_rate: options.speech_rate,
            pitch_rate: options.pitch_rate,
        })
    }

    /// `key=value` pairs in a stable order for the GET transport.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("appkey", self.appkey.clone()),
            ("token", self.token.clone()),
            ("text", self.text.clone()),
            ("format", self.format.to_string()),
            ("sample_rate", self.sample_rate.to_string()),
            ("volume", self.volume.to_string()),
        ];
        if let Some(voice) = &self.voice {
            pairs.push(("voice", voice.clone()));
        }
        if let Some(rate) = self.speech_rate {
            pairs.push(("speech_rate", rate.to_string()));
        }
        if let Some(rate) = self.pitch_rate {
            pairs.push(("pitch_rate", rate.to_string()));
        }
        pairs
    }

    /// Query string with every value percent-encoded.
    pub fn query_string(&self) -> String {
        self.query_pairs()
            .iter()
            .map(|(k, v)| format!("{k}={}", percent_encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }
}

impl fmt::Debug for SynthesisRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SynthesisRequest")
            .field("appkey", &mask_secret(&self.appkey))
            .field("token", &mask_secret(&self.token))
            .field("text_chars", &self.text.chars().count())
            .field("format", &self.format)
            .field("sample_rate", &self.sample_rate)
            .field("volume", &self.volume)
            .field("voice", &self.voice)
            .field("speech_rate", &self.speech_rate)
            .field("pitch_rate", &self.pitch_rate)
            .finish()
    }
}

/// Issues synthesis calls and hands back the audio body as a stream.
pub struct SpeechSynthesizer {
    client: Client,
    app_key: String,
    tts_url: Url,
    transport: Transport,
    timeout: Duration,
}

impl SpeechSynthesizer {
    pub fn new(config: &NlsConfig, client: Client) -> NlsResult<Self> {
        let tts_url = validate_endpoint_url(&config.tts_url)
            .map_err(|e| NlsError::Configuration(format!("Invalid TTS URL: {e}")))?;

        Ok(Self {
            client,
            app_key: config.credentials.app_key().to_string(),
            tts_url,
            transport: config.transport,
            timeout: config.request_timeout,
        })
    }

    /// Build the outbound HTTP request for the configured transport.
    pub(crate) fn build_http_request(
        &self,
        request: &SynthesisRequest,
    ) -> reqwest::RequestBuilder {
        match self.transport {
            Transport::Post => self.client.post(self.tts_url.clone()).json(request),
            Transport::Get => {
                let mut url = self.tts_url.clone();
                url.set_query(Some(&request.query_string()));
                self.client.get(url)
            }
        }
    }

    /// Request audio for `text`.
    ///
    /// The timeout bounds the wait for response headers only; once the
    /// provider starts answering, the body streams for as long as it takes.
    pub async fn synthesize(
        &self,
        text: &str,
        token: &AccessToken,
        options: &SynthesisOptions,
    ) -> NlsResult<AudioStream> {
        let request = SynthesisRequest::new(&self.app_key, token, text, options)?;

        debug!(
            transport = %self.transport,
            request = ?request,
            "Requesting speech synthesis"
        );

        let response = tokio::time::timeout(self.timeout, self.build_http_request(&request).send())
            .await
            .map_err(|_| {
                NlsError::Timeout(format!(
                    "Synthesis request exceeded {}ms",
                    self.timeout.as_millis()
                ))
            })?
            .map_err(|e| NlsError::from_reqwest("Synthesis request failed", e))?;

        let status = response.status();
        // The gateway reports some failures in-band as a JSON body with status 200.
        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("application/json"));

        if status != StatusCode::OK || is_json {
            let mut body = tokio::time::timeout(self.timeout, response.text())
                .await
                .ok()
                .and_then(Result::ok)
                .unwrap_or_default();
            // Provider error bodies may echo the token back.
            if !token.id().is_empty() {
                body = body.replace(token.id(), &mask_secret(token.id()));
            }
            error!(status = %status, body = %body, "NLS synthesis endpoint returned error");
            return Err(NlsError::SynthesisFailed {
                status: status.as_u16(),
                body,
            });
        }

        debug!(
            content_length = ?response.content_length(),
            "Streaming synthesized audio"
        );

        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| NlsError::from_reqwest("Failed to read audio stream", e)));

        Ok(Box::pin(stream))
    }
}
