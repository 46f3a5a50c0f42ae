//! Text-to-speech streaming endpoint.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Query, State, rejection::QueryRejection},
    http::header,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::info;

use crate::core::nls::SynthesisOptions;
use crate::core::nls::config::AUDIO_CONTENT_TYPE;
use crate::errors::{AppError, AppResult};
use crate::state::AppState;

/// Query parameters for `GET /speak`
///
/// Only `text` is required; the rest override the configured defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SpeakQuery {
    pub text: String,
    pub voice: Option<String>,
    pub volume: Option<u32>,
    pub speech_rate: Option<i32>,
    pub pitch_rate: Option<i32>,
}

impl SpeakQuery {
    pub fn overrides(&self) -> SynthesisOptions {
        SynthesisOptions {
            voice: self.voice.clone(),
            volume: self.volume,
            speech_rate: self.speech_rate,
            pitch_rate: self.pitch_rate,
        }
    }
}

/// Synthesize `text` and stream the MP3 audio back as it arrives.
///
/// Dropping the response body (client disconnect) drops the upstream stream.
pub async fn speak_handler(
    State(state): State<Arc<AppState>>,
    query: Result<Query<SpeakQuery>, QueryRejection>,
) -> AppResult<Response> {
    let Query(query) = query.map_err(|e| AppError::BadRequest(e.body_text()))?;

    info!(
        text_chars = query.text.chars().count(),
        voice = ?query.voice,
        "Speak request received"
    );

    let audio = state
        .speech
        .synthesize(&query.text, &query.overrides())
        .await?;

    Ok((
        [(header::CONTENT_TYPE, AUDIO_CONTENT_TYPE)],
        Body::from_stream(audio),
    )
        .into_response())
}
