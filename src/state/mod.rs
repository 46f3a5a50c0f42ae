use std::sync::Arc;

use crate::config::ServerConfig;
use crate::core::nls::{NlsResult, SpeechService};

/// Application state that can be shared across handlers
pub struct AppState {
    pub config: ServerConfig,
    /// Token acquisition and synthesis against the NLS service
    pub speech: Arc<SpeechService>,
}

impl AppState {
    /// Build the shared state, including the pooled HTTP client.
    pub fn new(config: ServerConfig) -> NlsResult<Arc<Self>> {
        let speech = Arc::new(SpeechService::new(&config.nls_config()?)?);
        Ok(Self::with_speech_service(config, speech))
    }

    pub fn with_speech_service(config: ServerConfig, speech: Arc<SpeechService>) -> Arc<Self> {
        Arc::new(Self { config, speech })
    }
}
