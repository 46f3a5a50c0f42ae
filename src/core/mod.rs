pub mod nls;

// Re-export commonly used types for convenience
pub use nls::{
    AccessToken, AudioStream, Credentials, NlsConfig, NlsError, NlsResult, SpeechService,
    SynthesisOptions, TokenSource, Transport,
};
