//! Error types for the NLS token and synthesis calls.

/// Result type for NLS operations.
pub type NlsResult<T> = Result<T, NlsError>;

/// Errors surfaced by the token provider, the synthesizer and the speech service.
///
/// Variants carrying a provider `body` hold the raw response text. Bodies never
/// contain our own secrets, so they are safe to log; the access key secret and
/// the issued token must never be formatted into any of these messages.
#[derive(Debug, Clone, thiserror::Error)]
pub enum NlsError {
    /// The token endpoint answered with a non-200 status.
    #[error("Token request failed with status {status}: {body}")]
    TokenRequestFailed { status: u16, body: String },

    /// The token endpoint answered 200 but the body had no usable `Token.Id`.
    #[error("Invalid token response: {0}")]
    InvalidTokenResponse(String),

    /// The synthesis endpoint answered with a non-200 status or an in-band error.
    #[error("Speech synthesis failed with status {status}: {body}")]
    SynthesisFailed { status: u16, body: String },

    /// Caller supplied text or options the provider would reject.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Connection, TLS or body-read failure on an outbound call.
    #[error("Network error: {0}")]
    Network(String),

    /// An outbound call did not complete within the configured timeout.
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Local misconfiguration (bad endpoint URL, HTTP client construction).
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl NlsError {
    /// Whether a failed token fetch may be retried once.
    ///
    /// Only transport-level failures qualify; a provider status error is final.
    pub fn is_transient(&self) -> bool {
        matches!(self, NlsError::Network(_) | NlsError::Timeout(_))
    }

    /// Whether the failure was caused by the caller rather than the provider.
    pub fn is_client_error(&self) -> bool {
        matches!(self, NlsError::InvalidInput(_))
    }

    /// Classify a reqwest failure into `Timeout` or `Network`.
    ///
    /// The request URL is stripped first: GET synthesis carries the token in
    /// its query string.
    pub(crate) fn from_reqwest(context: &str, err: reqwest::Error) -> Self {
        let err = err.without_url();
        if err.is_timeout() {
            NlsError::Timeout(format!("{context}: {err}"))
        } else {
            NlsError::Network(format!("{context}: {err}"))
        }
    }
}
