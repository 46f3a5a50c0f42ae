use super::ServerConfig;
use super::merge::merge_config;

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// Reads configuration from environment variables, with defaults for
    /// everything except the three credentials. Also loads from .env file if
    /// present using dotenvy.
    ///
    /// # Errors
    /// Returns an error if:
    /// - `ACCESS_KEY_ID`, `ACCESS_KEY_SECRET` or `APP_KEY` is missing
    /// - A variable is malformed (e.g. non-numeric `PORT`)
    /// - Endpoint URLs, TLS paths or TTS defaults fail validation
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        // Load .env file if it exists
        let _ = dotenvy::dotenv();

        merge_config(None)
    }
}
