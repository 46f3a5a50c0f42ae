//! Access token acquisition.
//!
//! The synthesis gateway authorizes calls with a short-lived token issued by
//! the `nls-meta` RPC endpoint:
//! 1. A `CreateToken` parameter set is built with a fresh nonce and timestamp
//! 2. The parameters are signed (see [`super::signing`]) and sent as a GET query
//! 3. `Token.Id` and `Token.ExpireTime` are read from the JSON response
//!
//! Tokens can optionally be cached until shortly before `ExpireTime`.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use http::Method;
use moka::future::Cache;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use time::format_description::well_known::Rfc3339;
use time::{OffsetDateTime, UtcOffset};
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

use super::config::{
    Credentials, NlsConfig, SIGNATURE_METHOD, SIGNATURE_VERSION, TOKEN_ACTION, TOKEN_API_VERSION,
};
use super::error::{NlsError, NlsResult};
use super::signing::SignedRequest;
use crate::utils::{mask_secret, validate_endpoint_url};

/// Cached tokens are refreshed this long before the provider's expiry.
pub const TOKEN_REFRESH_MARGIN_SECS: i64 = 300;

/// Upper bound on distinct credential sets held in the token cache.
const TOKEN_CACHE_CAPACITY: u64 = 64;

// =============================================================================
// Token
// =============================================================================

/// A bearer token for the synthesis gateway.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    id: String,
    /// Unix seconds, as reported by the provider.
    expire_time: Option<i64>,
}

impl AccessToken {
    pub fn new(id: impl Into<String>, expire_time: Option<i64>) -> Self {
        Self {
            id: id.into(),
            expire_time,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn expire_time(&self) -> Option<i64> {
        self.expire_time
    }

    /// Whether the token can still be handed out at `now` (unix seconds).
    ///
    /// Tokens without a reported expiry are never considered fresh, so they
    /// are used once and not cached.
    pub fn is_fresh_at(&self, now: i64) -> bool {
        self.expire_time
            .is_some_and(|expires| expires - TOKEN_REFRESH_MARGIN_SECS > now)
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("id", &mask_secret(&self.id))
            .field("expire_time", &self.expire_time)
            .finish()
    }
}

/// Source of access tokens for the speech service.
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Return a token valid for at least one synthesis call.
    async fn token(&self) -> NlsResult<AccessToken>;
}

// =============================================================================
// Response parsing
// =============================================================================

#[derive(Debug, Deserialize)]
struct CreateTokenResponse {
    #[serde(rename = "Token")]
    token: Option<TokenBody>,
}

#[derive(Debug, Deserialize)]
struct TokenBody {
    #[serde(rename = "Id")]
    id: Option<String>,
    #[serde(rename = "ExpireTime")]
    expire_time: Option<i64>,
}

/// Extract the token from a 200 response body.
pub(crate) fn parse_token_response(body: &str) -> NlsResult<AccessToken> {
    let response: CreateTokenResponse = serde_json::from_str(body)
        .map_err(|e| NlsError::InvalidTokenResponse(format!("Malformed JSON: {e}")))?;

    let token = response
        .token
        .ok_or_else(|| NlsError::InvalidTokenResponse("Missing Token object".to_string()))?;

    match token.id {
        Some(id) if !id.trim().is_empty() => Ok(AccessToken::new(id, token.expire_time)),
        _ => Err(NlsError::InvalidTokenResponse(
            "Missing or empty Token.Id".to_string(),
        )),
    }
}

/// UTC RFC 3339 timestamp with second precision, e.g. `2019-04-18T08:32:31Z`.
pub fn format_timestamp(at: OffsetDateTime) -> NlsResult<String> {
    at.to_offset(UtcOffset::UTC)
        .replace_nanosecond(0)
        .map_err(|e| NlsError::Configuration(format!("Invalid request timestamp: {e}")))?
        .format(&Rfc3339)
        .map_err(|e| NlsError::Configuration(format!("Failed to format request timestamp: {e}")))
}

// =============================================================================
// Token provider
// =============================================================================

/// Issues tokens by calling the signed `CreateToken` action.
pub struct TokenProvider {
    client: Client,
    credentials: Credentials,
    region: String,
    token_url: Url,
    timeout: Duration,
    cache: Option<Cache<String, AccessToken>>,
}

impl TokenProvider {
    pub fn new(config: &NlsConfig, client: Client) -> NlsResult<Self> {
        let token_url = validate_endpoint_url(&config.token_url)
            .map_err(|e| NlsError::Configuration(format!("Invalid token URL: {e}")))?;

        let cache = config
            .token_cache
            .then(|| Cache::builder().max_capacity(TOKEN_CACHE_CAPACITY).build());

        Ok(Self {
            client,
            credentials: config.credentials.clone(),
            region: config.region.clone(),
            token_url,
            timeout: config.request_timeout,
            cache,
        })
    }

    /// Parameter set for one `CreateToken` call.
    pub fn build_request(&self, timestamp: &str, nonce: &str) -> SignedRequest {
        SignedRequest::new()
            .param("AccessKeyId", self.credentials.access_key_id())
            .param("Action", TOKEN_ACTION)
            .param("AppKey", self.credentials.app_key())
            .param("Format", "JSON")
            .param("RegionId", &self.region)
            .param("SignatureMethod", SIGNATURE_METHOD)
            .param("SignatureNonce", nonce)
            .param("SignatureVersion", SIGNATURE_VERSION)
            .param("Timestamp", timestamp)
            .param("Version", TOKEN_API_VERSION)
    }

    /// Fully signed request URL with a fresh nonce and the current time.
    pub fn signed_url(&self) -> NlsResult<Url> {
        let timestamp = format_timestamp(OffsetDateTime::now_utc())?;
        let nonce = Uuid::new_v4().to_string();
        let query = self
            .build_request(&timestamp, &nonce)
            .sign(&Method::GET, self.credentials.access_key_secret())?;

        let mut url = self.token_url.clone();
        url.set_query(Some(&query));
        Ok(url)
    }

    /// One token exchange, bounded by the request timeout.
    pub async fn fetch_token(&self) -> NlsResult<AccessToken> {
        let url = self.signed_url()?;

        debug!(
            access_key_id = %self.credentials.access_key_id(),
            region = %self.region,
            "Requesting NLS access token"
        );

        let exchange = async {
            let response = self
                .client
                .get(url)
                .send()
                .await
                .map_err(|e| NlsError::from_reqwest("Token request failed", e))?;
            let status = response.status();
            let body = response
                .text()
                .await
                .map_err(|e| NlsError::from_reqwest("Failed to read token response", e))?;
            Ok::<_, NlsError>((status, body))
        };

        let (status, body) = tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| {
                NlsError::Timeout(format!(
                    "Token request exceeded {}ms",
                    self.timeout.as_millis()
                ))
            })??;

        if status != StatusCode::OK {
            warn!(status = %status, body = %body, "NLS token endpoint returned error");
            return Err(NlsError::TokenRequestFailed {
                status: status.as_u16(),
                body,
            });
        }

        let token = parse_token_response(&body)?;
        info!(
            token = %mask_secret(token.id()),
            expire_time = ?token.expire_time(),
            "NLS access token issued"
        );
        Ok(token)
    }

    /// Fetch with a single retry on transport failures.
    ///
    /// Provider status errors and malformed bodies are returned as-is.
    async fn fetch_with_retry(&self) -> NlsResult<AccessToken> {
        match self.fetch_token().await {
            Err(e) if e.is_transient() => {
                warn!(error = %e, "NLS token request failed, retrying once");
                self.fetch_token().await
            }
            result => result,
        }
    }

    fn cache_key(&self) -> String {
        format!(
            "{}:{}:{}",
            self.credentials.access_key_id(),
            self.credentials.app_key(),
            self.region
        )
    }
}

#[async_trait]
impl TokenSource for TokenProvider {
    async fn token(&self) -> NlsResult<AccessToken> {
        let Some(cache) = &self.cache else {
            return self.fetch_with_retry().await;
        };

        let key = self.cache_key();
        let now = OffsetDateTime::now_utc().unix_timestamp();

        if let Some(token) = cache.get(&key).await {
            if token.is_fresh_at(now) {
                debug!(token = %mask_secret(token.id()), "Using cached NLS token");
                return Ok(token);
            }
            cache.invalidate(&key).await;
        }

        let token = self.fetch_with_retry().await?;
        if token.is_fresh_at(now) {
            cache.insert(key, token.clone()).await;
        }
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeMap;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(token_url: &str) -> NlsConfig {
        let credentials =
            Credentials::new("test-access-key-id", "test-access-key-secret", "test-app-key")
                .unwrap();
        let mut config = NlsConfig::new(credentials);
        config.token_url = token_url.to_string();
        config.request_timeout = Duration::from_millis(500);
        config
    }

    fn provider(config: &NlsConfig) -> TokenProvider {
        TokenProvider::new(config, Client::new()).unwrap()
    }

    fn far_future() -> i64 {
        OffsetDateTime::now_utc().unix_timestamp() + 3600
    }

    #[test]
    fn test_format_timestamp() {
        let at = OffsetDateTime::from_unix_timestamp(1555576351).unwrap();
        assert_eq!(format_timestamp(at).unwrap(), "2019-04-18T08:32:31Z");

        let at = OffsetDateTime::from_unix_timestamp(1704423845)
            .unwrap()
            .to_offset(UtcOffset::from_hms(8, 0, 0).unwrap());
        assert_eq!(format_timestamp(at).unwrap(), "2024-01-05T03:04:05Z");
    }

    #[test]
    fn test_format_timestamp_drops_fraction() {
        let at = OffsetDateTime::from_unix_timestamp(1555576351).unwrap()
            + time::Duration::milliseconds(750);
        assert_eq!(format_timestamp(at).unwrap(), "2019-04-18T08:32:31Z");
    }

    #[test]
    fn test_parse_token_response_success() {
        let token =
            parse_token_response(r#"{"Token":{"Id":"tok-123","ExpireTime":1527592757}}"#).unwrap();
        assert_eq!(token.id(), "tok-123");
        assert_eq!(token.expire_time(), Some(1527592757));

        let token = parse_token_response(r#"{"Token":{"Id":"tok-123"}}"#).unwrap();
        assert_eq!(token.expire_time(), None);
    }

    #[test]
    fn test_parse_token_response_invalid() {
        for body in [
            "not json",
            "{}",
            r#"{"Token":{}}"#,
            r#"{"Token":{"Id":""}}"#,
            r#"{"Token":{"Id":42}}"#,
            r#"{"Code":"InvalidAccessKeyId.NotFound"}"#,
        ] {
            assert!(
                matches!(
                    parse_token_response(body),
                    Err(NlsError::InvalidTokenResponse(_))
                ),
                "{body} should be rejected"
            );
        }
    }

    #[test]
    fn test_access_token_freshness() {
        let now = 1_000_000;
        assert!(AccessToken::new("t", Some(now + 3600)).is_fresh_at(now));
        assert!(!AccessToken::new("t", Some(now + TOKEN_REFRESH_MARGIN_SECS)).is_fresh_at(now));
        assert!(!AccessToken::new("t", Some(now - 1)).is_fresh_at(now));
        assert!(!AccessToken::new("t", None).is_fresh_at(now));
    }

    #[test]
    fn test_access_token_debug_masks_id() {
        let token = AccessToken::new("0123456789abcdef0123", Some(1));
        let debug = format!("{token:?}");
        assert!(!debug.contains("0123456789abcdef0123"));
        assert!(debug.contains("0123..."));
    }

    #[test]
    fn test_build_request_params() {
        let config = test_config("https://nls-meta.cn-shanghai.aliyuncs.com/");
        let request = provider(&config).build_request("2019-04-18T08:32:31Z", "nonce-1");

        assert_eq!(request.get("AccessKeyId"), Some("test-access-key-id"));
        assert_eq!(request.get("Action"), Some("CreateToken"));
        assert_eq!(request.get("AppKey"), Some("test-app-key"));
        assert_eq!(request.get("Format"), Some("JSON"));
        assert_eq!(request.get("RegionId"), Some("cn-shanghai"));
        assert_eq!(request.get("SignatureMethod"), Some("HMAC-SHA1"));
        assert_eq!(request.get("SignatureNonce"), Some("nonce-1"));
        assert_eq!(request.get("SignatureVersion"), Some("1.0"));
        assert_eq!(request.get("Timestamp"), Some("2019-04-18T08:32:31Z"));
        assert_eq!(request.get("Version"), Some("2019-02-28"));
        assert_eq!(request.params().len(), 10);
    }

    #[test]
    fn test_signed_url_uses_fresh_nonce() {
        let config = test_config("https://nls-meta.cn-shanghai.aliyuncs.com/");
        let provider = provider(&config);

        let nonce = |url: &Url| {
            url.query_pairs()
                .find(|(k, _)| k == "SignatureNonce")
                .map(|(_, v)| v.into_owned())
                .unwrap()
        };

        let first = provider.signed_url().unwrap();
        let second = provider.signed_url().unwrap();
        assert_ne!(nonce(&first), nonce(&second));
        assert!(!first.as_str().contains("test-access-key-secret"));
    }

    #[test]
    fn test_rejects_invalid_token_url() {
        let config = test_config("ftp://example.com/");
        assert!(matches!(
            TokenProvider::new(&config, Client::new()),
            Err(NlsError::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn test_fetch_token_success_and_signature_verifies() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .and(query_param("Action", "CreateToken"))
            .and(query_param("AppKey", "test-app-key"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"Token": {"Id": "tok-123", "ExpireTime": 1527592757}})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let config = test_config(&format!("{}/", server.uri()));
        let token = provider(&config).fetch_token().await.unwrap();
        assert_eq!(token.id(), "tok-123");

        // Recompute the signature server-side from the received parameters.
        let requests = server.received_requests().await.unwrap();
        let mut params: BTreeMap<String, String> = requests[0]
            .url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        let received_signature = params.remove("Signature").unwrap();

        let mut request = SignedRequest::new();
        for (k, v) in &params {
            request.insert(k.clone(), v);
        }
        assert_eq!(
            request
                .signature(&Method::GET, "test-access-key-secret")
                .unwrap(),
            received_signature
        );
    }

    #[tokio::test]
    async fn test_fetch_token_forbidden() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(403).set_body_string(r#"{"Code":"SignatureDoesNotMatch"}"#),
            )
            .expect(1)
            .mount(&server)
            .await;

        let config = test_config(&format!("{}/", server.uri()));
        let err = provider(&config).token().await.unwrap_err();
        match err {
            NlsError::TokenRequestFailed { status, body } => {
                assert_eq!(status, 403);
                assert!(body.contains("SignatureDoesNotMatch"));
            }
            other => panic!("Expected TokenRequestFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_fetch_token_invalid_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"RequestId": "r-1"})))
            .mount(&server)
            .await;

        let config = test_config(&format!("{}/", server.uri()));
        let err = provider(&config).token().await.unwrap_err();
        assert!(matches!(err, NlsError::InvalidTokenResponse(_)));
    }

    #[tokio::test]
    async fn test_status_errors_are_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let config = test_config(&format!("{}/", server.uri()));
        let err = provider(&config).token().await.unwrap_err();
        assert!(matches!(
            err,
            NlsError::TokenRequestFailed { status: 500, .. }
        ));
    }

    #[tokio::test]
    async fn test_timeout_is_retried_once() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"Token": {"Id": "tok-slow"}}))
                    .set_delay(Duration::from_secs(2)),
            )
            .expect(2)
            .mount(&server)
            .await;

        let mut config = test_config(&format!("{}/", server.uri()));
        config.request_timeout = Duration::from_millis(100);
        let err = provider(&config).token().await.unwrap_err();
        assert!(matches!(err, NlsError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_cache_reuses_fresh_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"Token": {"Id": "tok-cached", "ExpireTime": far_future()}})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let config = test_config(&format!("{}/", server.uri()));
        let provider = provider(&config);
        assert_eq!(provider.token().await.unwrap().id(), "tok-cached");
        assert_eq!(provider.token().await.unwrap().id(), "tok-cached");
    }

    #[tokio::test]
    async fn test_cache_disabled_fetches_every_time() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"Token": {"Id": "tok", "ExpireTime": far_future()}})),
            )
            .expect(2)
            .mount(&server)
            .await;

        let mut config = test_config(&format!("{}/", server.uri()));
        config.token_cache = false;
        let provider = provider(&config);
        provider.token().await.unwrap();
        provider.token().await.unwrap();
    }

    #[tokio::test]
    async fn test_cache_skips_tokens_near_expiry() {
        let server = MockServer::start().await;
        let expiring = OffsetDateTime::now_utc().unix_timestamp() + 60;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"Token": {"Id": "tok", "ExpireTime": expiring}})),
            )
            .expect(2)
            .mount(&server)
            .await;

        let config = test_config(&format!("{}/", server.uri()));
        let provider = provider(&config);
        provider.token().await.unwrap();
        provider.token().await.unwrap();
    }
}
