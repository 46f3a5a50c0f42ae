//! RPC request signing (signature version 1.0, HMAC-SHA1).
//!
//! The provider authenticates RPC-style calls by signing a canonical form of
//! the query parameters:
//!
//! 1. Percent-encode every key and value with strict RFC 3986 rules.
//! 2. Sort the pairs by encoded key, byte-wise ascending.
//! 3. Join them as `k1=v1&k2=v2&...` (the canonical query string).
//! 4. Build the string to sign: `METHOD&%2F&` + percent-encode(canonical).
//! 5. Signature = base64(HMAC-SHA1(secret + "&", string to sign)).
//!
//! The signature is then appended to the query as the `Signature` parameter.
//! Everything here is pure; nonces and timestamps are supplied by the caller.
//!
//! # Example
//!
//! ```rust
//! use http::Method;
//! use nls_tts_proxy::core::nls::signing::SignedRequest;
//!
//! let query = SignedRequest::new()
//!     .param("Action", "CreateToken")
//!     .param("AccessKeyId", "my-id")
//!     .sign(&Method::GET, "my-secret")
//!     .unwrap();
//! assert!(query.starts_with("AccessKeyId=my-id&Action=CreateToken&Signature="));
//! ```

use std::collections::BTreeMap;

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use hmac::{Hmac, Mac};
use http::Method;
use sha1::Sha1;
use url::form_urlencoded;

use super::error::{NlsError, NlsResult};

type HmacSha1 = Hmac<Sha1>;

/// Pre-encoded request path `/`.
const ENCODED_ROOT_PATH: &str = "%2F";

/// Name of the parameter carrying the computed signature.
pub const SIGNATURE_PARAM: &str = "Signature";

/// Percent-encode a key or value with strict RFC 3986 rules.
///
/// Only `A-Z a-z 0-9 - _ . ~` pass through. Form encoding differs on three
/// characters, fixed up after encoding: space becomes `%20` instead of `+`,
/// `*` becomes `%2A`, and `~` stays literal instead of `%7E`.
pub fn percent_encode(value: &str) -> String {
    let encoded: String = form_urlencoded::byte_serialize(value.as_bytes()).collect();
    // A literal '+' in the input is already %2B, so every '+' here was a space.
    encoded
        .replace('+', "%20")
        .replace('*', "%2A")
        .replace("%7E", "~")
}

/// Build the canonical query string from parameter pairs.
///
/// Keys and values are encoded independently, then sorted by encoded key.
pub fn canonical_query_string<I, K, V>(params: I) -> String
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut encoded: Vec<(String, String)> = params
        .into_iter()
        .map(|(k, v)| (percent_encode(k.as_ref()), percent_encode(v.as_ref())))
        .collect();
    encoded.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));

    encoded
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

/// Build the string to sign for a canonical query string.
pub fn string_to_sign(method: &Method, canonical_query: &str) -> String {
    format!(
        "{}&{}&{}",
        method.as_str(),
        ENCODED_ROOT_PATH,
        percent_encode(canonical_query)
    )
}

/// base64(HMAC-SHA1(secret + "&", string_to_sign)).
pub fn compute_signature(secret: &str, string_to_sign: &str) -> NlsResult<String> {
    let key = format!("{secret}&");
    let mut mac = HmacSha1::new_from_slice(key.as_bytes())
        .map_err(|e| NlsError::Configuration(format!("Invalid signing key: {e}")))?;
    mac.update(string_to_sign.as_bytes());
    Ok(BASE64.encode(mac.finalize().into_bytes()))
}

/// Sign a parameter set in one step.
pub fn sign<I, K, V>(method: &Method, params: I, secret: &str) -> NlsResult<String>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let canonical = canonical_query_string(params);
    compute_signature(secret, &string_to_sign(method, &canonical))
}

/// Parameter set for a signed RPC call.
///
/// Setting a key twice keeps the last value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignedRequest {
    params: BTreeMap<String, String>,
}

impl SignedRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl ToString) {
        self.params.insert(key.into(), value.to_string());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    pub fn params(&self) -> &BTreeMap<String, String> {
        &self.params
    }

    /// Canonical query string of the current parameters (no signature).
    pub fn canonical_query(&self) -> String {
        canonical_query_string(&self.params)
    }

    /// Signature over the current parameters.
    pub fn signature(&self, method: &Method, secret: &str) -> NlsResult<String> {
        compute_signature(secret, &string_to_sign(method, &self.canonical_query()))
    }

    /// Canonical query with `Signature=<encoded signature>` appended last.
    pub fn sign(&self, method: &Method, secret: &str) -> NlsResult<String> {
        let canonical = self.canonical_query();
        let signature = compute_signature(secret, &string_to_sign(method, &canonical))?;
        Ok(format!(
            "{canonical}&{SIGNATURE_PARAM}={}",
            percent_encode(&signature)
        ))
    }
}
