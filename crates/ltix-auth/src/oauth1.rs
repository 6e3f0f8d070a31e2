//! OAuth 1.0 HMAC-SHA1 request signing (RFC 5849).
//!
//! Outbound LTI 1.0/1.1 launches are signed with the tool's consumer key and
//! secret; inbound service requests signed by tools are verified the same way.
//!
//! # Example
//!
//! ```
//! use ltix_auth::{OAuth1Request, OAuth1Signer, VerifyOptions};
//! use std::collections::BTreeMap;
//!
//! let signer = OAuth1Signer::new("key", "secret");
//! let mut params = BTreeMap::new();
//! params.insert("resource_link_id".to_string(), "42".to_string());
//!
//! let signed = signer.sign("POST", "https://tool.example/launch", &params).unwrap();
//! assert!(signed.contains_key("oauth_signature"));
//!
//! let request = OAuth1Request::new("POST", "https://tool.example/launch", signed);
//! assert!(signer.verify(&request, &VerifyOptions::default()).is_ok());
//! ```

use crate::error::AuthError;
use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::Utc;
use hmac::{Hmac, Mac};
use rand::rngs::OsRng;
use rand::RngCore;
use sha1::Sha1;
use std::collections::BTreeMap;
use subtle::ConstantTimeEq;

/// The only signature method supported.
pub const SIGNATURE_METHOD: &str = "HMAC-SHA1";

/// The only protocol version supported.
pub const OAUTH_VERSION: &str = "1.0";

type HmacSha1 = Hmac<Sha1>;

/// Percent-encodes per RFC 5849 section 3.6: everything but ALPHA, DIGIT,
/// `-`, `.`, `_` and `~`, with upper-case hex.
#[must_use]
pub fn percent_encode(input: &str) -> String {
    urlencoding::encode(input).into_owned()
}

fn percent_decode(input: &str) -> Result<String, AuthError> {
    urlencoding::decode(input)
        .map(|decoded| decoded.into_owned())
        .map_err(|_| AuthError::MalformedAuthorizationHeader(input.to_string()))
}

/// Normalizes an endpoint for the signature base string: lower-cased scheme
/// and host, default ports dropped, no query or fragment.
pub fn normalize_url(endpoint: &str) -> Result<String, AuthError> {
    let url = url::Url::parse(endpoint).map_err(|e| AuthError::InvalidUrl(e.to_string()))?;
    let host = url
        .host_str()
        .ok_or_else(|| AuthError::InvalidUrl(format!("{endpoint} has no host")))?;
    let port = url.port().map(|p| format!(":{p}")).unwrap_or_default();
    Ok(format!(
        "{}://{}{}{}",
        url.scheme(),
        host.to_ascii_lowercase(),
        port,
        url.path()
    ))
}

/// Builds the signature base string.
///
/// Query parameters of `endpoint` are signed along with `params`;
/// `oauth_signature` itself is excluded.
pub fn base_string<'a, I>(method: &str, endpoint: &str, params: I) -> Result<String, AuthError>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let url = url::Url::parse(endpoint).map_err(|e| AuthError::InvalidUrl(e.to_string()))?;

    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (percent_encode(&k), percent_encode(&v)))
        .collect();
    pairs.extend(
        params
            .into_iter()
            .filter(|(k, _)| *k != "oauth_signature")
            .map(|(k, v)| (percent_encode(k), percent_encode(v))),
    );
    pairs.sort();

    let normalized_params = pairs
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    Ok(format!(
        "{}&{}&{}",
        method.to_ascii_uppercase(),
        percent_encode(&normalize_url(endpoint)?),
        percent_encode(&normalized_params)
    ))
}

/// Parses an `Authorization: OAuth ...` header into its percent-decoded
/// parameters. `realm` is dropped.
pub fn parse_authorization_header(value: &str) -> Result<Vec<(String, String)>, AuthError> {
    let value = value.trim();
    let rest = value
        .get(..6)
        .filter(|scheme| scheme.eq_ignore_ascii_case("oauth "))
        .map(|_| &value[6..])
        .ok_or_else(|| AuthError::MalformedAuthorizationHeader("not an OAuth header".into()))?;

    let mut params = Vec::new();
    for part in rest.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let (name, quoted) = part
            .split_once('=')
            .ok_or_else(|| AuthError::MalformedAuthorizationHeader(part.to_string()))?;
        let raw = quoted
            .trim()
            .strip_prefix('"')
            .and_then(|v| v.strip_suffix('"'))
            .ok_or_else(|| AuthError::MalformedAuthorizationHeader(part.to_string()))?;
        let name = percent_decode(name.trim())?;
        if name.eq_ignore_ascii_case("realm") {
            continue;
        }
        params.push((name, percent_decode(raw)?));
    }
    Ok(params)
}

/// An inbound request carrying OAuth1 parameters.
#[derive(Debug, Clone)]
pub struct OAuth1Request {
    pub method: String,
    /// Full request URL; its query string takes part in the signature.
    pub url: String,
    /// Body and Authorization-header parameters.
    pub params: Vec<(String, String)>,
}

impl OAuth1Request {
    pub fn new<I, K, V>(method: &str, url: impl Into<String>, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            method: method.to_ascii_uppercase(),
            url: url.into(),
            params: params
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Merges Authorization-header parameters (if any) with form parameters.
    pub fn from_parts(
        method: &str,
        url: impl Into<String>,
        authorization: Option<&str>,
        form: Vec<(String, String)>,
    ) -> Result<Self, AuthError> {
        let mut params = match authorization {
            Some(header) => parse_authorization_header(header)?,
            None => Vec::new(),
        };
        params.extend(form);
        Ok(Self::new(method, url, params))
    }

    /// First value of a parameter.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    fn required(&self, name: &str) -> Result<&str, AuthError> {
        self.param(name)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| AuthError::MissingParameter(name.to_string()))
    }

    /// Consumer key the request claims to be signed with.
    #[must_use]
    pub fn consumer_key(&self) -> Option<&str> {
        self.param("oauth_consumer_key")
    }
}

/// Inbound verification settings.
#[derive(Debug, Clone)]
pub struct VerifyOptions {
    /// Accepted clock skew; `None` disables the check.
    pub timestamp_window_secs: Option<i64>,
    /// Current Unix time.
    pub now: i64,
}

impl Default for VerifyOptions {
    fn default() -> Self {
        Self {
            timestamp_window_secs: Some(300),
            now: Utc::now().timestamp(),
        }
    }
}

impl VerifyOptions {
    #[must_use]
    pub fn with_window(secs: i64) -> Self {
        Self {
            timestamp_window_secs: Some(secs),
            ..Default::default()
        }
    }
}

/// Signs and verifies requests for one consumer.
#[derive(Clone)]
pub struct OAuth1Signer {
    consumer_key: String,
    consumer_secret: String,
    token: Option<(String, String)>,
}

impl std::fmt::Debug for OAuth1Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuth1Signer")
            .field("consumer_key", &self.consumer_key)
            .field("consumer_secret", &"[redacted]")
            .finish_non_exhaustive()
    }
}

impl OAuth1Signer {
    #[must_use]
    pub fn new(consumer_key: impl Into<String>, consumer_secret: impl Into<String>) -> Self {
        Self {
            consumer_key: consumer_key.into(),
            consumer_secret: consumer_secret.into(),
            token: None,
        }
    }

    /// Signs with an access token as well. LTI launches use none.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>, token_secret: impl Into<String>) -> Self {
        self.token = Some((token.into(), token_secret.into()));
        self
    }

    #[must_use]
    pub fn consumer_key(&self) -> &str {
        &self.consumer_key
    }

    /// Adds fresh `oauth_*` parameters and the signature to `params`.
    pub fn sign(
        &self,
        method: &str,
        endpoint: &str,
        params: &BTreeMap<String, String>,
    ) -> Result<BTreeMap<String, String>, AuthError> {
        let mut nonce = [0u8; 16];
        OsRng.fill_bytes(&mut nonce);
        self.sign_with(
            method,
            endpoint,
            params,
            &hex::encode(nonce),
            Utc::now().timestamp(),
        )
    }

    /// Deterministic [`OAuth1Signer::sign`] with a caller-chosen nonce and timestamp.
    pub fn sign_with(
        &self,
        method: &str,
        endpoint: &str,
        params: &BTreeMap<String, String>,
        nonce: &str,
        timestamp: i64,
    ) -> Result<BTreeMap<String, String>, AuthError> {
        let mut signed = params.clone();
        signed.insert("oauth_version".into(), OAUTH_VERSION.into());
        signed.insert("oauth_nonce".into(), nonce.into());
        signed.insert("oauth_timestamp".into(), timestamp.to_string());
        signed.insert("oauth_consumer_key".into(), self.consumer_key.clone());
        signed.insert("oauth_signature_method".into(), SIGNATURE_METHOD.into());
        if let Some((token, _)) = &self.token {
            signed.insert("oauth_token".into(), token.clone());
        }
        signed.remove("oauth_signature");

        let signature = self.signature(
            method,
            endpoint,
            signed.iter().map(|(k, v)| (k.as_str(), v.as_str())),
        )?;
        signed.insert("oauth_signature".into(), signature);
        Ok(signed)
    }

    /// HMAC-SHA1 signature of the base string, base64-encoded.
    pub fn signature<'a, I>(&self, method: &str, endpoint: &str, params: I) -> Result<String, AuthError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let base = base_string(method, endpoint, params)?;
        let token_secret = self.token.as_ref().map(|(_, s)| s.as_str()).unwrap_or("");
        let key = format!(
            "{}&{}",
            percent_encode(&self.consumer_secret),
            percent_encode(token_secret)
        );

        let mut mac = HmacSha1::new_from_slice(key.as_bytes())
            .map_err(|e| AuthError::InvalidKey(e.to_string()))?;
        mac.update(base.as_bytes());
        Ok(STANDARD.encode(mac.finalize().into_bytes()))
    }

    /// Verifies an inbound request signed with this consumer's secret.
    pub fn verify(&self, request: &OAuth1Request, options: &VerifyOptions) -> Result<(), AuthError> {
        if let Some(version) = request.param("oauth_version") {
            if version != OAUTH_VERSION {
                return Err(AuthError::UnsupportedVersion(version.to_string()));
            }
        }

        let method = request.required("oauth_signature_method")?;
        if method != SIGNATURE_METHOD {
            return Err(AuthError::UnsupportedSignatureMethod(method.to_string()));
        }

        request.required("oauth_consumer_key")?;
        request.required("oauth_nonce")?;
        let provided = request.required("oauth_signature")?;

        let timestamp = request
            .required("oauth_timestamp")?
            .parse::<i64>()
            .map_err(|_| AuthError::MissingParameter("oauth_timestamp".into()))?;
        if let Some(window) = options.timestamp_window_secs {
            if (options.now - timestamp).abs() > window {
                return Err(AuthError::TimestampOutOfRange {
                    timestamp,
                    now: options.now,
                });
            }
        }

        let expected = self.signature(
            &request.method,
            &request.url,
            request.params.iter().map(|(k, v)| (k.as_str(), v.as_str())),
        )?;

        if bool::from(expected.as_bytes().ct_eq(provided.as_bytes())) {
            Ok(())
        } else {
            Err(AuthError::SignatureMismatch)
        }
    }
}
