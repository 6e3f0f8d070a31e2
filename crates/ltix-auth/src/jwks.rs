//! JSON Web Keys.
//!
//! The platform publishes its own public keys as a [`JwkSet`] on `/certs`;
//! tools registered with a `JWK_KEYSET` key type are verified against keys
//! fetched from their keyset URL through [`JwksClient`].

use crate::error::AuthError;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use pkcs8::{DecodePublicKey, EncodePublicKey, LineEnding};
use rsa::traits::PublicKeyParts;
use rsa::{BigUint, RsaPublicKey};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

/// A JSON Web Key as defined in RFC 7517.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwk {
    /// Key type (e.g., "RSA").
    pub kty: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,

    /// Public key use (e.g., "sig" for signature).
    #[serde(rename = "use", skip_serializing_if = "Option::is_none")]
    pub key_use: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,

    /// RSA modulus (`Base64URL` encoded).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n: Option<String>,

    /// RSA exponent (`Base64URL` encoded).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub e: Option<String>,
}

impl Jwk {
    /// Build the signing JWK for a PEM-encoded RSA public key.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidKey` if the PEM is not an RSA SPKI public key.
    pub fn from_public_key_pem(pem: &str, kid: impl Into<String>) -> Result<Self, AuthError> {
        let key = RsaPublicKey::from_public_key_pem(pem)
            .map_err(|e| AuthError::InvalidKey(format!("Invalid public key: {e}")))?;

        Ok(Self {
            kty: "RSA".to_string(),
            kid: Some(kid.into()),
            key_use: Some("sig".to_string()),
            alg: Some("RS256".to_string()),
            n: Some(URL_SAFE_NO_PAD.encode(key.n().to_bytes_be())),
            e: Some(URL_SAFE_NO_PAD.encode(key.e().to_bytes_be())),
        })
    }

    /// Convert JWK to PEM-encoded public key.
    ///
    /// # Errors
    ///
    /// Returns error if the key cannot be converted to PEM.
    pub fn to_pem(&self) -> Result<Vec<u8>, AuthError> {
        if self.kty != "RSA" {
            return Err(AuthError::InvalidKey(format!(
                "Unsupported key type: {}",
                self.kty
            )));
        }
        let n = self
            .n
            .as_ref()
            .ok_or_else(|| AuthError::InvalidKey("Missing modulus (n)".to_string()))?;
        let e = self
            .e
            .as_ref()
            .ok_or_else(|| AuthError::InvalidKey("Missing exponent (e)".to_string()))?;

        let n_bytes = URL_SAFE_NO_PAD
            .decode(n)
            .map_err(|e| AuthError::InvalidKey(format!("Invalid modulus encoding: {e}")))?;
        let e_bytes = URL_SAFE_NO_PAD
            .decode(e)
            .map_err(|e| AuthError::InvalidKey(format!("Invalid exponent encoding: {e}")))?;

        let key = RsaPublicKey::new(
            BigUint::from_bytes_be(&n_bytes),
            BigUint::from_bytes_be(&e_bytes),
        )
        .map_err(|e| AuthError::InvalidKey(format!("Invalid RSA key: {e}")))?;

        key.to_public_key_pem(LineEnding::LF)
            .map(String::into_bytes)
            .map_err(|e| AuthError::InvalidKey(format!("PEM encoding failed: {e}")))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwkSet {
    pub keys: Vec<Jwk>,
}

impl JwkSet {
    /// Find a key by its kid.
    #[must_use]
    pub fn find_key(&self, kid: &str) -> Option<&Jwk> {
        self.keys.iter().find(|k| k.kid.as_deref() == Some(kid))
    }

    #[must_use]
    pub fn first_key(&self) -> Option<&Jwk> {
        self.keys.first()
    }

    /// Key for a token header: by kid when present, else the set's only key.
    #[must_use]
    pub fn select(&self, kid: Option<&str>) -> Option<&Jwk> {
        match kid {
            Some(kid) => self.find_key(kid),
            None if self.keys.len() == 1 => self.first_key(),
            None => None,
        }
    }
}

struct CachedJwks {
    jwks: JwkSet,
    fetched_at: Instant,
}

/// Caching client for one keyset URL.
///
/// Keys are served from the cache until the TTL passes; an unknown kid
/// forces one re-fetch before giving up.
#[derive(Clone)]
pub struct JwksClient {
    url: String,
    cache: Arc<RwLock<Option<CachedJwks>>>,
    cache_ttl: Duration,
    http_client: reqwest::Client,
}

impl JwksClient {
    /// # Errors
    ///
    /// Returns `AuthError::JwksFetchFailed` if the HTTP client cannot be created.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, AuthError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                AuthError::JwksFetchFailed(format!("Failed to create HTTP client: {e}"))
            })?;

        Ok(Self {
            url: url.into(),
            cache: Arc::new(RwLock::new(None)),
            cache_ttl: DEFAULT_CACHE_TTL,
            http_client,
        })
    }

    #[must_use]
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Fetch the keyset, bypassing the cache.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::JwksFetchFailed` on transport errors, timeouts,
    /// non-success status or an unparseable body.
    pub async fn fetch_jwks(&self) -> Result<JwkSet, AuthError> {
        tracing::debug!(url = %self.url, "fetching JWKS");

        let response = self
            .http_client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| AuthError::JwksFetchFailed(format!("Request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(AuthError::JwksFetchFailed(format!(
                "HTTP {}",
                response.status()
            )));
        }

        let jwks: JwkSet = response
            .json()
            .await
            .map_err(|e| AuthError::JwksFetchFailed(format!("Invalid JSON: {e}")))?;

        let mut cache = self.cache.write().await;
        *cache = Some(CachedJwks {
            jwks: jwks.clone(),
            fetched_at: Instant::now(),
        });

        Ok(jwks)
    }

    /// Get JWKS, using cache if available and not expired.
    pub async fn get_jwks(&self) -> Result<JwkSet, AuthError> {
        {
            let cache = self.cache.read().await;
            if let Some(ref cached) = *cache {
                if cached.fetched_at.elapsed() < self.cache_ttl {
                    return Ok(cached.jwks.clone());
                }
            }
        }

        self.fetch_jwks().await
    }

    /// Select a key for a token header, re-fetching once on a miss.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::KeyNotFound` if no key matches after re-fetch.
    pub async fn get_key(&self, kid: Option<&str>) -> Result<Jwk, AuthError> {
        let jwks = self.get_jwks().await?;
        if let Some(key) = jwks.select(kid) {
            return Ok(key.clone());
        }

        let jwks = self.fetch_jwks().await?;
        jwks.select(kid)
            .cloned()
            .ok_or_else(|| AuthError::KeyNotFound(kid.unwrap_or("<none>").to_string()))
    }

    pub async fn get_key_pem(&self, kid: Option<&str>) -> Result<Vec<u8>, AuthError> {
        self.get_key(kid).await?.to_pem()
    }

    pub async fn clear_cache(&self) {
        let mut cache = self.cache.write().await;
        *cache = None;
    }
}

impl std::fmt::Debug for JwksClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwksClient")
            .field("url", &self.url)
            .field("cache_ttl", &self.cache_ttl)
            .finish()
    }
}

/// One [`JwksClient`] per keyset URL, created on first use.
#[derive(Clone, Debug)]
pub struct JwksCache {
    clients: Arc<RwLock<HashMap<String, JwksClient>>>,
    timeout: Duration,
    cache_ttl: Duration,
}

impl JwksCache {
    pub fn new(timeout: Duration) -> Self {
        Self {
            clients: Arc::new(RwLock::new(HashMap::new())),
            timeout,
            cache_ttl: DEFAULT_CACHE_TTL,
        }
    }

    #[must_use]
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// # Errors
    ///
    /// Returns `AuthError::JwksFetchFailed` if a new client cannot be created.
    pub async fn client_for(&self, url: &str) -> Result<JwksClient, AuthError> {
        if let Some(client) = self.clients.read().await.get(url) {
            return Ok(client.clone());
        }

        let mut clients = self.clients.write().await;
        if let Some(client) = clients.get(url) {
            return Ok(client.clone());
        }
        let client = JwksClient::new(url, self.timeout)?.with_cache_ttl(self.cache_ttl);
        clients.insert(url.to_string(), client.clone());
        Ok(client)
    }

    /// PEM of the key a token header names, from the keyset at `url`.
    pub async fn key_pem(&self, url: &str, kid: Option<&str>) -> Result<Vec<u8>, AuthError> {
        self.client_for(url).await?.get_key_pem(kid).await
    }
}

impl Default for JwksCache {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}
