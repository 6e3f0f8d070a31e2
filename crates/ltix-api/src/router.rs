//! LTI API router configuration.
//!
//! Configures routes for the LTI endpoints:
//! - GET/POST /auth - OIDC auth endpoint
//! - GET /certs - Platform JSON Web Key Set
//! - POST /token - Access token grant
//! - GET /launch - Activity launch
//! - GET /contentitem - Content-item selection
//! - ANY /services/*path - Service resources
//! - GET /api-docs/openapi.json - OpenAPI document

use crate::handlers::{
    auth_handler, certs_handler, content_item_handler, launch_handler, openapi_handler,
    services_handler, token_handler,
};
use crate::services::CredentialStore;
use crate::store::AssetProcessorStore;
use axum::{
    routing::{any, get},
    Router,
};
use ltix_auth::JwksCache;
use ltix_core::{SessionStore, ToolRegistry, ACCESS_TOKEN_LIFETIME_SECS};
use std::sync::Arc;
use std::time::Duration;

/// A platform signing key. Several may be published; one is active.
#[derive(Clone, serde::Deserialize)]
pub struct LtiSigningKey {
    /// Key ID (kid) for JWKS identification.
    pub kid: String,
    /// PEM-encoded RSA private key.
    pub private_key_pem: String,
    /// PEM-encoded RSA public key.
    pub public_key_pem: String,
    /// Whether this key signs new id_tokens.
    #[serde(default)]
    pub is_active: bool,
}

impl std::fmt::Debug for LtiSigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LtiSigningKey")
            .field("kid", &self.kid)
            .field("private_key_pem", &"[redacted]")
            .field("is_active", &self.is_active)
            .finish()
    }
}

/// Application state for LTI routes.
#[derive(Clone)]
pub struct LtiState {
    pub registry: Arc<dyn ToolRegistry>,
    pub sessions: Arc<dyn SessionStore>,
    pub assets: Arc<dyn AssetProcessorStore>,
    /// Platform issuer (e.g. "<https://lms.example>"), also the base of absolute URLs.
    pub issuer: String,
    pub signing_keys: Vec<LtiSigningKey>,
    pub access_token_lifetime_secs: i64,
    pub id_token_lifetime_secs: i64,
    pub oauth1_timestamp_window_secs: i64,
    pub jwks_cache: JwksCache,
}

impl LtiState {
    #[must_use]
    pub fn new(
        registry: Arc<dyn ToolRegistry>,
        sessions: Arc<dyn SessionStore>,
        assets: Arc<dyn AssetProcessorStore>,
        issuer: impl Into<String>,
        signing_keys: Vec<LtiSigningKey>,
    ) -> Self {
        Self {
            registry,
            sessions,
            assets,
            issuer: issuer.into().trim_end_matches('/').to_string(),
            signing_keys,
            access_token_lifetime_secs: ACCESS_TOKEN_LIFETIME_SECS,
            id_token_lifetime_secs: 60,
            oauth1_timestamp_window_secs: 300,
            jwks_cache: JwksCache::new(Duration::from_secs(5)),
        }
    }

    #[must_use]
    pub fn with_access_token_lifetime(mut self, secs: i64) -> Self {
        self.access_token_lifetime_secs = secs;
        self
    }

    #[must_use]
    pub fn with_id_token_lifetime(mut self, secs: i64) -> Self {
        self.id_token_lifetime_secs = secs;
        self
    }

    #[must_use]
    pub fn with_oauth1_timestamp_window(mut self, secs: i64) -> Self {
        self.oauth1_timestamp_window_secs = secs;
        self
    }

    /// Timeout applied to outbound JWKS fetches.
    #[must_use]
    pub fn with_jwks_timeout(mut self, timeout: Duration) -> Self {
        self.jwks_cache = JwksCache::new(timeout);
        self
    }

    #[must_use]
    pub fn active_signing_key(&self) -> Option<&LtiSigningKey> {
        self.signing_keys.iter().find(|k| k.is_active)
    }

    #[must_use]
    pub fn find_key_by_kid(&self, kid: &str) -> Option<&LtiSigningKey> {
        self.signing_keys.iter().find(|k| k.kid == kid)
    }

    /// Credential lookups over the registry, sharing the JWKS cache.
    #[must_use]
    pub fn credentials(&self) -> CredentialStore {
        CredentialStore::new(self.registry.clone(), self.jwks_cache.clone())
    }

    /// Absolute URL for a platform path such as `/lti/return`.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.issuer, path)
    }
}

/// Create the LTI router with all endpoints.
pub fn lti_router(state: LtiState) -> Router {
    Router::new()
        .route("/auth", get(auth_handler).post(auth_handler))
        .route("/certs", get(certs_handler))
        .route("/token", any(token_handler))
        .route("/launch", get(launch_handler))
        .route("/contentitem", get(content_item_handler))
        .route("/services/*path", any(services_handler))
        .route("/api-docs/openapi.json", get(openapi_handler))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use crate::test_support::test_state;

    #[test]
    fn test_active_key_and_kid_lookup() {
        let state = test_state();
        assert_eq!(state.active_signing_key().unwrap().kid, "platform-key-1");
        assert!(state.find_key_by_kid("platform-key-1").is_some());
        assert!(state.find_key_by_kid("missing").is_none());
    }

    #[test]
    fn test_issuer_trailing_slash_is_dropped() {
        let state = test_state();
        assert_eq!(state.url("/lti/return"), "https://lms.example/lti/return");
    }

    #[test]
    fn test_debug_redacts_private_key() {
        let state = test_state();
        let debug = format!("{:?}", state.signing_keys[0]);
        assert!(debug.contains("[redacted]"));
        assert!(!debug.contains("BEGIN PRIVATE KEY"));
    }
}
