//! JWT encoding and decoding with the RS256 algorithm.
//!
//! Launch id_tokens are signed with the platform key; client assertions sent
//! to the token endpoint are verified with the tool's key.

use crate::error::AuthError;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// What an inbound token is checked against besides its signature.
#[derive(Debug, Clone)]
pub struct ValidationConfig {
    /// Accepted clock skew, in seconds.
    pub leeway: u64,
    /// Required `iss`, when set.
    pub issuer: Option<String>,
    /// Accepted `aud` values, when set. Unset skips the audience check.
    pub audience: Option<Vec<String>>,
    pub validate_exp: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            leeway: 60,
            issuer: None,
            audience: None,
            validate_exp: true,
        }
    }
}

impl ValidationConfig {
    #[must_use]
    pub fn issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    #[must_use]
    pub fn audience(mut self, audience: Vec<impl Into<String>>) -> Self {
        self.audience = Some(audience.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn with_leeway(mut self, leeway: u64) -> Self {
        self.leeway = leeway;
        self
    }
}

/// Signs `claims` as a compact RS256 JWT, tagging the header with `kid`.
///
/// Fails with `AuthError::InvalidKey` when the PEM does not parse.
pub fn encode_claims<T: Serialize>(
    claims: &T,
    private_key_pem: &[u8],
    kid: Option<&str>,
) -> Result<String, AuthError> {
    let key = EncodingKey::from_rsa_pem(private_key_pem)
        .map_err(|e| AuthError::InvalidKey(format!("Invalid private key: {e}")))?;

    let mut header = Header::new(Algorithm::RS256);
    header.kid = kid.map(str::to_string);

    encode(&header, claims, &key)
        .map_err(|e| AuthError::InvalidToken(format!("Encoding failed: {e}")))
}

/// Verifies an RS256 token against `public_key_pem` and deserializes its
/// claims. Expiry, issuer and audience follow `config`.
pub fn decode_claims<T: DeserializeOwned>(
    token: &str,
    public_key_pem: &[u8],
    config: &ValidationConfig,
) -> Result<T, AuthError> {
    let key = DecodingKey::from_rsa_pem(public_key_pem)
        .map_err(|e| AuthError::InvalidKey(format!("Invalid public key: {e}")))?;

    let mut validation = Validation::new(Algorithm::RS256);
    validation.leeway = config.leeway;
    validation.validate_exp = config.validate_exp;
    if !config.validate_exp {
        validation.required_spec_claims.remove("exp");
    }
    if let Some(issuer) = &config.issuer {
        validation.set_issuer(&[issuer]);
    }
    match &config.audience {
        Some(audience) => validation.set_audience(audience),
        None => validation.validate_aud = false,
    }

    decode::<T>(token, &key, &validation)
        .map(|data| data.claims)
        .map_err(map_jwt_error)
}

/// `kid` from the token header. The signature is not checked.
pub fn extract_kid(token: &str) -> Result<Option<String>, AuthError> {
    let header = jsonwebtoken::decode_header(token)
        .map_err(|e| AuthError::InvalidToken(format!("Invalid token header: {e}")))?;

    Ok(header.kid)
}

/// Read a compact JWT's payload without checking its signature.
///
/// Used to find out which client a token claims to come from before its
/// key is known. The result must not be trusted.
pub fn decode_unverified_payload(token: &str) -> Result<serde_json::Value, AuthError> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err(AuthError::InvalidToken(format!(
            "expected 3 segments, found {}",
            parts.len()
        )));
    }

    let bytes = URL_SAFE_NO_PAD
        .decode(parts[1].trim_end_matches('='))
        .map_err(|_| AuthError::InvalidToken("Invalid base64 encoding".to_string()))?;
    serde_json::from_slice(&bytes)
        .map_err(|_| AuthError::InvalidToken("Invalid JSON in claims".to_string()))
}

/// Map jsonwebtoken errors to AuthError.
fn map_jwt_error(err: jsonwebtoken::errors::Error) -> AuthError {
    use jsonwebtoken::errors::ErrorKind;

    match err.kind() {
        ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        ErrorKind::InvalidSignature => AuthError::InvalidSignature,
        ErrorKind::InvalidAlgorithm => AuthError::InvalidAlgorithm,
        ErrorKind::InvalidToken => AuthError::InvalidToken("Malformed token".to_string()),
        ErrorKind::Base64(_) => AuthError::InvalidToken("Invalid base64 encoding".to_string()),
        ErrorKind::Json(_) => AuthError::InvalidToken("Invalid JSON in claims".to_string()),
        ErrorKind::MissingRequiredClaim(claim) => AuthError::MissingClaim(claim.to_string()),
        ErrorKind::InvalidIssuer => AuthError::InvalidToken("Invalid issuer".to_string()),
        ErrorKind::InvalidAudience => AuthError::InvalidToken("Invalid audience".to_string()),
        _ => AuthError::InvalidToken(format!("Token validation failed: {err}")),
    }
}
