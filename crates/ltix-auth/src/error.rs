//! Error types for signing and verification.

use ltix_core::ErrorKind;
use thiserror::Error;

/// Signing and verification error types.
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    // JWT errors
    /// Token has expired (exp claim is in the past).
    #[error("Token has expired")]
    TokenExpired,

    /// Token signature is invalid.
    #[error("Invalid token signature")]
    InvalidSignature,

    /// Token format is malformed or invalid.
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    /// Token uses an unsupported algorithm (only RS256 is allowed).
    #[error("Unsupported algorithm: only RS256 is allowed")]
    InvalidAlgorithm,

    /// Required claim is missing from token.
    #[error("Missing required claim: {0}")]
    MissingClaim(String),

    // JWKS errors
    /// Failed to fetch JWKS from endpoint.
    #[error("JWKS fetch failed: {0}")]
    JwksFetchFailed(String),

    /// Key with specified kid not found in JWKS.
    #[error("Key not found: {0}")]
    KeyNotFound(String),

    // Key errors
    /// RSA key is invalid or malformed.
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    // OAuth1 errors
    /// A required oauth_* parameter is absent.
    #[error("Missing OAuth parameter: {0}")]
    MissingParameter(String),

    /// Only HMAC-SHA1 is accepted.
    #[error("Unsupported signature method: {0}")]
    UnsupportedSignatureMethod(String),

    /// Only OAuth 1.0 is accepted.
    #[error("Unsupported OAuth version: {0}")]
    UnsupportedVersion(String),

    /// The request timestamp is outside the accepted window.
    #[error("Expired timestamp, yours {timestamp}, ours {now}")]
    TimestampOutOfRange {
        /// Timestamp sent by the client
        timestamp: i64,
        /// Server time
        now: i64,
    },

    /// Recomputed signature differs from the one sent.
    #[error("Invalid signature")]
    SignatureMismatch,

    /// The OAuth Authorization header could not be parsed.
    #[error("Malformed Authorization header: {0}")]
    MalformedAuthorizationHeader(String),

    /// The endpoint URL could not be normalized.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl AuthError {
    /// Check if this error indicates an expired token.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        matches!(self, AuthError::TokenExpired)
    }

    /// Check if this error is a signature (JWT or OAuth1) failure.
    #[must_use]
    pub fn is_signature_failure(&self) -> bool {
        matches!(self, AuthError::InvalidSignature | AuthError::SignatureMismatch)
    }

    /// Check if this error came from key material rather than the request.
    #[must_use]
    pub fn is_key_error(&self) -> bool {
        matches!(
            self,
            AuthError::JwksFetchFailed(_) | AuthError::KeyNotFound(_) | AuthError::InvalidKey(_)
        )
    }

    /// Protocol error kind reported to the caller.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::MissingParameter(_)
            | AuthError::MalformedAuthorizationHeader(_)
            | AuthError::InvalidUrl(_)
            | AuthError::InvalidToken(_)
            | AuthError::MissingClaim(_) => ErrorKind::InvalidRequest,
            AuthError::JwksFetchFailed(_) | AuthError::KeyNotFound(_) | AuthError::InvalidKey(_) => {
                ErrorKind::InvalidClient
            }
            _ => ErrorKind::SignatureMismatch,
        }
    }
}
