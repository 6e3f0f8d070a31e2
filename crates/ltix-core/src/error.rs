//! Error Types
//!
//! [`ErrorKind`] is the closed set of protocol failures the engine reports to
//! tools. Mapping to HTTP statuses happens once, at the API boundary.
//!
//! # Example
//!
//! ```
//! use ltix_core::ErrorKind;
//!
//! assert_eq!(ErrorKind::UnsupportedResponseType.as_str(), "unsupported_response_type");
//! assert_eq!(ErrorKind::SignatureMismatch.to_string(), "invalid_signature");
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Protocol-level failure kinds, carried on the wire as OAuth2-style codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// A required parameter is missing or malformed.
    InvalidRequest,
    /// The requested scope is unknown or not permitted.
    InvalidScope,
    /// Only `id_token` is supported by the auth endpoint.
    UnsupportedResponseType,
    /// Only `client_credentials` with a JWT-bearer assertion is supported.
    UnsupportedGrantType,
    /// The client id does not belong to the tool being launched.
    UnauthorizedClient,
    /// The login hint does not match the signed-in user.
    AccessDenied,
    /// The client could not be identified or authenticated.
    InvalidClient,
    /// An OAuth1 or JWT signature did not verify.
    #[serde(rename = "invalid_signature")]
    SignatureMismatch,
    /// A referenced record does not exist.
    NotFound,
}

impl ErrorKind {
    /// Wire code of this error kind.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidRequest => "invalid_request",
            Self::InvalidScope => "invalid_scope",
            Self::UnsupportedResponseType => "unsupported_response_type",
            Self::UnsupportedGrantType => "unsupported_grant_type",
            Self::UnauthorizedClient => "unauthorized_client",
            Self::AccessDenied => "access_denied",
            Self::InvalidClient => "invalid_client",
            Self::SignatureMismatch => "invalid_signature",
            Self::NotFound => "not_found",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validation errors raised by the domain model itself.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// An LTI 1.3 tool was registered without a client id.
    #[error("Tool {tool} uses LTI 1.3 but has no client id")]
    MissingClientId {
        /// Tool type id
        tool: i64,
    },

    /// Another tool already uses this client id.
    #[error("Client id {0} is already registered")]
    DuplicateClientId(String),

    /// A launch hint stored in the session could not be decoded.
    #[error("Malformed launch hint: {0}")]
    MalformedLaunchHint(String),
}

/// Failures of the external tool registry.
#[derive(Debug, Clone, Error)]
pub enum RegistryError {
    /// The backing store could not be reached.
    #[error("Registry unavailable: {0}")]
    Unavailable(String),

    /// A stored record violated a registry invariant.
    #[error("Corrupt registry record {record}: {message}")]
    Corrupt {
        /// Record description (e.g. "tool 12")
        record: String,
        /// What was wrong with it
        message: String,
    },
}

/// Failures of the external session store.
#[derive(Debug, Clone, Error)]
pub enum SessionError {
    /// The backing store could not be reached.
    #[error("Session store unavailable: {0}")]
    Unavailable(String),
}
