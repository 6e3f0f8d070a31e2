//! LTI API error types.
//!
//! Every failure of the engine is an [`LtiError`]. The mapping to an HTTP
//! status and an OAuth2-style body happens here and nowhere else.

use crate::html;
use crate::services::VerifyError;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Json,
};
use ltix_auth::AuthError;
use ltix_core::{ErrorKind, RegistryError, SessionError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// OAuth2-style error body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,
}

#[derive(Debug, Error)]
pub enum LtiError {
    /// Soft protocol failure, reported back to the tool.
    #[error("{kind}")]
    Protocol {
        kind: ErrorKind,
        description: Option<String>,
    },

    /// Token grant failure; the code is sent as-is in `{"error": ...}`.
    #[error("{0}")]
    Grant(String),

    #[error(transparent)]
    Verify(#[from] VerifyError),

    /// Missing, unknown or expired credentials on a service call.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Valid credentials without the required scope or context.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Unrecoverable launch failure. Rendered as a page, never redirected.
    #[error("Invalid request: {0}")]
    HardFailure(String),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Signing error: {0}")]
    Auth(#[from] AuthError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl LtiError {
    pub fn protocol(kind: ErrorKind) -> Self {
        Self::Protocol {
            kind,
            description: None,
        }
    }

    pub fn protocol_with(kind: ErrorKind, description: impl Into<String>) -> Self {
        Self::Protocol {
            kind,
            description: Some(description.into()),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Protocol { .. }
            | Self::Grant(_)
            | Self::Verify(_)
            | Self::BadRequest(_)
            | Self::HardFailure(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Registry(_) | Self::Session(_) | Self::Auth(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn error_code(&self) -> String {
        match self {
            Self::Protocol { kind, .. } => kind.as_str().to_string(),
            Self::Grant(code) => code.clone(),
            Self::Verify(_) => ErrorKind::SignatureMismatch.as_str().to_string(),
            Self::Unauthorized(_) => "invalid_token".to_string(),
            Self::Forbidden(_) => "insufficient_scope".to_string(),
            Self::NotFound(_) => ErrorKind::NotFound.as_str().to_string(),
            Self::BadRequest(_) | Self::HardFailure(_) => {
                ErrorKind::InvalidRequest.as_str().to_string()
            }
            Self::Registry(_) | Self::Session(_) | Self::Auth(_) | Self::Internal(_) => {
                "server_error".to_string()
            }
        }
    }

    pub fn to_response(&self) -> ErrorResponse {
        let error_description = match self {
            Self::Protocol { description, .. } => description.clone(),
            Self::Grant(_) => None,
            Self::Registry(_) | Self::Session(_) | Self::Auth(_) | Self::Internal(_) => None,
            other => Some(other.to_string()),
        };
        ErrorResponse {
            error: self.error_code(),
            error_description,
        }
    }
}

impl IntoResponse for LtiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "LTI request failed");
        }
        if let Self::HardFailure(message) = &self {
            return (status, Html(html::error_page(message))).into_response();
        }
        (status, Json(self.to_response())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_errors_use_wire_codes() {
        let err = LtiError::protocol(ErrorKind::UnsupportedResponseType);
        assert_eq!(err.error_code(), "unsupported_response_type");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_grant_error_body_has_only_error() {
        let json = serde_json::to_value(LtiError::Grant("invalid_scope".into()).to_response())
            .unwrap();
        assert_eq!(json, serde_json::json!({"error": "invalid_scope"}));
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            LtiError::Unauthorized("x".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            LtiError::Forbidden("x".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            LtiError::HardFailure("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            LtiError::Internal("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_internal_errors_hide_details() {
        let body = LtiError::Registry(RegistryError::Unavailable("db down".into())).to_response();
        assert_eq!(body.error, "server_error");
        assert!(body.error_description.is_none());
    }
}
