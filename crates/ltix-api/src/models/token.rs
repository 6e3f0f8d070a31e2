//! Token endpoint models.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const CLIENT_ASSERTION_TYPE_JWT_BEARER: &str =
    "urn:ietf:params:oauth:client-assertion-type:jwt-bearer";

pub const GRANT_TYPE_CLIENT_CREDENTIALS: &str = "client_credentials";

/// Access token request (`application/x-www-form-urlencoded`).
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct TokenRequest {
    /// JWT signed with the tool's private key; `sub` is the client id.
    pub client_assertion: Option<String>,
    /// Must be `urn:ietf:params:oauth:client-assertion-type:jwt-bearer`.
    pub client_assertion_type: Option<String>,
    /// Must be `client_credentials`.
    pub grant_type: Option<String>,
    /// Space-separated service scopes.
    pub scope: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    /// Always "Bearer".
    pub token_type: String,
    /// Lifetime in seconds.
    pub expires_in: i64,
    /// Granted scopes, space-separated.
    pub scope: String,
}

/// Failed grant.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenErrorResponse {
    pub error: String,
}
