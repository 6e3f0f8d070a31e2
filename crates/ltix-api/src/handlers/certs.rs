//! Platform JSON Web Key Set.

use crate::models::{Jwk, JwkSet};
use crate::router::LtiState;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

/// Public keys tools use to verify platform id_tokens.
#[utoipa::path(
    get,
    path = "/lti/certs",
    responses(
        (status = 200, description = "JSON Web Key Set", body = JwkSet),
    ),
    tag = "LTI"
)]
pub async fn certs_handler(State(state): State<LtiState>) -> Response {
    let mut keys = Vec::with_capacity(state.signing_keys.len());
    for key in &state.signing_keys {
        match ltix_auth::Jwk::from_public_key_pem(&key.public_key_pem, &key.kid) {
            Ok(jwk) => keys.push(Jwk::from(jwk)),
            Err(e) => {
                tracing::error!(kid = %key.kid, "Failed to create JWK from public key: {}", e);
            }
        }
    }

    match serde_json::to_string_pretty(&JwkSet { keys }) {
        Ok(body) => ([(header::CONTENT_TYPE, "application/json")], body).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize key set");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
