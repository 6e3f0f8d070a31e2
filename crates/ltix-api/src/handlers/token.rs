//! Access token endpoint.

use super::request_context;
use crate::error::LtiError;
use crate::models::{TokenErrorResponse, TokenRequest, TokenResponse};
use crate::router::LtiState;
use crate::services::grant;
use axum::{
    body::Bytes,
    extract::{OriginalUri, State},
    http::{HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

/// `client_credentials` grant authenticated by a JWT-bearer client assertion.
#[utoipa::path(
    post,
    path = "/lti/token",
    request_body(content = TokenRequest, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Access token issued", body = TokenResponse),
        (status = 400, description = "Grant refused", body = TokenErrorResponse),
    ),
    tag = "LTI"
)]
pub async fn token_handler(
    State(state): State<LtiState>,
    method: Method,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let ctx = request_context(&state, &method, &uri, &headers, &body);
    match grant(&state, &ctx).await {
        Ok(token) => Json(token).into_response(),
        Err(e) => {
            if !matches!(e, LtiError::Grant(_)) {
                tracing::error!(error = %e, "Token grant failed");
            }
            let body = TokenErrorResponse {
                error: e.error_code(),
            };
            (StatusCode::BAD_REQUEST, Json(body)).into_response()
        }
    }
}
