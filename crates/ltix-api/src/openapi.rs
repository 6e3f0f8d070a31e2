//! OpenAPI document of the public LTI endpoints.

use crate::handlers::{auth, certs, token};
use crate::models::{Jwk, JwkSet, TokenErrorResponse, TokenRequest, TokenResponse};
use axum::Json;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "ltix LTI API",
        description = "LTI 1.3 platform endpoints: OIDC auth, key set and access tokens",
        license(name = "BSL-1.1")
    ),
    paths(auth::auth_handler, certs::certs_handler, token::token_handler),
    components(schemas(Jwk, JwkSet, TokenRequest, TokenResponse, TokenErrorResponse)),
    tags((name = "LTI", description = "LTI platform endpoints"))
)]
pub struct ApiDoc;

pub async fn openapi_handler() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
