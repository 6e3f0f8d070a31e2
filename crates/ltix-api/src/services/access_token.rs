//! Access token grant and bearer validation.
//!
//! Tools obtain tokens with a `client_credentials` grant authenticated by a
//! JWT-bearer client assertion, then present them on service calls.

use crate::error::LtiError;
use crate::models::{
    TokenResponse, CLIENT_ASSERTION_TYPE_JWT_BEARER, GRANT_TYPE_CLIENT_CREDENTIALS,
};
use crate::router::LtiState;
use crate::services::VerifyError;
use ltix_auth::decode_unverified_payload;
use ltix_core::{AccessToken, ErrorKind, RequestContext};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

fn grant_error(kind: ErrorKind) -> LtiError {
    LtiError::Grant(kind.as_str().to_string())
}

/// The verifier's message goes back to the tool; registry failures stay internal.
fn assertion_error(err: VerifyError) -> LtiError {
    match err {
        VerifyError::Registry(e) => LtiError::Registry(e),
        other => LtiError::Grant(other.to_string()),
    }
}

/// Requested scopes the tool is permitted, in request order, without duplicates.
pub fn intersect_scopes(requested: &str, permitted: &[String]) -> Vec<String> {
    let mut granted: Vec<String> = Vec::new();
    for scope in requested.split_whitespace() {
        if permitted.iter().any(|p| p == scope) && !granted.iter().any(|g| g == scope) {
            granted.push(scope.to_string());
        }
    }
    granted
}

/// Handles a token request. Every failure is a [`LtiError::Grant`].
pub async fn grant(state: &LtiState, ctx: &RequestContext) -> Result<TokenResponse, LtiError> {
    if !ctx.is_post() || ctx.content_type().as_deref() != Some(FORM_CONTENT_TYPE) {
        return Err(grant_error(ErrorKind::InvalidRequest));
    }

    let required = |name: &str| ctx.param(name).filter(|v| !v.is_empty());
    let (Some(assertion), Some(assertion_type), Some(grant_type), Some(scope)) = (
        required("client_assertion"),
        required("client_assertion_type"),
        required("grant_type"),
        required("scope"),
    ) else {
        return Err(grant_error(ErrorKind::InvalidRequest));
    };

    if assertion_type != CLIENT_ASSERTION_TYPE_JWT_BEARER
        || grant_type != GRANT_TYPE_CLIENT_CREDENTIALS
    {
        return Err(grant_error(ErrorKind::UnsupportedGrantType));
    }

    if assertion.split('.').count() != 3 {
        return Err(grant_error(ErrorKind::InvalidRequest));
    }
    let client_id = decode_unverified_payload(assertion)
        .ok()
        .and_then(|claims| claims.get("sub").and_then(|s| s.as_str()).map(str::to_string))
        .filter(|sub| !sub.is_empty())
        .ok_or_else(|| grant_error(ErrorKind::InvalidRequest))?;

    let Some(tool) = state.registry.find_tool_by_client_id(&client_id).await? else {
        tracing::warn!(client_id = %client_id, "Token request for unknown client");
        return Err(grant_error(ErrorKind::InvalidClient));
    };
    let config = state.registry.get_type_config(tool.id).await?;

    state
        .credentials()
        .verify_jwt(&tool, &config, &client_id, assertion)
        .await
        .map_err(assertion_error)?;

    let permitted = state.registry.permitted_scopes(&tool, &config).await?;
    let scopes = intersect_scopes(scope, &permitted);
    if scopes.is_empty() {
        tracing::warn!(tool_id = %tool.id, requested = %scope, "No permitted scope requested");
        return Err(grant_error(ErrorKind::InvalidScope));
    }

    let token = state
        .registry
        .issue_token(
            tool.id,
            scopes,
            chrono::Duration::seconds(state.access_token_lifetime_secs),
        )
        .await?;

    tracing::info!(
        tool_id = %tool.id,
        scope = %token.scope_string(),
        "Access token granted"
    );

    Ok(TokenResponse {
        access_token: token.token.clone(),
        token_type: "Bearer".to_string(),
        expires_in: token.expires_in(),
        scope: token.scope_string(),
    })
}

/// Resolves the bearer token of a service call and checks it carries `scope`.
///
/// Missing, unknown and expired tokens are [`LtiError::Unauthorized`]; a
/// valid token without the scope is [`LtiError::Forbidden`].
pub async fn validate_bearer(
    state: &LtiState,
    authorization: Option<&str>,
    scope: &str,
) -> Result<AccessToken, LtiError> {
    let token = authorization
        .and_then(|value| {
            value
                .strip_prefix("Bearer ")
                .or_else(|| value.strip_prefix("bearer "))
        })
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| LtiError::Unauthorized("Missing bearer token".into()))?;

    let Some(access_token) = state.registry.lookup_token(token).await? else {
        return Err(LtiError::Unauthorized("Unknown access token".into()));
    };
    if access_token.is_expired() {
        return Err(LtiError::Unauthorized("Access token expired".into()));
    }
    if !access_token.has_scope(scope) {
        tracing::warn!(tool_id = %access_token.type_id, scope, "Token lacks required scope");
        return Err(LtiError::Forbidden(format!("Scope {scope} not granted")));
    }
    Ok(access_token)
}
