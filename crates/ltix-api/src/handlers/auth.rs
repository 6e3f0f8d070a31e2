//! OIDC auth endpoint.

use super::request_context;
use crate::html;
use crate::middleware::extract_session_cookie;
use crate::models::AuthenticationRequest;
use crate::router::LtiState;
use crate::services::authorize;
use axum::{
    body::Bytes,
    extract::{OriginalUri, State},
    http::{HeaderMap, Method},
    response::{Html, IntoResponse, Response},
};

/// Answers the tool's authentication request with an auto-submitting form.
///
/// A request without a signed-in session that has not been re-posted yet is
/// first bounced through a same-site re-post page.
#[utoipa::path(
    post,
    path = "/lti/auth",
    params(AuthenticationRequest),
    responses(
        (status = 200, description = "Auto-submit form to the tool's redirect URI", content_type = "text/html"),
        (status = 400, description = "Unverifiable request, rendered as an error page", content_type = "text/html"),
    ),
    tag = "LTI"
)]
pub async fn auth_handler(
    State(state): State<LtiState>,
    method: Method,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let ctx = request_context(&state, &method, &uri, &headers, &body);
    let session = extract_session_cookie(&headers);

    let user = match session {
        Some(session) => match state.sessions.authenticated_user(&session).await {
            Ok(user) => user,
            Err(e) => return crate::LtiError::from(e).into_response(),
        },
        None => None,
    };
    if user.is_none() && ctx.param("repost").is_none() {
        let params = ctx.merged_params();
        return Html(html::repost_page(
            uri.path(),
            params.iter().map(|(k, v)| (k.as_str(), v.as_str())),
        ))
        .into_response();
    }

    let request = AuthenticationRequest::from_context(&ctx);
    match authorize(&state, session.as_ref(), &request).await {
        Ok(response) => Html(response.to_form()).into_response(),
        Err(e) => e.into_response(),
    }
}
