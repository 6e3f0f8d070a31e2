//! LTI endpoint handlers.

pub mod auth;
pub mod certs;
pub mod launch;
pub mod services;
pub mod token;

pub use crate::openapi::openapi_handler;
pub use auth::auth_handler;
pub use certs::certs_handler;
pub use launch::{content_item_handler, launch_handler};
pub use services::services_handler;
pub use token::token_handler;

use crate::router::LtiState;
use axum::http::{HeaderMap, Method, Uri};
use ltix_core::RequestContext;

/// Builds the request context the protocol layer works on.
///
/// The URL is the one the platform publishes (issuer plus path and query), so
/// OAuth1 signatures computed by tools verify against it. Form bodies are
/// parsed only when declared as such.
pub fn request_context(
    state: &LtiState,
    method: &Method,
    uri: &Uri,
    headers: &HeaderMap,
    body: &[u8],
) -> RequestContext {
    let url = match uri.query() {
        Some(query) => format!("{}?{query}", state.url(uri.path())),
        None => state.url(uri.path()),
    };
    let mut ctx = RequestContext::new(method.as_str(), url);
    for (name, value) in headers {
        if let Ok(value) = value.to_str() {
            ctx = ctx.with_header(name.as_str(), value);
        }
    }
    if let Some(query) = uri.query() {
        ctx = ctx.with_query_string(query);
    }
    if ctx.content_type().as_deref() == Some("application/x-www-form-urlencoded") {
        ctx = ctx.with_form_body(body);
    }
    ctx
}
