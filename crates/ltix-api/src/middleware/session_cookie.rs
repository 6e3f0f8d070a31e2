//! Platform session cookie.
//!
//! The platform's login lives outside this crate. Its session id travels in
//! the `ltix_session` cookie and the authenticated user is read back through
//! [`ltix_core::SessionStore::authenticated_user`].

use axum::http::{header::COOKIE, HeaderMap};
use ltix_core::SessionId;

pub const SESSION_COOKIE_NAME: &str = "ltix_session";

/// Cookie max age in seconds (8 hours).
pub const SESSION_COOKIE_MAX_AGE: i64 = 28800;

/// `Set-Cookie` value for a session.
///
/// `SameSite=None` is required: the OIDC auth request arrives as a
/// cross-site POST from the tool.
#[must_use]
pub fn session_cookie(session_id: &SessionId, secure: bool) -> String {
    let secure_flag = if secure { "; Secure" } else { "" };
    format!(
        "{SESSION_COOKIE_NAME}={session_id}; HttpOnly{secure_flag}; SameSite=None; Path=/; Max-Age={SESSION_COOKIE_MAX_AGE}"
    )
}

/// Session id from the request's `Cookie` header, if present and well formed.
pub fn extract_session_cookie(headers: &HeaderMap) -> Option<SessionId> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .find_map(|part| {
            part.trim()
                .strip_prefix(SESSION_COOKIE_NAME)
                .and_then(|rest| rest.strip_prefix('='))
                .and_then(|value| value.trim().parse().ok())
        })
}
