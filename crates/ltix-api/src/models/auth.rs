//! OIDC auth request models.

use ltix_core::RequestContext;
use serde::Deserialize;
use utoipa::IntoParams;

/// Parameters of the OIDC authentication request sent by the tool to `/auth`.
///
/// Accepted in the query string (GET) or a form body (POST). All fields are
/// optional at the transport level; the login flow reports what is missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, IntoParams)]
pub struct AuthenticationRequest {
    /// Must be "openid".
    pub scope: Option<String>,
    /// Must be "id_token".
    pub response_type: Option<String>,
    /// Client id registered for the tool.
    pub client_id: Option<String>,
    /// One of the tool's registered redirection URIs.
    pub redirect_uri: Option<String>,
    /// Id of the user the launch was started for.
    pub login_hint: Option<String>,
    /// JSON `{"launchid": "..."}` echoed from login initiation.
    pub lti_message_hint: Option<String>,
    /// Opaque tool state, echoed back.
    pub state: Option<String>,
    /// Must be "form_post".
    pub response_mode: Option<String>,
    pub nonce: Option<String>,
    /// "none" or absent.
    pub prompt: Option<String>,
}

impl AuthenticationRequest {
    pub fn from_context(ctx: &RequestContext) -> Self {
        let get = |name: &str| ctx.param(name).map(str::to_string);
        Self {
            scope: get("scope"),
            response_type: get("response_type"),
            client_id: get("client_id"),
            redirect_uri: get("redirect_uri"),
            login_hint: get("login_hint"),
            lti_message_hint: get("lti_message_hint"),
            state: get("state"),
            response_mode: get("response_mode"),
            nonce: get("nonce"),
            prompt: get("prompt"),
        }
    }
}
