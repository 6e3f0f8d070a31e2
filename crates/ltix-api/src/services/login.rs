//! OIDC third-party-initiated login: the auth request step.
//!
//! The tool answers a login initiation by sending the user agent to `/auth`.
//! Checks run in a fixed order and the first failure wins. Soft failures are
//! posted back to the tool's redirect URI; a redirect URI that cannot be
//! verified against the tool's allow-list aborts with an error page instead.

use crate::error::LtiError;
use crate::html;
use crate::models::AuthenticationRequest;
use crate::router::LtiState;
use crate::services::launch::LaunchBuilder;
use ltix_core::{ErrorKind, LaunchHint, SessionId};

/// Form the auth endpoint posts back to the tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthResponse {
    pub redirect_uri: String,
    pub params: Vec<(String, String)>,
}

impl AuthResponse {
    /// The `error` parameter, when this is a soft failure.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.param("error")
    }

    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn to_form(&self) -> String {
        html::auto_submit_form(
            &self.redirect_uri,
            self.params.iter().map(|(k, v)| (k.as_str(), v.as_str())),
        )
    }
}

struct SoftError {
    kind: ErrorKind,
    description: Option<&'static str>,
}

impl SoftError {
    fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            description: None,
        }
    }

    fn with(kind: ErrorKind, description: &'static str) -> Self {
        Self {
            kind,
            description: Some(description),
        }
    }
}

fn present(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|v| !v.is_empty())
}

/// Launch id carried in `lti_message_hint`, if it decodes.
fn launch_id(hint: Option<&String>) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(present(hint)?).ok()?;
    value
        .get("launchid")
        .and_then(serde_json::Value::as_str)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

/// Runs the auth request checks and builds the response form.
pub async fn authorize(
    state: &LtiState,
    session: Option<&SessionId>,
    request: &AuthenticationRequest,
) -> Result<AuthResponse, LtiError> {
    let scope = present(request.scope.as_ref());
    let response_type = present(request.response_type.as_ref());
    let client_id = present(request.client_id.as_ref());
    let redirect_uri = present(request.redirect_uri.as_ref());
    let login_hint = present(request.login_hint.as_ref());
    let nonce = present(request.nonce.as_ref());
    let launch_id = launch_id(request.lti_message_hint.as_ref());

    let complete = scope.is_some()
        && response_type.is_some()
        && client_id.is_some()
        && redirect_uri.is_some()
        && login_hint.is_some()
        && nonce.is_some();

    let mut failure = if !complete || launch_id.is_none() {
        Some(SoftError::with(
            ErrorKind::InvalidRequest,
            "No launch id in LTI hint",
        ))
    } else if scope != Some("openid") {
        Some(SoftError::new(ErrorKind::InvalidScope))
    } else if response_type != Some("id_token") {
        Some(SoftError::new(ErrorKind::UnsupportedResponseType))
    } else {
        None
    };

    // The hint is consumed even after a soft failure so that the redirect URI
    // can still be checked against the tool it names.
    let stored = match (session, launch_id.as_deref()) {
        (Some(session), Some(id)) => state.sessions.take(session, id).await?,
        _ => None,
    };
    let Some(stored) = stored else {
        tracing::warn!("Auth request without a usable launch hint");
        return Err(LtiError::HardFailure("Invalid request".into()));
    };
    let hint = LaunchHint::from_session_value(&stored)
        .map_err(|e| LtiError::HardFailure(e.to_string()))?;

    let Some(tool) = state.registry.find_tool_by_id(hint.type_id).await? else {
        tracing::warn!(tool_id = %hint.type_id, "Launch hint names an unknown tool");
        return Err(LtiError::HardFailure("Invalid request".into()));
    };
    let config = state.registry.get_type_config(hint.type_id).await?;

    if failure.is_none() && client_id != tool.client_id.as_deref() {
        failure = Some(SoftError::new(ErrorKind::UnauthorizedClient));
    }

    let user_id = match session {
        Some(session) => state.sessions.authenticated_user(session).await?,
        None => None,
    };
    if failure.is_none() && (user_id.is_none() || login_hint != user_id.as_deref()) {
        failure = Some(SoftError::new(ErrorKind::AccessDenied));
    }

    let Some(redirect_uri) = redirect_uri.filter(|uri| config.allows_redirect_uri(uri)) else {
        tracing::warn!(tool_id = %tool.id, "Auth request with an unregistered redirect URI");
        return Err(LtiError::HardFailure("Invalid parameter: redirect_uri".into()));
    };

    if failure.is_none() {
        failure = match request.response_mode.as_deref() {
            None => Some(SoftError::with(
                ErrorKind::InvalidRequest,
                "Missing response_mode",
            )),
            Some("form_post") => None,
            Some(_) => Some(SoftError::with(
                ErrorKind::InvalidRequest,
                "Invalid response_mode",
            )),
        };
    }

    if failure.is_none() {
        if let Some(prompt) = present(request.prompt.as_ref()) {
            if prompt != "none" {
                failure = Some(SoftError::with(ErrorKind::InvalidRequest, "Invalid prompt"));
            }
        }
    }

    let mut params: Vec<(String, String)> = match failure {
        Some(error) => {
            tracing::warn!(
                tool_id = %tool.id,
                error = error.kind.as_str(),
                "Rejecting LTI auth request"
            );
            let mut params = vec![("error".to_string(), error.kind.as_str().to_string())];
            if let Some(description) = error.description {
                params.push(("error_description".to_string(), description.to_string()));
            }
            params
        }
        None => {
            let launch_user = hint
                .for_user_id
                .clone()
                .filter(|id| !id.is_empty())
                .or(user_id)
                .unwrap_or_default();
            let user = state
                .registry
                .find_user(&launch_user)
                .await?
                .ok_or_else(|| LtiError::NotFound(format!("User {launch_user}")))?;
            let launch = LaunchBuilder::new(state)
                .launch_from_hint(&hint, &tool, &config, &user, nonce.unwrap_or_default())
                .await?;
            tracing::info!(tool_id = %tool.id, course_id = %hint.course_id, "LTI 1.3 launch granted");
            launch.params.into_iter().collect()
        }
    };

    if let Some(state_param) = request.state.as_ref() {
        params.push(("state".to_string(), state_param.clone()));
    }

    Ok(AuthResponse {
        redirect_uri: redirect_uri.to_string(),
        params,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{seeded_state, LTI13_REDIRECT_URI};
    use ltix_core::{ActivityId, CourseId, ToolTypeId};

    async fn prepared(state: &LtiState) -> (SessionId, String) {
        let session = state_login(state).await;
        let launch_id = LaunchHint::new_launch_id();
        let hint = LaunchHint::activity(CourseId::new(5), ToolTypeId::new(4), ActivityId::new(12));
        state
            .sessions
            .put(&session, &launch_id, hint.to_session_value())
            .await
            .unwrap();
        (session, launch_id)
    }

    async fn state_login(state: &LtiState) -> SessionId {
        let session = SessionId::new();
        crate::test_support::sign_in(state, &session, "user-1").await;
        session
    }

    fn request(launch_id: &str) -> AuthenticationRequest {
        AuthenticationRequest {
            scope: Some("openid".into()),
            response_type: Some("id_token".into()),
            client_id: Some("tool-client".into()),
            redirect_uri: Some(LTI13_REDIRECT_URI.into()),
            login_hint: Some("user-1".into()),
            lti_message_hint: Some(format!(r#"{{"launchid":"{launch_id}"}}"#)),
            state: Some("tool-state".into()),
            response_mode: Some("form_post".into()),
            nonce: Some("nonce-1".into()),
            prompt: None,
        }
    }

    #[tokio::test]
    async fn test_successful_auth_posts_id_token() {
        let state = seeded_state();
        let (session, launch_id) = prepared(&state).await;

        let response = authorize(&state, Some(&session), &request(&launch_id))
            .await
            .unwrap();
        assert_eq!(response.redirect_uri, LTI13_REDIRECT_URI);
        assert!(response.error().is_none());
        assert!(response.param("id_token").is_some());
        assert_eq!(response.param("state"), Some("tool-state"));
    }

    #[tokio::test]
    async fn test_launch_hint_is_single_use() {
        let state = seeded_state();
        let (session, launch_id) = prepared(&state).await;

        authorize(&state, Some(&session), &request(&launch_id))
            .await
            .unwrap();
        let err = authorize(&state, Some(&session), &request(&launch_id))
            .await
            .unwrap_err();
        assert!(matches!(err, LtiError::HardFailure(_)));
    }

    #[tokio::test]
    async fn test_unsupported_response_type() {
        let state = seeded_state();
        let (session, launch_id) = prepared(&state).await;
        let mut req = request(&launch_id);
        req.response_type = Some("token".into());

        let response = authorize(&state, Some(&session), &req).await.unwrap();
        assert_eq!(response.error(), Some("unsupported_response_type"));
        assert!(response.param("id_token").is_none());
    }

    #[tokio::test]
    async fn test_check_order_first_failure_wins() {
        let state = seeded_state();
        let (session, launch_id) = prepared(&state).await;
        let mut req = request(&launch_id);
        req.scope = Some("profile".into());
        req.response_type = Some("token".into());
        req.client_id = Some("other".into());

        let response = authorize(&state, Some(&session), &req).await.unwrap();
        assert_eq!(response.error(), Some("invalid_scope"));
    }

    #[tokio::test]
    async fn test_missing_parameter_is_invalid_request() {
        let state = seeded_state();
        let (session, launch_id) = prepared(&state).await;
        let mut req = request(&launch_id);
        req.nonce = None;

        let response = authorize(&state, Some(&session), &req).await.unwrap();
        assert_eq!(response.error(), Some("invalid_request"));
        assert_eq!(
            response.param("error_description"),
            Some("No launch id in LTI hint")
        );
    }

    #[tokio::test]
    async fn test_client_and_user_mismatch() {
        let state = seeded_state();
        let (session, launch_id) = prepared(&state).await;
        let mut req = request(&launch_id);
        req.client_id = Some("other".into());
        let response = authorize(&state, Some(&session), &req).await.unwrap();
        assert_eq!(response.error(), Some("unauthorized_client"));

        let (session, launch_id) = prepared(&state).await;
        let mut req = request(&launch_id);
        req.login_hint = Some("user-2".into());
        let response = authorize(&state, Some(&session), &req).await.unwrap();
        assert_eq!(response.error(), Some("access_denied"));
    }

    #[tokio::test]
    async fn test_unregistered_redirect_uri_is_hard_failure() {
        let state = seeded_state();
        let (session, launch_id) = prepared(&state).await;
        let mut req = request(&launch_id);
        req.redirect_uri = Some("https://evil.example/steal".into());
        req.response_type = Some("token".into());

        let err = authorize(&state, Some(&session), &req).await.unwrap_err();
        assert!(matches!(err, LtiError::HardFailure(_)));
    }

    #[tokio::test]
    async fn test_response_mode_and_prompt() {
        let state = seeded_state();

        let (session, launch_id) = prepared(&state).await;
        let mut req = request(&launch_id);
        req.response_mode = None;
        let response = authorize(&state, Some(&session), &req).await.unwrap();
        assert_eq!(response.param("error_description"), Some("Missing response_mode"));

        let (session, launch_id) = prepared(&state).await;
        let mut req = request(&launch_id);
        req.response_mode = Some("query".into());
        let response = authorize(&state, Some(&session), &req).await.unwrap();
        assert_eq!(response.param("error_description"), Some("Invalid response_mode"));

        let (session, launch_id) = prepared(&state).await;
        let mut req = request(&launch_id);
        req.prompt = Some("login".into());
        let response = authorize(&state, Some(&session), &req).await.unwrap();
        assert_eq!(response.param("error_description"), Some("Invalid prompt"));

        let (session, launch_id) = prepared(&state).await;
        let mut req = request(&launch_id);
        req.prompt = Some("none".into());
        let response = authorize(&state, Some(&session), &req).await.unwrap();
        assert!(response.error().is_none());
    }

    #[test]
    fn test_launch_id_decoding() {
        assert_eq!(
            launch_id(Some(&r#"{"launchid":"abc"}"#.to_string())).as_deref(),
            Some("abc")
        );
        assert!(launch_id(Some(&"{}".to_string())).is_none());
        assert!(launch_id(Some(&"not json".to_string())).is_none());
        assert!(launch_id(None).is_none());
    }
}
