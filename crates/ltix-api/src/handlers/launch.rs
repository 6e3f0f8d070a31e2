//! Launch entry points for signed-in platform users.

use crate::error::LtiError;
use crate::html;
use crate::middleware::extract_session_cookie;
use crate::router::LtiState;
use crate::services::LaunchBuilder;
use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
};
use base64::{engine::general_purpose::STANDARD, Engine};
use ltix_core::{ActivityId, CourseId, PlatformUser, SessionId, ToolTypeId};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct LaunchQuery {
    pub id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ContentItemQuery {
    pub course: Option<String>,
    pub id: Option<String>,
    /// Base64-encoded.
    pub title: Option<String>,
    /// Base64-encoded.
    pub text: Option<String>,
}

/// `GET /launch?id=<activity>`
pub async fn launch_handler(
    State(state): State<LtiState>,
    headers: HeaderMap,
    Query(query): Query<LaunchQuery>,
) -> Response {
    let (session, viewer) = match viewer(&state, &headers).await {
        Ok(Some(found)) => found,
        Ok(None) => return login_required(),
        Err(e) => return e.into_response(),
    };
    let activity_id: ActivityId = match required(query.id.as_deref(), "id") {
        Ok(id) => id,
        Err(e) => return e.into_response(),
    };

    match LaunchBuilder::new(&state)
        .launch_activity(&session, &viewer, activity_id)
        .await
    {
        Ok(launch) => {
            tracing::info!(
                activity_id = %activity_id,
                user_id = %viewer.id,
                signed = launch.is_signed(),
                "Launching activity"
            );
            Html(launch.to_form()).into_response()
        }
        Err(e) => e.into_response(),
    }
}

/// `GET /contentitem?course=&id=<tool type>&title=&text=`
pub async fn content_item_handler(
    State(state): State<LtiState>,
    headers: HeaderMap,
    Query(query): Query<ContentItemQuery>,
) -> Response {
    let (session, viewer) = match viewer(&state, &headers).await {
        Ok(Some(found)) => found,
        Ok(None) => return login_required(),
        Err(e) => return e.into_response(),
    };
    let ids = required::<CourseId>(query.course.as_deref(), "course")
        .and_then(|course| Ok((course, required::<ToolTypeId>(query.id.as_deref(), "id")?)));
    let (course_id, type_id) = match ids {
        Ok(ids) => ids,
        Err(e) => return e.into_response(),
    };
    let title = decode_text(query.title.as_deref());
    let text = decode_text(query.text.as_deref());

    match LaunchBuilder::new(&state)
        .start_content_item(&session, &viewer, course_id, type_id, &title, &text)
        .await
    {
        Ok(launch) => {
            tracing::info!(course_id = %course_id, tool_id = %type_id, "Starting content-item selection");
            Html(launch.to_form()).into_response()
        }
        Err(e) => e.into_response(),
    }
}

/// Session and user behind the request's session cookie.
async fn viewer(
    state: &LtiState,
    headers: &HeaderMap,
) -> Result<Option<(SessionId, PlatformUser)>, LtiError> {
    let Some(session) = extract_session_cookie(headers) else {
        return Ok(None);
    };
    let Some(user_id) = state.sessions.authenticated_user(&session).await? else {
        return Ok(None);
    };
    Ok(state
        .registry
        .find_user(&user_id)
        .await?
        .map(|user| (session, user)))
}

fn required<T: std::str::FromStr>(value: Option<&str>, name: &str) -> Result<T, LtiError> {
    value
        .and_then(|v| v.parse().ok())
        .ok_or_else(|| LtiError::BadRequest(format!("Missing or invalid parameter {name}")))
}

fn decode_text(value: Option<&str>) -> String {
    value
        .and_then(|v| STANDARD.decode(v).ok())
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .unwrap_or_default()
}

fn login_required() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Html(html::error_page("You must be signed in to launch a tool")),
    )
        .into_response()
}
