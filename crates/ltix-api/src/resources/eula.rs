//! EULA acceptance resource.

use super::{ServiceContext, ServiceResource, ServiceResponse, SCOPE_EULA};
use crate::store::EulaAcceptance;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use ltix_core::CourseId;
use serde_json::{json, Value};
use uuid::Uuid;

pub const EULA_FORMAT: &str = "application/vnd.ims.lis.v2.eula+json";

static FORMATS: &[&str] = &[EULA_FORMAT, "application/json", "text/plain"];

const JSON: &str = "application/json";

pub struct Eula;

/// Checks shared by the EULA resources, in order: context and content type,
/// course, tool placement, EULA deployment.
pub(crate) async fn check_context(
    ctx: &ServiceContext<'_>,
    formats: &[&str],
) -> Result<CourseId, ServiceResponse> {
    let deployment_id = ctx.param("deployment_id");
    let content_type = ctx.request.content_type().filter(|ct| !ct.is_empty());
    if deployment_id.is_empty()
        || content_type.is_some_and(|ct| !formats.contains(&ct.as_str()))
    {
        return Err(ServiceResponse::status(400).with_reason("No context or unsupported content type"));
    }

    let not_found =
        || ServiceResponse::status(404).with_reason(format!("Not Found: Course {deployment_id} doesn't exist"));
    let course_id: CourseId = deployment_id.parse().map_err(|_| not_found())?;
    let course = match ctx.state.registry.find_course(course_id).await {
        Ok(Some(course)) => course,
        Ok(None) => return Err(not_found()),
        Err(e) => return Err(ServiceResponse::status(500).with_reason(e.to_string())),
    };

    if !ctx.tool.is_allowed_in(course.id) {
        return Err(ServiceResponse::status(403).with_reason("Not allowed in context"));
    }

    match ctx.state.assets.eula_deployment(course.id).await {
        Ok(Some(_)) => Ok(course.id),
        Ok(None) => {
            Err(ServiceResponse::status(404).with_reason("Not Found: EULA Deployment doesn't exist"))
        }
        Err(e) => Err(ServiceResponse::status(500).with_reason(e.to_string())),
    }
}

pub(crate) fn invalid_request_data() -> ServiceResponse {
    ServiceResponse::json(
        400,
        JSON,
        &json!({ "reason": "Invalid Request Data.", "text": "Invalid Request Data" }),
    )
    .with_reason("Invalid request data.")
}

fn message(status: u16, text: &str) -> ServiceResponse {
    ServiceResponse::json(status, JSON, &json!({ "reason": text, "text": text }))
}

fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => n.as_i64().and_then(|secs| Utc.timestamp_opt(secs, 0).single()),
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .map(|t| t.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                s.parse::<i64>()
                    .ok()
                    .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
            }),
        _ => None,
    }
}

fn parse_accepted(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_i64().map(|n| n != 0),
        Value::String(s) => match s.as_str() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// `userId`, `accepted` and `timestamp` of a POST body.
fn parse_acceptance(body: &Value, context_id: CourseId) -> Option<EulaAcceptance> {
    let user = Uuid::parse_str(body.get("userId")?.as_str()?).ok()?;
    Some(EulaAcceptance {
        context_id,
        user_id: *user.as_bytes(),
        accepted: parse_accepted(body.get("accepted")?)?,
        timestamp: parse_timestamp(body.get("timestamp")?)?,
    })
}

impl Eula {
    async fn post(&self, ctx: &ServiceContext<'_>, context_id: CourseId) -> ServiceResponse {
        let Some(acceptance) = ctx
            .json_body()
            .and_then(|body| parse_acceptance(&body, context_id))
        else {
            return invalid_request_data();
        };

        let existing = match ctx.state.assets.find_eula(context_id, &acceptance.user_id).await {
            Ok(existing) => existing,
            Err(e) => return ServiceResponse::status(500).with_reason(e.to_string()),
        };
        let text = if existing.is_some() {
            "EULA updated."
        } else {
            "EULA inserted."
        };
        match ctx.state.assets.save_eula(acceptance).await {
            Ok(()) => {
                tracing::info!(tool_id = %ctx.tool.id, context_id = %context_id, "{text}");
                message(201, text)
            }
            Err(_) if existing.is_some() => message(400, "Failed to update EULA."),
            Err(_) => message(400, "Failed to insert EULA."),
        }
    }

    async fn delete(&self, ctx: &ServiceContext<'_>, context_id: CourseId) -> ServiceResponse {
        let eulas = match ctx.state.assets.eulas_in_context(context_id).await {
            Ok(eulas) => eulas,
            Err(e) => return ServiceResponse::status(500).with_reason(e.to_string()),
        };
        for eula in eulas {
            let withdrawn = EulaAcceptance {
                accepted: false,
                ..eula
            };
            if let Err(e) = ctx.state.assets.save_eula(withdrawn).await {
                return ServiceResponse::status(500).with_reason(e.to_string());
            }
        }
        ServiceResponse::json(200, JSON, &json!({ "text": "EULA successfully deleted." }))
    }
}

#[async_trait]
impl ServiceResource for Eula {
    fn id(&self) -> &'static str {
        "EULA"
    }

    fn template(&self) -> &'static str {
        "/{deployment_id}/api/lti/eula"
    }

    fn methods(&self) -> &'static [&'static str] {
        &["POST", "DELETE"]
    }

    fn formats(&self) -> &'static [&'static str] {
        FORMATS
    }

    fn required_scope(&self) -> &'static str {
        SCOPE_EULA
    }

    fn auth_failure_status(&self) -> Option<u16> {
        Some(401)
    }

    async fn execute(&self, ctx: &ServiceContext<'_>) -> ServiceResponse {
        let context_id = match check_context(ctx, FORMATS).await {
            Ok(context_id) => context_id,
            Err(response) => return response,
        };
        match ctx.request.method.as_str() {
            "POST" => self.post(ctx, context_id).await,
            "DELETE" => self.delete(ctx, context_id).await,
            _ => ServiceResponse::status(405).with_reason("Invalid request method specified."),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_acceptance() {
        let body = json!({
            "userId": "6f9619ff-8b86-d011-b42d-00c04fc964ff",
            "accepted": true,
            "timestamp": 1_700_000_000
        });
        let eula = parse_acceptance(&body, CourseId::new(5)).unwrap();
        assert!(eula.accepted);
        assert_eq!(eula.user_id[0], 0x6f);
        assert_eq!(eula.timestamp.timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_parse_acceptance_requires_all_fields() {
        let body = json!({ "userId": "6f9619ff-8b86-d011-b42d-00c04fc964ff", "accepted": true });
        assert!(parse_acceptance(&body, CourseId::new(5)).is_none());

        let body = json!({ "userId": "not-a-uuid", "accepted": true, "timestamp": 1 });
        assert!(parse_acceptance(&body, CourseId::new(5)).is_none());
    }

    #[test]
    fn test_timestamp_formats() {
        assert!(parse_timestamp(&json!("2024-01-01T00:00:00Z")).is_some());
        assert!(parse_timestamp(&json!("1700000000")).is_some());
        assert!(parse_timestamp(&json!(null)).is_none());
    }
}
