//! EULA deployment resource: whether a context requires EULA acceptance.

use super::eula::{check_context, invalid_request_data};
use super::{ServiceContext, ServiceResource, ServiceResponse, SCOPE_EULA};
use crate::store::EulaDeployment as DeploymentRecord;
use async_trait::async_trait;
use serde_json::{json, Value};

pub const EULA_DEPLOYMENT_FORMAT: &str = "application/vnd.ims.lis.v2.euladeployment+json";

static FORMATS: &[&str] = &[EULA_DEPLOYMENT_FORMAT, "application/json", "text/plain"];

pub struct EulaDeployment;

fn eula_required(body: &Value) -> Option<bool> {
    match body.get("eulaRequired")? {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_i64().map(|n| n != 0),
        Value::String(s) => Some(s == "true" || s == "1"),
        _ => None,
    }
}

#[async_trait]
impl ServiceResource for EulaDeployment {
    fn id(&self) -> &'static str {
        "EULA DEPLOYMENT"
    }

    fn template(&self) -> &'static str {
        "/{deployment_id}/api/lti/eula/deployment"
    }

    fn methods(&self) -> &'static [&'static str] {
        &["PUT"]
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
        let Some(required) = ctx.json_body().as_ref().and_then(eula_required) else {
            return invalid_request_data();
        };

        let record = DeploymentRecord {
            context_id,
            eula_required: required,
        };
        match ctx.state.assets.put_eula_deployment(record).await {
            Ok(()) => {
                tracing::info!(tool_id = %ctx.tool.id, context_id = %context_id, required, "EULA deployment updated");
                let text = "EULA deployment updated.";
                ServiceResponse::json(201, "application/json", &json!({ "reason": text, "text": text }))
            }
            Err(_) => {
                let text = "Failed to update EULA DEPLOYMENT.";
                ServiceResponse::json(400, "application/json", &json!({ "reason": text, "text": text }))
                    .with_reason(text)
            }
        }
    }
}
