//! Asset reports left by a tool on an activity's resources.

use super::{ServiceContext, ServiceResource, ServiceResponse, SCOPE_ASSET_REPORT};
use async_trait::async_trait;
use ltix_core::ActivityId;
use serde_json::Value;

pub const ASSET_REPORTS_FORMAT: &str = "application/vnd.ims.lis.v2.assetreports+json";

static FORMATS: &[&str] = &[ASSET_REPORTS_FORMAT];

pub struct AssetReports;

#[async_trait]
impl ServiceResource for AssetReports {
    fn id(&self) -> &'static str {
        "AssetReports"
    }

    fn template(&self) -> &'static str {
        "/api/lti/activity/{activity_id}/resource/{resource_id}/reports"
    }

    fn methods(&self) -> &'static [&'static str] {
        &["GET"]
    }

    fn formats(&self) -> &'static [&'static str] {
        FORMATS
    }

    fn required_scope(&self) -> &'static str {
        SCOPE_ASSET_REPORT
    }

    async fn execute(&self, ctx: &ServiceContext<'_>) -> ServiceResponse {
        let Ok(activity_id) = ctx.param("activity_id").parse::<ActivityId>() else {
            return ServiceResponse::status(404);
        };
        let activity = match ctx.state.registry.find_activity(activity_id).await {
            Ok(Some(activity)) => activity,
            Ok(None) => return ServiceResponse::status(404),
            Err(e) => return ServiceResponse::status(500).with_reason(e.to_string()),
        };
        if activity.type_id != ctx.tool.id {
            return ServiceResponse::status(403).with_reason("Not allowed in context");
        }

        match ctx
            .state
            .assets
            .asset_reports(activity.id, ctx.param("resource_id"))
            .await
        {
            Ok(reports) => ServiceResponse::json(200, ASSET_REPORTS_FORMAT, &Value::Array(reports)),
            Err(e) => ServiceResponse::status(500).with_reason(e.to_string()),
        }
    }
}
