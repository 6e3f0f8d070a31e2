//! Asset service: metadata of a submitted file.

use super::{ServiceContext, ServiceResource, ServiceResponse, SCOPE_ASSET_READ};
use async_trait::async_trait;
use serde_json::json;

static FORMATS: &[&str] = &["application/json"];

pub struct AssetService;

#[async_trait]
impl ServiceResource for AssetService {
    fn id(&self) -> &'static str {
        "assetservice"
    }

    fn template(&self) -> &'static str {
        "/api/lti/assetservice/{asset_id}"
    }

    fn methods(&self) -> &'static [&'static str] {
        &["POST"]
    }

    fn formats(&self) -> &'static [&'static str] {
        FORMATS
    }

    fn required_scope(&self) -> &'static str {
        SCOPE_ASSET_READ
    }

    fn auth_failure_status(&self) -> Option<u16> {
        Some(403)
    }

    async fn execute(&self, ctx: &ServiceContext<'_>) -> ServiceResponse {
        let asset_id = ctx.param("asset_id");
        let file = match ctx.state.assets.asset_file(asset_id).await {
            Ok(Some(file)) => file,
            Ok(None) => return ServiceResponse::status(404),
            Err(e) => return ServiceResponse::status(500).with_reason(e.to_string()),
        };

        let url = format!(
            "{}?asset_id={}",
            ctx.state.url("/lti/assetprocessor/download"),
            url::form_urlencoded::byte_serialize(file.asset_id.as_bytes()).collect::<String>()
        );
        ServiceResponse::json(
            200,
            FORMATS[0],
            &json!({
                "asset_id": file.asset_id,
                "url": url,
                "title": file.title,
                "filename": file.filename,
                "sha256_checksum": file.sha256_checksum,
                "timestamp": file.timestamp,
                "size": file.size,
                "content_type": file.content_type,
            }),
        )
    }
}
