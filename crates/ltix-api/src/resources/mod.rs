//! LTI service resources.
//!
//! Services are a compile-time registry: each [`LtiService`] grants a set of
//! scopes to tools subscribed through their configuration and owns a list of
//! [`ServiceResource`]s reachable under `/services`.
//!
//! Dispatch order for a service call:
//! 1. resolve the resource by URL template (404)
//! 2. check the HTTP method (405)
//! 3. check the content type against the resource's formats (400)
//! 4. authenticate the tool with a bearer token or an OAuth1 signature and
//!    check the required scope (401/403)
//! 5. when the request names a `type_id`, check it is the authenticated tool (401)
//!
//! Resources with their own auth failure status authenticate before the
//! content type check, so an unauthenticated call to them is always rejected
//! with that status.

mod response;

pub mod asset_reports;
pub mod asset_service;
pub mod eula;
pub mod eula_deployment;

pub use response::{reason_phrase, ServiceResponse};

use crate::error::LtiError;
use crate::router::LtiState;
use crate::services::validate_bearer;
use async_trait::async_trait;
use ltix_auth::{OAuth1Request, VerifyOptions};
use ltix_core::{RequestContext, ToolConfig, ToolType, ToolTypeId};
use std::collections::BTreeMap;

/// Scope for reading and writing asset reports.
pub const SCOPE_ASSET_REPORT: &str = "https://purl.imsglobal.org/spec/lti-ap/scope/report";

/// Scope for managing EULAs and EULA deployments.
pub const SCOPE_EULA: &str = "https://purl.imsglobal.org/spec/lti/scope/eula";

/// Scope for reading submitted asset metadata.
pub const SCOPE_ASSET_READ: &str = "https://purl.imsglobal.org/spec/lti-ap/scope/asset.readonly";

/// Everything a resource sees of an authenticated service call.
pub struct ServiceContext<'a> {
    pub state: &'a LtiState,
    pub request: &'a RequestContext,
    /// Values bound by the resource's URL template.
    pub params: BTreeMap<String, String>,
    /// The authenticated tool.
    pub tool: ToolType,
    pub body: &'a [u8],
}

impl ServiceContext<'_> {
    #[must_use]
    pub fn param(&self, name: &str) -> &str {
        self.params.get(name).map(String::as_str).unwrap_or_default()
    }

    /// Request body parsed as JSON, `None` when it is not valid JSON.
    #[must_use]
    pub fn json_body(&self) -> Option<serde_json::Value> {
        serde_json::from_slice(self.body).ok()
    }
}

#[async_trait]
pub trait ServiceResource: Send + Sync {
    fn id(&self) -> &'static str;

    /// Path template relative to `/services`, e.g. `/api/lti/assetservice/{asset_id}`.
    fn template(&self) -> &'static str;

    /// Accepted HTTP methods, upper-case.
    fn methods(&self) -> &'static [&'static str];

    /// Accepted media types; the first is the resource's own format.
    fn formats(&self) -> &'static [&'static str];

    fn required_scope(&self) -> &'static str;

    /// Status sent for any authentication failure, overriding the default
    /// 401 (bad credentials) / 403 (missing scope) split.
    fn auth_failure_status(&self) -> Option<u16> {
        None
    }

    fn matches_template(&self, path: &str) -> Option<BTreeMap<String, String>> {
        match_template(self.template(), path)
    }

    async fn execute(&self, ctx: &ServiceContext<'_>) -> ServiceResponse;
}

/// A service a tool can subscribe to.
pub struct LtiService {
    pub id: &'static str,
    pub name: &'static str,
    /// Tool configuration key enabling the service (non-zero value).
    pub config_key: &'static str,
    pub scopes: &'static [&'static str],
    pub resources: &'static [&'static dyn ServiceResource],
}

impl LtiService {
    #[must_use]
    pub fn is_enabled_for(&self, config: &ToolConfig) -> bool {
        config
            .extension(self.config_key)
            .is_some_and(|v| !v.is_empty() && v != "0")
    }
}

pub static SERVICES: &[LtiService] = &[LtiService {
    id: "assetprocessor",
    name: "Asset Processor",
    config_key: "ltixservice_assetprocessor",
    scopes: &[SCOPE_ASSET_REPORT, SCOPE_EULA, SCOPE_ASSET_READ],
    resources: &[
        &asset_reports::AssetReports,
        &asset_service::AssetService,
        &eula::Eula,
        &eula_deployment::EulaDeployment,
    ],
}];

/// Scopes granted by every service the configuration enables.
pub fn permitted_scopes(config: &ToolConfig) -> Vec<String> {
    let mut scopes: Vec<String> = Vec::new();
    for service in SERVICES.iter().filter(|s| s.is_enabled_for(config)) {
        for scope in service.scopes {
            if !scopes.iter().any(|s| s == scope) {
                scopes.push((*scope).to_string());
            }
        }
    }
    scopes
}

/// Binds `{name}` segments of `template` to the matching segments of `path`.
pub fn match_template(template: &str, path: &str) -> Option<BTreeMap<String, String>> {
    let template_segments: Vec<&str> = template.trim_matches('/').split('/').collect();
    let path_segments: Vec<&str> = path.trim_matches('/').split('/').collect();
    if template_segments.len() != path_segments.len() {
        return None;
    }

    let mut params = BTreeMap::new();
    for (expected, actual) in template_segments.iter().zip(&path_segments) {
        match expected
            .strip_prefix('{')
            .and_then(|s| s.strip_suffix('}'))
        {
            Some(name) if !actual.is_empty() => {
                params.insert(name.to_string(), (*actual).to_string());
            }
            Some(_) => return None,
            None if expected == actual => {}
            None => return None,
        }
    }
    Some(params)
}

/// The resource serving `path`, with its bound template values.
pub fn find_resource(path: &str) -> Option<(&'static dyn ServiceResource, BTreeMap<String, String>)> {
    SERVICES
        .iter()
        .flat_map(|service| service.resources.iter())
        .find_map(|resource| resource.matches_template(path).map(|params| (*resource, params)))
}

fn auth_failure(resource: &dyn ServiceResource, default: u16) -> ServiceResponse {
    ServiceResponse::status(resource.auth_failure_status().unwrap_or(default))
}

/// Runs a service call through the checks above and the resource.
pub async fn dispatch(
    state: &LtiState,
    request: &RequestContext,
    path: &str,
    body: &[u8],
) -> ServiceResponse {
    let Some((resource, params)) = find_resource(path) else {
        return ServiceResponse::status(404);
    };
    if !resource.methods().contains(&request.method.as_str()) {
        return ServiceResponse::status(405);
    }
    let auth_first = resource.auth_failure_status().is_some();
    if !auth_first {
        if let Err(response) = check_format(request, resource) {
            return response;
        }
    }

    let type_id = match authenticate(state, request, resource).await {
        Ok(type_id) => type_id,
        Err(response) => return response,
    };
    if auth_first {
        if let Err(response) = check_format(request, resource) {
            return response;
        }
    }

    if let Some(requested) = request.param("type_id").filter(|t| !t.is_empty()) {
        if requested.parse::<ToolTypeId>().ok() != Some(type_id) {
            tracing::warn!(tool_id = %type_id, requested, "Service call for another tool");
            return auth_failure(resource, 401);
        }
    }

    let tool = match state.registry.find_tool_by_id(type_id).await {
        Ok(Some(tool)) => tool,
        Ok(None) => return auth_failure(resource, 401),
        Err(e) => {
            tracing::error!(error = %e, "Tool lookup failed during service call");
            return ServiceResponse::status(500);
        }
    };

    let ctx = ServiceContext {
        state,
        request,
        params,
        tool,
        body,
    };
    tracing::debug!(resource = resource.id(), tool_id = %type_id, "Executing service resource");
    resource.execute(&ctx).await
}

fn check_format(request: &RequestContext, resource: &dyn ServiceResource) -> Result<(), ServiceResponse> {
    match request.content_type().filter(|ct| !ct.is_empty()) {
        Some(content_type) if !resource.formats().contains(&content_type.as_str()) => {
            Err(ServiceResponse::status(400).with_reason("Unsupported content type"))
        }
        _ => Ok(()),
    }
}

async fn authenticate(
    state: &LtiState,
    request: &RequestContext,
    resource: &dyn ServiceResource,
) -> Result<ToolTypeId, ServiceResponse> {
    let authorization = request.header("authorization");
    let is_oauth1 = authorization.is_some_and(|h| {
        h.get(..6)
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case("oauth "))
    });

    if !is_oauth1 {
        return match validate_bearer(state, authorization, resource.required_scope()).await {
            Ok(token) => Ok(token.type_id),
            Err(LtiError::Forbidden(_)) => Err(auth_failure(resource, 403)),
            Err(LtiError::Unauthorized(_)) => Err(auth_failure(resource, 401)),
            Err(e) => {
                tracing::error!(error = %e, "Bearer validation failed");
                Err(ServiceResponse::status(500))
            }
        };
    }

    let Some(type_id) = request
        .param("type_id")
        .and_then(|t| t.parse::<ToolTypeId>().ok())
    else {
        return Err(auth_failure(resource, 401));
    };
    let form = if request.content_type().as_deref() == Some("application/x-www-form-urlencoded") {
        request.form.clone()
    } else {
        Vec::new()
    };
    let oauth_request = OAuth1Request::from_parts(&request.method, &request.url, authorization, form)
        .map_err(|_| auth_failure(resource, 401))?;
    let options = VerifyOptions::with_window(state.oauth1_timestamp_window_secs);

    let tool = state
        .credentials()
        .verify_oauth1(type_id, &oauth_request, &options)
        .await
        .map_err(|_| auth_failure(resource, 401))?;

    let config = state
        .registry
        .get_type_config(tool.id)
        .await
        .map_err(|_| ServiceResponse::status(500))?;
    let scopes = state
        .registry
        .permitted_scopes(&tool, &config)
        .await
        .map_err(|_| ServiceResponse::status(500))?;
    if !scopes.iter().any(|s| s == resource.required_scope()) {
        return Err(auth_failure(resource, 403));
    }
    Ok(tool.id)
}
