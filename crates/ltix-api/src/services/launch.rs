//! Launch construction.
//!
//! A launch starts as a bag of LTI 1.1 parameters. For 1.0/1.1 tools the bag
//! is OAuth1-signed (or sent unsigned when the tool has no key/secret); for
//! 1.3 tools it is mapped to claims and sent as an RS256 `id_token` once the
//! OIDC login handshake completes.

use crate::error::LtiError;
use crate::html;
use crate::router::LtiState;
use ltix_auth::{encode_claims, LaunchClaims, OAuth1Signer};
use ltix_core::{
    ActivityId, Course, CourseId, LaunchHint, LtiActivity, LtiVersion, MessageType,
    PlatformUser, SessionId, ToolConfig, ToolType, ToolTypeId,
};
use rand::Rng;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

const PRODUCT_FAMILY_CODE: &str = "ltix";
const DOCUMENT_TARGET: &str = "iframe";
const LOCALE: &str = "en";

/// One launch: where it goes and what it carries. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchRequest {
    pub endpoint: String,
    pub params: BTreeMap<String, String>,
    pub version: LtiVersion,
}

impl LaunchRequest {
    /// True once an OAuth1 signature or an id_token is attached.
    #[must_use]
    pub fn is_signed(&self) -> bool {
        self.params.contains_key("oauth_signature") || self.params.contains_key("id_token")
    }

    /// Auto-submitting form posting the parameters to the endpoint.
    #[must_use]
    pub fn to_form(&self) -> String {
        html::auto_submit_form(
            &self.endpoint,
            self.params.iter().map(|(k, v)| (k.as_str(), v.as_str())),
        )
    }
}

#[derive(Serialize)]
struct SourcedIdData<'a> {
    instanceid: i64,
    userid: &'a str,
    typeid: i64,
    launchid: String,
}

#[derive(Serialize)]
struct SourcedId<'a> {
    data: SourcedIdData<'a>,
    hash: String,
}

/// Result source id a tool echoes back when returning grades.
pub fn build_sourcedid(
    activity_id: ActivityId,
    user_id: &str,
    type_id: ToolTypeId,
    service_salt: &str,
    launch_id: Option<&str>,
) -> Result<String, LtiError> {
    let data = SourcedIdData {
        instanceid: activity_id.get(),
        userid: user_id,
        typeid: type_id.get(),
        launchid: launch_id
            .filter(|l| !l.is_empty())
            .map_or_else(|| rand::thread_rng().gen::<u32>().to_string(), str::to_string),
    };
    let json = serde_json::to_string(&data).map_err(|e| LtiError::Internal(e.to_string()))?;
    let hash = hex::encode(Sha256::digest(format!("{json}{service_salt}").as_bytes()));
    serde_json::to_string(&SourcedId { data, hash }).map_err(|e| LtiError::Internal(e.to_string()))
}

/// `custom_<name>` parameters from `name=value` lines.
pub fn custom_parameters(lines: &str) -> BTreeMap<String, String> {
    lines
        .lines()
        .filter_map(|line| line.split_once('='))
        .filter(|(name, _)| !name.trim().is_empty())
        .map(|(name, value)| {
            let name: String = name
                .trim()
                .to_lowercase()
                .chars()
                .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
                .collect();
            (format!("custom_{name}"), value.trim().to_string())
        })
        .collect()
}

/// Builds launches against the platform state.
pub struct LaunchBuilder<'a> {
    state: &'a LtiState,
}

impl<'a> LaunchBuilder<'a> {
    #[must_use]
    pub fn new(state: &'a LtiState) -> Self {
        Self { state }
    }

    /// Launch an existing activity for `viewer`.
    ///
    /// 1.0/1.1 tools get the launch form directly. 1.3 tools get a login
    /// initiation form and the launch is built later by the auth endpoint.
    pub async fn launch_activity(
        &self,
        session: &SessionId,
        viewer: &PlatformUser,
        activity_id: ActivityId,
    ) -> Result<LaunchRequest, LtiError> {
        let activity = self
            .state
            .registry
            .find_activity(activity_id)
            .await?
            .ok_or_else(|| LtiError::NotFound(format!("Activity {activity_id}")))?;
        let course = self.course(activity.course_id).await?;
        let (tool, config) = self.tool(activity.type_id, course.id).await?;

        if tool.lti_version == LtiVersion::V1p3 {
            let hint = LaunchHint::activity(course.id, tool.id, activity.id);
            let target = activity
                .tool_url
                .clone()
                .or_else(|| config.tool_url.clone())
                .unwrap_or_else(|| tool.base_url.clone());
            return self
                .initiate_login(session, viewer, &tool, &config, &hint, &target)
                .await;
        }

        self.activity_request(&tool, &config, &activity, &course, viewer, None)
            .await
    }

    /// Start a content-item selection with a tool in a course.
    pub async fn start_content_item(
        &self,
        session: &SessionId,
        viewer: &PlatformUser,
        course_id: CourseId,
        type_id: ToolTypeId,
        title: &str,
        text: &str,
    ) -> Result<LaunchRequest, LtiError> {
        let course = self.course(course_id).await?;
        let (tool, config) = self.tool(type_id, course.id).await?;

        if tool.lti_version == LtiVersion::V1p3 {
            let hint = LaunchHint::content_item(course.id, tool.id, title, text);
            let target = content_item_endpoint(&tool, &config);
            return self
                .initiate_login(session, viewer, &tool, &config, &hint, &target)
                .await;
        }

        self.content_item_request(&tool, &config, &course, viewer, title, text, None)
            .await
    }

    /// Builds the launch a consumed hint describes. Used by the auth endpoint.
    pub async fn launch_from_hint(
        &self,
        hint: &LaunchHint,
        tool: &ToolType,
        config: &ToolConfig,
        user: &PlatformUser,
        nonce: &str,
    ) -> Result<LaunchRequest, LtiError> {
        let course = self.course(hint.course_id).await?;
        match (hint.message_type, hint.activity_id) {
            (MessageType::BasicLaunch, Some(activity_id)) => {
                let activity = self
                    .state
                    .registry
                    .find_activity(activity_id)
                    .await?
                    .ok_or_else(|| LtiError::NotFound(format!("Activity {activity_id}")))?;
                self.activity_request(tool, config, &activity, &course, user, Some(nonce))
                    .await
            }
            _ => {
                self.content_item_request(
                    tool,
                    config,
                    &course,
                    user,
                    &hint.title(),
                    &hint.text(),
                    Some(nonce),
                )
                .await
            }
        }
    }

    pub async fn activity_request(
        &self,
        tool: &ToolType,
        config: &ToolConfig,
        activity: &LtiActivity,
        course: &Course,
        user: &PlatformUser,
        nonce: Option<&str>,
    ) -> Result<LaunchRequest, LtiError> {
        let (key, secret) = self.state.credentials().oauth1_credentials(tool, config).await?;
        let unsigned = tool.lti_version != LtiVersion::V1p3 && (key.is_empty() || secret.is_empty());

        let mut params = self.base_params(tool, config, course, user, MessageType::BasicLaunch);
        params.insert("resource_link_id".into(), activity.id.to_string());
        params.insert("resource_link_title".into(), activity.name.clone());
        params.insert("resource_link_description".into(), activity.intro.clone());

        let mut return_url = format!(
            "{}?course={}&instanceid={}",
            self.state.url("/lti/return"),
            course.id,
            activity.id
        );
        if unsigned {
            return_url.push_str("&unsigned=1");
        }
        params.insert("launch_presentation_return_url".into(), return_url);

        if config.accept_grades {
            let sourcedid = build_sourcedid(
                activity.id,
                &user.id,
                tool.id,
                config.service_salt.as_deref().unwrap_or_default(),
                None,
            )?;
            params.insert("lis_result_sourcedid".into(), sourcedid);
            params.insert(
                "lis_outcome_service_url".into(),
                self.state.url("/lti/service"),
            );
        }

        if let Some(lines) = &config.custom_parameters {
            params.extend(custom_parameters(lines));
        }
        if let Some(lines) = &activity.custom_parameters {
            params.extend(custom_parameters(lines));
        }

        let endpoint = activity
            .tool_url
            .clone()
            .or_else(|| config.tool_url.clone())
            .unwrap_or_else(|| tool.base_url.clone());
        let endpoint = apply_force_ssl(endpoint, config.force_ssl);

        tracing::info!(
            tool_id = %tool.id,
            activity_id = %activity.id,
            version = tool.lti_version.as_str(),
            "Building activity launch"
        );
        self.finish(tool, endpoint, params, user, nonce, &key, &secret)
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn content_item_request(
        &self,
        tool: &ToolType,
        config: &ToolConfig,
        course: &Course,
        user: &PlatformUser,
        title: &str,
        text: &str,
        nonce: Option<&str>,
    ) -> Result<LaunchRequest, LtiError> {
        let (key, secret) = self.state.credentials().oauth1_credentials(tool, config).await?;

        let mut params = self.base_params(tool, config, course, user, MessageType::ContentItemSelection);
        let accept_types = if tool.lti_version == LtiVersion::V1p3 {
            "ltiResourceLink"
        } else {
            "application/vnd.ims.lti.v1.ltilink"
        };
        params.insert("accept_types".into(), accept_types.into());
        params.insert(
            "accept_presentation_document_targets".into(),
            "frame,iframe,window".into(),
        );
        params.insert("accept_multiple".into(), "false".into());
        params.insert("accept_unsigned".into(), "false".into());
        params.insert("auto_create".into(), "false".into());
        params.insert(
            "content_item_return_url".into(),
            format!(
                "{}?course={}&id={}",
                self.state.url("/lti/contentitem_return"),
                course.id,
                tool.id
            ),
        );
        params.insert("title".into(), title.to_string());
        params.insert("text".into(), text.to_string());
        if let Some(lines) = &config.custom_parameters {
            params.extend(custom_parameters(lines));
        }

        let endpoint = apply_force_ssl(content_item_endpoint(tool, config), config.force_ssl);
        tracing::info!(tool_id = %tool.id, course_id = %course.id, "Building content-item request");
        self.finish(tool, endpoint, params, user, nonce, &key, &secret)
    }

    /// Stores a launch hint and returns the form posting to the tool's
    /// login initiation URL.
    pub async fn initiate_login(
        &self,
        session: &SessionId,
        viewer: &PlatformUser,
        tool: &ToolType,
        config: &ToolConfig,
        hint: &LaunchHint,
        target_link_uri: &str,
    ) -> Result<LaunchRequest, LtiError> {
        let endpoint = config
            .initiate_login_url
            .clone()
            .ok_or_else(|| LtiError::HardFailure("Tool has no login initiation URL".into()))?;

        let launch_id = LaunchHint::new_launch_id();
        self.state
            .sessions
            .put(session, &launch_id, hint.to_session_value())
            .await?;

        let mut params = BTreeMap::new();
        params.insert("iss".to_string(), self.state.issuer.clone());
        params.insert("target_link_uri".to_string(), target_link_uri.to_string());
        params.insert("login_hint".to_string(), viewer.id.clone());
        params.insert(
            "lti_message_hint".to_string(),
            serde_json::json!({ "launchid": launch_id }).to_string(),
        );
        params.insert(
            "client_id".to_string(),
            tool.client_id.clone().unwrap_or_default(),
        );
        params.insert("lti_deployment_id".to_string(), tool.id.to_string());

        tracing::info!(tool_id = %tool.id, "Initiating LTI 1.3 login");
        Ok(LaunchRequest {
            endpoint,
            params,
            version: LtiVersion::V1p3,
        })
    }

    fn base_params(
        &self,
        tool: &ToolType,
        config: &ToolConfig,
        course: &Course,
        user: &PlatformUser,
        message_type: MessageType,
    ) -> BTreeMap<String, String> {
        let mut params = BTreeMap::new();
        let version = match tool.lti_version {
            LtiVersion::V1p3 => LtiVersion::V1p3,
            _ => LtiVersion::V1p0,
        };
        params.insert("lti_message_type".into(), message_type.as_str().into());
        params.insert("lti_version".into(), version.as_str().into());
        params.insert("user_id".into(), user.id.clone());
        params.insert("roles".into(), user.roles.join(","));
        params.insert("context_id".into(), course.id.to_string());
        params.insert("context_label".into(), course.short_name.clone());
        params.insert("context_title".into(), course.full_name.clone());
        params.insert("context_type".into(), "CourseSection".into());
        params.insert("launch_presentation_locale".into(), LOCALE.into());
        params.insert(
            "launch_presentation_document_target".into(),
            DOCUMENT_TARGET.into(),
        );
        params.insert(
            "tool_consumer_info_product_family_code".into(),
            PRODUCT_FAMILY_CODE.into(),
        );
        params.insert(
            "tool_consumer_info_version".into(),
            env!("CARGO_PKG_VERSION").into(),
        );
        params.insert("tool_consumer_instance_guid".into(), self.instance_guid());
        params.insert("tool_consumer_instance_url".into(), self.state.issuer.clone());
        params.insert("ext_lms".into(), PRODUCT_FAMILY_CODE.into());

        if config.send_name {
            params.insert("lis_person_name_given".into(), user.given_name.clone());
            params.insert("lis_person_name_family".into(), user.family_name.clone());
            params.insert("lis_person_name_full".into(), user.full_name());
        }
        if config.send_email {
            params.insert(
                "lis_person_contact_email_primary".into(),
                user.email.clone(),
            );
        }
        params
    }

    #[allow(clippy::too_many_arguments)]
    fn finish(
        &self,
        tool: &ToolType,
        endpoint: String,
        mut params: BTreeMap<String, String>,
        user: &PlatformUser,
        nonce: Option<&str>,
        key: &str,
        secret: &str,
    ) -> Result<LaunchRequest, LtiError> {
        if tool.lti_version == LtiVersion::V1p3 {
            params.insert("target_link_uri".into(), endpoint.clone());
            let id_token = self.sign_id_token(tool, &params, user, nonce)?;
            let mut signed = BTreeMap::new();
            signed.insert("id_token".to_string(), id_token);
            return Ok(LaunchRequest {
                endpoint,
                params: signed,
                version: LtiVersion::V1p3,
            });
        }

        if !key.is_empty() && !secret.is_empty() {
            params = OAuth1Signer::new(key, secret).sign("POST", &endpoint, &params)?;
        } else {
            tracing::info!(tool_id = %tool.id, "Sending unsigned launch");
        }
        Ok(LaunchRequest {
            endpoint,
            params,
            version: tool.lti_version,
        })
    }

    fn sign_id_token(
        &self,
        tool: &ToolType,
        params: &BTreeMap<String, String>,
        user: &PlatformUser,
        nonce: Option<&str>,
    ) -> Result<String, LtiError> {
        let client_id = tool
            .client_id
            .as_deref()
            .filter(|c| !c.is_empty())
            .ok_or_else(|| LtiError::HardFailure(format!("Tool {} has no client id", tool.id)))?;
        let key = self
            .state
            .active_signing_key()
            .ok_or_else(|| LtiError::Internal("No active signing key".into()))?;

        let mut builder = LaunchClaims::builder()
            .issuer(self.state.issuer.clone())
            .audience(client_id)
            .subject(user.id.clone())
            .deployment_id(tool.id.to_string())
            .expires_in_secs(self.state.id_token_lifetime_secs)
            .params(params);
        if let Some(nonce) = nonce {
            builder = builder.nonce(nonce);
        }

        Ok(encode_claims(
            &builder.build(),
            key.private_key_pem.as_bytes(),
            Some(&key.kid),
        )?)
    }

    fn instance_guid(&self) -> String {
        url::Url::parse(&self.state.issuer)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_else(|| self.state.issuer.clone())
    }

    async fn course(&self, id: CourseId) -> Result<Course, LtiError> {
        self.state
            .registry
            .find_course(id)
            .await?
            .ok_or_else(|| LtiError::NotFound(format!("Course {id}")))
    }

    async fn tool(&self, id: ToolTypeId, course: CourseId) -> Result<(ToolType, ToolConfig), LtiError> {
        let tool = self
            .state
            .registry
            .find_tool_by_id(id)
            .await?
            .ok_or_else(|| LtiError::NotFound(format!("Tool {id}")))?;
        if !tool.is_allowed_in(course) {
            return Err(LtiError::Forbidden(format!(
                "Tool {id} is not available in course {course}"
            )));
        }
        let config = self.state.registry.get_type_config(id).await?;
        Ok((tool, config))
    }
}

fn content_item_endpoint(tool: &ToolType, config: &ToolConfig) -> String {
    config
        .content_item_url
        .clone()
        .or_else(|| config.tool_url.clone())
        .unwrap_or_else(|| tool.base_url.clone())
}

fn apply_force_ssl(endpoint: String, force_ssl: bool) -> String {
    match endpoint.strip_prefix("http://") {
        Some(rest) if force_ssl => format!("https://{rest}"),
        _ => endpoint,
    }
}
