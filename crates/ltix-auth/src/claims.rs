//! LTI 1.3 launch claim set.
//!
//! Launch parameters are assembled with their LTI 1.1 names. [`LaunchClaimsBuilder`]
//! maps them onto the IMS claim namespace so the same parameter bag can be sent
//! either as an OAuth1 form or as an id_token.

use chrono::Utc;
use ltix_core::MessageType;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Prefix of every IMS LTI claim name.
pub const LTI_CLAIM_PREFIX: &str = "https://purl.imsglobal.org/spec/lti";

/// Version string placed in the `version` claim.
const LTI_1P3_VERSION: &str = "1.3.0";

/// Default id_token lifetime in seconds.
const DEFAULT_ID_TOKEN_LIFETIME_SECS: i64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClaimKind {
    Str,
    Array,
    Bool,
    Int,
}

#[derive(Debug, Clone, Copy)]
enum ClaimGroup {
    /// Registered JWT/OIDC claim at the top of the payload (`sub`, `email`).
    TopLevel,
    /// `<prefix>/claim/<claim>`
    Direct,
    /// `<prefix>/claim/<group>` object holding `<claim>`.
    Nested(&'static str),
}

#[derive(Debug, Clone, Copy)]
struct ClaimMapping {
    param: &'static str,
    suffix: &'static str,
    group: ClaimGroup,
    claim: &'static str,
    kind: ClaimKind,
}

const fn map(
    param: &'static str,
    suffix: &'static str,
    group: ClaimGroup,
    claim: &'static str,
    kind: ClaimKind,
) -> ClaimMapping {
    ClaimMapping {
        param,
        suffix,
        group,
        claim,
        kind,
    }
}

use ClaimGroup::{Direct, Nested, TopLevel};
use ClaimKind::{Array, Bool, Int, Str};

const DL: ClaimGroup = Nested("deep_linking_settings");

static CLAIM_MAPPINGS: &[ClaimMapping] = &[
    map("accept_copy_advice", "dl", DL, "copyAdvice", Bool),
    map("accept_media_types", "dl", DL, "accept_media_types", Str),
    map("accept_multiple", "dl", DL, "accept_multiple", Bool),
    map(
        "accept_presentation_document_targets",
        "dl",
        DL,
        "accept_presentation_document_targets",
        Array,
    ),
    map("accept_types", "dl", DL, "accept_types", Array),
    map("accept_unsigned", "dl", DL, "accept_unsigned", Bool),
    map("auto_create", "dl", DL, "auto_create", Bool),
    map("can_confirm", "dl", DL, "can_confirm", Bool),
    map("content_item_return_url", "dl", DL, "deep_link_return_url", Str),
    map("content_items", "dl", Direct, "content_items", Str),
    map("data", "dl", DL, "data", Str),
    map("text", "dl", DL, "text", Str),
    map("title", "dl", DL, "title", Str),
    map("lti_msg", "dl", Direct, "msg", Str),
    map("lti_log", "dl", Direct, "log", Str),
    map("lti_errormsg", "dl", Direct, "errormsg", Str),
    map("lti_errorlog", "dl", Direct, "errorlog", Str),
    map("context_id", "", Nested("context"), "id", Str),
    map("context_label", "", Nested("context"), "label", Str),
    map("context_title", "", Nested("context"), "title", Str),
    map("context_type", "", Nested("context"), "type", Array),
    map(
        "lis_course_offering_sourcedid",
        "",
        Nested("lis"),
        "course_offering_sourcedid",
        Str,
    ),
    map(
        "lis_course_section_sourcedid",
        "",
        Nested("lis"),
        "course_section_sourcedid",
        Str,
    ),
    map("lis_person_sourcedid", "", Nested("lis"), "person_sourcedid", Str),
    map(
        "launch_presentation_css_url",
        "",
        Nested("launch_presentation"),
        "css_url",
        Str,
    ),
    map(
        "launch_presentation_document_target",
        "",
        Nested("launch_presentation"),
        "document_target",
        Str,
    ),
    map(
        "launch_presentation_height",
        "",
        Nested("launch_presentation"),
        "height",
        Int,
    ),
    map(
        "launch_presentation_locale",
        "",
        Nested("launch_presentation"),
        "locale",
        Str,
    ),
    map(
        "launch_presentation_return_url",
        "",
        Nested("launch_presentation"),
        "return_url",
        Str,
    ),
    map(
        "launch_presentation_width",
        "",
        Nested("launch_presentation"),
        "width",
        Int,
    ),
    map(
        "lis_outcome_service_url",
        "bo",
        Nested("basicoutcome"),
        "lis_outcome_service_url",
        Str,
    ),
    map(
        "lis_result_sourcedid",
        "bo",
        Nested("basicoutcome"),
        "lis_result_sourcedid",
        Str,
    ),
    map("lis_person_contact_email_primary", "", TopLevel, "email", Str),
    map("lis_person_name_family", "", TopLevel, "family_name", Str),
    map("lis_person_name_full", "", TopLevel, "name", Str),
    map("lis_person_name_given", "", TopLevel, "given_name", Str),
    map("user_id", "", TopLevel, "sub", Str),
    map("user_image", "", TopLevel, "picture", Str),
    map("lti_message_type", "", Direct, "message_type", Str),
    map("lti_version", "", Direct, "version", Str),
    map("deployment_id", "", Direct, "deployment_id", Str),
    map("target_link_uri", "", Direct, "target_link_uri", Str),
    map("roles", "", Direct, "roles", Array),
    map("role_scope_mentor", "", Direct, "role_scope_mentor", Array),
    map("resource_link_id", "", Nested("resource_link"), "id", Str),
    map("resource_link_title", "", Nested("resource_link"), "title", Str),
    map(
        "resource_link_description",
        "",
        Nested("resource_link"),
        "description",
        Str,
    ),
    map(
        "tool_consumer_info_product_family_code",
        "",
        Nested("tool_platform"),
        "product_family_code",
        Str,
    ),
    map(
        "tool_consumer_info_version",
        "",
        Nested("tool_platform"),
        "version",
        Str,
    ),
    map(
        "tool_consumer_instance_contact_email",
        "",
        Nested("tool_platform"),
        "contact_email",
        Str,
    ),
    map(
        "tool_consumer_instance_description",
        "",
        Nested("tool_platform"),
        "description",
        Str,
    ),
    map(
        "tool_consumer_instance_guid",
        "",
        Nested("tool_platform"),
        "guid",
        Str,
    ),
    map(
        "tool_consumer_instance_name",
        "",
        Nested("tool_platform"),
        "name",
        Str,
    ),
    map(
        "tool_consumer_instance_url",
        "",
        Nested("tool_platform"),
        "url",
        Str,
    ),
];

fn claim_base(suffix: &str) -> String {
    if suffix.is_empty() {
        format!("{LTI_CLAIM_PREFIX}/claim/")
    } else {
        format!("{LTI_CLAIM_PREFIX}-{suffix}/claim/")
    }
}

fn convert(kind: ClaimKind, param: &str, value: &str) -> Value {
    match kind {
        Str => {
            // Outbound parameters are already renamed for 1.3 by the message type claim.
            if param == "lti_message_type" {
                if let Some(message_type) = MessageType::from_lti1_name(value) {
                    return Value::String(message_type.lti13_name().to_string());
                }
            }
            if param == "lti_version" {
                return Value::String(LTI_1P3_VERSION.to_string());
            }
            Value::String(value.to_string())
        }
        Array => Value::Array(
            value
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| Value::String(s.to_string()))
                .collect(),
        ),
        Bool => Value::Bool(value.eq_ignore_ascii_case("true")),
        Int => value
            .trim()
            .parse::<i64>()
            .map(Value::from)
            .unwrap_or(Value::Null),
    }
}

/// The payload of an LTI 1.3 id_token.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LaunchClaims(Map<String, Value>);

impl LaunchClaims {
    pub fn builder() -> LaunchClaimsBuilder {
        LaunchClaimsBuilder::default()
    }

    /// Raw access to a top-level claim.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// A claim under the core LTI namespace, e.g. `lti_claim("message_type")`.
    pub fn lti_claim(&self, name: &str) -> Option<&Value> {
        self.0.get(&format!("{LTI_CLAIM_PREFIX}/claim/{name}"))
    }

    pub fn custom(&self) -> Option<&Map<String, Value>> {
        self.lti_claim("custom").and_then(Value::as_object)
    }

    pub fn aud(&self) -> Option<&str> {
        self.get("aud").and_then(Value::as_str)
    }

    pub fn nonce(&self) -> Option<&str> {
        self.get("nonce").and_then(Value::as_str)
    }

    pub fn sub(&self) -> Option<&str> {
        self.get("sub").and_then(Value::as_str)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

/// Builder for [`LaunchClaims`].
#[derive(Debug, Default)]
pub struct LaunchClaimsBuilder {
    issuer: Option<String>,
    audience: Option<String>,
    subject: Option<String>,
    nonce: Option<String>,
    deployment_id: Option<String>,
    expires_in_secs: Option<i64>,
    params: BTreeMap<String, String>,
}

impl LaunchClaimsBuilder {
    #[must_use]
    pub fn issuer(mut self, iss: impl Into<String>) -> Self {
        self.issuer = Some(iss.into());
        self
    }

    /// The tool's client id.
    #[must_use]
    pub fn audience(mut self, client_id: impl Into<String>) -> Self {
        self.audience = Some(client_id.into());
        self
    }

    #[must_use]
    pub fn subject(mut self, sub: impl Into<String>) -> Self {
        self.subject = Some(sub.into());
        self
    }

    #[must_use]
    pub fn nonce(mut self, nonce: impl Into<String>) -> Self {
        self.nonce = Some(nonce.into());
        self
    }

    #[must_use]
    pub fn deployment_id(mut self, deployment_id: impl Into<String>) -> Self {
        self.deployment_id = Some(deployment_id.into());
        self
    }

    #[must_use]
    pub fn expires_in_secs(mut self, secs: i64) -> Self {
        self.expires_in_secs = Some(secs);
        self
    }

    /// Launch parameters under their LTI 1.1 names.
    #[must_use]
    pub fn params(mut self, params: &BTreeMap<String, String>) -> Self {
        self.params
            .extend(params.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    pub fn build(self) -> LaunchClaims {
        let now = Utc::now().timestamp();
        let lifetime = self
            .expires_in_secs
            .unwrap_or(DEFAULT_ID_TOKEN_LIFETIME_SECS);

        let mut payload = Map::new();
        if let Some(nonce) = self.nonce {
            payload.insert("nonce".into(), Value::String(nonce));
        }
        payload.insert("iat".into(), Value::from(now));
        payload.insert("exp".into(), Value::from(now + lifetime));
        if let Some(iss) = self.issuer {
            payload.insert("iss".into(), Value::String(iss));
        }
        if let Some(aud) = self.audience {
            payload.insert("aud".into(), Value::String(aud));
        }

        let mut custom = Map::new();
        let mut ext = Map::new();

        for (key, value) in &self.params {
            if let Some(mapping) = CLAIM_MAPPINGS.iter().find(|m| m.param == key.as_str()) {
                let converted = convert(mapping.kind, key, value);
                match mapping.group {
                    TopLevel => {
                        payload.insert(mapping.claim.to_string(), converted);
                    }
                    Direct => {
                        payload.insert(
                            format!("{}{}", claim_base(mapping.suffix), mapping.claim),
                            converted,
                        );
                    }
                    Nested(group) => {
                        let name = format!("{}{group}", claim_base(mapping.suffix));
                        let entry = payload
                            .entry(name)
                            .or_insert_with(|| Value::Object(Map::new()));
                        if let Value::Object(object) = entry {
                            object.insert(mapping.claim.to_string(), converted);
                        }
                    }
                }
            } else if let Some(name) = key.strip_prefix("custom_") {
                custom.insert(name.to_string(), Value::String(value.clone()));
            } else if let Some(name) = key.strip_prefix("ext_") {
                ext.insert(name.to_string(), Value::String(value.clone()));
            }
        }

        if let Some(deployment_id) = self.deployment_id {
            payload.insert(
                format!("{LTI_CLAIM_PREFIX}/claim/deployment_id"),
                Value::String(deployment_id),
            );
        }
        if let Some(sub) = self.subject {
            payload.insert("sub".into(), Value::String(sub));
        }
        if !custom.is_empty() {
            payload.insert(
                format!("{LTI_CLAIM_PREFIX}/claim/custom"),
                Value::Object(custom),
            );
        }
        if !ext.is_empty() {
            payload.insert(format!("{LTI_CLAIM_PREFIX}/claim/ext"), Value::Object(ext));
        }

        LaunchClaims(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_standard_claims() {
        let claims = LaunchClaims::builder()
            .issuer("https://lms.example")
            .audience("client-abc")
            .nonce("n-123")
            .deployment_id("7")
            .build();

        assert_eq!(claims.aud(), Some("client-abc"));
        assert_eq!(claims.nonce(), Some("n-123"));
        assert_eq!(claims.get("iss").unwrap(), "https://lms.example");
        assert_eq!(claims.lti_claim("deployment_id").unwrap(), "7");

        let iat = claims.get("iat").unwrap().as_i64().unwrap();
        let exp = claims.get("exp").unwrap().as_i64().unwrap();
        assert_eq!(exp - iat, 60);
    }

    #[test]
    fn test_message_type_and_version_are_renamed() {
        let claims = LaunchClaims::builder()
            .params(&params(&[
                ("lti_message_type", "basic-lti-launch-request"),
                ("lti_version", "LTI-1p0"),
            ]))
            .build();

        assert_eq!(
            claims.lti_claim("message_type").unwrap(),
            "LtiResourceLinkRequest"
        );
        assert_eq!(claims.lti_claim("version").unwrap(), "1.3.0");

        let claims = LaunchClaims::builder()
            .params(&params(&[(
                "lti_message_type",
                "ContentItemSelectionRequest",
            )]))
            .build();
        assert_eq!(
            claims.lti_claim("message_type").unwrap(),
            "LtiDeepLinkingRequest"
        );
    }

    #[test]
    fn test_nested_and_typed_claims() {
        let claims = LaunchClaims::builder()
            .params(&params(&[
                ("context_id", "42"),
                ("context_title", "Algebra"),
                ("context_type", "CourseSection"),
                ("roles", "Instructor,Learner"),
                ("launch_presentation_width", "640"),
                ("launch_presentation_height", "tall"),
                ("lis_person_name_given", "Ada"),
                ("user_id", "u-1"),
            ]))
            .build();

        let context = claims.lti_claim("context").unwrap();
        assert_eq!(context["id"], "42");
        assert_eq!(context["title"], "Algebra");
        assert_eq!(context["type"], serde_json::json!(["CourseSection"]));

        assert_eq!(
            claims.lti_claim("roles").unwrap(),
            &serde_json::json!(["Instructor", "Learner"])
        );

        let presentation = claims.lti_claim("launch_presentation").unwrap();
        assert_eq!(presentation["width"], 640);
        assert!(presentation["height"].is_null());

        assert_eq!(claims.get("given_name").unwrap(), "Ada");
        assert_eq!(claims.sub(), Some("u-1"));
    }

    #[test]
    fn test_deep_linking_claims_use_suffixed_namespace() {
        let claims = LaunchClaims::builder()
            .params(&params(&[
                ("accept_multiple", "false"),
                ("auto_create", "true"),
                ("accept_types", "link,ltiResourceLink"),
                (
                    "content_item_return_url",
                    "https://lms.example/lti/contentitem_return",
                ),
            ]))
            .build();

        let settings = claims
            .get(&format!(
                "{LTI_CLAIM_PREFIX}-dl/claim/deep_linking_settings"
            ))
            .unwrap();
        assert_eq!(settings["accept_multiple"], false);
        assert_eq!(settings["auto_create"], true);
        assert_eq!(
            settings["accept_types"],
            serde_json::json!(["link", "ltiResourceLink"])
        );
        assert_eq!(
            settings["deep_link_return_url"],
            "https://lms.example/lti/contentitem_return"
        );
    }

    #[test]
    fn test_custom_and_ext_namespaces() {
        let claims = LaunchClaims::builder()
            .params(&params(&[
                ("custom_chapter", "3"),
                ("ext_lms", "ltix"),
                ("unmapped_param", "dropped"),
            ]))
            .build();

        assert_eq!(claims.custom().unwrap()["chapter"], "3");
        assert_eq!(claims.lti_claim("ext").unwrap()["lms"], "ltix");
        assert!(!claims
            .as_map()
            .values()
            .any(|v| v == &Value::String("dropped".into())));
    }

    #[test]
    fn test_subject_overrides_user_id_param() {
        let claims = LaunchClaims::builder()
            .subject("explicit")
            .params(&params(&[("user_id", "from-params")]))
            .build();
        assert_eq!(claims.sub(), Some("explicit"));
    }
}
