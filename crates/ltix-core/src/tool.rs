//! Registered tools and their launch configuration.
//!
//! Tool types and proxies are owned by the registry; the engine only reads
//! them. [`ToolConfig`] is the merged per-tool configuration returned by
//! [`crate::ToolRegistry::get_type_config`].

use crate::error::CoreError;
use crate::ids::{CourseId, ToolProxyId, ToolTypeId};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// LTI protocol version a tool speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LtiVersion {
    /// LTI 1.0 / 1.1, OAuth1-signed form launches.
    #[default]
    #[serde(rename = "LTI-1p0")]
    V1p0,
    /// LTI 2.0 tool proxies, OAuth1-signed with the proxy secret.
    #[serde(rename = "LTI-2p0")]
    V2p0,
    /// LTI 1.3, OIDC login with RS256 id_tokens.
    #[serde(rename = "1.3.0")]
    V1p3,
}

impl LtiVersion {
    /// Value sent as `lti_version` in launch parameters.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::V1p0 => "LTI-1p0",
            Self::V2p0 => "LTI-2p0",
            Self::V1p3 => "1.3.0",
        }
    }

    /// True for versions that launch with an OAuth1 signature.
    #[must_use]
    pub const fn uses_oauth1(&self) -> bool {
        matches!(self, Self::V1p0 | Self::V2p0)
    }
}

/// Where a tool may be picked by teachers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CourseVisibility {
    /// Not offered; only URL matching can reach it.
    No,
    /// Offered as a preconfigured tool.
    #[default]
    Preconfigured,
    /// Offered in the activity chooser.
    ActivityChooser,
}

impl CourseVisibility {
    /// Whether the tool is offered to courses at all.
    #[must_use]
    pub const fn is_offered(&self) -> bool {
        !matches!(self, Self::No)
    }
}

/// Administrative state of a tool registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ToolState {
    /// Approved and usable.
    Configured,
    /// Awaiting approval.
    #[default]
    Pending,
    /// Refused by an administrator.
    Rejected,
}

/// How an LTI 1.3 tool publishes its verification key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KeyType {
    /// A PEM-encoded RSA public key stored in the configuration.
    RsaKey,
    /// A JWKS URL fetched on demand.
    JwkKeyset,
}

/// A registered external tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolType {
    pub id: ToolTypeId,
    pub name: String,
    /// Launch URL the tool was registered with.
    pub base_url: String,
    /// Domain used to shortlist tools during URL matching.
    #[serde(default)]
    pub tool_domain: String,
    #[serde(default)]
    pub lti_version: LtiVersion,
    /// OAuth2 client id; mandatory for LTI 1.3 tools, unique when present.
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub course_visible: CourseVisibility,
    /// Owning course; the site course makes the tool global.
    #[serde(default = "CourseId::site")]
    pub course_id: CourseId,
    #[serde(default)]
    pub state: ToolState,
    /// Legacy LTI 2 registration this tool belongs to.
    #[serde(default)]
    pub tool_proxy_id: Option<ToolProxyId>,
    #[serde(default)]
    pub description: Option<String>,
}

impl ToolType {
    /// New pending LTI 1.0 site tool.
    #[must_use]
    pub fn new(id: ToolTypeId, name: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            base_url: base_url.into(),
            tool_domain: String::new(),
            lti_version: LtiVersion::V1p0,
            client_id: None,
            course_visible: CourseVisibility::Preconfigured,
            course_id: CourseId::site(),
            state: ToolState::Pending,
            tool_proxy_id: None,
            description: None,
        }
    }

    /// True when the tool is global rather than owned by one course.
    #[must_use]
    pub fn is_site_tool(&self) -> bool {
        self.course_id.is_site()
    }

    /// True when the tool may be used inside `course`.
    #[must_use]
    pub fn is_allowed_in(&self, course: CourseId) -> bool {
        self.is_site_tool() || self.course_id == course
    }

    /// Generates a client id for an LTI 1.3 tool that has none.
    pub fn ensure_client_id(&mut self) {
        if self.lti_version == LtiVersion::V1p3
            && self.client_id.as_deref().map_or(true, str::is_empty)
        {
            self.client_id = Some(random_token(8));
        }
    }

    /// Checks registry invariants.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.lti_version == LtiVersion::V1p3
            && self.client_id.as_deref().map_or(true, str::is_empty)
        {
            return Err(CoreError::MissingClientId { tool: self.id.get() });
        }
        Ok(())
    }
}

/// Legacy LTI 2 registration carrying a shared GUID/secret pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolProxy {
    pub id: ToolProxyId,
    pub name: String,
    /// Consumer key used for OAuth1 signing.
    pub guid: String,
    /// Shared secret used for OAuth1 signing.
    pub secret: String,
    #[serde(default)]
    pub state: ToolState,
    #[serde(default)]
    pub capabilities_offered: Vec<String>,
    #[serde(default)]
    pub services_offered: Vec<String>,
}

impl ToolProxy {
    /// New pending proxy with a random GUID and secret.
    #[must_use]
    pub fn generate(id: ToolProxyId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            guid: random_token(10),
            secret: random_token(16),
            state: ToolState::Pending,
            capabilities_offered: Vec::new(),
            services_offered: Vec::new(),
        }
    }
}

/// Merged launch configuration of a tool type.
///
/// Well-known keys are typed; everything else (service subscriptions, vendor
/// extensions) lands in [`ToolConfig::extensions`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolConfig {
    pub tool_url: Option<String>,
    /// Launch URL for content-item selection requests.
    pub content_item_url: Option<String>,
    /// OAuth1 consumer key.
    pub resource_key: Option<String>,
    /// OAuth1 shared secret.
    pub password: Option<String>,
    pub key_type: Option<KeyType>,
    /// PEM public key for [`KeyType::RsaKey`].
    pub public_key: Option<String>,
    /// JWKS URL for [`KeyType::JwkKeyset`].
    pub public_keyset_url: Option<String>,
    pub initiate_login_url: Option<String>,
    /// Allowed redirect URIs, one per line.
    pub redirection_uris: Option<String>,
    /// `name=value` pairs, one per line.
    pub custom_parameters: Option<String>,
    pub send_name: bool,
    pub send_email: bool,
    pub accept_grades: bool,
    pub force_ssl: bool,
    /// Salt mixed into result source id hashes.
    pub service_salt: Option<String>,
    #[serde(flatten)]
    pub extensions: BTreeMap<String, String>,
}

impl ToolConfig {
    /// Builds a config from registry `(name, value)` rows.
    ///
    /// Names may carry the `lti_` storage prefix; unknown names are kept as
    /// extensions under their stored name.
    pub fn from_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut config = Self::default();
        for (name, value) in entries {
            let (name, value) = (name.into(), value.into());
            let key = name.strip_prefix("lti_").unwrap_or(&name);
            let text = || Some(value.clone()).filter(|v| !v.is_empty());
            match key {
                "toolurl" => config.tool_url = text(),
                "toolurl_ContentItemSelectionRequest" => config.content_item_url = text(),
                "resourcekey" => config.resource_key = text(),
                "password" => config.password = text(),
                "keytype" => {
                    config.key_type = match value.as_str() {
                        "RSA_KEY" => Some(KeyType::RsaKey),
                        "JWK_KEYSET" => Some(KeyType::JwkKeyset),
                        _ => None,
                    }
                }
                "publickey" => config.public_key = text(),
                "publickeyset" => config.public_keyset_url = text(),
                "initiatelogin" => config.initiate_login_url = text(),
                "redirectionuris" => config.redirection_uris = text(),
                "customparameters" => config.custom_parameters = text(),
                "sendname" => config.send_name = value == "1",
                "sendemailaddr" => config.send_email = value == "1",
                "acceptgrades" => config.accept_grades = value == "1",
                "forcessl" => config.force_ssl = value == "1",
                "servicesalt" => config.service_salt = text(),
                _ => {
                    config.extensions.insert(name.clone(), value);
                }
            }
        }
        config
    }

    /// Allowed redirect URIs, trimmed, blank lines dropped.
    pub fn redirect_uris(&self) -> impl Iterator<Item = &str> {
        self.redirection_uris
            .as_deref()
            .unwrap_or_default()
            .split('\n')
            .map(str::trim)
            .filter(|uri| !uri.is_empty())
    }

    /// Exact membership test against [`ToolConfig::redirect_uris`].
    #[must_use]
    pub fn allows_redirect_uri(&self, uri: &str) -> bool {
        self.redirect_uris().any(|allowed| allowed == uri)
    }

    /// Extension value for `key`.
    #[must_use]
    pub fn extension(&self, key: &str) -> Option<&str> {
        self.extensions.get(key).map(String::as_str)
    }

    /// Key type, defaulting to a stored RSA key.
    #[must_use]
    pub fn resolved_key_type(&self) -> KeyType {
        self.key_type.unwrap_or(KeyType::RsaKey)
    }

    /// Fills in defaults a freshly registered configuration needs.
    pub fn ensure_service_salt(&mut self) {
        if self.service_salt.as_deref().map_or(true, str::is_empty) {
            self.service_salt = Some(random_token(8));
        }
    }
}

fn random_token(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}
