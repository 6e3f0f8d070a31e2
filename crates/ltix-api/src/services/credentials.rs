//! Credential lookup and inbound signature verification.
//!
//! Which credentials a tool has depends on its LTI version: 1.0/1.1 tools
//! share an OAuth1 key/secret (their own or their tool proxy's), 1.3 tools are
//! identified by client id and verified with a PEM key or a JWKS URL.

use ltix_auth::{
    decode_claims, extract_kid, AuthError, JwksCache, OAuth1Request, OAuth1Signer,
    ValidationConfig, VerifyOptions,
};
use ltix_core::{
    KeyType, LtiVersion, RegistryError, ToolConfig, ToolRegistry, ToolType, ToolTypeId,
};
use std::sync::Arc;
use thiserror::Error;

/// Where a 1.3 tool's verification key comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublicKeySource {
    Pem(String),
    JwksUri(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Shared secret; both may be empty for unsigned launches.
    OAuth1 { key: String, secret: String },
    Jwt {
        client_id: String,
        key: Option<PublicKeySource>,
    },
}

/// How the caller identifies the tool.
#[derive(Debug, Clone, Copy)]
pub enum Lookup<'a> {
    TypeId(ToolTypeId),
    ClientId(&'a str),
}

/// A tool with its configuration and credentials.
#[derive(Debug, Clone)]
pub struct ResolvedTool {
    pub tool: ToolType,
    pub config: ToolConfig,
    pub credentials: Credentials,
}

/// Inbound verification failures. The messages are sent to tools verbatim.
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("Tool not found")]
    ToolNotFound,

    #[error("Incorrect consumer key")]
    IncorrectConsumerKey,

    #[error("OAuth signature failed: {0}")]
    OAuthSignature(AuthError),

    #[error("JWT security not supported with LTI 2")]
    Lti2NotSupported,

    #[error("No public key configured")]
    NoPublicKey,

    #[error("No public keyset configured")]
    NoPublicKeyset,

    #[error(transparent)]
    Jwt(AuthError),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Read-only adapter over the tool registry.
#[derive(Clone)]
pub struct CredentialStore {
    registry: Arc<dyn ToolRegistry>,
    jwks: JwksCache,
}

impl CredentialStore {
    pub fn new(registry: Arc<dyn ToolRegistry>, jwks: JwksCache) -> Self {
        Self { registry, jwks }
    }

    pub async fn resolve(&self, lookup: Lookup<'_>) -> Result<Option<ResolvedTool>, RegistryError> {
        let tool = match lookup {
            Lookup::TypeId(id) => self.registry.find_tool_by_id(id).await?,
            Lookup::ClientId(client_id) => self.registry.find_tool_by_client_id(client_id).await?,
        };
        let Some(tool) = tool else {
            return Ok(None);
        };

        let config = self.registry.get_type_config(tool.id).await?;
        let credentials = if tool.lti_version == LtiVersion::V1p3 {
            let key = match config.resolved_key_type() {
                KeyType::RsaKey => config.public_key.clone().map(PublicKeySource::Pem),
                KeyType::JwkKeyset => config
                    .public_keyset_url
                    .clone()
                    .map(PublicKeySource::JwksUri),
            };
            Credentials::Jwt {
                client_id: tool.client_id.clone().unwrap_or_default(),
                key,
            }
        } else {
            let (key, secret) = self.oauth1_credentials(&tool, &config).await?;
            Credentials::OAuth1 { key, secret }
        };

        Ok(Some(ResolvedTool {
            tool,
            config,
            credentials,
        }))
    }

    /// Key and secret a 1.0/1.1 tool signs with.
    pub async fn oauth1_credentials(
        &self,
        tool: &ToolType,
        config: &ToolConfig,
    ) -> Result<(String, String), RegistryError> {
        if let Some(proxy_id) = tool.tool_proxy_id {
            if let Some(proxy) = self.registry.find_tool_proxy(proxy_id).await? {
                return Ok((proxy.guid, proxy.secret));
            }
        }
        Ok((
            config.resource_key.clone().unwrap_or_default(),
            config.password.clone().unwrap_or_default(),
        ))
    }

    /// Verifies an OAuth1-signed request claiming to come from `type_id`.
    pub async fn verify_oauth1(
        &self,
        type_id: ToolTypeId,
        request: &OAuth1Request,
        options: &VerifyOptions,
    ) -> Result<ToolType, VerifyError> {
        let Some(tool) = self.registry.find_tool_by_id(type_id).await? else {
            tracing::warn!(tool_id = %type_id, "OAuth1 request for unknown tool");
            return Err(VerifyError::ToolNotFound);
        };
        let config = self.registry.get_type_config(type_id).await?;
        let (key, secret) = self.oauth1_credentials(&tool, &config).await?;

        if request.consumer_key() != Some(key.as_str()) {
            tracing::warn!(tool_id = %type_id, "OAuth1 consumer key mismatch");
            return Err(VerifyError::IncorrectConsumerKey);
        }

        OAuth1Signer::new(key, secret)
            .verify(request, options)
            .map_err(|e| {
                tracing::warn!(tool_id = %type_id, error = %e, "OAuth1 signature rejected");
                VerifyError::OAuthSignature(e)
            })?;

        Ok(tool)
    }

    /// Verifies a JWT signed by a 1.3 tool and returns its claims.
    pub async fn verify_jwt(
        &self,
        tool: &ToolType,
        config: &ToolConfig,
        consumer_key: &str,
        token: &str,
    ) -> Result<serde_json::Value, VerifyError> {
        if tool.lti_version != LtiVersion::V1p3 {
            tracing::warn!(tool_id = %tool.id, "JWT presented for a non 1.3 tool");
            return Err(VerifyError::IncorrectConsumerKey);
        }
        if tool.tool_proxy_id.is_some() {
            return Err(VerifyError::Lti2NotSupported);
        }
        if tool.client_id.as_deref() != Some(consumer_key) {
            tracing::warn!(tool_id = %tool.id, "JWT client id mismatch");
            return Err(VerifyError::IncorrectConsumerKey);
        }

        let pem = match config.resolved_key_type() {
            KeyType::RsaKey => config
                .public_key
                .as_deref()
                .filter(|k| !k.is_empty())
                .ok_or(VerifyError::NoPublicKey)?
                .as_bytes()
                .to_vec(),
            KeyType::JwkKeyset => {
                let url = config
                    .public_keyset_url
                    .as_deref()
                    .filter(|u| !u.is_empty())
                    .ok_or(VerifyError::NoPublicKeyset)?;
                let kid = extract_kid(token).map_err(VerifyError::Jwt)?;
                self.jwks
                    .key_pem(url, kid.as_deref())
                    .await
                    .map_err(|e| {
                        tracing::warn!(tool_id = %tool.id, error = %e, "JWKS key resolution failed");
                        VerifyError::Jwt(e)
                    })?
            }
        };

        decode_claims::<serde_json::Value>(token, &pem, &ValidationConfig::default()).map_err(|e| {
            tracing::warn!(tool_id = %tool.id, error = %e, "JWT signature rejected");
            VerifyError::Jwt(e)
        })
    }
}
