//! Server configuration loaded from environment variables.
//!
//! Loading fails fast: required variables must be present and valid, or the
//! server exits with a clear error message.

use ltix_api::LtiSigningKey;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors that can occur during environment loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(String),

    #[error("Invalid value for {var}: {message}")]
    InvalidValue { var: String, message: String },

    #[error("Failed to parse port: {0}")]
    InvalidPort(#[from] std::num::ParseIntError),
}

#[derive(Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub issuer: String,
    pub signing_keys: Vec<LtiSigningKey>,
    pub access_token_lifetime_secs: i64,
    pub id_token_lifetime_secs: i64,
    pub oauth1_timestamp_window_secs: i64,
    pub jwks_timeout: Duration,
    /// JSON file seeding the in-memory registry.
    pub tools_file: Option<PathBuf>,
    pub cors_origins: Vec<String>,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kids: Vec<&str> = self.signing_keys.iter().map(|k| k.kid.as_str()).collect();
        f.debug_struct("Config")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("log_level", &self.log_level)
            .field("issuer", &self.issuer)
            .field("signing_keys", &kids)
            .field("access_token_lifetime_secs", &self.access_token_lifetime_secs)
            .field("id_token_lifetime_secs", &self.id_token_lifetime_secs)
            .field("oauth1_timestamp_window_secs", &self.oauth1_timestamp_window_secs)
            .field("jwks_timeout", &self.jwks_timeout)
            .field("tools_file", &self.tools_file)
            .field("cors_origins", &self.cors_origins)
            .finish()
    }
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through `lookup`, which returns a variable's value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let required =
            |name: &str| get(name).ok_or_else(|| ConfigError::MissingVar(name.to_string()));

        let host = get("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = match get("PORT") {
            Some(port) => port.trim().parse::<u16>()?,
            None => 8080,
        };
        let log_level = get("LOG_LEVEL").unwrap_or_else(|| "info".to_string());

        let issuer = required("LTI_ISSUER")?;
        if !issuer.starts_with("http://") && !issuer.starts_with("https://") {
            return Err(ConfigError::InvalidValue {
                var: "LTI_ISSUER".to_string(),
                message: "Must be an absolute http(s) URL".to_string(),
            });
        }
        let signing_keys = parse_signing_keys(&required("LTI_SIGNING_KEYS")?)?;

        let number = |name: &str, default: i64| -> Result<i64, ConfigError> {
            match get(name) {
                None => Ok(default),
                Some(value) => value
                    .trim()
                    .parse::<i64>()
                    .ok()
                    .filter(|n| *n > 0)
                    .ok_or_else(|| ConfigError::InvalidValue {
                        var: name.to_string(),
                        message: format!("Expected a positive integer, got {value}"),
                    }),
            }
        };

        let access_token_lifetime_secs = number(
            "LTI_ACCESS_TOKEN_LIFETIME_SECS",
            ltix_core::ACCESS_TOKEN_LIFETIME_SECS,
        )?;
        let id_token_lifetime_secs = number("LTI_ID_TOKEN_LIFETIME_SECS", 60)?;
        let oauth1_timestamp_window_secs = number("LTI_OAUTH1_TIMESTAMP_WINDOW_SECS", 300)?;
        let jwks_timeout_secs = number("LTI_JWKS_TIMEOUT_SECS", 5)?;

        let cors_origins = get("CORS_ORIGINS")
            .map(|origins| {
                origins
                    .split(',')
                    .map(str::trim)
                    .filter(|o| !o.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            host,
            port,
            log_level,
            issuer,
            signing_keys,
            access_token_lifetime_secs,
            id_token_lifetime_secs,
            oauth1_timestamp_window_secs,
            jwks_timeout: Duration::from_secs(jwks_timeout_secs.unsigned_abs()),
            tools_file: get("LTI_TOOLS_FILE").map(PathBuf::from),
            cors_origins,
        })
    }

    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Parse `LTI_SIGNING_KEYS`: a JSON array with exactly one active key.
fn parse_signing_keys(json: &str) -> Result<Vec<LtiSigningKey>, ConfigError> {
    let invalid = |message: String| ConfigError::InvalidValue {
        var: "LTI_SIGNING_KEYS".to_string(),
        message,
    };

    let keys: Vec<LtiSigningKey> =
        serde_json::from_str(json).map_err(|e| invalid(format!("Invalid JSON: {e}")))?;
    if keys.is_empty() {
        return Err(invalid("Array must contain at least one key".to_string()));
    }

    let active_count = keys.iter().filter(|k| k.is_active).count();
    if active_count != 1 {
        return Err(invalid(format!(
            "Exactly one key must be marked active, found {active_count}"
        )));
    }

    for key in &keys {
        if !key.private_key_pem.contains("-----BEGIN") || !key.public_key_pem.contains("-----BEGIN")
        {
            return Err(invalid(format!("Key {} is not PEM encoded", key.kid)));
        }
    }
    Ok(keys)
}
