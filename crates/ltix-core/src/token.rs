//! Scoped bearer tokens issued to tools.

use crate::ids::ToolTypeId;
use chrono::{DateTime, Duration, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};

/// Default access token lifetime in seconds.
pub const ACCESS_TOKEN_LIFETIME_SECS: i64 = 3600;

/// An opaque access token bound to one tool and a set of scopes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    pub type_id: ToolTypeId,
    pub token: String,
    pub scopes: Vec<String>,
    pub valid_until: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl AccessToken {
    /// Mints a fresh random token valid for `lifetime`.
    #[must_use]
    pub fn mint(type_id: ToolTypeId, scopes: Vec<String>, lifetime: Duration) -> Self {
        let mut bytes = [0u8; 32];
        OsRng.fill_bytes(&mut bytes);
        let now = Utc::now();
        Self {
            type_id,
            token: hex::encode(bytes),
            scopes,
            valid_until: now + lifetime,
            created_at: now,
        }
    }

    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.valid_until
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    #[must_use]
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.iter().any(|s| s == scope)
    }

    /// Seconds until expiry, never negative.
    #[must_use]
    pub fn expires_in(&self) -> i64 {
        (self.valid_until - Utc::now()).num_seconds().max(0)
    }

    /// Granted scopes as a space-separated string.
    #[must_use]
    pub fn scope_string(&self) -> String {
        self.scopes.join(" ")
    }
}
