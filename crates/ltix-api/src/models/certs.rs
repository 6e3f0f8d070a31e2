//! JSON Web Key Set published on `/certs`.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Public half of a platform signing key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Jwk {
    /// Key type (RSA).
    pub kty: String,
    pub kid: String,
    /// Key use (sig = signature).
    #[serde(rename = "use")]
    pub key_use: String,
    pub alg: String,
    /// RSA modulus (base64url encoded).
    pub n: String,
    /// RSA exponent (base64url encoded).
    pub e: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct JwkSet {
    pub keys: Vec<Jwk>,
}

impl From<ltix_auth::Jwk> for Jwk {
    fn from(jwk: ltix_auth::Jwk) -> Self {
        Self {
            kty: jwk.kty,
            kid: jwk.kid.unwrap_or_default(),
            key_use: jwk.key_use.unwrap_or_else(|| "sig".to_string()),
            alg: jwk.alg.unwrap_or_else(|| "RS256".to_string()),
            n: jwk.n.unwrap_or_default(),
            e: jwk.e.unwrap_or_default(),
        }
    }
}
