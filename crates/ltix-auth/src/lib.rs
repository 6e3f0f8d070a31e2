//! Signing and verification primitives for LTI launches.
//!
//! This crate provides:
//! - OAuth1 HMAC-SHA1 signing and verification (RFC 5849) for LTI 1.0/1.1
//! - RS256 JWT encoding and decoding with key ids
//! - The LTI 1.3 claim mapping used to build id_tokens from launch parameters
//! - JWK conversion and a caching JWKS client for tool-published keys
//!
//! # Example
//!
//! ```rust,ignore
//! use ltix_auth::{encode_claims, LaunchClaims, OAuth1Signer};
//!
//! // LTI 1.1: sign the launch form
//! let signer = OAuth1Signer::new("consumer-key", "secret");
//! let signed = signer.sign("POST", "https://tool.example/launch", &params)?;
//!
//! // LTI 1.3: build and sign the id_token
//! let claims = LaunchClaims::builder()
//!     .issuer("https://lms.example")
//!     .audience("client-123")
//!     .nonce("n-0S6_WzA2Mj")
//!     .params(&params)
//!     .build();
//! let id_token = encode_claims(&claims, private_key_pem, Some("kid-1"))?;
//! ```

mod claims;
mod error;
mod jwks;
mod jwt;
mod oauth1;

pub use claims::{LaunchClaims, LaunchClaimsBuilder, LTI_CLAIM_PREFIX};
pub use error::AuthError;
pub use jwks::{Jwk, JwkSet, JwksCache, JwksClient};
pub use jwt::{
    decode_claims, decode_unverified_payload, encode_claims, extract_kid, ValidationConfig,
};
pub use oauth1::{
    base_string, normalize_url, parse_authorization_header, percent_encode, OAuth1Request,
    OAuth1Signer, VerifyOptions, OAUTH_VERSION, SIGNATURE_METHOD,
};
