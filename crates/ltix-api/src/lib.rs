//! LTI launch and provisioning API for ltix.
//!
//! This crate is the protocol engine and its HTTP surface. It builds LTI
//! 1.0/1.1 OAuth1-signed launches and LTI 1.3 OIDC launches, brokers the
//! third-party-initiated login handshake, issues scoped access tokens to
//! tools and dispatches their service calls.
//!
//! # Endpoints
//!
//! - `GET|POST /auth` - OIDC auth endpoint, answers with an auto-submit form
//! - `GET /certs` - Platform JSON Web Key Set
//! - `POST /token` - `client_credentials` grant with a JWT-bearer assertion
//! - `GET /launch?id=` - Launch an activity
//! - `GET /contentitem?course=&id=` - Start a content-item selection
//! - `ANY /services/*path` - Service resources (asset processor)
//! - `GET /api-docs/openapi.json` - OpenAPI document
//!
//! # Example
//!
//! ```rust,ignore
//! use ltix_api::{lti_router, LtiSigningKey, LtiState};
//! use ltix_api::store::{InMemoryAssetProcessorStore, InMemorySessionStore, InMemoryToolRegistry};
//! use std::sync::Arc;
//!
//! let state = LtiState::new(
//!     Arc::new(InMemoryToolRegistry::default()),
//!     Arc::new(InMemorySessionStore::default()),
//!     Arc::new(InMemoryAssetProcessorStore::default()),
//!     "https://lms.example",
//!     vec![signing_key],
//! );
//! let app = axum::Router::new().nest("/lti", lti_router(state));
//! ```

pub mod error;
pub mod handlers;
pub mod html;
pub mod middleware;
pub mod models;
pub mod openapi;
pub mod resources;
pub mod router;
pub mod services;
pub mod store;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::LtiError;
pub use middleware::{extract_session_cookie, session_cookie, SESSION_COOKIE_NAME};
pub use router::{lti_router, LtiSigningKey, LtiState};
pub use services::{find_best_match, url_thumbprint, LaunchRequest, ScoredTool};
