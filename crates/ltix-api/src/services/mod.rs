//! LTI protocol services.

pub mod access_token;
pub mod credentials;
pub mod launch;
pub mod login;
pub mod matcher;

pub use access_token::{grant, intersect_scopes, validate_bearer};
pub use credentials::{
    CredentialStore, Credentials, Lookup, PublicKeySource, ResolvedTool, VerifyError,
};
pub use launch::{build_sourcedid, custom_parameters, LaunchBuilder, LaunchRequest};
pub use login::{authorize, AuthResponse};
pub use matcher::{
    domain_from_url, find_best_match, tool_by_url_match, tools_for_course, url_thumbprint,
    ScoredTool,
};
