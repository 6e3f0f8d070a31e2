//! ltix Core Library
//!
//! Domain model and collaborator seams shared by the ltix crates.
//!
//! # Modules
//!
//! - [`ids`] - Strongly typed identifiers (ToolTypeId, CourseId, SessionId, ...)
//! - [`tool`] - Registered tool types, tool proxies and their typed configuration
//! - [`launch`] - Launch hints kept in the session between login initiation and auth
//! - [`token`] - Scoped access tokens issued to tools
//! - [`platform`] - Courses, activities and users the platform launches with
//! - [`context`] - Explicit per-request context handed to protocol handlers
//! - [`traits`] - Collaborator traits (ToolRegistry, SessionStore)
//! - [`error`] - Protocol error kinds and collaborator errors
//!
//! # Example
//!
//! ```
//! use ltix_core::{LtiVersion, ToolType, ToolTypeId};
//!
//! let mut tool = ToolType::new(ToolTypeId::new(7), "Quiz tool", "https://tool.example/launch");
//! tool.lti_version = LtiVersion::V1p3;
//! tool.ensure_client_id();
//! assert!(tool.validate().is_ok());
//! ```

pub mod context;
pub mod error;
pub mod ids;
pub mod launch;
pub mod platform;
pub mod token;
pub mod tool;
pub mod traits;

pub use context::RequestContext;
pub use error::{CoreError, ErrorKind, RegistryError, SessionError};
pub use ids::{ActivityId, CourseId, ParseIdError, SessionId, ToolProxyId, ToolTypeId, SITE_COURSE_ID};
pub use launch::{LaunchHint, MessageType};
pub use platform::{Course, LtiActivity, PlatformUser};
pub use token::{AccessToken, ACCESS_TOKEN_LIFETIME_SECS};
pub use tool::{CourseVisibility, KeyType, LtiVersion, ToolConfig, ToolProxy, ToolState, ToolType};
pub use traits::{SessionStore, ToolRegistry};
