//! Collaborator Traits
//!
//! The engine consults two external collaborators it does not implement:
//! the tool registry (tool records, configuration, issued tokens and the
//! platform records launches are built from) and the server-side session
//! store.
//!
//! Both traits are object-safe and used as `Arc<dyn ...>`.

use crate::error::{RegistryError, SessionError};
use crate::ids::{ActivityId, CourseId, SessionId, ToolProxyId, ToolTypeId};
use crate::platform::{Course, LtiActivity, PlatformUser};
use crate::token::AccessToken;
use crate::tool::{ToolConfig, ToolProxy, ToolState, ToolType};
use async_trait::async_trait;
use chrono::Duration;

/// Read access to registered tools plus token persistence.
#[async_trait]
pub trait ToolRegistry: Send + Sync {
    async fn find_tool_by_id(&self, id: ToolTypeId) -> Result<Option<ToolType>, RegistryError>;

    /// Looks a tool up by its unique LTI 1.3 client id.
    async fn find_tool_by_client_id(
        &self,
        client_id: &str,
    ) -> Result<Option<ToolType>, RegistryError>;

    /// Tools registered for `domain`, optionally filtered by state, that are
    /// usable in `course_id` (site tools plus tools owned by that course).
    async fn find_tools_by_domain(
        &self,
        domain: &str,
        state: Option<ToolState>,
        course_id: Option<CourseId>,
    ) -> Result<Vec<ToolType>, RegistryError>;

    /// Every tool usable in a course, regardless of visibility or state.
    async fn tools_in_course(&self, course_id: CourseId) -> Result<Vec<ToolType>, RegistryError>;

    async fn find_tool_proxy(&self, id: ToolProxyId) -> Result<Option<ToolProxy>, RegistryError>;

    /// Merged launch configuration of a tool type. Unknown tools yield an
    /// empty configuration.
    async fn get_type_config(&self, type_id: ToolTypeId) -> Result<ToolConfig, RegistryError>;

    /// Service scopes the tool's configuration subscribes it to.
    async fn permitted_scopes(
        &self,
        tool: &ToolType,
        config: &ToolConfig,
    ) -> Result<Vec<String>, RegistryError>;

    /// Mints and stores a token for `type_id` carrying `scopes`.
    async fn issue_token(
        &self,
        type_id: ToolTypeId,
        scopes: Vec<String>,
        lifetime: Duration,
    ) -> Result<AccessToken, RegistryError>;

    async fn lookup_token(&self, token: &str) -> Result<Option<AccessToken>, RegistryError>;

    async fn find_course(&self, id: CourseId) -> Result<Option<Course>, RegistryError>;

    async fn find_activity(&self, id: ActivityId) -> Result<Option<LtiActivity>, RegistryError>;

    async fn find_user(&self, id: &str) -> Result<Option<PlatformUser>, RegistryError>;
}

/// Server-side session storage.
///
/// `take` must read and delete in one step: two concurrent takes of the
/// same key may not both observe the value.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn put(&self, session: &SessionId, key: &str, value: String) -> Result<(), SessionError>;

    /// Atomically removes and returns the value stored under `key`.
    async fn take(&self, session: &SessionId, key: &str) -> Result<Option<String>, SessionError>;

    /// Id of the user signed in on this session, if any.
    async fn authenticated_user(&self, session: &SessionId) -> Result<Option<String>, SessionError>;
}
