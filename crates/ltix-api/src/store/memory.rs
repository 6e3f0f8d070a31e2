//! In-memory collaborators.

use super::{AssetFile, AssetProcessorStore, EulaAcceptance, EulaDeployment};
use crate::resources;
use crate::services::domain_from_url;
use async_trait::async_trait;
use chrono::Duration;
use ltix_core::{
    AccessToken, ActivityId, CoreError, Course, CourseId, LtiActivity, PlatformUser,
    RegistryError, SessionError, SessionId, SessionStore, ToolConfig, ToolProxy, ToolProxyId,
    ToolRegistry, ToolState, ToolType, ToolTypeId,
};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Session key holding the signed-in user's id.
pub const USER_SESSION_KEY: &str = "user_id";

#[derive(Default)]
struct RegistryData {
    tools: BTreeMap<ToolTypeId, ToolType>,
    configs: HashMap<ToolTypeId, ToolConfig>,
    proxies: HashMap<ToolProxyId, ToolProxy>,
    courses: HashMap<CourseId, Course>,
    activities: HashMap<ActivityId, LtiActivity>,
    users: HashMap<String, PlatformUser>,
    tokens: HashMap<String, AccessToken>,
}

/// A tool with its raw configuration rows, as found in a seed file.
#[derive(Debug, Clone, Deserialize)]
pub struct SeedTool {
    #[serde(flatten)]
    pub tool: ToolType,
    #[serde(default)]
    pub config: BTreeMap<String, String>,
}

/// Initial registry contents.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RegistrySeed {
    pub tools: Vec<SeedTool>,
    pub proxies: Vec<ToolProxy>,
    pub courses: Vec<Course>,
    pub activities: Vec<LtiActivity>,
    pub users: Vec<PlatformUser>,
}

/// Tool registry kept in process memory.
#[derive(Default)]
pub struct InMemoryToolRegistry {
    data: RwLock<RegistryData>,
}

impl std::fmt::Debug for InMemoryToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryToolRegistry").finish_non_exhaustive()
    }
}

impl InMemoryToolRegistry {
    /// Builds a registry from seed data, validating every tool.
    pub fn from_seed(seed: RegistrySeed) -> Result<Self, CoreError> {
        let registry = Self::default();
        for proxy in seed.proxies {
            registry.add_proxy(proxy);
        }
        for course in seed.courses {
            registry.add_course(course);
        }
        for entry in seed.tools {
            registry.add_tool(entry.tool, ToolConfig::from_entries(entry.config))?;
        }
        for activity in seed.activities {
            registry.add_activity(activity);
        }
        for user in seed.users {
            registry.add_user(user);
        }
        Ok(registry)
    }

    fn read(&self) -> RwLockReadGuard<'_, RegistryData> {
        self.data.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, RegistryData> {
        self.data.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a tool. 1.3 tools without a client id get a random one.
    pub fn add_tool(&self, mut tool: ToolType, mut config: ToolConfig) -> Result<ToolTypeId, CoreError> {
        tool.ensure_client_id();
        tool.validate()?;
        if tool.tool_domain.is_empty() {
            tool.tool_domain = domain_from_url(&tool.base_url).unwrap_or_default();
        }
        config.ensure_service_salt();

        let mut data = self.write();
        if let Some(client_id) = tool.client_id.as_deref() {
            let taken = data
                .tools
                .values()
                .any(|t| t.id != tool.id && t.client_id.as_deref() == Some(client_id));
            if taken {
                return Err(CoreError::DuplicateClientId(client_id.to_string()));
            }
        }
        let id = tool.id;
        data.configs.insert(id, config);
        data.tools.insert(id, tool);
        Ok(id)
    }

    pub fn set_config(&self, type_id: ToolTypeId, config: ToolConfig) {
        self.write().configs.insert(type_id, config);
    }

    pub fn add_proxy(&self, proxy: ToolProxy) {
        self.write().proxies.insert(proxy.id, proxy);
    }

    pub fn add_course(&self, course: Course) {
        self.write().courses.insert(course.id, course);
    }

    pub fn add_activity(&self, activity: LtiActivity) {
        self.write().activities.insert(activity.id, activity);
    }

    pub fn add_user(&self, user: PlatformUser) {
        self.write().users.insert(user.id.clone(), user);
    }

    #[must_use]
    pub fn tool_count(&self) -> usize {
        self.read().tools.len()
    }
}

#[async_trait]
impl ToolRegistry for InMemoryToolRegistry {
    async fn find_tool_by_id(&self, id: ToolTypeId) -> Result<Option<ToolType>, RegistryError> {
        Ok(self.read().tools.get(&id).cloned())
    }

    async fn find_tool_by_client_id(
        &self,
        client_id: &str,
    ) -> Result<Option<ToolType>, RegistryError> {
        Ok(self
            .read()
            .tools
            .values()
            .find(|t| t.client_id.as_deref() == Some(client_id))
            .cloned())
    }

    async fn find_tools_by_domain(
        &self,
        domain: &str,
        state: Option<ToolState>,
        course_id: Option<CourseId>,
    ) -> Result<Vec<ToolType>, RegistryError> {
        Ok(self
            .read()
            .tools
            .values()
            .filter(|t| t.tool_domain.eq_ignore_ascii_case(domain))
            .filter(|t| state.map_or(true, |s| t.state == s))
            .filter(|t| course_id.map_or(true, |c| t.is_allowed_in(c)))
            .cloned()
            .collect())
    }

    async fn tools_in_course(&self, course_id: CourseId) -> Result<Vec<ToolType>, RegistryError> {
        Ok(self
            .read()
            .tools
            .values()
            .filter(|t| t.is_allowed_in(course_id))
            .cloned()
            .collect())
    }

    async fn find_tool_proxy(&self, id: ToolProxyId) -> Result<Option<ToolProxy>, RegistryError> {
        Ok(self.read().proxies.get(&id).cloned())
    }

    async fn get_type_config(&self, type_id: ToolTypeId) -> Result<ToolConfig, RegistryError> {
        Ok(self.read().configs.get(&type_id).cloned().unwrap_or_default())
    }

    async fn permitted_scopes(
        &self,
        _tool: &ToolType,
        config: &ToolConfig,
    ) -> Result<Vec<String>, RegistryError> {
        Ok(resources::permitted_scopes(config))
    }

    async fn issue_token(
        &self,
        type_id: ToolTypeId,
        scopes: Vec<String>,
        lifetime: Duration,
    ) -> Result<AccessToken, RegistryError> {
        let token = AccessToken::mint(type_id, scopes, lifetime);
        let mut data = self.write();
        data.tokens.retain(|_, t| !t.is_expired());
        data.tokens.insert(token.token.clone(), token.clone());
        Ok(token)
    }

    async fn lookup_token(&self, token: &str) -> Result<Option<AccessToken>, RegistryError> {
        Ok(self.read().tokens.get(token).cloned())
    }

    async fn find_course(&self, id: CourseId) -> Result<Option<Course>, RegistryError> {
        Ok(self.read().courses.get(&id).cloned())
    }

    async fn find_activity(&self, id: ActivityId) -> Result<Option<LtiActivity>, RegistryError> {
        Ok(self.read().activities.get(&id).cloned())
    }

    async fn find_user(&self, id: &str) -> Result<Option<PlatformUser>, RegistryError> {
        Ok(self.read().users.get(id).cloned())
    }
}

/// Session store kept in process memory.
///
/// All entries sit behind one mutex, so `take` removes under the same lock
/// it reads with.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: Mutex<HashMap<SessionId, HashMap<String, String>>>,
}

impl InMemorySessionStore {
    fn lock(&self) -> MutexGuard<'_, HashMap<SessionId, HashMap<String, String>>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Opens a session signed in as `user_id`.
    pub fn login(&self, user_id: impl Into<String>) -> SessionId {
        let session = SessionId::new();
        self.lock()
            .entry(session)
            .or_default()
            .insert(USER_SESSION_KEY.to_string(), user_id.into());
        session
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn put(&self, session: &SessionId, key: &str, value: String) -> Result<(), SessionError> {
        self.lock()
            .entry(*session)
            .or_default()
            .insert(key.to_string(), value);
        Ok(())
    }

    async fn take(&self, session: &SessionId, key: &str) -> Result<Option<String>, SessionError> {
        Ok(self
            .lock()
            .get_mut(session)
            .and_then(|entries| entries.remove(key)))
    }

    async fn authenticated_user(&self, session: &SessionId) -> Result<Option<String>, SessionError> {
        Ok(self
            .lock()
            .get(session)
            .and_then(|entries| entries.get(USER_SESSION_KEY))
            .cloned())
    }
}

#[derive(Default)]
struct AssetData {
    deployments: HashMap<CourseId, EulaDeployment>,
    eulas: Vec<EulaAcceptance>,
    reports: HashMap<(ActivityId, String), Vec<serde_json::Value>>,
    files: HashMap<String, AssetFile>,
}

/// Asset processor records kept in process memory.
#[derive(Default)]
pub struct InMemoryAssetProcessorStore {
    data: Mutex<AssetData>,
}

impl InMemoryAssetProcessorStore {
    fn lock(&self) -> MutexGuard<'_, AssetData> {
        self.data.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl AssetProcessorStore for InMemoryAssetProcessorStore {
    async fn eula_deployment(
        &self,
        context: CourseId,
    ) -> Result<Option<EulaDeployment>, RegistryError> {
        Ok(self.lock().deployments.get(&context).cloned())
    }

    async fn put_eula_deployment(&self, deployment: EulaDeployment) -> Result<(), RegistryError> {
        self.lock()
            .deployments
            .insert(deployment.context_id, deployment);
        Ok(())
    }

    async fn find_eula(
        &self,
        context: CourseId,
        user_id: &[u8; 16],
    ) -> Result<Option<EulaAcceptance>, RegistryError> {
        Ok(self
            .lock()
            .eulas
            .iter()
            .find(|e| e.context_id == context && &e.user_id == user_id)
            .cloned())
    }

    async fn save_eula(&self, eula: EulaAcceptance) -> Result<(), RegistryError> {
        let mut data = self.lock();
        match data
            .eulas
            .iter_mut()
            .find(|e| e.context_id == eula.context_id && e.user_id == eula.user_id)
        {
            Some(existing) => *existing = eula,
            None => data.eulas.push(eula),
        }
        Ok(())
    }

    async fn eulas_in_context(
        &self,
        context: CourseId,
    ) -> Result<Vec<EulaAcceptance>, RegistryError> {
        Ok(self
            .lock()
            .eulas
            .iter()
            .filter(|e| e.context_id == context)
            .cloned()
            .collect())
    }

    async fn asset_reports(
        &self,
        activity: ActivityId,
        resource_id: &str,
    ) -> Result<Vec<serde_json::Value>, RegistryError> {
        Ok(self
            .lock()
            .reports
            .get(&(activity, resource_id.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    async fn add_asset_report(
        &self,
        activity: ActivityId,
        resource_id: &str,
        report: serde_json::Value,
    ) -> Result<(), RegistryError> {
        self.lock()
            .reports
            .entry((activity, resource_id.to_string()))
            .or_default()
            .push(report);
        Ok(())
    }

    async fn asset_file(&self, asset_id: &str) -> Result<Option<AssetFile>, RegistryError> {
        Ok(self.lock().files.get(asset_id).cloned())
    }

    async fn put_asset_file(&self, file: AssetFile) -> Result<(), RegistryError> {
        self.lock().files.insert(file.asset_id.clone(), file);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ltix_core::LtiVersion;
    use std::sync::Arc;

    #[test]
    fn test_add_tool_assigns_client_id_and_salt() {
        let registry = InMemoryToolRegistry::default();
        let mut tool = ToolType::new(ToolTypeId::new(1), "Tool", "https://www.tool.example/launch");
        tool.lti_version = LtiVersion::V1p3;
        registry.add_tool(tool, ToolConfig::default()).unwrap();

        let data = registry.read();
        let stored = &data.tools[&ToolTypeId::new(1)];
        assert!(stored.client_id.is_some());
        assert_eq!(stored.tool_domain, "tool.example");
        assert_eq!(stored.state, ToolState::Pending);
        assert!(data.configs[&ToolTypeId::new(1)].service_salt.is_some());
    }

    #[test]
    fn test_duplicate_client_id_rejected() {
        let registry = InMemoryToolRegistry::default();
        for id in [1, 2] {
            let mut tool = ToolType::new(ToolTypeId::new(id), "Tool", "https://tool.example/");
            tool.lti_version = LtiVersion::V1p3;
            tool.client_id = Some("same".into());
            let result = registry.add_tool(tool, ToolConfig::default());
            assert_eq!(result.is_ok(), id == 1);
        }
    }

    #[tokio::test]
    async fn test_domain_lookup_filters_state_and_course() {
        let registry = InMemoryToolRegistry::default();
        let mut site = ToolType::new(ToolTypeId::new(1), "Site", "https://tool.example/a");
        site.state = ToolState::Configured;
        let mut other_course = ToolType::new(ToolTypeId::new(2), "Other", "https://tool.example/b");
        other_course.state = ToolState::Configured;
        other_course.course_id = CourseId::new(9);
        let pending = ToolType::new(ToolTypeId::new(3), "Pending", "https://tool.example/c");
        for tool in [site, other_course, pending] {
            registry.add_tool(tool, ToolConfig::default()).unwrap();
        }

        let found = registry
            .find_tools_by_domain("tool.example", Some(ToolState::Configured), Some(CourseId::new(5)))
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, ToolTypeId::new(1));

        let all = registry.find_tools_by_domain("TOOL.example", None, None).await.unwrap();
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn test_expired_tokens_dropped_on_next_grant() {
        let registry = InMemoryToolRegistry::default();
        let type_id = ToolTypeId::new(4);
        for _ in 0..50 {
            registry
                .issue_token(type_id, vec!["scope".into()], Duration::seconds(-1))
                .await
                .unwrap();
        }
        assert_eq!(registry.read().tokens.len(), 50);

        let live = registry
            .issue_token(type_id, vec!["scope".into()], Duration::seconds(600))
            .await
            .unwrap();
        assert_eq!(registry.read().tokens.len(), 1);
        assert!(registry.lookup_token(&live.token).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_take_is_single_use() {
        let store = InMemorySessionStore::default();
        let session = store.login("user-1");
        store.put(&session, "k", "v".into()).await.unwrap();

        assert_eq!(store.take(&session, "k").await.unwrap().as_deref(), Some("v"));
        assert_eq!(store.take(&session, "k").await.unwrap(), None);
        assert_eq!(
            store.authenticated_user(&session).await.unwrap().as_deref(),
            Some("user-1")
        );
    }

    #[tokio::test]
    async fn test_concurrent_takes_yield_one_value() {
        let store = Arc::new(InMemorySessionStore::default());
        let session = SessionId::new();
        store.put(&session, "launch", "hint".into()).await.unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.take(&session, "launch").await.unwrap() })
            })
            .collect();
        let mut hits = 0;
        for handle in handles {
            if handle.await.unwrap().is_some() {
                hits += 1;
            }
        }
        assert_eq!(hits, 1);
    }

    #[tokio::test]
    async fn test_save_eula_upserts() {
        let store = InMemoryAssetProcessorStore::default();
        let eula = EulaAcceptance {
            context_id: CourseId::new(5),
            user_id: [7; 16],
            accepted: true,
            timestamp: chrono::Utc::now(),
        };
        store.save_eula(eula.clone()).await.unwrap();
        store
            .save_eula(EulaAcceptance {
                accepted: false,
                ..eula
            })
            .await
            .unwrap();

        let all = store.eulas_in_context(CourseId::new(5)).await.unwrap();
        assert_eq!(all.len(), 1);
        assert!(!all[0].accepted);
    }

    #[test]
    fn test_seed_parsing() {
        let seed: RegistrySeed = serde_json::from_str(
            r#"{
                "tools": [{
                    "id": 2,
                    "name": "Quiz",
                    "base_url": "https://quiz.example/launch",
                    "state": "CONFIGURED",
                    "config": {"resourcekey": "k", "password": "s"}
                }],
                "courses": [{"id": 5, "short_name": "C5", "full_name": "Course 5"}]
            }"#,
        )
        .unwrap();
        let registry = InMemoryToolRegistry::from_seed(seed).unwrap();
        assert_eq!(registry.tool_count(), 1);
        let data = registry.read();
        assert_eq!(
            data.configs[&ToolTypeId::new(2)].resource_key.as_deref(),
            Some("k")
        );
    }
}
