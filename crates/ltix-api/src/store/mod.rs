//! Collaborator storage.
//!
//! [`AssetProcessorStore`] holds the records the asset processor service
//! reads and writes. The `memory` module provides in-memory implementations
//! of it and of the core collaborator traits for the server and for tests.

mod memory;

pub use memory::{
    InMemoryAssetProcessorStore, InMemorySessionStore, InMemoryToolRegistry, RegistrySeed, SeedTool,
    USER_SESSION_KEY,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ltix_core::{ActivityId, CourseId, RegistryError};
use serde::{Deserialize, Serialize};

/// Whether tools must collect EULA acceptance in a context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EulaDeployment {
    pub context_id: CourseId,
    pub eula_required: bool,
}

/// A user's answer to a context's EULA.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EulaAcceptance {
    pub context_id: CourseId,
    /// UUID of the user, stored as its 16 raw bytes.
    pub user_id: [u8; 16],
    pub accepted: bool,
    pub timestamp: DateTime<Utc>,
}

/// Metadata of a submitted file a tool may fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetFile {
    pub asset_id: String,
    pub title: String,
    pub filename: String,
    pub sha256_checksum: String,
    pub timestamp: i64,
    pub size: u64,
    pub content_type: String,
}

#[async_trait]
pub trait AssetProcessorStore: Send + Sync {
    async fn eula_deployment(&self, context: CourseId)
        -> Result<Option<EulaDeployment>, RegistryError>;

    async fn put_eula_deployment(&self, deployment: EulaDeployment) -> Result<(), RegistryError>;

    async fn find_eula(
        &self,
        context: CourseId,
        user_id: &[u8; 16],
    ) -> Result<Option<EulaAcceptance>, RegistryError>;

    /// Inserts or replaces the acceptance of `(context, user)`.
    async fn save_eula(&self, eula: EulaAcceptance) -> Result<(), RegistryError>;

    async fn eulas_in_context(&self, context: CourseId)
        -> Result<Vec<EulaAcceptance>, RegistryError>;

    async fn asset_reports(
        &self,
        activity: ActivityId,
        resource_id: &str,
    ) -> Result<Vec<serde_json::Value>, RegistryError>;

    async fn add_asset_report(
        &self,
        activity: ActivityId,
        resource_id: &str,
        report: serde_json::Value,
    ) -> Result<(), RegistryError>;

    async fn asset_file(&self, asset_id: &str) -> Result<Option<AssetFile>, RegistryError>;

    async fn put_asset_file(&self, file: AssetFile) -> Result<(), RegistryError>;
}
