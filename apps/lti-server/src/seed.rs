//! Registry seeding from `LTI_TOOLS_FILE`.

use ltix_api::store::{InMemoryToolRegistry, RegistrySeed};
use ltix_core::CoreError;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid seed file {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },

    #[error("Invalid tool in seed file: {0}")]
    Tool(#[from] CoreError),
}

/// Builds the registry from a JSON seed file.
pub fn load_registry(path: &Path) -> Result<InMemoryToolRegistry, SeedError> {
    let display = path.display().to_string();
    let contents = std::fs::read_to_string(path).map_err(|source| SeedError::Read {
        path: display.clone(),
        source,
    })?;
    let seed: RegistrySeed = serde_json::from_str(&contents).map_err(|source| SeedError::Parse {
        path: display,
        source,
    })?;
    let registry = InMemoryToolRegistry::from_seed(seed)?;
    tracing::info!(tools = registry.tool_count(), "Registry seeded");
    Ok(registry)
}
