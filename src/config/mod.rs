//! Persistent state: the per-project `arbor.yaml`, the global config and the
//! per-worktree `.arbor.local`.
//!
//! Reads go through serde_yaml into typed structs. Writes of the two
//! user-edited files go through [`document::YamlDocument`] so comments and
//! key order survive.

pub mod document;
pub mod global;
pub mod local;
pub mod migrate;
pub mod project;

pub use global::{GlobalConfig, ProjectInfo};
pub use local::LocalState;
pub use project::{ProjectConfig, StepConfig};

use crate::error::ArborError;
use crate::utils::atomic_write;
use anyhow::{Context, Result};
use document::YamlDocument;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::Path;

/// File name of the per-project config.
pub const PROJECT_CONFIG_FILE: &str = "arbor.yaml";

const CONFIG_FILE_MODE: u32 = 0o644;

/// Deserialize `path`, or `None` when it does not exist. An empty file reads
/// as the default value.
pub(crate) fn load_yaml<T>(path: &Path) -> Result<Option<T>>
where
    T: DeserializeOwned + Default,
{
    if !path.exists() {
        return Ok(None);
    }
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    if contents.trim().is_empty() {
        return Ok(Some(T::default()));
    }
    let value = serde_yaml::from_str(&contents)
        .map_err(|e| ArborError::config(format!("{}: {e}", path.display())))?;
    Ok(Some(value))
}

/// Write `value` to `path`, editing the existing document in place.
pub(crate) fn save_yaml<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let existing = if path.exists() {
        fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?
    } else {
        String::new()
    };

    let mut doc = YamlDocument::parse(&existing)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    let new_value = serde_yaml::to_value(value)
        .map_err(|e| ArborError::config(format!("failed to serialize config: {e}")))?;
    doc.sync(&new_value)?;

    atomic_write(path, doc.render().as_bytes(), CONFIG_FILE_MODE)
        .with_context(|| format!("Failed to write config file: {}", path.display()))
}
