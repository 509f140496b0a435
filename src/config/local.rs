//! Per-worktree machine state in `.arbor.local`.

use crate::error::ArborError;
use crate::utils::atomic_write;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::fs;
use std::path::{Path, PathBuf};

pub const LOCAL_STATE_FILE: &str = ".arbor.local";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalState {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db_suffix: Option<String>,
}

impl LocalState {
    pub fn path_in(worktree: &Path) -> PathBuf {
        worktree.join(LOCAL_STATE_FILE)
    }

    /// Read `.arbor.local`; a missing file is the zero value.
    pub fn load(worktree: &Path) -> Result<Self> {
        Ok(super::load_yaml(&Self::path_in(worktree))?.unwrap_or_default())
    }

    /// The stored suffix, if any and non-empty.
    pub fn db_suffix(&self) -> Option<&str> {
        self.db_suffix.as_deref().filter(|s| !s.is_empty())
    }

    /// Merge `self` into whatever is on disk. Empty strings never replace an
    /// existing value, and keys this version does not know are kept.
    pub fn save(&self, worktree: &Path) -> Result<()> {
        let path = Self::path_in(worktree);
        let mut merged = read_mapping(&path)?;

        let updates = serde_yaml::to_value(self)
            .map_err(|e| ArborError::config(format!("failed to serialize local state: {e}")))?;
        if let Value::Mapping(updates) = updates {
            for (key, value) in updates {
                if matches!(&value, Value::String(s) if s.is_empty()) {
                    continue;
                }
                merged.insert(key, value);
            }
        }

        let text = serde_yaml::to_string(&Value::Mapping(merged))
            .map_err(|e| ArborError::config(format!("failed to render local state: {e}")))?;
        atomic_write(&path, text.as_bytes(), 0o644)
            .with_context(|| format!("Failed to write {}", path.display()))
    }
}

fn read_mapping(path: &Path) -> Result<Mapping> {
    if !path.exists() {
        return Ok(Mapping::new());
    }
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    if contents.trim().is_empty() {
        return Ok(Mapping::new());
    }
    match serde_yaml::from_str(&contents)
        .map_err(|e| ArborError::config(format!("{}: {e}", path.display())))?
    {
        Value::Mapping(m) => Ok(m),
        Value::Null => Ok(Mapping::new()),
        _ => Err(ArborError::config(format!("{} must be a mapping", path.display())).into()),
    }
}
