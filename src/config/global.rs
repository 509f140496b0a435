//! The user-wide config: defaults, detected tools and linked projects.
//!
//! Lives at `$XDG_CONFIG_HOME/arbor/arbor.yaml`, falling back to
//! `~/.config/arbor/arbor.yaml`. It is loaded once per command and passed
//! down explicitly.

use super::{load_yaml, save_yaml};
use crate::error::ArborError;
use crate::utils::{expand_tilde, home_dir};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};

pub const CONFIG_DIR_NAME: &str = "arbor";
pub const CONFIG_FILE_NAME: &str = "arbor.yaml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_branch: Option<String>,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub detected_tools: BTreeMap<String, bool>,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub tools: BTreeMap<String, ToolInfo>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub scaffold: Option<GlobalScaffold>,

    /// Root for linked-project worktrees. A leading `~` means home.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub worktree_base: Option<String>,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub projects: BTreeMap<String, ProjectInfo>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalScaffold {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parallel_dependencies: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub interactive: Option<bool>,
}

/// A linked project registered by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectInfo {
    pub path: PathBuf,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_branch: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub preset: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub site_name: Option<String>,
}

impl GlobalConfig {
    /// Where the global config lives for the current environment.
    pub fn default_path() -> Result<PathBuf> {
        let base = match env::var_os("XDG_CONFIG_HOME") {
            Some(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => home_dir()?.join(".config"),
        };
        Ok(base.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Load from the default location; absence yields the default config.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        Ok(load_yaml(path)?.unwrap_or_default())
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::default_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        save_yaml(path, self)
    }

    /// `worktree_base` with `~` expanded, if configured.
    pub fn worktree_base(&self) -> Result<Option<PathBuf>> {
        match self.worktree_base.as_deref() {
            Some(base) if !base.trim().is_empty() => expand_tilde(base.trim()).map(Some),
            _ => Ok(None),
        }
    }

    pub fn project(&self, name: &str) -> Option<&ProjectInfo> {
        self.projects.get(name)
    }

    /// Add a linked project. The name must be new and the path an existing
    /// directory; the stored path is absolute.
    pub fn register_project(&mut self, name: &str, path: &Path, mut info: ProjectInfo) -> Result<()> {
        validate_project_name(name)?;
        if self.projects.contains_key(name) {
            return Err(
                ArborError::config(format!("project '{name}' is already registered")).into(),
            );
        }
        if !path.is_dir() {
            return Err(ArborError::config(format!(
                "project path {} is not a directory",
                path.display()
            ))
            .into());
        }
        info.path = std::path::absolute(path)
            .with_context(|| format!("Failed to resolve path: {}", path.display()))?;
        self.projects.insert(name.to_string(), info);
        Ok(())
    }

    pub fn unregister_project(&mut self, name: &str) -> Result<ProjectInfo> {
        self.projects
            .remove(name)
            .ok_or_else(|| ArborError::not_found(format!("no project named '{name}'")).into())
    }
}

fn validate_project_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(ArborError::config("project name cannot be empty").into());
    }
    if name.contains(['/', '\\']) || name == "." || name == ".." {
        return Err(ArborError::config(format!(
            "project name '{name}' cannot contain path separators"
        ))
        .into());
    }
    Ok(())
}
