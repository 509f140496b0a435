//! Typed view of the per-project `arbor.yaml`.

use super::{load_yaml, save_yaml, PROJECT_CONFIG_FILE};
use crate::scaffold::conditions::Condition;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Contents of `arbor.yaml`.
///
/// Every field is optional so that loading and saving an unchanged file
/// writes nothing new. Keys arbor does not know are kept in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub preset: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_branch: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub scaffold: Option<ScaffoldSection>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cleanup: Option<CleanupSection>,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub tools: BTreeMap<String, ToolConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub sync: Option<SyncConfig>,

    /// Written here by older releases; moved to `.arbor.local` by
    /// [`super::migrate::migrate_db_suffix`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db_suffix: Option<String>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScaffoldSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pre_flight: Option<PreFlight>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub steps: Option<Vec<StepConfig>>,

    /// Replace the preset's steps instead of appending to them.
    #[serde(rename = "override", skip_serializing_if = "Option::is_none")]
    pub override_preset: Option<bool>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreFlight {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanupSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub steps: Option<Vec<StepConfig>>,

    #[serde(rename = "override", skip_serializing_if = "Option::is_none")]
    pub override_preset: Option<bool>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolConfig {
    /// File pinning the tool version, e.g. `.nvmrc`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_file: Option<String>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStrategy {
    #[default]
    Rebase,
    Merge,
}

/// How a worktree is brought up to date with its upstream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upstream: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<SyncStrategy>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_stash: Option<bool>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl SyncConfig {
    pub fn strategy(&self) -> SyncStrategy {
        self.strategy.unwrap_or_default()
    }

    pub fn remote(&self) -> &str {
        self.remote.as_deref().unwrap_or("origin")
    }

    pub fn auto_stash(&self) -> bool {
        self.auto_stash.unwrap_or(false)
    }
}

/// One declarative step. `name` selects the step kind in the registry; the
/// remaining fields are read by whichever kinds need them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StepConfig {
    pub name: String,

    /// Absent means enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,

    /// Shell text for `bash.run` / `command.run`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub keys: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_as: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_file: Option<String>,

    /// Database engine for `db.create` / `db.destroy`.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub db_type: Option<String>,
}

impl StepConfig {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn with_args(mut self, args: &[&str]) -> Self {
        self.args = args.iter().map(|a| a.to_string()).collect();
        self
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }
}

impl ProjectConfig {
    pub fn path_in(dir: &Path) -> PathBuf {
        dir.join(PROJECT_CONFIG_FILE)
    }

    /// Load `arbor.yaml` from `dir`; a missing file is the default config.
    pub fn load(dir: &Path) -> Result<Self> {
        Ok(load_yaml(&Self::path_in(dir))?.unwrap_or_default())
    }

    /// Whether `dir` has an `arbor.yaml` at all.
    pub fn exists_in(dir: &Path) -> bool {
        Self::path_in(dir).is_file()
    }

    pub fn save(&self, dir: &Path) -> Result<()> {
        save_yaml(&Self::path_in(dir), self)
    }

    pub fn scaffold_steps(&self) -> &[StepConfig] {
        self.scaffold
            .as_ref()
            .and_then(|s| s.steps.as_deref())
            .unwrap_or_default()
    }

    pub fn cleanup_steps(&self) -> &[StepConfig] {
        self.cleanup
            .as_ref()
            .and_then(|s| s.steps.as_deref())
            .unwrap_or_default()
    }

    pub fn scaffold_overrides_preset(&self) -> bool {
        self.scaffold
            .as_ref()
            .and_then(|s| s.override_preset)
            .unwrap_or(false)
    }

    /// Cleanup follows the scaffold's override flag unless it sets its own.
    pub fn cleanup_overrides_preset(&self) -> bool {
        self.cleanup
            .as_ref()
            .and_then(|c| c.override_preset)
            .unwrap_or_else(|| self.scaffold_overrides_preset())
    }

    pub fn preflight(&self) -> Option<&Condition> {
        self.scaffold
            .as_ref()
            .and_then(|s| s.pre_flight.as_ref())
            .and_then(|p| p.condition.as_ref())
    }

    pub fn sync_config(&self) -> SyncConfig {
        self.sync.clone().unwrap_or_default()
    }
}
