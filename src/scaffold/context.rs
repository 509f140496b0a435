//! State shared by the steps of one scaffold or cleanup run.

use super::conditions::{self, Condition, ConditionEnv};
use super::steps::db::sanitize_identifier;
use crate::log_debug;
use anyhow::Result;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

/// Fixed facts about the worktree being scaffolded, plus the two values steps
/// hand to each other: the database suffix and named variables.
///
/// The mutable slots sit behind locks so a step may share the context with
/// threads it spawns.
#[derive(Debug)]
pub struct ScaffoldContext {
    pub worktree_path: PathBuf,
    pub branch: String,
    pub repo_name: String,
    pub site_name: String,
    pub preset: Option<String>,
    /// Basename of `worktree_path`.
    pub path: String,
    /// Basename of the directory holding the worktree.
    pub repo_path: String,
    /// Extra environment for every subprocess a step starts.
    pub env: HashMap<String, String>,
    db_suffix: RwLock<Option<String>>,
    vars: RwLock<HashMap<String, String>>,
}

impl ScaffoldContext {
    /// A context whose site name defaults to the repository name.
    pub fn new(worktree_path: impl Into<PathBuf>, branch: &str, repo_name: &str) -> Self {
        let worktree_path = worktree_path.into();
        let path = file_name(&worktree_path);
        let repo_path = worktree_path.parent().map(file_name).unwrap_or_default();
        Self {
            worktree_path,
            branch: branch.to_string(),
            repo_name: repo_name.to_string(),
            site_name: repo_name.to_string(),
            preset: None,
            path,
            repo_path,
            env: HashMap::new(),
            db_suffix: RwLock::new(None),
            vars: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_site_name(mut self, site_name: &str) -> Self {
        self.site_name = site_name.to_string();
        self
    }

    pub fn with_preset(mut self, preset: Option<&str>) -> Self {
        self.preset = preset.map(str::to_string);
        self
    }

    pub fn with_env(mut self, env: HashMap<String, String>) -> Self {
        self.env = env;
        self
    }

    pub fn with_db_suffix(self, suffix: Option<&str>) -> Self {
        self.set_db_suffix(suffix.unwrap_or_default());
        self
    }

    pub fn set_var(&self, name: &str, value: &str) {
        self.vars
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), value.to_string());
    }

    pub fn var(&self, name: &str) -> Option<String> {
        self.vars
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// An empty suffix clears it.
    pub fn set_db_suffix(&self, suffix: &str) {
        let mut slot = self.db_suffix.write().unwrap_or_else(PoisonError::into_inner);
        *slot = if suffix.is_empty() {
            None
        } else {
            Some(suffix.to_string())
        };
    }

    pub fn db_suffix(&self) -> Option<String> {
        self.db_suffix
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// `site_name` reduced to a database-safe identifier.
    pub fn db_site_name(&self) -> String {
        sanitize_identifier(&self.site_name)
    }

    pub fn condition_env<'a>(&'a self, vars: &'a HashMap<String, String>) -> ConditionEnv<'a> {
        ConditionEnv {
            worktree: &self.worktree_path,
            extra_env: &self.env,
            vars,
        }
    }

    /// Evaluate a step condition. Evaluation errors count as false.
    pub fn evaluate(&self, condition: &Condition) -> bool {
        let vars = self.snapshot_for_template();
        match conditions::evaluate(condition, self.condition_env(&vars)) {
            Ok(result) => result,
            Err(e) => {
                log_debug!("Condition evaluation failed, treating as false: {e:#}");
                false
            }
        }
    }

    /// Evaluate the preflight condition, reporting everything that is missing.
    pub fn check_preflight(&self, condition: &Condition) -> Result<()> {
        let vars = self.snapshot_for_template();
        conditions::check_preflight(condition, self.condition_env(&vars))
    }

    /// Owned copy of every template value.
    ///
    /// Variables come first so the built-in names cannot be shadowed.
    /// `SiteName` is the database-safe form of the site name.
    pub fn snapshot_for_template(&self) -> HashMap<String, String> {
        let mut snapshot = self
            .vars
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        snapshot.insert("Path".into(), self.path.clone());
        snapshot.insert("RepoPath".into(), self.repo_path.clone());
        snapshot.insert("RepoName".into(), self.repo_name.clone());
        snapshot.insert("SiteName".into(), self.db_site_name());
        snapshot.insert("Branch".into(), self.branch.clone());
        snapshot.insert("DbSuffix".into(), self.db_suffix().unwrap_or_default());
        snapshot
    }

    /// Resolve a step-supplied path against the worktree.
    pub fn resolve(&self, relative: &str) -> PathBuf {
        let p = Path::new(relative);
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            self.worktree_path.join(p)
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
