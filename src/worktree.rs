//! Worktree discovery, classification and lookup.

use crate::error::ArborError;
use crate::git::{GitOps, WorktreeEntry};
use crate::project::normalize;
use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// A worktree with its classification applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Worktree {
    /// Basename of `path`.
    pub name: String,
    pub path: PathBuf,
    /// `None` when detached.
    pub branch: Option<String>,
    /// Checked out on the default branch.
    pub is_main: bool,
    /// Contains the directory the command runs in.
    pub is_current: bool,
    /// Fully contained in the default branch, which has moved on since.
    pub is_merged: bool,
    /// Modification time of the worktree directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Local>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum SortKey {
    #[default]
    Name,
    Branch,
    Created,
}

/// Ancestry answers for one listing, keyed by `(branch, target)`.
#[derive(Default)]
pub struct MergeCache {
    answers: HashMap<(String, String), bool>,
}

impl MergeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `branch` is an ancestor of `target`, asking git once per pair.
    pub fn is_ancestor(
        &mut self,
        git: &dyn GitOps,
        git_dir: &Path,
        branch: &str,
        target: &str,
    ) -> Result<bool> {
        let key = (branch.to_string(), target.to_string());
        if let Some(answer) = self.answers.get(&key) {
            return Ok(*answer);
        }
        let answer = git
            .is_merged(git_dir, branch, target)
            .with_context(|| format!("Failed to compare {branch} with {target}"))?;
        self.answers.insert(key, answer);
        Ok(answer)
    }

    /// Merged means `branch` is contained in `default` and `default` is not
    /// contained in `branch`. A branch sitting on the same commit as the
    /// default branch is therefore not merged.
    pub fn is_merged(
        &mut self,
        git: &dyn GitOps,
        git_dir: &Path,
        branch: &str,
        default: &str,
    ) -> Result<bool> {
        Ok(self.is_ancestor(git, git_dir, branch, default)?
            && !self.is_ancestor(git, git_dir, default, branch)?)
    }

    pub fn len(&self) -> usize {
        self.answers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }
}

/// List and classify every non-bare worktree of the repository at `git_dir`.
pub fn list_worktrees(
    git: &dyn GitOps,
    git_dir: &Path,
    default_branch: &str,
    cwd: &Path,
) -> Result<Vec<Worktree>> {
    let entries = git
        .list_worktrees(git_dir)
        .context("Failed to list worktrees")?;
    classify(git, git_dir, &entries, default_branch, cwd)
}

pub fn classify(
    git: &dyn GitOps,
    git_dir: &Path,
    entries: &[WorktreeEntry],
    default_branch: &str,
    cwd: &Path,
) -> Result<Vec<Worktree>> {
    let here = normalize(cwd);
    let current = entries
        .iter()
        .filter(|e| !e.is_bare)
        .map(|e| normalize(&e.path))
        .filter(|p| here.starts_with(p))
        .max_by_key(|p| p.components().count());

    let mut cache = MergeCache::new();
    let mut worktrees = Vec::with_capacity(entries.len());

    for entry in entries.iter().filter(|e| !e.is_bare) {
        let is_main = entry.branch.as_deref() == Some(default_branch);
        let is_merged = match entry.branch.as_deref() {
            Some(branch) if !is_main => cache.is_merged(git, git_dir, branch, default_branch)?,
            _ => false,
        };
        let created = std::fs::metadata(&entry.path)
            .and_then(|m| m.modified())
            .ok()
            .map(DateTime::<Local>::from);

        worktrees.push(Worktree {
            name: entry
                .path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            path: entry.path.clone(),
            branch: entry.branch.clone(),
            is_main,
            is_current: current.as_deref() == Some(normalize(&entry.path).as_path()),
            is_merged,
            created,
        });
    }

    Ok(worktrees)
}

/// Sort by `key`, reversed on request. Equal keys keep path order.
pub fn sort_worktrees(worktrees: &mut [Worktree], key: SortKey, reverse: bool) {
    worktrees.sort_by(|a, b| {
        let ord = match key {
            SortKey::Name => a.name.cmp(&b.name),
            SortKey::Branch => a.branch.cmp(&b.branch),
            SortKey::Created => a.created.cmp(&b.created),
        };
        let ord = if reverse { ord.reverse() } else { ord };
        ord.then_with(|| a.path.cmp(&b.path))
    });
}

/// Look up a worktree by name or branch.
///
/// An exact basename or branch match wins. Otherwise a unique substring match
/// is returned; several are Ambiguous and none is NotFound.
pub fn find_worktree<'a>(worktrees: &'a [Worktree], query: &str) -> Result<&'a Worktree> {
    let exact = |w: &&Worktree| w.name == query || w.branch.as_deref() == Some(query);
    if let Some(found) = worktrees.iter().find(exact) {
        return Ok(found);
    }

    let partial: Vec<&Worktree> = worktrees
        .iter()
        .filter(|w| w.name.contains(query) || w.branch.as_deref().is_some_and(|b| b.contains(query)))
        .collect();

    match partial.as_slice() {
        [one] => Ok(one),
        [] => Err(ArborError::not_found(format!("no worktree matches '{query}'")).into()),
        many => Err(ArborError::Ambiguous {
            query: query.to_string(),
            candidates: many.iter().map(|w| w.name.clone()).collect(),
        }
        .into()),
    }
}

/// The worktree containing `cwd`, if any.
pub fn current_worktree(worktrees: &[Worktree]) -> Option<&Worktree> {
    worktrees.iter().find(|w| w.is_current)
}
