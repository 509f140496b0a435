//! In-memory [`GitOps`] for unit tests.

use super::{GitOps, WorktreeEntry};
use anyhow::Result;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Default)]
pub(crate) struct FakeGit {
    pub default_branch: String,
    pub worktrees: RefCell<Vec<WorktreeEntry>>,
    pub branches: RefCell<Vec<String>>,
    /// `(branch, target)` answers for `is_merged`; missing pairs are false.
    pub ancestry: HashMap<(String, String), bool>,
    pub merge_queries: Cell<usize>,
    pub ignored: bool,
    pub calls: RefCell<Vec<String>>,
}

impl FakeGit {
    pub fn new(default_branch: &str) -> Self {
        Self {
            default_branch: default_branch.to_string(),
            ignored: true,
            ..Default::default()
        }
    }

    pub fn with_worktree(self, path: &Path, branch: Option<&str>) -> Self {
        self.worktrees.borrow_mut().push(WorktreeEntry {
            path: path.to_path_buf(),
            branch: branch.map(str::to_string),
            is_bare: false,
        });
        if let Some(branch) = branch {
            self.branches.borrow_mut().push(branch.to_string());
        }
        self
    }

    pub fn with_ancestry(mut self, branch: &str, target: &str, answer: bool) -> Self {
        self.ancestry
            .insert((branch.to_string(), target.to_string()), answer);
        self
    }

    fn record(&self, call: String) {
        self.calls.borrow_mut().push(call);
    }
}

impl GitOps for FakeGit {
    fn clone_bare(&self, url: &str, dest: &Path) -> Result<()> {
        fs::create_dir_all(dest)?;
        self.record(format!("clone_bare {url}"));
        Ok(())
    }

    fn create_worktree(
        &self,
        _git_dir: &Path,
        path: &Path,
        branch: &str,
        base: Option<&str>,
    ) -> Result<()> {
        fs::create_dir_all(path)?;
        self.record(format!("create_worktree {branch} {}", base.unwrap_or("-")));
        if !self.branches.borrow().iter().any(|b| b == branch) {
            self.branches.borrow_mut().push(branch.to_string());
        }
        self.worktrees.borrow_mut().push(WorktreeEntry {
            path: path.to_path_buf(),
            branch: Some(branch.to_string()),
            is_bare: false,
        });
        Ok(())
    }

    fn remove_worktree(&self, _git_dir: &Path, path: &Path, force: bool) -> Result<()> {
        if path.exists() {
            fs::remove_dir_all(path)?;
        }
        self.record(format!("remove_worktree {} force={force}", path.display()));
        self.worktrees.borrow_mut().retain(|w| w.path != path);
        Ok(())
    }

    fn list_worktrees(&self, _git_dir: &Path) -> Result<Vec<WorktreeEntry>> {
        Ok(self.worktrees.borrow().clone())
    }

    fn find_git_dir(&self, path: &Path) -> Result<PathBuf> {
        Ok(path.join(".git"))
    }

    fn default_branch(&self, _git_dir: &Path) -> Result<String> {
        Ok(self.default_branch.clone())
    }

    fn is_merged(&self, _git_dir: &Path, branch: &str, target: &str) -> Result<bool> {
        self.merge_queries.set(self.merge_queries.get() + 1);
        Ok(self
            .ancestry
            .get(&(branch.to_string(), target.to_string()))
            .copied()
            .unwrap_or(false))
    }

    fn branch_exists(&self, _git_dir: &Path, branch: &str) -> Result<bool> {
        Ok(self.branches.borrow().iter().any(|b| b == branch))
    }

    fn delete_branch(&self, _git_dir: &Path, branch: &str, force: bool) -> Result<()> {
        self.record(format!("delete_branch {branch} force={force}"));
        self.branches.borrow_mut().retain(|b| b != branch);
        Ok(())
    }

    fn list_local_branches(&self, _git_dir: &Path) -> Result<Vec<String>> {
        Ok(self.branches.borrow().clone())
    }

    fn list_remote_branches(&self, _git_dir: &Path) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    fn list_all_branches(&self, git_dir: &Path) -> Result<Vec<String>> {
        self.list_local_branches(git_dir)
    }

    fn configure_fetch_refspec(&self, _git_dir: &Path, remote: &str) -> Result<()> {
        self.record(format!("configure_fetch_refspec {remote}"));
        Ok(())
    }

    fn remote_url(&self, _git_dir: &Path, _remote: &str) -> Result<String> {
        Ok(String::new())
    }

    fn set_upstream(&self, _git_dir: &Path, _branch: &str, _remote: &str) -> Result<()> {
        Ok(())
    }

    fn has_tracking(&self, _git_dir: &Path, _branch: &str) -> Result<bool> {
        Ok(false)
    }

    fn is_ignored(&self, _worktree: &Path, _relative: &str) -> Result<bool> {
        Ok(self.ignored)
    }

    fn has_stash(&self, _worktree: &Path) -> Result<bool> {
        Ok(false)
    }

    fn is_detached_head(&self, _worktree: &Path) -> Result<bool> {
        Ok(false)
    }
}
