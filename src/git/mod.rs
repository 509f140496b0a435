//! Everything arbor asks of git goes through [`GitOps`].
//!
//! [`GitCommand`] implements it by running the `git` binary; each verb runs
//! with `-C <dir>` so nothing depends on the process working directory.
//! Tests substitute their own implementation where a real repository would
//! be in the way.

mod branch;
mod clone;
#[cfg(test)]
pub(crate) mod fake;
mod remote;
mod status;
mod worktree;

pub use worktree::parse_worktree_porcelain;

use crate::error::ArborError;
use crate::process::{run_command, CancelToken, CommandOutput};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::Command;

/// One entry of `git worktree list`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorktreeEntry {
    pub path: PathBuf,
    /// Short branch name; `None` when detached or bare.
    pub branch: Option<String>,
    pub is_bare: bool,
}

pub trait GitOps {
    fn clone_bare(&self, url: &str, dest: &Path) -> Result<()>;

    /// Check out `branch` at `path`. With `base`, the branch is created from
    /// it first.
    fn create_worktree(
        &self,
        git_dir: &Path,
        path: &Path,
        branch: &str,
        base: Option<&str>,
    ) -> Result<()>;

    fn remove_worktree(&self, git_dir: &Path, path: &Path, force: bool) -> Result<()>;

    fn list_worktrees(&self, git_dir: &Path) -> Result<Vec<WorktreeEntry>>;

    /// The common git directory for a checkout or bare repository.
    fn find_git_dir(&self, path: &Path) -> Result<PathBuf>;

    /// `main`, `master` or `develop` if one exists, else what HEAD points at.
    fn default_branch(&self, git_dir: &Path) -> Result<String>;

    /// Whether `branch` is an ancestor of `target`. A git failure is an
    /// error, not `false`.
    fn is_merged(&self, git_dir: &Path, branch: &str, target: &str) -> Result<bool>;

    fn branch_exists(&self, git_dir: &Path, branch: &str) -> Result<bool>;

    fn delete_branch(&self, git_dir: &Path, branch: &str, force: bool) -> Result<()>;

    fn list_local_branches(&self, git_dir: &Path) -> Result<Vec<String>>;

    fn list_remote_branches(&self, git_dir: &Path) -> Result<Vec<String>>;

    fn list_all_branches(&self, git_dir: &Path) -> Result<Vec<String>>;

    /// Give `remote` the usual `+refs/heads/*` fetch refspec, which bare
    /// clones lack.
    fn configure_fetch_refspec(&self, git_dir: &Path, remote: &str) -> Result<()>;

    /// Empty when the remote has no URL configured.
    fn remote_url(&self, git_dir: &Path, remote: &str) -> Result<String>;

    fn set_upstream(&self, git_dir: &Path, branch: &str, remote: &str) -> Result<()>;

    fn has_tracking(&self, git_dir: &Path, branch: &str) -> Result<bool>;

    fn is_ignored(&self, worktree: &Path, relative: &str) -> Result<bool>;

    fn has_stash(&self, worktree: &Path) -> Result<bool>;

    fn is_detached_head(&self, worktree: &Path) -> Result<bool>;
}

pub struct GitCommand {
    pub(crate) quiet: bool,
    pub(crate) cancel: CancelToken,
}

impl GitCommand {
    pub fn new(quiet: bool) -> Self {
        Self {
            quiet,
            cancel: CancelToken::new(),
        }
    }

    /// Run every git call under `cancel`.
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// `git -C <dir>`.
    pub(crate) fn git_in(&self, dir: &Path) -> Command {
        let mut cmd = Command::new("git");
        cmd.arg("-C").arg(dir);
        cmd
    }

    /// Run and hand back the output whatever the exit status.
    pub(crate) fn exec(&self, verb: &str, mut cmd: Command) -> Result<CommandOutput> {
        run_command(&mut cmd, &self.cancel).with_context(|| format!("Failed to execute git {verb}"))
    }

    /// Run, failing with a git error naming `verb` and `path` on a non-zero
    /// exit. Returns stdout.
    pub(crate) fn exec_ok(&self, verb: &str, path: &Path, cmd: Command) -> Result<String> {
        let output = self.exec(verb, cmd)?;
        if !output.success() {
            return Err(ArborError::git(verb, path, output.error_message()).into());
        }
        Ok(output.stdout)
    }

    /// Exit 0 is true, 1 is false, anything else is an error.
    pub(crate) fn exec_predicate(&self, verb: &str, path: &Path, cmd: Command) -> Result<bool> {
        let output = self.exec(verb, cmd)?;
        match output.status.code() {
            Some(0) => Ok(true),
            Some(1) => Ok(false),
            _ => Err(ArborError::git(verb, path, output.error_message()).into()),
        }
    }
}

impl GitOps for GitCommand {
    fn clone_bare(&self, url: &str, dest: &Path) -> Result<()> {
        GitCommand::clone_bare(self, url, dest)
    }

    fn create_worktree(
        &self,
        git_dir: &Path,
        path: &Path,
        branch: &str,
        base: Option<&str>,
    ) -> Result<()> {
        self.worktree_add(git_dir, path, branch, base)
    }

    fn remove_worktree(&self, git_dir: &Path, path: &Path, force: bool) -> Result<()> {
        self.worktree_remove(git_dir, path, force)
    }

    fn list_worktrees(&self, git_dir: &Path) -> Result<Vec<WorktreeEntry>> {
        self.worktree_list(git_dir)
    }

    fn find_git_dir(&self, path: &Path) -> Result<PathBuf> {
        self.common_dir(path)
    }

    fn default_branch(&self, git_dir: &Path) -> Result<String> {
        GitCommand::default_branch(self, git_dir)
    }

    fn is_merged(&self, git_dir: &Path, branch: &str, target: &str) -> Result<bool> {
        self.is_ancestor(git_dir, branch, target)
    }

    fn branch_exists(&self, git_dir: &Path, branch: &str) -> Result<bool> {
        self.local_branch_exists(git_dir, branch)
    }

    fn delete_branch(&self, git_dir: &Path, branch: &str, force: bool) -> Result<()> {
        self.branch_delete(git_dir, branch, force)
    }

    fn list_local_branches(&self, git_dir: &Path) -> Result<Vec<String>> {
        self.branches_under(git_dir, "refs/heads")
    }

    fn list_remote_branches(&self, git_dir: &Path) -> Result<Vec<String>> {
        self.branches_under(git_dir, "refs/remotes")
    }

    fn list_all_branches(&self, git_dir: &Path) -> Result<Vec<String>> {
        let mut all = self.branches_under(git_dir, "refs/heads")?;
        all.extend(self.branches_under(git_dir, "refs/remotes")?);
        Ok(all)
    }

    fn configure_fetch_refspec(&self, git_dir: &Path, remote: &str) -> Result<()> {
        self.setup_fetch_refspec(git_dir, remote)
    }

    fn remote_url(&self, git_dir: &Path, remote: &str) -> Result<String> {
        self.remote_get_url(git_dir, remote)
    }

    fn set_upstream(&self, git_dir: &Path, branch: &str, remote: &str) -> Result<()> {
        self.branch_set_upstream(git_dir, branch, remote)
    }

    fn has_tracking(&self, git_dir: &Path, branch: &str) -> Result<bool> {
        self.branch_has_upstream(git_dir, branch)
    }

    fn is_ignored(&self, worktree: &Path, relative: &str) -> Result<bool> {
        self.check_ignore(worktree, relative)
    }

    fn has_stash(&self, worktree: &Path) -> Result<bool> {
        self.stash_present(worktree)
    }

    fn is_detached_head(&self, worktree: &Path) -> Result<bool> {
        self.head_detached(worktree)
    }
}
