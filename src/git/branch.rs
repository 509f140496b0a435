use super::GitCommand;
use crate::error::ArborError;
use anyhow::Result;
use std::path::Path;

/// Tried in order before falling back to HEAD.
pub const DEFAULT_BRANCH_CANDIDATES: &[&str] = &["main", "master", "develop"];

impl GitCommand {
    pub fn local_branch_exists(&self, git_dir: &Path, branch: &str) -> Result<bool> {
        let mut cmd = self.git_in(git_dir);
        cmd.args(["show-ref", "--verify", "--quiet"])
            .arg(format!("refs/heads/{branch}"));
        self.exec_predicate("show-ref", git_dir, cmd)
    }

    pub fn default_branch(&self, git_dir: &Path) -> Result<String> {
        for candidate in DEFAULT_BRANCH_CANDIDATES {
            if self.local_branch_exists(git_dir, candidate)? {
                return Ok((*candidate).to_string());
            }
        }

        let mut cmd = self.git_in(git_dir);
        cmd.args(["symbolic-ref", "--short", "HEAD"]);
        let head = self.exec_ok("symbolic-ref", git_dir, cmd)?;
        let head = head.trim();
        if head.is_empty() {
            return Err(
                ArborError::git("symbolic-ref", git_dir, "HEAD does not name a branch").into(),
            );
        }
        Ok(head.to_string())
    }

    /// `git merge-base --is-ancestor branch target`.
    pub fn is_ancestor(&self, git_dir: &Path, branch: &str, target: &str) -> Result<bool> {
        let mut cmd = self.git_in(git_dir);
        cmd.args(["merge-base", "--is-ancestor", branch, target]);
        self.exec_predicate("merge-base", git_dir, cmd)
    }

    pub fn branch_delete(&self, git_dir: &Path, branch: &str, force: bool) -> Result<()> {
        let mut cmd = self.git_in(git_dir);
        cmd.arg("branch");

        if force {
            cmd.arg("-D");
        } else {
            cmd.arg("-d");
        }

        cmd.arg(branch);
        self.exec_ok("branch delete", git_dir, cmd)?;
        Ok(())
    }

    /// Short names of the refs under `prefix`, skipping symbolic `HEAD`s.
    pub fn branches_under(&self, git_dir: &Path, prefix: &str) -> Result<Vec<String>> {
        let mut cmd = self.git_in(git_dir);
        cmd.args(["for-each-ref", "--format=%(refname:short)", prefix]);
        let stdout = self.exec_ok("for-each-ref", git_dir, cmd)?;
        Ok(stdout
            .lines()
            .map(str::trim)
            .filter(|name| !name.is_empty() && !name.ends_with("/HEAD"))
            .map(str::to_string)
            .collect())
    }
}
