use super::GitCommand;
use anyhow::Result;
use std::path::Path;

impl GitCommand {
    pub fn check_ignore(&self, worktree: &Path, relative: &str) -> Result<bool> {
        let mut cmd = self.git_in(worktree);
        cmd.args(["check-ignore", "--quiet", relative]);
        self.exec_predicate("check-ignore", worktree, cmd)
    }

    pub fn stash_present(&self, worktree: &Path) -> Result<bool> {
        let mut cmd = self.git_in(worktree);
        cmd.args(["stash", "list"]);
        let stdout = self.exec_ok("stash list", worktree, cmd)?;
        Ok(!stdout.trim().is_empty())
    }

    pub fn head_detached(&self, worktree: &Path) -> Result<bool> {
        let mut cmd = self.git_in(worktree);
        cmd.args(["symbolic-ref", "--quiet", "HEAD"]);
        // symbolic-ref fails exactly when HEAD is not a branch
        Ok(!self.exec_predicate("symbolic-ref", worktree, cmd)?)
    }
}
