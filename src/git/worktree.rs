use super::{GitCommand, WorktreeEntry};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

impl GitCommand {
    pub fn worktree_add(
        &self,
        git_dir: &Path,
        path: &Path,
        branch: &str,
        base: Option<&str>,
    ) -> Result<()> {
        let mut cmd = self.git_in(git_dir);
        cmd.args(["worktree", "add"]);

        if self.quiet {
            cmd.arg("--quiet");
        }

        match base {
            Some(base) => cmd.arg("-b").arg(branch).arg(path).arg(base),
            None => cmd.arg(path).arg(branch),
        };

        self.exec_ok("worktree add", path, cmd)?;
        Ok(())
    }

    pub fn worktree_remove(&self, git_dir: &Path, path: &Path, force: bool) -> Result<()> {
        let mut cmd = self.git_in(git_dir);
        cmd.args(["worktree", "remove"]);

        if force {
            cmd.arg("--force");
        }

        cmd.arg(path);
        self.exec_ok("worktree remove", path, cmd)?;
        Ok(())
    }

    pub fn worktree_list(&self, git_dir: &Path) -> Result<Vec<WorktreeEntry>> {
        let mut cmd = self.git_in(git_dir);
        cmd.args(["worktree", "list", "--porcelain"]);
        let stdout = self.exec_ok("worktree list", git_dir, cmd)?;
        Ok(parse_worktree_porcelain(&stdout))
    }

    /// `git rev-parse --git-common-dir`, made absolute.
    pub fn common_dir(&self, path: &Path) -> Result<PathBuf> {
        let mut cmd = self.git_in(path);
        cmd.args(["rev-parse", "--git-common-dir"]);
        let stdout = self.exec_ok("rev-parse", path, cmd)?;

        let dir = PathBuf::from(stdout.trim());
        let dir = if dir.is_absolute() { dir } else { path.join(dir) };
        dir.canonicalize()
            .with_context(|| format!("Failed to resolve git directory: {}", dir.display()))
    }
}

/// Parse `git worktree list --porcelain`. Records are separated by blank
/// lines; `branch refs/heads/x` becomes `x`.
pub fn parse_worktree_porcelain(output: &str) -> Vec<WorktreeEntry> {
    let mut entries = Vec::new();
    let mut current: Option<WorktreeEntry> = None;

    for line in output.lines() {
        if let Some(path) = line.strip_prefix("worktree ") {
            entries.extend(current.take());
            current = Some(WorktreeEntry {
                path: PathBuf::from(path),
                ..Default::default()
            });
        } else if let Some(entry) = current.as_mut() {
            if let Some(reference) = line.strip_prefix("branch ") {
                let name = reference.strip_prefix("refs/heads/").unwrap_or(reference);
                entry.branch = Some(name.to_string());
            } else if line == "bare" {
                entry.is_bare = true;
            }
        }
    }
    entries.extend(current);
    entries
}
