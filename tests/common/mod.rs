#![allow(dead_code)]

use anyhow::Result;
use arbor::git::{GitOps, WorktreeEntry};
use arbor::process::CancelToken;
use arbor::scaffold::steps::{CreateOutcome, DbClient, DbClientProvider, DbConnection, DbEngine};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::{Arc, Mutex};

/// Run `git` in `dir`, panicking with its stderr on failure.
pub fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .arg("-C")
        .arg(dir)
        .args(args)
        .env("GIT_AUTHOR_NAME", "Arbor Test")
        .env("GIT_AUTHOR_EMAIL", "test@example.com")
        .env("GIT_COMMITTER_NAME", "Arbor Test")
        .env("GIT_COMMITTER_EMAIL", "test@example.com")
        .output()
        .expect("git should be installed");
    assert!(
        output.status.success(),
        "git {} failed: {}",
        args.join(" "),
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// A non-bare repository at `dir` on branch `main` with one commit.
pub fn init_repo(dir: &Path) {
    std::fs::create_dir_all(dir).unwrap();
    git(dir, &["init", "--quiet", "--initial-branch=main"]);
    commit(dir, "README.md", "# shop\n", "initial");
}

pub fn commit(dir: &Path, file: &str, contents: &str, message: &str) {
    std::fs::write(dir.join(file), contents).unwrap();
    git(dir, &["add", file]);
    git(dir, &["commit", "--quiet", "-m", message]);
}

/// In-memory git for resolver tests: knows a default branch and a fixed list
/// of worktrees.
pub struct StaticGit {
    pub default_branch: String,
    pub worktrees: Vec<WorktreeEntry>,
}

impl StaticGit {
    pub fn new(default_branch: &str) -> Self {
        Self {
            default_branch: default_branch.to_string(),
            worktrees: Vec::new(),
        }
    }
}

impl GitOps for StaticGit {
    fn clone_bare(&self, _url: &str, dest: &Path) -> Result<()> {
        std::fs::create_dir_all(dest)?;
        Ok(())
    }
    fn create_worktree(&self, _: &Path, path: &Path, _: &str, _: Option<&str>) -> Result<()> {
        std::fs::create_dir_all(path)?;
        Ok(())
    }
    fn remove_worktree(&self, _: &Path, _: &Path, _: bool) -> Result<()> {
        Ok(())
    }
    fn list_worktrees(&self, _: &Path) -> Result<Vec<WorktreeEntry>> {
        Ok(self.worktrees.clone())
    }
    fn find_git_dir(&self, path: &Path) -> Result<PathBuf> {
        Ok(path.join(".git"))
    }
    fn default_branch(&self, _: &Path) -> Result<String> {
        Ok(self.default_branch.clone())
    }
    fn is_merged(&self, _: &Path, _: &str, _: &str) -> Result<bool> {
        Ok(false)
    }
    fn branch_exists(&self, _: &Path, _: &str) -> Result<bool> {
        Ok(false)
    }
    fn delete_branch(&self, _: &Path, _: &str, _: bool) -> Result<()> {
        Ok(())
    }
    fn list_local_branches(&self, _: &Path) -> Result<Vec<String>> {
        Ok(Vec::new())
    }
    fn list_remote_branches(&self, _: &Path) -> Result<Vec<String>> {
        Ok(Vec::new())
    }
    fn list_all_branches(&self, _: &Path) -> Result<Vec<String>> {
        Ok(Vec::new())
    }
    fn configure_fetch_refspec(&self, _: &Path, _: &str) -> Result<()> {
        Ok(())
    }
    fn remote_url(&self, _: &Path, _: &str) -> Result<String> {
        Ok(String::new())
    }
    fn set_upstream(&self, _: &Path, _: &str, _: &str) -> Result<()> {
        Ok(())
    }
    fn has_tracking(&self, _: &Path, _: &str) -> Result<bool> {
        Ok(false)
    }
    fn is_ignored(&self, _: &Path, _: &str) -> Result<bool> {
        Ok(true)
    }
    fn has_stash(&self, _: &Path) -> Result<bool> {
        Ok(false)
    }
    fn is_detached_head(&self, _: &Path) -> Result<bool> {
        Ok(false)
    }
}

/// A database server that only remembers names.
#[derive(Default)]
pub struct FakeDatabases {
    pub names: Mutex<BTreeSet<String>>,
    pub engines: Mutex<Vec<DbEngine>>,
}

impl FakeDatabases {
    pub fn names(&self) -> Vec<String> {
        self.names.lock().unwrap().iter().cloned().collect()
    }
}

struct FakeClient(Arc<FakeDatabases>);

impl DbClient for FakeClient {
    fn create_database(&self, name: &str, _cancel: &CancelToken) -> Result<CreateOutcome> {
        if self.0.names.lock().unwrap().insert(name.to_string()) {
            Ok(CreateOutcome::Created)
        } else {
            Ok(CreateOutcome::AlreadyExists)
        }
    }

    fn list_databases(&self, pattern: &str, _cancel: &CancelToken) -> Result<Vec<String>> {
        let suffix = pattern.trim_start_matches('%');
        Ok(self
            .0
            .names
            .lock()
            .unwrap()
            .iter()
            .filter(|n| n.ends_with(suffix))
            .cloned()
            .collect())
    }

    fn drop_database(&self, name: &str, _cancel: &CancelToken) -> Result<()> {
        self.0.names.lock().unwrap().remove(name);
        Ok(())
    }
}

pub struct FakeDbProvider(pub Arc<FakeDatabases>);

impl DbClientProvider for FakeDbProvider {
    fn client(&self, engine: DbEngine, _conn: &DbConnection) -> Result<Box<dyn DbClient>> {
        self.0.engines.lock().unwrap().push(engine);
        Ok(Box::new(FakeClient(Arc::clone(&self.0))))
    }
}
