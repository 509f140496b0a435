//! Core logic for `arbor work`: create a worktree for a branch and scaffold it.

use super::scaffold::Scaffolder;
use crate::core::ProgressSink;
use crate::git::GitOps;
use crate::project::ProjectContext;
use crate::scaffold::{PipelineReport, StepOptions};
use crate::utils::{ensure_directory_exists, validate_branch_name};
use anyhow::{Context, Result};
use std::path::PathBuf;

pub struct CreateParams {
    pub branch: String,
    /// Start point for a new branch. Defaults to the project's default branch.
    pub base: Option<String>,
}

pub struct CreateResult {
    pub path: PathBuf,
    pub branch: String,
    /// False when the branch already existed and was only checked out.
    pub created_branch: bool,
    pub base: Option<String>,
    pub report: PipelineReport,
}

pub fn execute(
    params: &CreateParams,
    project: &ProjectContext,
    git: &dyn GitOps,
    scaffolder: &Scaffolder,
    opts: &StepOptions,
    sink: &mut dyn ProgressSink,
) -> Result<CreateResult> {
    validate_branch_name(&params.branch)?;
    let path = project.worktree_path(&params.branch)?;

    if path.exists() {
        anyhow::bail!("{} already exists", path.display());
    }
    let checked_out = git
        .list_worktrees(&project.git_dir)?
        .into_iter()
        .find(|w| w.branch.as_deref() == Some(params.branch.as_str()));
    if let Some(existing) = checked_out {
        anyhow::bail!(
            "Branch '{}' is already checked out at {}",
            params.branch,
            existing.path.display()
        );
    }

    let exists = git
        .branch_exists(&project.git_dir, &params.branch)
        .with_context(|| format!("Failed to look up branch '{}'", params.branch))?;
    let base = if exists {
        None
    } else {
        Some(
            params
                .base
                .clone()
                .unwrap_or_else(|| project.default_branch.clone()),
        )
    };

    if opts.dry_run {
        match &base {
            Some(base) => sink.on_step(&format!(
                "Would create branch {} from {base} at {}",
                params.branch,
                path.display()
            )),
            None => sink.on_step(&format!(
                "Would check out {} at {}",
                params.branch,
                path.display()
            )),
        }
    } else {
        if let Some(parent) = path.parent() {
            ensure_directory_exists(parent)?;
        }
        sink.on_step(&format!("Creating worktree at {}", path.display()));
        git.create_worktree(&project.git_dir, &path, &params.branch, base.as_deref())?;
    }

    let report = scaffolder.run_scaffold(project, git, &path, &params.branch, opts, sink)?;

    Ok(CreateResult {
        path,
        branch: params.branch.clone(),
        created_branch: base.is_some(),
        base,
        report,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GlobalConfig, ProjectConfig};
    use crate::core::NullSink;
    use crate::git::fake::FakeGit;
    use crate::project::ProjectLayout;
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    fn project(root: &Path) -> ProjectContext {
        ProjectContext {
            cwd: root.to_path_buf(),
            git_dir: root.join(".bare"),
            project_root: root.to_path_buf(),
            layout: ProjectLayout::Legacy,
            config: ProjectConfig::default(),
            default_branch: "main".into(),
            global: GlobalConfig::default(),
        }
    }

    fn params(branch: &str, base: Option<&str>) -> CreateParams {
        CreateParams {
            branch: branch.into(),
            base: base.map(str::to_string),
        }
    }

    #[test]
    fn test_new_branch_starts_from_default() {
        let dir = tempdir().unwrap();
        let git = FakeGit::new("main");
        let result = execute(
            &params("feature/login", None),
            &project(dir.path()),
            &git,
            &Scaffolder::with_builtins(),
            &StepOptions::default(),
            &mut NullSink,
        )
        .unwrap();

        assert_eq!(result.path, dir.path().join("feature-login"));
        assert!(result.path.is_dir());
        assert!(result.created_branch);
        assert_eq!(git.calls.borrow().as_slice(), ["create_worktree feature/login main"]);
    }

    #[test]
    fn test_explicit_base_and_existing_branch() {
        let dir = tempdir().unwrap();
        let git = FakeGit::new("main");
        git.branches.borrow_mut().push("hotfix".into());

        execute(
            &params("feature/a", Some("develop")),
            &project(dir.path()),
            &git,
            &Scaffolder::with_builtins(),
            &StepOptions::default(),
            &mut NullSink,
        )
        .unwrap();
        let existing = execute(
            &params("hotfix", Some("develop")),
            &project(dir.path()),
            &git,
            &Scaffolder::with_builtins(),
            &StepOptions::default(),
            &mut NullSink,
        )
        .unwrap();

        assert!(!existing.created_branch);
        assert_eq!(
            git.calls.borrow().as_slice(),
            ["create_worktree feature/a develop", "create_worktree hotfix -"]
        );
    }

    #[test]
    fn test_dry_run_touches_nothing() {
        let dir = tempdir().unwrap();
        let git = FakeGit::new("main");
        let opts = StepOptions {
            dry_run: true,
            ..Default::default()
        };
        let result = execute(
            &params("feature/x", None),
            &project(dir.path()),
            &git,
            &Scaffolder::with_builtins(),
            &opts,
            &mut NullSink,
        )
        .unwrap();
        assert!(!result.path.exists());
        assert!(git.calls.borrow().is_empty());
    }

    #[test]
    fn test_refuses_existing_path_and_checked_out_branch() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("taken")).unwrap();
        let git = FakeGit::new("main").with_worktree(Path::new("/elsewhere/x"), Some("busy"));

        for branch in ["taken", "busy"] {
            assert!(execute(
                &params(branch, None),
                &project(dir.path()),
                &git,
                &Scaffolder::with_builtins(),
                &StepOptions::default(),
                &mut NullSink,
            )
            .is_err());
        }
        assert!(git.calls.borrow().is_empty());
    }

    #[test]
    fn test_invalid_branch_rejected() {
        let dir = tempdir().unwrap();
        let err = execute(
            &params("../escape", None),
            &project(dir.path()),
            &FakeGit::new("main"),
            &Scaffolder::with_builtins(),
            &StepOptions::default(),
            &mut NullSink,
        );
        assert!(err.is_err());
    }
}
