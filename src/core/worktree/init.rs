//! Core logic for `arbor init`.
//!
//! Clones a repository into the legacy layout: a bare repository in
//! `<dir>/.bare` and one sibling directory per worktree, starting with the
//! default branch.

use super::scaffold::Scaffolder;
use crate::config::{GlobalConfig, ProjectConfig};
use crate::core::ProgressSink;
use crate::git::GitOps;
use crate::project::{self, ProjectContext, BARE_DIR};
use crate::scaffold::{PipelineReport, StepOptions};
use crate::utils::{extract_repo_name, normalize_clone_url, sanitize_branch};
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

pub struct InitParams {
    /// Clone URL, `owner/repo` shorthand or local path.
    pub repository: String,
    /// Target directory. Defaults to the repository name under `cwd`.
    pub directory: Option<PathBuf>,
    /// Run the scaffold pipeline for the new worktree.
    pub scaffold: bool,
}

pub struct InitResult {
    pub project_root: PathBuf,
    pub default_branch: String,
    pub worktree_path: PathBuf,
    pub preset: Option<String>,
    /// `None` when scaffolding was skipped.
    pub report: Option<PipelineReport>,
}

pub fn execute(
    params: &InitParams,
    cwd: &Path,
    global: GlobalConfig,
    git: &dyn GitOps,
    scaffolder: &Scaffolder,
    opts: &StepOptions,
    sink: &mut dyn ProgressSink,
) -> Result<InitResult> {
    let url = normalize_clone_url(&params.repository);
    let name = extract_repo_name(&url)?;
    let root = match &params.directory {
        Some(dir) => cwd.join(dir),
        None => cwd.join(&name),
    };
    check_target(&root)?;

    let git_dir = root.join(BARE_DIR);
    sink.on_step(&format!("Cloning {url} into {}", git_dir.display()));
    git.clone_bare(&url, &git_dir)?;
    git.configure_fetch_refspec(&git_dir, "origin")?;

    let default_branch = git
        .default_branch(&git_dir)
        .context("Could not determine the default branch")?;
    let worktree_path = root.join(sanitize_branch(&default_branch));
    sink.on_step(&format!(
        "Creating worktree for {default_branch} at {}",
        worktree_path.display()
    ));
    git.create_worktree(&git_dir, &worktree_path, &default_branch, None)?;

    let preset = scaffolder
        .presets
        .detect_preset(&worktree_path)
        .map(|p| p.name().to_string());
    let config = initial_config(&worktree_path, &default_branch, preset.clone())?;
    config.save(&root)?;
    sink.on_debug(&format!("Wrote {}", ProjectConfig::path_in(&root).display()));

    let report = if params.scaffold {
        let project = ProjectContext {
            cwd: worktree_path.clone(),
            git_dir,
            project_root: root.clone(),
            layout: project::ProjectLayout::Legacy,
            config,
            default_branch: default_branch.clone(),
            global,
        };
        Some(scaffolder.run_scaffold(&project, git, &worktree_path, &default_branch, opts, sink)?)
    } else {
        None
    };

    Ok(InitResult {
        project_root: root,
        default_branch,
        worktree_path,
        preset,
        report,
    })
}

/// A missing or empty directory is fine; anything else is refused.
fn check_target(root: &Path) -> Result<()> {
    if !root.exists() {
        return Ok(());
    }
    if !root.is_dir() {
        anyhow::bail!("{} exists and is not a directory", root.display());
    }
    let mut entries =
        fs::read_dir(root).with_context(|| format!("Failed to read {}", root.display()))?;
    if entries.next().is_some() {
        anyhow::bail!("{} already exists and is not empty", root.display());
    }
    Ok(())
}

/// The checked-out `arbor.yaml`, if the repository ships one, with the
/// default branch and detected preset filled in where unset.
fn initial_config(
    worktree: &Path,
    default_branch: &str,
    preset: Option<String>,
) -> Result<ProjectConfig> {
    let mut config = ProjectConfig::load(worktree)?;
    if config.default_branch.is_none() {
        config.default_branch = Some(default_branch.to_string());
    }
    if config.preset.is_none() {
        config.preset = preset;
    }
    Ok(config)
}
