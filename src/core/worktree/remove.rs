//! Core logic for `arbor remove`: run cleanup, then remove the worktree.

use super::scaffold::Scaffolder;
use crate::core::ProgressSink;
use crate::git::GitOps;
use crate::project::{normalize, ProjectContext};
use crate::scaffold::{PipelineReport, StepOptions};
use crate::utils::remove_empty_dirs;
use crate::worktree::{find_worktree, list_worktrees, Worktree};
use anyhow::{Context, Result};

pub struct RemoveParams {
    /// Worktree name or branch, matched like `find_worktree`.
    pub query: String,
    /// Remove even with uncommitted changes.
    pub force: bool,
    /// Also delete the local branch.
    pub delete_branch: bool,
}

#[derive(Debug)]
pub struct RemoveResult {
    pub worktree: Worktree,
    pub branch_deleted: bool,
    pub report: PipelineReport,
}

pub fn execute(
    params: &RemoveParams,
    project: &ProjectContext,
    git: &dyn GitOps,
    scaffolder: &Scaffolder,
    opts: &StepOptions,
    sink: &mut dyn ProgressSink,
) -> Result<RemoveResult> {
    let worktrees = list_worktrees(
        git,
        &project.git_dir,
        &project.default_branch,
        &project.cwd,
    )?;
    let target = find_worktree(&worktrees, &params.query)?.clone();
    check_removable(project, &target)?;
    remove_worktree(
        project,
        git,
        scaffolder,
        target,
        params.force,
        params.delete_branch,
        opts,
        sink,
    )
}

/// The default-branch worktree and a linked project's main checkout stay.
pub(crate) fn check_removable(project: &ProjectContext, worktree: &Worktree) -> Result<()> {
    if worktree.is_main {
        anyhow::bail!(
            "Refusing to remove {}: it holds the default branch",
            worktree.name
        );
    }
    if normalize(&worktree.path) == normalize(&project.project_root) {
        anyhow::bail!(
            "Refusing to remove {}: it is the project's main checkout",
            worktree.name
        );
    }
    Ok(())
}

/// Cleanup, `git worktree remove`, optional branch deletion, then tidy up
/// directories left empty.
#[allow(clippy::too_many_arguments)]
pub(crate) fn remove_worktree(
    project: &ProjectContext,
    git: &dyn GitOps,
    scaffolder: &Scaffolder,
    worktree: Worktree,
    force: bool,
    delete_branch: bool,
    opts: &StepOptions,
    sink: &mut dyn ProgressSink,
) -> Result<RemoveResult> {
    let branch = worktree.branch.clone().unwrap_or_default();
    let report = scaffolder.run_cleanup(project, &worktree.path, &branch, opts, sink)?;

    if opts.dry_run {
        sink.on_step(&format!("Would remove {}", worktree.path.display()));
        if delete_branch && !branch.is_empty() {
            sink.on_step(&format!("Would delete branch {branch}"));
        }
        return Ok(RemoveResult {
            worktree,
            branch_deleted: false,
            report,
        });
    }

    sink.on_step(&format!("Removing {}", worktree.path.display()));
    git.remove_worktree(&project.git_dir, &worktree.path, force)?;

    let mut branch_deleted = false;
    if delete_branch && !branch.is_empty() {
        git.delete_branch(&project.git_dir, &branch, force)
            .with_context(|| format!("Worktree removed but branch '{branch}' was kept"))?;
        branch_deleted = true;
    }

    if let (Some(parent), Some(stop)) = (worktree.path.parent(), project.worktrees_dir()) {
        if let Err(e) = remove_empty_dirs(parent, &stop) {
            sink.on_debug(&format!("Could not tidy empty directories: {e:#}"));
        }
    }

    Ok(RemoveResult {
        worktree,
        branch_deleted,
        report,
    })
}
