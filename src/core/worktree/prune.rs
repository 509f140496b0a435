//! Core logic for `arbor prune`.
//!
//! Removes every worktree whose branch has been merged into the default
//! branch. The default-branch worktree, the main checkout and the worktree the
//! command runs in are never touched.

use super::remove::{check_removable, remove_worktree, RemoveResult};
use super::scaffold::Scaffolder;
use crate::core::ProgressSink;
use crate::git::GitOps;
use crate::project::ProjectContext;
use crate::scaffold::StepOptions;
use crate::worktree::{list_worktrees, Worktree};
use anyhow::Result;

pub struct PruneParams {
    pub force: bool,
    pub delete_branch: bool,
}

#[derive(Default)]
pub struct PruneResult {
    pub removed: Vec<RemoveResult>,
    /// Merged, but the command is running inside it.
    pub skipped_current: Option<Worktree>,
}

impl PruneResult {
    pub fn nothing_to_prune(&self) -> bool {
        self.removed.is_empty() && self.skipped_current.is_none()
    }
}

/// Merged worktrees that may be removed, in listing order.
pub fn candidates(project: &ProjectContext, worktrees: &[Worktree]) -> Vec<Worktree> {
    worktrees
        .iter()
        .filter(|w| w.is_merged && check_removable(project, w).is_ok())
        .cloned()
        .collect()
}

pub fn execute(
    params: &PruneParams,
    project: &ProjectContext,
    git: &dyn GitOps,
    scaffolder: &Scaffolder,
    opts: &StepOptions,
    sink: &mut dyn ProgressSink,
) -> Result<PruneResult> {
    let worktrees = list_worktrees(
        git,
        &project.git_dir,
        &project.default_branch,
        &project.cwd,
    )?;

    let mut result = PruneResult::default();
    for worktree in candidates(project, &worktrees) {
        opts.cancel.check()?;
        if worktree.is_current {
            sink.on_warning(&format!(
                "Skipping {}: it is the current worktree",
                worktree.name
            ));
            result.skipped_current = Some(worktree);
            continue;
        }
        let removed = remove_worktree(
            project,
            git,
            scaffolder,
            worktree,
            params.force,
            params.delete_branch,
            opts,
            sink,
        )?;
        result.removed.push(removed);
    }
    Ok(result)
}
