use super::{prompt, render_report, Session};
use crate::core::worktree::{prune, Scaffolder};
use crate::core::OutputSink;
use crate::output::Output;
use crate::worktree::list_worktrees;
use anyhow::Result;

#[derive(clap::Args)]
#[command(long_about = r#"
Removes every worktree whose branch is merged into the default branch,
running each one's cleanup steps first.

A branch counts as merged when it is contained in the default branch and the
default branch has moved past it; a branch that was just created from the
default branch is not merged. The default-branch worktree and the worktree you
are in are kept.
"#)]
pub struct Args {
    #[arg(short, long, help = "Remove even with uncommitted changes")]
    force: bool,

    #[arg(short = 'D', long, help = "Also delete the merged branches")]
    delete_branch: bool,

    #[arg(long, help = "List what would be removed without changing anything")]
    dry_run: bool,

    #[arg(short, long, help = "Do not ask for confirmation")]
    yes: bool,
}

pub fn run(args: Args, session: &Session, output: &mut dyn Output) -> Result<()> {
    let git = session.git();
    let project = session.project(&git)?;
    let scaffolder = Scaffolder::with_builtins();

    let worktrees = list_worktrees(
        &git,
        &project.git_dir,
        &project.default_branch,
        &project.cwd,
    )?;
    let candidates = prune::candidates(&project, &worktrees);
    if candidates.is_empty() {
        output.info("No merged worktrees to prune.");
        return Ok(());
    }

    output.info(&format!(
        "Merged into {}:",
        project.default_branch
    ));
    for worktree in &candidates {
        output.list_item(&worktree.name);
    }
    if !args.dry_run {
        prompt::confirm(
            &format!("Remove {} worktree(s)?", candidates.len()),
            args.yes,
        )?;
    }

    let params = prune::PruneParams {
        force: args.force,
        delete_branch: args.delete_branch,
    };
    let opts = session.step_options(args.dry_run);
    let result = {
        let mut sink = OutputSink(output);
        prune::execute(&params, &project, &git, &scaffolder, &opts, &mut sink)?
    };

    for removed in &result.removed {
        output.debug(&format!("Cleanup for {}", removed.worktree.name));
        render_report(output, &removed.report, args.dry_run);
    }
    if args.dry_run {
        output.info("Dry run complete. No changes were made.");
    } else {
        output.result(&format!("Pruned {} worktree(s)", result.removed.len()));
    }
    Ok(())
}
