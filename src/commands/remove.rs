use super::{prompt, render_report, Session};
use crate::core::worktree::{remove, Scaffolder};
use crate::core::OutputSink;
use crate::output::Output;
use anyhow::Result;

#[derive(clap::Args)]
#[command(long_about = r#"
Runs the project's cleanup steps for a worktree (dropping its databases,
unlinking sites and so on), then removes the worktree.

<worktree> is matched against worktree directory names and branches: an exact
match wins, otherwise a unique partial match is used. The worktree holding the
default branch is never removed.
"#)]
pub struct Args {
    #[arg(help = "Worktree name or branch")]
    worktree: String,

    #[arg(short, long, help = "Remove even with uncommitted changes")]
    force: bool,

    #[arg(short = 'D', long, help = "Also delete the local branch")]
    delete_branch: bool,

    #[arg(long, help = "Show what would happen without changing anything")]
    dry_run: bool,

    #[arg(short, long, help = "Do not ask for confirmation")]
    yes: bool,
}

pub fn run(args: Args, session: &Session, output: &mut dyn Output) -> Result<()> {
    let git = session.git();
    let project = session.project(&git)?;
    let scaffolder = Scaffolder::with_builtins();

    if !args.dry_run {
        prompt::confirm(
            &format!("Remove worktree '{}'?", args.worktree),
            args.yes,
        )?;
    }

    let params = remove::RemoveParams {
        query: args.worktree,
        force: args.force,
        delete_branch: args.delete_branch,
    };
    let opts = session.step_options(args.dry_run);
    let result = {
        let mut sink = OutputSink(output);
        remove::execute(&params, &project, &git, &scaffolder, &opts, &mut sink)?
    };

    render_report(output, &result.report, args.dry_run);
    if args.dry_run {
        output.info(&format!(
            "Would remove {}",
            result.worktree.path.display()
        ));
        return Ok(());
    }

    output.result(&format!("Removed worktree {}", result.worktree.name));
    if result.branch_deleted {
        if let Some(branch) = &result.worktree.branch {
            output.detail("deleted branch", branch);
        }
    }
    Ok(())
}
