use super::{render_report, Session};
use crate::core::worktree::{create, Scaffolder};
use crate::core::OutputSink;
use crate::output::Output;
use anyhow::Result;

#[derive(clap::Args)]
#[command(long_about = r#"
Creates a worktree for <branch> and scaffolds it.

An existing branch is checked out as is. A new branch starts from --base, or
from the project's default branch. The worktree directory is the branch name
with every '/' replaced by '-', placed next to the other worktrees of the
project.
"#)]
pub struct Args {
    #[arg(help = "Branch to check out or create")]
    branch: String,

    #[arg(long, help = "Start point for a new branch")]
    base: Option<String>,

    #[arg(long, help = "Show what would happen without changing anything")]
    dry_run: bool,
}

pub fn run(args: Args, session: &Session, output: &mut dyn Output) -> Result<()> {
    let git = session.git();
    let project = session.project(&git)?;
    let scaffolder = Scaffolder::with_builtins();
    let params = create::CreateParams {
        branch: args.branch,
        base: args.base,
    };
    let opts = session.step_options(args.dry_run);

    let result = {
        let mut sink = OutputSink(output);
        create::execute(&params, &project, &git, &scaffolder, &opts, &mut sink)?
    };

    render_report(output, &result.report, args.dry_run);
    if args.dry_run {
        output.info("Dry run complete. No changes were made.");
        return Ok(());
    }

    let how = match &result.base {
        Some(base) => format!("new branch from {base}"),
        None => "existing branch".to_string(),
    };
    output.result(&format!("Created worktree for {} ({how})", result.branch));
    output.raw(&format!("{}\n", result.path.display()));
    Ok(())
}
