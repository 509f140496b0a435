use super::{render_report, Session};
use crate::core::worktree::Scaffolder;
use crate::core::OutputSink;
use crate::error::ArborError;
use crate::output::Output;
use crate::worktree::{current_worktree, list_worktrees};
use anyhow::Result;

#[derive(clap::Args)]
#[command(long_about = r#"
Runs the scaffold steps again for the worktree you are in, for example after
changing arbor.yaml. Steps are expected to be safe to repeat: env values are
overwritten in place and an existing database suffix is reused.
"#)]
pub struct Args {
    #[arg(long, help = "Show the steps without running them")]
    dry_run: bool,
}

pub fn run(args: Args, session: &Session, output: &mut dyn Output) -> Result<()> {
    let git = session.git();
    let project = session.project(&git)?;
    let worktrees = list_worktrees(
        &git,
        &project.git_dir,
        &project.default_branch,
        &project.cwd,
    )?;
    let current = current_worktree(&worktrees).ok_or_else(|| {
        ArborError::not_found(format!(
            "{} is not inside a worktree of {}",
            session.cwd.display(),
            project.name()
        ))
    })?;
    let branch = current.branch.clone().unwrap_or_default();

    let scaffolder = Scaffolder::with_builtins();
    let opts = session.step_options(args.dry_run);
    let report = {
        let mut sink = OutputSink(output);
        scaffolder.run_scaffold(&project, &git, &current.path, &branch, &opts, &mut sink)?
    };

    render_report(output, &report, args.dry_run);
    if !args.dry_run {
        output.result(&format!("Scaffolded {}", current.name));
    }
    Ok(())
}
