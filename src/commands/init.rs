use super::{render_report, Session};
use crate::config::GlobalConfig;
use crate::core::worktree::{init, Scaffolder};
use crate::core::OutputSink;
use crate::output::Output;
use anyhow::Result;
use std::path::PathBuf;

#[derive(clap::Args)]
#[command(long_about = r#"
Clones a repository as a bare repository into <dir>/.bare, configures the
origin fetch refspec so remote branches are visible, and creates a worktree for
the default branch next to it.

An arbor.yaml recording the default branch and the detected preset is written
to <dir>, and the new worktree is scaffolded unless --no-scaffold is given.

The repository may be a full URL, a local path, or an owner/repo shorthand
for GitHub.
"#)]
pub struct Args {
    #[arg(help = "Repository URL, local path or owner/repo")]
    repository: String,

    #[arg(help = "Target directory (defaults to the repository name)")]
    directory: Option<PathBuf>,

    #[arg(long, help = "Do not scaffold the default-branch worktree")]
    no_scaffold: bool,

    #[arg(long, help = "Show the scaffold steps without running them")]
    dry_run: bool,
}

pub fn run(args: Args, session: &Session, output: &mut dyn Output) -> Result<()> {
    let git = session.git();
    let scaffolder = Scaffolder::with_builtins();
    let params = init::InitParams {
        repository: args.repository,
        directory: args.directory,
        scaffold: !args.no_scaffold,
    };
    let opts = session.step_options(args.dry_run);

    let result = {
        let mut sink = OutputSink(output);
        init::execute(
            &params,
            &session.cwd,
            GlobalConfig::load()?,
            &git,
            &scaffolder,
            &opts,
            &mut sink,
        )?
    };

    if let Some(report) = &result.report {
        render_report(output, report, args.dry_run);
    }
    output.result(&format!(
        "Initialized {} on {}",
        result.project_root.display(),
        result.default_branch
    ));
    output.detail("worktree", &result.worktree_path.display().to_string());
    if let Some(preset) = &result.preset {
        output.detail("preset", preset);
    }
    Ok(())
}
