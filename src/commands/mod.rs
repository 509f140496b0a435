//! Command-line surface.
//!
//! One module per subcommand, each with its own clap `Args` and a `run`
//! function that drives a core operation and renders its result through an
//! [`Output`].

pub mod init;
pub mod list;
pub mod migrate;
pub mod project;
mod prompt;
pub mod prune;
pub mod remove;
pub mod scaffold;
pub mod work;

use crate::git::{GitCommand, GitOps};
use crate::output::Output;
use crate::process::CancelToken;
use crate::project::{self as resolver, ProjectContext};
use crate::scaffold::{PipelineReport, StepOptions, StepOutcome};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "arbor")]
#[command(version = crate::VERSION)]
#[command(about = "Parallel git worktrees with per-checkout scaffolding")]
#[command(long_about = r#"
Manages git worktrees for a project kept either as a bare repository with
sibling worktree directories (created by `arbor init`) or as an ordinary
checkout registered with `arbor project add`.

Every new worktree is scaffolded: the project's preset and arbor.yaml steps
copy env files, install dependencies, create a per-worktree database and so
on. Removing a worktree runs the matching cleanup steps.
"#)]
pub struct Cli {
    #[arg(short, long, global = true, help = "Show detailed progress")]
    pub verbose: bool,

    #[arg(
        short,
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Only print warnings and errors"
    )]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Clone a repository into a new worktree-based project
    Init(init::Args),
    /// Create a worktree for a branch and scaffold it
    Work(work::Args),
    /// Run cleanup steps and remove a worktree
    Remove(remove::Args),
    /// List the project's worktrees
    List(list::Args),
    /// Re-run the scaffold for the current worktree
    Scaffold(scaffold::Args),
    /// Remove every worktree whose branch is merged into the default branch
    Prune(prune::Args),
    /// Manage linked projects in the global config
    #[command(subcommand)]
    Project(project::ProjectCommand),
    /// Move a legacy db_suffix from arbor.yaml into .arbor.local
    Migrate(migrate::Args),
}

/// What every command needs besides its own arguments.
pub struct Session {
    pub cwd: PathBuf,
    pub cancel: CancelToken,
    pub verbose: bool,
    pub quiet: bool,
}

impl Session {
    pub fn new(cwd: PathBuf, cancel: CancelToken, verbose: bool, quiet: bool) -> Self {
        Self {
            cwd,
            cancel,
            verbose,
            quiet,
        }
    }

    /// From the process working directory.
    pub fn current(cancel: CancelToken, verbose: bool, quiet: bool) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current directory")?;
        Ok(Self::new(cwd, cancel, verbose, quiet))
    }

    pub fn git(&self) -> GitCommand {
        GitCommand::new(self.quiet).with_cancel(self.cancel.clone())
    }

    pub fn project(&self, git: &dyn GitOps) -> Result<ProjectContext> {
        resolver::discover(&self.cwd, git)
    }

    pub fn step_options(&self, dry_run: bool) -> StepOptions {
        StepOptions {
            dry_run,
            verbose: self.verbose,
            quiet: self.quiet,
            cancel: self.cancel.clone(),
        }
    }
}

pub fn run(cli: Cli, session: &Session, output: &mut dyn Output) -> Result<()> {
    match cli.command {
        Command::Init(args) => init::run(args, session, output),
        Command::Work(args) => work::run(args, session, output),
        Command::Remove(args) => remove::run(args, session, output),
        Command::List(args) => list::run(args, session, output),
        Command::Scaffold(args) => scaffold::run(args, session, output),
        Command::Prune(args) => prune::run(args, session, output),
        Command::Project(cmd) => project::run(cmd, session, output),
        Command::Migrate(args) => migrate::run(args, session, output),
    }
}

/// Summarize a pipeline run. Dry runs list every step that would execute.
pub(crate) fn render_report(output: &mut dyn Output, report: &PipelineReport, dry_run: bool) {
    if dry_run {
        let would_run = report.would_run();
        if would_run.is_empty() {
            output.info("No steps would run.");
        } else {
            output.info("Steps that would run:");
            for name in would_run {
                output.list_item(name);
            }
        }
    }
    for step in &report.steps {
        if let StepOutcome::Skipped(reason) = &step.outcome {
            output.debug(&format!("Skipped {}: {reason}", step.name));
        }
    }
    if !dry_run && !report.ran().is_empty() {
        output.success(&format!("Ran {} steps", report.ran().len()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::{OutputEntry, TestOutput};
    use crate::scaffold::StepReport;

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_render_dry_run_lists_steps() {
        let report = PipelineReport {
            steps: vec![
                StepReport {
                    name: "php.composer".into(),
                    outcome: StepOutcome::WouldRun,
                },
                StepReport {
                    name: "node.npm".into(),
                    outcome: StepOutcome::Skipped("condition not met".into()),
                },
            ],
        };
        let mut output = TestOutput::new();
        render_report(&mut output, &report, true);
        assert!(output
            .entries()
            .contains(&OutputEntry::ListItem("php.composer".into())));
        assert!(!output
            .entries()
            .iter()
            .any(|e| matches!(e, OutputEntry::Success(_))));
    }
}
