use super::Session;
use crate::config::migrate::{migrate_db_suffix, MigrationOutcome};
use crate::error::ArborError;
use crate::output::Output;
use crate::worktree::{current_worktree, list_worktrees};
use anyhow::Result;

#[derive(clap::Args)]
#[command(long_about = r#"
Older releases stored the database suffix in arbor.yaml, where it could be
committed by accident. This moves it into the worktree's .arbor.local.
Running it again does nothing.
"#)]
pub struct Args {}

pub fn run(_args: Args, session: &Session, output: &mut dyn Output) -> Result<()> {
    let git = session.git();
    let dir = match session.project(&git) {
        Ok(project) => {
            let worktrees = list_worktrees(
                &git,
                &project.git_dir,
                &project.default_branch,
                &project.cwd,
            )?;
            match current_worktree(&worktrees) {
                Some(w) => w.path.clone(),
                None if project.is_in_worktree() => session.cwd.clone(),
                None => {
                    return Err(ArborError::not_found(format!(
                        "{} is not inside a worktree of {}",
                        session.cwd.display(),
                        project.name()
                    ))
                    .into())
                }
            }
        }
        Err(e) => {
            output.debug(&format!("Not in a project ({e:#}); migrating the current directory"));
            session.cwd.clone()
        }
    };

    match migrate_db_suffix(&dir)? {
        MigrationOutcome::Migrated { suffix } => {
            output.result(&format!("Moved db_suffix '{suffix}' into .arbor.local"));
            output.detail("worktree", &dir.display().to_string());
        }
        MigrationOutcome::NothingToDo => output.info("Nothing to migrate."),
    }
    Ok(())
}
