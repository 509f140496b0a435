use super::Session;
use crate::config::{GlobalConfig, ProjectInfo};
use crate::output::Output;
use anyhow::Result;
use std::path::{Path, PathBuf};

#[derive(clap::Subcommand)]
pub enum ProjectCommand {
    /// Register an existing checkout as a linked project
    #[command(long_about = r#"
Registers an ordinary git checkout under <name> in the global config. Its
worktrees are created under <worktree_base>/<name>/, so worktree_base must be
set in the global config before `arbor work` can place them.
"#)]
    Add(AddArgs),
    /// Forget a linked project. Nothing on disk is touched.
    Remove(RemoveArgs),
    /// List linked projects
    List,
}

#[derive(clap::Args)]
pub struct AddArgs {
    #[arg(help = "Project name")]
    name: String,

    #[arg(help = "Path to the checkout (defaults to the current directory)")]
    path: Option<PathBuf>,

    #[arg(long, help = "Default branch, if git cannot tell")]
    default_branch: Option<String>,

    #[arg(long, help = "Preset to use instead of detection")]
    preset: Option<String>,

    #[arg(long, help = "Site name used for databases and URLs")]
    site_name: Option<String>,
}

#[derive(clap::Args)]
pub struct RemoveArgs {
    #[arg(help = "Project name")]
    name: String,
}

pub fn run(cmd: ProjectCommand, session: &Session, output: &mut dyn Output) -> Result<()> {
    let path = GlobalConfig::default_path()?;
    match cmd {
        ProjectCommand::Add(args) => add(args, &session.cwd, &path, output),
        ProjectCommand::Remove(args) => remove(&args.name, &path, output),
        ProjectCommand::List => list(&path, output),
    }
}

fn add(args: AddArgs, cwd: &Path, config_path: &Path, output: &mut dyn Output) -> Result<()> {
    let dir = match args.path {
        Some(path) => cwd.join(path),
        None => cwd.to_path_buf(),
    };
    let mut global = GlobalConfig::load_from(config_path)?;
    global.register_project(
        &args.name,
        &dir,
        ProjectInfo {
            path: PathBuf::new(),
            default_branch: args.default_branch,
            preset: args.preset,
            site_name: args.site_name,
        },
    )?;
    global.save_to(config_path)?;

    output.result(&format!("Registered project {}", args.name));
    if global.worktree_base.is_none() {
        output.warning(&format!(
            "worktree_base is not set in {}; set it before creating worktrees",
            config_path.display()
        ));
    }
    Ok(())
}

fn remove(name: &str, config_path: &Path, output: &mut dyn Output) -> Result<()> {
    let mut global = GlobalConfig::load_from(config_path)?;
    let info = global.unregister_project(name)?;
    global.save_to(config_path)?;
    output.result(&format!("Removed project {name}"));
    output.detail("checkout kept at", &info.path.display().to_string());
    Ok(())
}

fn list(config_path: &Path, output: &mut dyn Output) -> Result<()> {
    let global = GlobalConfig::load_from(config_path)?;
    if global.projects.is_empty() {
        output.info("No linked projects.");
        return Ok(());
    }
    for (name, info) in &global.projects {
        output.raw(&format!("{name}\t{}\n", info.path.display()));
    }
    Ok(())
}
