//! Finding the project that owns a directory, and where its worktrees go.
//!
//! Two layouts exist. A legacy project is a directory holding a bare
//! repository in `.bare/` with one sibling directory per worktree. A linked
//! project is an ordinary checkout registered by name in the global config;
//! its worktrees live under `<worktree_base>/<name>/`.

use crate::config::{GlobalConfig, ProjectConfig, ProjectInfo};
use crate::error::ArborError;
use crate::git::GitOps;
use crate::log_debug;
use crate::utils::sanitize_branch;
use anyhow::{Context, Result};
use std::path::{Component, Path, PathBuf};

pub const BARE_DIR: &str = ".bare";

#[derive(Debug, Clone, PartialEq)]
pub enum ProjectLayout {
    Legacy,
    Linked {
        name: String,
        /// Unset when the global config has no `worktree_base`.
        worktree_base: Option<PathBuf>,
    },
}

/// Everything a command needs to know about the project it runs in.
#[derive(Debug, Clone)]
pub struct ProjectContext {
    pub cwd: PathBuf,
    pub git_dir: PathBuf,
    pub project_root: PathBuf,
    pub layout: ProjectLayout,
    pub config: ProjectConfig,
    pub default_branch: String,
    pub global: GlobalConfig,
}

impl ProjectContext {
    pub fn is_linked(&self) -> bool {
        matches!(self.layout, ProjectLayout::Linked { .. })
    }

    /// The registered name for linked projects, else the root's basename.
    pub fn name(&self) -> String {
        match &self.layout {
            ProjectLayout::Linked { name, .. } => name.clone(),
            ProjectLayout::Legacy => self
                .project_root
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
        }
    }

    fn project_info(&self) -> Option<&ProjectInfo> {
        match &self.layout {
            ProjectLayout::Linked { name, .. } => self.global.project(name),
            ProjectLayout::Legacy => None,
        }
    }

    /// `site_name` from `arbor.yaml`, then from the registration, then the
    /// project name.
    pub fn site_name(&self) -> String {
        self.config
            .site_name
            .clone()
            .or_else(|| self.project_info().and_then(|i| i.site_name.clone()))
            .unwrap_or_else(|| self.name())
    }

    /// The configured preset name, if any.
    pub fn preset(&self) -> Option<String> {
        self.config
            .preset
            .clone()
            .or_else(|| self.project_info().and_then(|i| i.preset.clone()))
    }

    /// Where the worktree for `branch` lives. Depends on nothing but the
    /// layout and the branch name.
    pub fn worktree_path(&self, branch: &str) -> Result<PathBuf> {
        let dir = sanitize_branch(branch);
        match &self.layout {
            ProjectLayout::Legacy => Ok(self.project_root.join(dir)),
            ProjectLayout::Linked {
                name,
                worktree_base: Some(base),
            } => Ok(base.join(name).join(dir)),
            ProjectLayout::Linked {
                name,
                worktree_base: None,
            } => Err(ArborError::config(format!(
                "worktree_base is not set in {}; linked project '{name}' has nowhere to put worktrees",
                GlobalConfig::default_path()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|_| "the global config".to_string())
            ))
            .into()),
        }
    }

    /// Directory that holds this project's worktrees other than the main
    /// checkout.
    pub fn worktrees_dir(&self) -> Option<PathBuf> {
        match &self.layout {
            ProjectLayout::Legacy => Some(self.project_root.clone()),
            ProjectLayout::Linked {
                name,
                worktree_base,
            } => worktree_base.as_ref().map(|base| base.join(name)),
        }
    }

    /// Whether `cwd` is inside a worktree of this project.
    ///
    /// Legacy: strictly below the project root and not in `.bare`. This does
    /// not ask git whether the directory really is a worktree. Linked:
    /// strictly below the main checkout or below `<worktree_base>/<name>`.
    pub fn is_in_worktree(&self) -> bool {
        let cwd = normalize(&self.cwd);
        match &self.layout {
            ProjectLayout::Legacy => {
                let root = normalize(&self.project_root);
                strictly_inside(&cwd, &root) && !cwd.starts_with(root.join(BARE_DIR))
            }
            ProjectLayout::Linked { .. } => {
                strictly_inside(&cwd, &normalize(&self.project_root))
                    || self
                        .worktrees_dir()
                        .is_some_and(|dir| strictly_inside(&cwd, &normalize(&dir)))
            }
        }
    }
}

/// Resolve the project owning `cwd`.
///
/// Registered linked projects win, then a `worktree_base/<name>/` path whose
/// name is registered, then the nearest ancestor holding `.bare/`.
pub fn resolve(cwd: &Path, global: GlobalConfig, git: &dyn GitOps) -> Result<ProjectContext> {
    let here = normalize(cwd);

    if let Some(name) = linked_by_path(&here, &global) {
        log_debug!("{} belongs to linked project {name}", here.display());
        return linked_context(cwd, name, global, git);
    }

    if let Some(name) = linked_by_worktree_base(&here, &global)? {
        log_debug!(
            "{} is under the worktree base of linked project {name}",
            here.display()
        );
        return linked_context(cwd, name, global, git);
    }

    if let Some(root) = find_bare_ancestor(&here) {
        log_debug!("Found {} in {}", BARE_DIR, root.display());
        let config = ProjectConfig::load(&root)?;
        let git_dir = root.join(BARE_DIR);
        let default_branch = effective_default_branch(&config, None, &global, &git_dir, git)?;
        return Ok(ProjectContext {
            cwd: cwd.to_path_buf(),
            git_dir,
            project_root: root,
            layout: ProjectLayout::Legacy,
            config,
            default_branch,
            global,
        });
    }

    Err(ArborError::not_found(format!(
        "{} is not inside an Arbor project",
        cwd.display()
    ))
    .into())
}

/// [`resolve`] with the global config from its default location.
pub fn discover(cwd: &Path, git: &dyn GitOps) -> Result<ProjectContext> {
    resolve(cwd, GlobalConfig::load()?, git)
}

fn linked_by_path(here: &Path, global: &GlobalConfig) -> Option<String> {
    global
        .projects
        .iter()
        .map(|(name, info)| (name, normalize(&info.path)))
        .filter(|(_, path)| here.starts_with(path))
        // Nested registrations: the innermost project owns the directory
        .max_by_key(|(_, path)| path.components().count())
        .map(|(name, _)| name.clone())
}

fn linked_by_worktree_base(here: &Path, global: &GlobalConfig) -> Result<Option<String>> {
    let Some(base) = global.worktree_base()? else {
        return Ok(None);
    };
    let Ok(rest) = here.strip_prefix(normalize(&base)) else {
        return Ok(None);
    };
    let name = match rest.components().next() {
        Some(Component::Normal(name)) => name.to_string_lossy().into_owned(),
        _ => return Ok(None),
    };
    Ok(global.projects.contains_key(&name).then_some(name))
}

fn linked_context(
    cwd: &Path,
    name: String,
    global: GlobalConfig,
    git: &dyn GitOps,
) -> Result<ProjectContext> {
    let info = global
        .project(&name)
        .cloned()
        .ok_or_else(|| ArborError::not_found(format!("project '{name}' is not registered")))?;
    let project_root = info.path.clone();
    let config = ProjectConfig::load(&project_root)?;
    let git_dir = git
        .find_git_dir(&project_root)
        .with_context(|| format!("Linked project '{name}' is not a git checkout"))?;
    let default_branch =
        effective_default_branch(&config, Some(&info), &global, &git_dir, git)?;
    let worktree_base = global.worktree_base()?;

    Ok(ProjectContext {
        cwd: cwd.to_path_buf(),
        git_dir,
        project_root,
        layout: ProjectLayout::Linked {
            name,
            worktree_base,
        },
        config,
        default_branch,
        global,
    })
}

/// `arbor.yaml`, then the project registration, then the global default,
/// then whatever git reports.
pub fn effective_default_branch(
    config: &ProjectConfig,
    info: Option<&ProjectInfo>,
    global: &GlobalConfig,
    git_dir: &Path,
    git: &dyn GitOps,
) -> Result<String> {
    let configured = [
        config.default_branch.as_deref(),
        info.and_then(|i| i.default_branch.as_deref()),
        global.default_branch.as_deref(),
    ];
    if let Some(branch) = configured
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|b| !b.is_empty())
    {
        return Ok(branch.to_string());
    }
    git.default_branch(git_dir)
}

fn find_bare_ancestor(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(BARE_DIR).is_dir())
        .map(Path::to_path_buf)
}

/// Symlinks resolved where the path exists, else made absolute.
pub(crate) fn normalize(path: &Path) -> PathBuf {
    path.canonicalize()
        .or_else(|_| std::path::absolute(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

fn strictly_inside(path: &Path, dir: &Path) -> bool {
    path != dir && path.starts_with(dir)
}
