//! Running the scaffold and cleanup pipelines for one worktree.
//!
//! Shared by `work`, `init`, `remove`, `prune` and the `scaffold` command.

use crate::config::local::LOCAL_STATE_FILE;
use crate::config::{LocalState, StepConfig};
use crate::core::ProgressSink;
use crate::error::ArborError;
use crate::git::GitOps;
use crate::presets::PresetManager;
use crate::project::ProjectContext;
use crate::scaffold::{
    assemble_steps, run_pipeline, PipelineReport, ScaffoldContext, StepOptions, StepRegistry,
};
use anyhow::Result;
use std::path::Path;

/// Step kinds and presets available to a pipeline run.
pub struct Scaffolder {
    pub registry: StepRegistry,
    pub presets: PresetManager,
}

impl Scaffolder {
    pub fn new(registry: StepRegistry, presets: PresetManager) -> Self {
        Self { registry, presets }
    }

    pub fn with_builtins() -> Self {
        Self::new(StepRegistry::with_builtins(), PresetManager::with_builtins())
    }

    /// The configured preset, or the one detected in the worktree.
    ///
    /// A configured name that no preset answers to is a configuration error.
    pub fn preset_name(&self, project: &ProjectContext, worktree: &Path) -> Result<Option<String>> {
        if let Some(name) = project.preset() {
            if self.presets.get(&name).is_none() {
                return Err(ArborError::config(format!(
                    "unknown preset '{name}' (available: {})",
                    self.presets.names().join(", ")
                ))
                .into());
            }
            return Ok(Some(name));
        }
        Ok(self
            .presets
            .detect_preset(worktree)
            .map(|p| p.name().to_string()))
    }

    /// A fresh context for `branch` checked out at `worktree`, seeded with the
    /// suffix recorded in the worktree's local state.
    pub fn context(
        &self,
        project: &ProjectContext,
        worktree: &Path,
        branch: &str,
        preset: Option<&str>,
    ) -> Result<ScaffoldContext> {
        let local = LocalState::load(worktree)?;
        Ok(ScaffoldContext::new(worktree, branch, &project.name())
            .with_site_name(&project.site_name())
            .with_preset(preset)
            .with_db_suffix(local.db_suffix()))
    }

    pub fn scaffold_steps(&self, project: &ProjectContext, preset: Option<&str>) -> Vec<StepConfig> {
        let preset_steps = preset
            .and_then(|name| self.presets.get(name))
            .map(|p| p.scaffold_steps())
            .unwrap_or_default();
        assemble_steps(
            &preset_steps,
            project.config.scaffold_steps(),
            project.config.scaffold_overrides_preset(),
        )
    }

    pub fn cleanup_steps(&self, project: &ProjectContext, preset: Option<&str>) -> Vec<StepConfig> {
        let preset_steps = preset
            .and_then(|name| self.presets.get(name))
            .map(|p| p.cleanup_steps())
            .unwrap_or_default();
        assemble_steps(
            &preset_steps,
            project.config.cleanup_steps(),
            project.config.cleanup_overrides_preset(),
        )
    }

    /// Scaffold the worktree at `worktree`, preflight first.
    ///
    /// After a real run, warns when `.arbor.local` exists but git does not
    /// ignore it.
    pub fn run_scaffold(
        &self,
        project: &ProjectContext,
        git: &dyn GitOps,
        worktree: &Path,
        branch: &str,
        opts: &StepOptions,
        sink: &mut dyn ProgressSink,
    ) -> Result<PipelineReport> {
        let preset = self.preset_name(project, worktree)?;
        match &preset {
            Some(name) => sink.on_debug(&format!("Using preset {name}")),
            None => sink.on_debug("No preset configured or detected"),
        }
        let ctx = self.context(project, worktree, branch, preset.as_deref())?;
        let steps = self
            .registry
            .build_all(&self.scaffold_steps(project, preset.as_deref()))?;
        let report = run_pipeline(&steps, &ctx, opts, project.config.preflight(), sink)?;

        if !opts.dry_run {
            warn_if_local_state_tracked(git, worktree, sink);
        }
        Ok(report)
    }

    /// Run the cleanup steps for the worktree at `worktree`. No preflight.
    pub fn run_cleanup(
        &self,
        project: &ProjectContext,
        worktree: &Path,
        branch: &str,
        opts: &StepOptions,
        sink: &mut dyn ProgressSink,
    ) -> Result<PipelineReport> {
        let preset = self.preset_name(project, worktree)?;
        let ctx = self.context(project, worktree, branch, preset.as_deref())?;
        let steps = self
            .registry
            .build_all(&self.cleanup_steps(project, preset.as_deref()))?;
        run_pipeline(&steps, &ctx, opts, None, sink)
    }
}

fn warn_if_local_state_tracked(git: &dyn GitOps, worktree: &Path, sink: &mut dyn ProgressSink) {
    if !LocalState::path_in(worktree).exists() {
        return;
    }
    match git.is_ignored(worktree, LOCAL_STATE_FILE) {
        Ok(true) => {}
        Ok(false) => sink.on_warning(&format!(
            "{} is not ignored by git; add it to .gitignore so it is not committed",
            LOCAL_STATE_FILE
        )),
        Err(e) => sink.on_debug(&format!(
            "Could not check whether {} is ignored: {e:#}",
            LOCAL_STATE_FILE
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GlobalConfig, ProjectConfig};
    use crate::git::fake::FakeGit;
    use crate::project::ProjectLayout;
    use crate::scaffold::StepOutcome;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::tempdir;

    /// Collects warnings and steps.
    #[derive(Default)]
    struct Recording {
        steps: Vec<String>,
        warnings: Vec<String>,
    }

    impl ProgressSink for Recording {
        fn on_step(&mut self, msg: &str) {
            self.steps.push(msg.to_string());
        }
        fn on_warning(&mut self, msg: &str) {
            self.warnings.push(msg.to_string());
        }
        fn on_debug(&mut self, _msg: &str) {}
    }

    fn project(root: &Path, config: ProjectConfig) -> ProjectContext {
        ProjectContext {
            cwd: root.to_path_buf(),
            git_dir: root.join(".bare"),
            project_root: root.to_path_buf(),
            layout: ProjectLayout::Legacy,
            config,
            default_branch: "main".into(),
            global: GlobalConfig::default(),
        }
    }

    fn laravel_checkout(path: &PathBuf) {
        fs::create_dir_all(path).unwrap();
        fs::write(path.join("artisan"), "").unwrap();
        fs::write(path.join("composer.json"), "{}").unwrap();
        fs::write(path.join(".env.example"), "APP_KEY=\n").unwrap();
    }

    #[test]
    fn test_detected_preset_dry_run_in_declared_order() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("shop");
        let wt = root.join("main");
        laravel_checkout(&wt);

        let scaffolder = Scaffolder::with_builtins();
        let project = project(&root, ProjectConfig::default());
        let opts = StepOptions {
            dry_run: true,
            ..Default::default()
        };
        let report = scaffolder
            .run_scaffold(&project, &FakeGit::new("main"), &wt, "main", &opts, &mut Recording::default())
            .unwrap();

        let names: Vec<&str> = report.steps.iter().map(|s| s.name.as_str()).collect();
        let expected: Vec<String> = scaffolder
            .presets
            .get("laravel")
            .unwrap()
            .scaffold_steps()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, expected);
        assert!(report
            .steps
            .iter()
            .all(|s| s.outcome != StepOutcome::Ran));
        assert!(!wt.join(".env").exists());
    }

    #[test]
    fn test_unknown_configured_preset_is_config_error() {
        let dir = tempdir().unwrap();
        let config = ProjectConfig {
            preset: Some("rails".into()),
            ..Default::default()
        };
        let err = Scaffolder::with_builtins()
            .preset_name(&project(dir.path(), config), dir.path())
            .unwrap_err();
        assert_eq!(
            crate::error::exit_code_for(&err),
            crate::error::exit_codes::CONFIG
        );
    }

    #[test]
    fn test_warns_when_local_state_not_ignored() {
        let dir = tempdir().unwrap();
        let wt = dir.path().join("wt");
        fs::create_dir_all(&wt).unwrap();
        LocalState {
            db_suffix: Some("brave_otter".into()),
        }
        .save(&wt)
        .unwrap();

        let git = FakeGit {
            ignored: false,
            ..FakeGit::new("main")
        };
        let mut sink = Recording::default();
        Scaffolder::with_builtins()
            .run_scaffold(
                &project(dir.path(), ProjectConfig::default()),
                &git,
                &wt,
                "main",
                &StepOptions::default(),
                &mut sink,
            )
            .unwrap();
        assert_eq!(sink.warnings.len(), 1);
        assert!(sink.warnings[0].contains(".arbor.local"));

        let mut quiet = Recording::default();
        Scaffolder::with_builtins()
            .run_scaffold(
                &project(dir.path(), ProjectConfig::default()),
                &FakeGit::new("main"),
                &wt,
                "main",
                &StepOptions::default(),
                &mut quiet,
            )
            .unwrap();
        assert!(quiet.warnings.is_empty());
    }

    #[test]
    fn test_context_carries_recorded_suffix() {
        let dir = tempdir().unwrap();
        LocalState {
            db_suffix: Some("calm_heron".into()),
        }
        .save(dir.path())
        .unwrap();
        let config = ProjectConfig {
            site_name: Some("My Shop".into()),
            ..Default::default()
        };
        let ctx = Scaffolder::with_builtins()
            .context(&project(dir.path(), config), dir.path(), "main", None)
            .unwrap();
        assert_eq!(ctx.db_suffix().as_deref(), Some("calm_heron"));
        assert_eq!(ctx.site_name, "My Shop");
    }
}
