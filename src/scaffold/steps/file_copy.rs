//! Copying files between paths inside a worktree.

use crate::config::StepConfig;
use crate::error::ArborError;
use crate::scaffold::context::ScaffoldContext;
use crate::scaffold::step::{configured_condition, Step, StepOptions};
use crate::scaffold::template::expand;
use anyhow::{Context, Result};
use std::fs;

/// `file.copy`: copy `from` to `to`, both relative to the worktree.
///
/// The target is written in place (not atomically) with mode 0644.
pub struct FileCopyStep {
    config: StepConfig,
    from: String,
    to: String,
}

impl FileCopyStep {
    pub fn new(config: StepConfig) -> Result<Self> {
        let (Some(from), Some(to)) = (config.from.clone(), config.to.clone()) else {
            return Err(ArborError::config("file.copy requires 'from' and 'to'").into());
        };
        Ok(Self { config, from, to })
    }
}

impl Step for FileCopyStep {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn condition(&self, ctx: &ScaffoldContext) -> bool {
        configured_condition(&self.config, ctx)
    }

    fn run(&self, ctx: &ScaffoldContext, _opts: &StepOptions) -> Result<()> {
        let vars = ctx.snapshot_for_template();
        let from = ctx.resolve(&expand(&self.from, &vars)?);
        let to = ctx.resolve(&expand(&self.to, &vars)?);

        if !from.is_file() {
            anyhow::bail!("source file {} does not exist", from.display());
        }
        let bytes =
            fs::read(&from).with_context(|| format!("Failed to read {}", from.display()))?;
        if let Some(parent) = to.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        fs::write(&to, bytes).with_context(|| format!("Failed to write {}", to.display()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&to, fs::Permissions::from_mode(0o644))
                .with_context(|| format!("Failed to set permissions on {}", to.display()))?;
        }
        Ok(())
    }

    fn enabled(&self) -> Option<bool> {
        self.config.enabled
    }
}
