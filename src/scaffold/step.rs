use super::context::ScaffoldContext;
use crate::config::StepConfig;
use crate::process::CancelToken;
use anyhow::Result;

/// Flags shared by every step of one pipeline run.
#[derive(Debug, Clone, Default)]
pub struct StepOptions {
    pub dry_run: bool,
    pub verbose: bool,
    pub quiet: bool,
    pub cancel: CancelToken,
}

/// One unit of scaffold or cleanup work.
pub trait Step: Send + Sync {
    /// Registry name, e.g. `env.write`.
    fn name(&self) -> &str;

    /// Whether the step applies to this worktree. False means skipped.
    fn condition(&self, ctx: &ScaffoldContext) -> bool;

    fn run(&self, ctx: &ScaffoldContext, opts: &StepOptions) -> Result<()>;

    /// `Some(false)` when the step was explicitly disabled.
    fn enabled(&self) -> Option<bool> {
        None
    }
}

/// The configured condition, or true when there is none.
pub(crate) fn configured_condition(config: &StepConfig, ctx: &ScaffoldContext) -> bool {
    config
        .condition
        .as_ref()
        .is_none_or(|condition| ctx.evaluate(condition))
}
