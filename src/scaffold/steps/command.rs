//! Steps that run an external program in the worktree.

use crate::config::StepConfig;
use crate::error::ArborError;
use crate::log_debug;
use crate::process::run_command;
use crate::scaffold::context::ScaffoldContext;
use crate::scaffold::step::{configured_condition, Step, StepOptions};
use crate::scaffold::template::{expand, expand_all};
use anyhow::{Context, Result};
use std::process::Command;

/// Spawn `program args...` in the worktree and apply `store_as`.
fn execute(
    config: &StepConfig,
    ctx: &ScaffoldContext,
    opts: &StepOptions,
    program: &str,
    args: &[String],
) -> Result<()> {
    log_debug!("Running {program} {}", args.join(" "));
    let mut cmd = Command::new(program);
    cmd.args(args).current_dir(&ctx.worktree_path).envs(&ctx.env);

    let output = run_command(&mut cmd, &opts.cancel)
        .with_context(|| format!("Failed to run {program}"))?;

    if opts.verbose && !output.stdout.trim().is_empty() {
        log_debug!("{}", output.stdout.trim_end());
    }
    if !output.success() {
        anyhow::bail!("{program} failed: {}", output.error_message());
    }
    if let Some(name) = config.store_as.as_deref().filter(|n| !n.is_empty()) {
        ctx.set_var(name, &output.combined());
    }
    Ok(())
}

/// A named binary such as `composer` or `php artisan`, run with the step's
/// templated `args`.
pub struct BinaryStep {
    config: StepConfig,
    program: String,
    leading_args: Vec<String>,
}

impl BinaryStep {
    pub fn new(config: StepConfig, binary: &str) -> Result<Self> {
        let mut tokens = binary.split_whitespace().map(str::to_string);
        let program = tokens
            .next()
            .ok_or_else(|| ArborError::config(format!("{}: empty program", config.name)))?;
        Ok(Self {
            config,
            program,
            leading_args: tokens.collect(),
        })
    }
}

impl Step for BinaryStep {
    fn name(&self) -> &str {
        &self.config.name
    }

    /// Without a configured condition the step applies when the program is
    /// on PATH.
    fn condition(&self, ctx: &ScaffoldContext) -> bool {
        match &self.config.condition {
            Some(condition) => ctx.evaluate(condition),
            None => which::which(&self.program).is_ok(),
        }
    }

    fn run(&self, ctx: &ScaffoldContext, opts: &StepOptions) -> Result<()> {
        let vars = ctx.snapshot_for_template();
        let mut args = self.leading_args.clone();
        args.extend(expand_all(&self.config.args, &vars)?);
        execute(&self.config, ctx, opts, &self.program, &args)
    }

    fn enabled(&self) -> Option<bool> {
        self.config.enabled
    }
}

/// `<shell> -c <command>` with the command templated.
pub struct ShellStep {
    config: StepConfig,
    shell: &'static str,
    command: String,
}

impl ShellStep {
    pub fn new(config: StepConfig, shell: &'static str) -> Result<Self> {
        let command = match config.command.as_deref() {
            Some(command) if !command.trim().is_empty() => command.to_string(),
            _ => {
                return Err(
                    ArborError::config(format!("{} requires 'command'", config.name)).into(),
                )
            }
        };
        Ok(Self {
            config,
            shell,
            command,
        })
    }
}

impl Step for ShellStep {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn condition(&self, ctx: &ScaffoldContext) -> bool {
        configured_condition(&self.config, ctx)
    }

    fn run(&self, ctx: &ScaffoldContext, opts: &StepOptions) -> Result<()> {
        let command = expand(&self.command, &ctx.snapshot_for_template())?;
        execute(
            &self.config,
            ctx,
            opts,
            self.shell,
            &["-c".to_string(), command],
        )
    }

    fn enabled(&self) -> Option<bool> {
        self.config.enabled
    }
}
