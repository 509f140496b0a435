//! `env.read`, `env.write` and `env.copy`.

use crate::config::StepConfig;
use crate::envfile;
use crate::error::ArborError;
use crate::scaffold::context::ScaffoldContext;
use crate::scaffold::step::{configured_condition, Step, StepOptions};
use crate::scaffold::template::expand;
use anyhow::{Context, Result};
use std::path::PathBuf;

const DEFAULT_ENV_FILE: &str = ".env";

fn required_key(config: &StepConfig) -> Result<String> {
    match config.key.as_deref().map(str::trim) {
        Some(key) if !key.is_empty() => Ok(key.to_string()),
        _ => Err(ArborError::config(format!("{} requires 'key'", config.name)).into()),
    }
}

fn target_file(config: &StepConfig, ctx: &ScaffoldContext) -> Result<PathBuf> {
    let file = config.file.as_deref().unwrap_or(DEFAULT_ENV_FILE);
    Ok(ctx.resolve(&expand(file, &ctx.snapshot_for_template())?))
}

/// Store one env file value in the context variables.
pub struct EnvReadStep {
    config: StepConfig,
    key: String,
}

impl EnvReadStep {
    pub fn new(config: StepConfig) -> Result<Self> {
        let key = required_key(&config)?;
        Ok(Self { config, key })
    }

    fn variable(&self) -> &str {
        match self.config.store_as.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => &self.key,
        }
    }
}

impl Step for EnvReadStep {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn condition(&self, ctx: &ScaffoldContext) -> bool {
        configured_condition(&self.config, ctx)
    }

    fn run(&self, ctx: &ScaffoldContext, _opts: &StepOptions) -> Result<()> {
        let path = target_file(&self.config, ctx)?;
        let value = envfile::read_value(&path, &self.key)?;
        ctx.set_var(self.variable(), &value);
        Ok(())
    }

    fn enabled(&self) -> Option<bool> {
        self.config.enabled
    }
}

/// Set one key in an env file. The value is a template.
pub struct EnvWriteStep {
    config: StepConfig,
    key: String,
}

impl EnvWriteStep {
    pub fn new(config: StepConfig) -> Result<Self> {
        let key = required_key(&config)?;
        Ok(Self { config, key })
    }
}

impl Step for EnvWriteStep {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn condition(&self, ctx: &ScaffoldContext) -> bool {
        configured_condition(&self.config, ctx)
    }

    fn run(&self, ctx: &ScaffoldContext, _opts: &StepOptions) -> Result<()> {
        let vars = ctx.snapshot_for_template();
        let value = expand(self.config.value.as_deref().unwrap_or_default(), &vars)
            .with_context(|| format!("Failed to expand value for {}", self.key))?;
        let path = target_file(&self.config, ctx)?;
        envfile::write_value(&path, &self.key, &value)
    }

    fn enabled(&self) -> Option<bool> {
        self.config.enabled
    }
}

/// Copy keys from another env file. Either every key is copied or nothing is
/// written.
pub struct EnvCopyStep {
    config: StepConfig,
    keys: Vec<String>,
    source: String,
}

impl EnvCopyStep {
    pub fn new(config: StepConfig) -> Result<Self> {
        let mut keys: Vec<String> = config
            .keys
            .iter()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();
        if keys.is_empty() {
            keys.push(required_key(&config)?);
        }
        let source = match config.source.as_deref() {
            Some(source) if !source.trim().is_empty() => source.to_string(),
            _ => return Err(ArborError::config("env.copy requires 'source'").into()),
        };
        Ok(Self {
            config,
            keys,
            source,
        })
    }

    /// `source/source_file`, or `source/.env` when `source` is a directory.
    fn source_path(&self, ctx: &ScaffoldContext) -> Result<PathBuf> {
        let vars = ctx.snapshot_for_template();
        let base = ctx.resolve(&expand(&self.source, &vars)?);
        match self.config.source_file.as_deref() {
            Some(file) if !file.is_empty() => Ok(base.join(expand(file, &vars)?)),
            _ if base.is_dir() => Ok(base.join(DEFAULT_ENV_FILE)),
            _ => Ok(base),
        }
    }
}

impl Step for EnvCopyStep {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn condition(&self, ctx: &ScaffoldContext) -> bool {
        configured_condition(&self.config, ctx)
    }

    fn run(&self, ctx: &ScaffoldContext, _opts: &StepOptions) -> Result<()> {
        let source = self.source_path(ctx)?;
        let vars = envfile::read_file(&source)?;

        let missing: Vec<&str> = self
            .keys
            .iter()
            .filter(|k| vars.get(k).is_none())
            .map(String::as_str)
            .collect();
        if !missing.is_empty() {
            return Err(ArborError::not_found(format!(
                "{} missing from {}",
                missing.join(", "),
                source.display()
            ))
            .into());
        }

        let pairs: Vec<(String, String)> = self
            .keys
            .iter()
            .filter_map(|k| vars.get(k).map(|v| (k.clone(), v.to_string())))
            .collect();
        let target = target_file(&self.config, ctx)?;
        envfile::update_values(&target, &pairs)
    }

    fn enabled(&self) -> Option<bool> {
        self.config.enabled
    }
}
