//! Step kinds by name.

use super::step::Step;
use super::steps::{self, DbClientProvider};
use crate::config::StepConfig;
use crate::error::ArborError;
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::sync::Arc;

pub type StepFactory = Box<dyn Fn(&StepConfig) -> Result<Box<dyn Step>> + Send + Sync>;

/// Maps a step `name` to the factory that builds it from its config.
#[derive(Default)]
pub struct StepRegistry {
    factories: HashMap<String, StepFactory>,
}

impl StepRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every built-in step kind, with database steps driving the real
    /// `mysql` / `psql` clients.
    pub fn with_builtins() -> Self {
        Self::with_db_provider(Arc::new(steps::db::CommandDbClients))
    }

    /// Every built-in step kind, with database steps using `provider`.
    pub fn with_db_provider(provider: Arc<dyn DbClientProvider>) -> Self {
        let mut registry = Self::new();
        steps::register_builtins(&mut registry, provider);
        registry
    }

    /// Add or replace a step kind.
    pub fn register<F>(&mut self, name: &str, factory: F)
    where
        F: Fn(&StepConfig) -> Result<Box<dyn Step>> + Send + Sync + 'static,
    {
        self.factories.insert(name.to_string(), Box::new(factory));
    }

    /// Register `name` as an invocation of `program`, which may carry leading
    /// arguments (`php artisan`).
    pub fn register_binary(&mut self, name: &str, program: &str) {
        let program = program.to_string();
        self.register(name, move |config| {
            Ok(Box::new(steps::command::BinaryStep::new(config.clone(), &program)?) as Box<dyn Step>)
        });
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn build(&self, config: &StepConfig) -> Result<Box<dyn Step>> {
        if config.name.trim().is_empty() {
            return Err(ArborError::config("step is missing a name").into());
        }
        let factory = self
            .factories
            .get(&config.name)
            .ok_or_else(|| ArborError::config(format!("unknown step '{}'", config.name)))?;
        factory(config).with_context(|| format!("Invalid configuration for step {}", config.name))
    }

    /// Build every step, failing on the first bad config before anything
    /// runs.
    pub fn build_all(&self, configs: &[StepConfig]) -> Result<Vec<Box<dyn Step>>> {
        configs.iter().map(|c| self.build(c)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{exit_code_for, exit_codes};

    #[test]
    fn test_builtins_registered() {
        let registry = StepRegistry::with_builtins();
        for name in [
            "file.copy",
            "env.read",
            "env.write",
            "env.copy",
            "db.create",
            "db.destroy",
            "bash.run",
            "command.run",
            "php.composer",
            "php.laravel.artisan",
            "node.npm",
            "node.yarn",
            "node.pnpm",
            "node.bun",
            "herd",
        ] {
            assert!(registry.contains(name), "{name} not registered");
        }
    }

    #[test]
    fn test_unknown_step_is_config_error() {
        let registry = StepRegistry::with_builtins();
        let err = match registry.build(&StepConfig::named("php.nope")) {
            Ok(_) => panic!("expected an error"),
            Err(e) => e,
        };
        assert_eq!(exit_code_for(&err), exit_codes::CONFIG);
        assert!(err.to_string().contains("php.nope"));
    }

    #[test]
    fn test_missing_required_field_is_config_error() {
        let registry = StepRegistry::with_builtins();
        let Err(err) = registry.build(&StepConfig::named("bash.run")) else {
            panic!("bash.run without a command should not build");
        };
        assert_eq!(exit_code_for(&err), exit_codes::CONFIG);
    }

    #[test]
    fn test_register_binary_builds_named_step() {
        let mut registry = StepRegistry::new();
        registry.register_binary("tool.make", "make -s");
        let step = registry.build(&StepConfig::named("tool.make")).unwrap();
        assert_eq!(step.name(), "tool.make");
    }

    #[test]
    fn test_build_all_preserves_order() {
        let registry = StepRegistry::with_builtins();
        let configs = vec![
            StepConfig::named("node.npm").with_args(&["ci"]),
            StepConfig::named("php.composer").with_args(&["install"]),
        ];
        let steps = registry.build_all(&configs).unwrap();
        let names: Vec<&str> = steps.iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["node.npm", "php.composer"]);
    }
}
