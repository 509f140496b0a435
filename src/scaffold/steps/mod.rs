//! Built-in step kinds.

pub mod command;
pub mod db;
pub mod env;
pub mod file_copy;
mod words;

pub use db::{CreateOutcome, DbClient, DbClientProvider, DbConnection, DbEngine};

use super::registry::StepRegistry;
use super::step::Step;
use std::sync::Arc;

/// Binary step names and the program each one runs.
pub const BINARY_STEPS: &[(&str, &str)] = &[
    ("php.composer", "composer"),
    ("php.laravel.artisan", "php artisan"),
    ("node.npm", "npm"),
    ("node.yarn", "yarn"),
    ("node.pnpm", "pnpm"),
    ("node.bun", "bun"),
    ("herd", "herd"),
];

pub(crate) fn register_builtins(registry: &mut StepRegistry, db: Arc<dyn DbClientProvider>) {
    registry.register("file.copy", |config| {
        Ok(Box::new(file_copy::FileCopyStep::new(config.clone())?) as Box<dyn Step>)
    });
    registry.register("env.read", |config| {
        Ok(Box::new(env::EnvReadStep::new(config.clone())?) as Box<dyn Step>)
    });
    registry.register("env.write", |config| {
        Ok(Box::new(env::EnvWriteStep::new(config.clone())?) as Box<dyn Step>)
    });
    registry.register("env.copy", |config| {
        Ok(Box::new(env::EnvCopyStep::new(config.clone())?) as Box<dyn Step>)
    });

    let create_provider = Arc::clone(&db);
    registry.register("db.create", move |config| {
        Ok(Box::new(db::DbCreateStep::new(
            config.clone(),
            Arc::clone(&create_provider),
        )?) as Box<dyn Step>)
    });
    registry.register("db.destroy", move |config| {
        Ok(Box::new(db::DbDestroyStep::new(config.clone(), Arc::clone(&db))?) as Box<dyn Step>)
    });

    registry.register("bash.run", |config| {
        Ok(Box::new(command::ShellStep::new(config.clone(), "bash")?) as Box<dyn Step>)
    });
    registry.register("command.run", |config| {
        Ok(Box::new(command::ShellStep::new(config.clone(), "sh")?) as Box<dyn Step>)
    });

    for (name, program) in BINARY_STEPS {
        registry.register_binary(name, program);
    }
}
