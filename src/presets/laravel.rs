use super::Preset;
use crate::config::StepConfig;
use crate::scaffold::conditions::{Condition, EnvFileKey, EnvFileMissing};
use std::path::Path;

/// A Laravel application, optionally served by Herd.
///
/// Scaffolding seeds `.env` from `.env.example`, installs dependencies,
/// creates a database for the worktree and links the site. Cleanup unlinks
/// the site and drops the worktree's databases.
pub struct LaravelPreset;

fn env_key_present(key: &str) -> Condition {
    Condition {
        env_file_contains: Some(EnvFileKey {
            file: None,
            key: key.to_string(),
        }),
        ..Default::default()
    }
}

fn with_value(mut step: StepConfig, key: &str, value: &str) -> StepConfig {
    step.key = Some(key.to_string());
    step.value = Some(value.to_string());
    step
}

impl Preset for LaravelPreset {
    fn name(&self) -> &str {
        "laravel"
    }

    fn detect(&self, path: &Path) -> bool {
        path.join("artisan").is_file() && path.join("composer.json").is_file()
    }

    fn scaffold_steps(&self) -> Vec<StepConfig> {
        let mut copy_env = StepConfig::named("file.copy").with_condition(Condition {
            file_exists: Condition::file_exists(&[".env.example"]).file_exists,
            not: Some(Box::new(Condition::file_exists(&[".env"]))),
            ..Default::default()
        });
        copy_env.from = Some(".env.example".into());
        copy_env.to = Some(".env".into());

        vec![
            copy_env,
            StepConfig::named("php.composer").with_args(&["install", "--no-interaction"]),
            StepConfig::named("db.create").with_condition(env_key_present("DB_CONNECTION")),
            with_value(
                StepConfig::named("env.write"),
                "DB_DATABASE",
                "{{ .SiteName }}_{{ .DbSuffix }}",
            )
            .with_condition(Condition {
                var_set: Condition::var_set(&["DbSuffix"]).var_set,
                ..env_key_present("DB_DATABASE")
            }),
            with_value(
                StepConfig::named("env.write"),
                "APP_URL",
                "https://{{ .Path }}.test",
            )
            .with_condition(Condition::file_exists(&[".env"])),
            StepConfig::named("php.laravel.artisan")
                .with_args(&["key:generate", "--no-interaction"])
                .with_condition(Condition {
                    env_file_missing: Some(EnvFileMissing::Key("APP_KEY".into())),
                    ..Default::default()
                }),
            StepConfig::named("node.npm")
                .with_args(&["install"])
                .with_condition(Condition::file_exists(&["package.json"])),
            StepConfig::named("php.laravel.artisan").with_args(&["migrate", "--force"]),
            StepConfig::named("herd").with_args(&["link", "{{ .Path }}"]),
        ]
    }

    fn cleanup_steps(&self) -> Vec<StepConfig> {
        vec![
            StepConfig::named("herd").with_args(&["unlink", "{{ .Path }}"]),
            StepConfig::named("db.destroy").with_condition(env_key_present("DB_CONNECTION")),
        ]
    }
}
