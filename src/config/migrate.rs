//! One-way upgrades of on-disk state written by older releases.

use super::document::YamlDocument;
use super::local::LocalState;
use super::PROJECT_CONFIG_FILE;
use crate::utils::atomic_write;
use crate::{log_debug, log_warning};
use anyhow::{Context, Result};
use serde_yaml::Value;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationOutcome {
    /// `db_suffix` moved from `arbor.yaml` into `.arbor.local`.
    Migrated { suffix: String },
    NothingToDo,
}

/// Move a legacy `db_suffix` out of `dir/arbor.yaml` into `dir/.arbor.local`.
///
/// `.arbor.local` is written first, so an interruption leaves the suffix in
/// both files and a rerun finishes the job. A suffix already present in
/// `.arbor.local` is kept. Running this twice is the same as running it once.
pub fn migrate_db_suffix(dir: &Path) -> Result<MigrationOutcome> {
    let config_path = dir.join(PROJECT_CONFIG_FILE);
    if !config_path.is_file() {
        return Ok(MigrationOutcome::NothingToDo);
    }

    let text = fs::read_to_string(&config_path)
        .with_context(|| format!("Failed to read {}", config_path.display()))?;
    let mut doc = YamlDocument::parse(&text)
        .with_context(|| format!("Failed to parse {}", config_path.display()))?;

    let suffix = match doc.value()?.get("db_suffix") {
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
        _ => {
            log_debug!("No db_suffix to migrate in {}", config_path.display());
            return Ok(MigrationOutcome::NothingToDo);
        }
    };

    let local = LocalState::load(dir)?;
    match local.db_suffix() {
        Some(existing) if existing != suffix => {
            log_warning!(
                "{} already has db_suffix '{existing}'; dropping '{suffix}' from {PROJECT_CONFIG_FILE}",
                LocalState::path_in(dir).display()
            );
        }
        Some(_) => {}
        None => LocalState {
            db_suffix: Some(suffix.clone()),
        }
        .save(dir)?,
    }

    doc.remove(&["db_suffix".to_string()]);
    atomic_write(&config_path, doc.render().as_bytes(), 0o644)
        .with_context(|| format!("Failed to write {}", config_path.display()))?;

    Ok(MigrationOutcome::Migrated { suffix })
}
