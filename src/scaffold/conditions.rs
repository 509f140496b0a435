//! Structured predicates gating steps and the scaffold preflight.
//!
//! A [`Condition`] is a map of predicate keys; all of them must hold. Step
//! conditions treat evaluation errors as false. The preflight check instead
//! reports every unmet predicate at once through [`check_preflight`].

use crate::envfile;
use crate::error::{ArborError, PreflightFailure};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

const DEFAULT_ENV_FILE: &str = ".env";

/// A single string or a list of strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    pub fn items(&self) -> Vec<&str> {
        match self {
            OneOrMany::One(s) => vec![s.as_str()],
            OneOrMany::Many(v) => v.iter().map(String::as_str).collect(),
        }
    }
}

/// `{file, key}` pointing into an env file; `file` defaults to `.env`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnvFileKey {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    pub key: String,
}

impl EnvFileKey {
    fn file(&self) -> &str {
        self.file.as_deref().unwrap_or(DEFAULT_ENV_FILE)
    }
}

/// `env_file_missing` takes a bare key (checked in `.env`) or `{file, key}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EnvFileMissing {
    Key(String),
    InFile(EnvFileKey),
}

impl EnvFileMissing {
    fn file_and_key(&self) -> (&str, &str) {
        match self {
            EnvFileMissing::Key(key) => (DEFAULT_ENV_FILE, key.as_str()),
            EnvFileMissing::InFile(k) => (k.file(), k.key.as_str()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Condition {
    /// Paths relative to the worktree that must all exist.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_exists: Option<OneOrMany>,

    /// Programs that must all resolve on PATH.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_exists: Option<OneOrMany>,

    /// Environment variables that must all be set; empty counts as set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub env_exists: Option<OneOrMany>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub env_file_contains: Option<EnvFileKey>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub env_file_missing: Option<EnvFileMissing>,

    /// Template variables (`DbSuffix`, or anything a step stored) that must
    /// all be non-empty when the step is reached.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub var_set: Option<OneOrMany>,

    /// At least one must match the running OS.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub os: Option<OneOrMany>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub not: Option<Box<Condition>>,
}

impl Condition {
    pub fn file_exists(paths: &[&str]) -> Self {
        Self {
            file_exists: Some(many(paths)),
            ..Default::default()
        }
    }

    pub fn command_exists(commands: &[&str]) -> Self {
        Self {
            command_exists: Some(many(commands)),
            ..Default::default()
        }
    }

    pub fn env_exists(vars: &[&str]) -> Self {
        Self {
            env_exists: Some(many(vars)),
            ..Default::default()
        }
    }

    pub fn var_set(names: &[&str]) -> Self {
        Self {
            var_set: Some(many(names)),
            ..Default::default()
        }
    }

    pub fn negate(self) -> Self {
        Self {
            not: Some(Box::new(self)),
            ..Default::default()
        }
    }
}

fn many(items: &[&str]) -> OneOrMany {
    OneOrMany::Many(items.iter().map(|s| s.to_string()).collect())
}

/// Inputs a condition is evaluated against.
#[derive(Debug, Clone, Copy)]
pub struct ConditionEnv<'a> {
    pub worktree: &'a Path,
    /// Variables the scaffold passes to its subprocesses; they count as set.
    pub extra_env: &'a HashMap<String, String>,
    /// Template values as of evaluation.
    pub vars: &'a HashMap<String, String>,
}

/// True when every predicate holds. Errors come from unreadable env files.
pub fn evaluate(condition: &Condition, env: ConditionEnv<'_>) -> Result<bool> {
    let mut failure = PreflightFailure::default();
    collect_failures(condition, env, &mut failure)?;
    Ok(failure.is_empty())
}

/// Evaluate a preflight condition, failing with every unmet predicate listed.
pub fn check_preflight(condition: &Condition, env: ConditionEnv<'_>) -> Result<()> {
    let mut failure = PreflightFailure::default();
    collect_failures(condition, env, &mut failure)?;
    if failure.is_empty() {
        Ok(())
    } else {
        Err(ArborError::PreflightFailed(failure).into())
    }
}

fn collect_failures(
    condition: &Condition,
    env: ConditionEnv<'_>,
    failure: &mut PreflightFailure,
) -> Result<()> {
    if let Some(files) = &condition.file_exists {
        for file in files.items() {
            if !env.worktree.join(file).exists() {
                failure.missing_files.push(file.to_string());
            }
        }
    }

    if let Some(commands) = &condition.command_exists {
        for command in commands.items() {
            if which::which(command).is_err() {
                failure.missing_commands.push(command.to_string());
            }
        }
    }

    if let Some(vars) = &condition.env_exists {
        for var in vars.items() {
            if std::env::var_os(var).is_none() && !env.extra_env.contains_key(var) {
                failure.missing_env.push(var.to_string());
            }
        }
    }

    if let Some(check) = &condition.env_file_contains {
        let file = check.file();
        if !env_file_has_value(env.worktree, file, &check.key)? {
            failure
                .unmet
                .push(format!("{file} has no value for {}", check.key));
        }
    }

    if let Some(check) = &condition.env_file_missing {
        let (file, key) = check.file_and_key();
        if env_file_has_value(env.worktree, file, key)? {
            failure.unmet.push(format!("{file} already sets {key}"));
        }
    }

    if let Some(names) = &condition.var_set {
        for name in names.items() {
            if env.vars.get(name).is_none_or(|v| v.is_empty()) {
                failure.unmet.push(format!("{{{{ .{name} }}}} is empty"));
            }
        }
    }

    if let Some(systems) = &condition.os {
        let current = std::env::consts::OS;
        if !systems.items().iter().any(|os| os_matches(os, current)) {
            failure.unmet.push(format!(
                "os is {current}, expected {}",
                systems.items().join(" or ")
            ));
        }
    }

    if let Some(inner) = &condition.not {
        if evaluate(inner, env)? {
            failure.unmet.push("negated condition holds".to_string());
        }
    }

    Ok(())
}

fn env_file_has_value(worktree: &Path, file: &str, key: &str) -> Result<bool> {
    Ok(envfile::read_file_if_exists(&worktree.join(file))?
        .is_some_and(|vars| vars.has_value(key)))
}

fn os_matches(wanted: &str, current: &str) -> bool {
    let wanted = wanted.trim().to_ascii_lowercase();
    let wanted = match wanted.as_str() {
        "darwin" | "osx" => "macos",
        "win" | "win32" => "windows",
        other => other,
    };
    wanted == current
}
