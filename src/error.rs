//! Error categories surfaced to the command entry point.
//!
//! Library code returns `anyhow::Result` and attaches context freely. Failures
//! that the CLI must distinguish (to pick an exit code) are raised as an
//! [`ArborError`] somewhere in the anyhow chain; [`exit_code_for`] finds it.

use std::fmt;
use std::path::PathBuf;

/// Process exit codes returned to the shell.
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL: i32 = 1;
    pub const INVALID_ARGS: i32 = 2;
    pub const WORKTREE_NOT_FOUND: i32 = 3;
    pub const GIT_FAILED: i32 = 4;
    pub const CONFIG: i32 = 5;
    pub const STEP_FAILED: i32 = 6;
}

#[derive(Debug, thiserror::Error)]
pub enum ArborError {
    /// No project, worktree or env key matching what was asked for.
    #[error("{0}")]
    NotFound(String),

    /// A partial-match query hit more than one worktree.
    #[error("'{query}' matches multiple worktrees: {}", candidates.join(", "))]
    Ambiguous {
        query: String,
        candidates: Vec<String>,
    },

    /// Malformed YAML, missing sections, conflicting options.
    #[error("configuration error: {0}")]
    Config(String),

    /// A git verb reported failure.
    #[error("git {verb} failed for {}: {message}", path.display())]
    GitFailed {
        verb: String,
        path: PathBuf,
        message: String,
    },

    /// A scaffold step returned an error; the pipeline stopped.
    #[error("step {step} failed: {message}")]
    StepFailed { step: String, message: String },

    /// At least one preflight predicate was false.
    #[error("{0}")]
    PreflightFailed(PreflightFailure),

    /// The user cancelled an interactive prompt or hit ctrl-c.
    #[error("user aborted")]
    Aborted,
}

impl ArborError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        ArborError::NotFound(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        ArborError::Config(msg.into())
    }

    pub fn git(verb: &str, path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        ArborError::GitFailed {
            verb: verb.to_string(),
            path: path.into(),
            message: message.into().trim().to_string(),
        }
    }

    /// Exit code the CLI should report for this category.
    pub fn exit_code(&self) -> i32 {
        match self {
            ArborError::NotFound(_) | ArborError::Ambiguous { .. } => {
                exit_codes::WORKTREE_NOT_FOUND
            }
            ArborError::Config(_) => exit_codes::CONFIG,
            ArborError::GitFailed { .. } => exit_codes::GIT_FAILED,
            ArborError::StepFailed { .. } | ArborError::PreflightFailed(_) => {
                exit_codes::STEP_FAILED
            }
            ArborError::Aborted => exit_codes::GENERAL,
        }
    }
}

/// Everything a preflight condition found missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreflightFailure {
    pub missing_env: Vec<String>,
    pub missing_commands: Vec<String>,
    pub missing_files: Vec<String>,
    /// Other predicates (os, env file checks, negations) that were not met.
    pub unmet: Vec<String>,
}

impl PreflightFailure {
    pub fn is_empty(&self) -> bool {
        self.missing_env.is_empty()
            && self.missing_commands.is_empty()
            && self.missing_files.is_empty()
            && self.unmet.is_empty()
    }
}

impl fmt::Display for PreflightFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "preflight checks failed")?;
        let sections = [
            ("missing environment variables", &self.missing_env),
            ("missing commands", &self.missing_commands),
            ("missing files", &self.missing_files),
            ("unmet conditions", &self.unmet),
        ];
        let mut sep = ": ";
        for (label, items) in sections {
            if !items.is_empty() {
                write!(f, "{sep}{label}: {}", items.join(", "))?;
                sep = "; ";
            }
        }
        Ok(())
    }
}

/// Find the first [`ArborError`] in an anyhow chain.
pub fn find_arbor_error(err: &anyhow::Error) -> Option<&ArborError> {
    err.chain().find_map(|e| e.downcast_ref::<ArborError>())
}

/// Map any error to the exit code the CLI reports.
pub fn exit_code_for(err: &anyhow::Error) -> i32 {
    find_arbor_error(err)
        .map(ArborError::exit_code)
        .unwrap_or(exit_codes::GENERAL)
}
