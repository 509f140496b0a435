//! arbor: parallel git worktrees with per-checkout scaffolding.
//!
//! A project is either a legacy layout (bare repository in `.bare/` with one
//! sibling directory per worktree) or a linked checkout registered in the
//! global config. Creating a worktree runs a scaffold pipeline of templated,
//! condition-gated steps; removing one runs the matching cleanup.

pub mod commands;
pub mod config;
pub mod core;
pub mod envfile;
pub mod error;
pub mod git;
pub mod logging;
pub mod output;
pub mod presets;
pub mod process;
pub mod project;
pub mod scaffold;
pub mod styles;
pub mod utils;
pub mod worktree;

pub use error::{exit_code_for, ArborError};

/// Package version, with the commit hash appended for dev builds.
pub const VERSION: &str = env!("ARBOR_VERSION");
