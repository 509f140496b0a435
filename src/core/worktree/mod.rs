//! Core worktree operations.
//!
//! Each submodule holds the business logic for one arbor command, separated
//! from argument parsing and output rendering. Functions take structured
//! params, a `GitOps`, and a `ProgressSink`, and return structured results.

pub mod create;
pub mod init;
pub mod prune;
pub mod remove;
pub mod scaffold;

pub use scaffold::Scaffolder;
