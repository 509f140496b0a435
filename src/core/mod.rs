//! Core operations behind the commands.
//!
//! Operations report progress through [`ProgressSink`] instead of talking to
//! an `Output` directly, so the same code runs under the CLI and in tests.

mod progress;
pub mod worktree;

pub use progress::OutputSink;

/// Progress reporting for core operations.
///
/// Commands wrap their `Output` in an [`OutputSink`]; tests use [`NullSink`]
/// or a recording sink of their own.
pub trait ProgressSink {
    /// An intermediate step, such as a scaffold step starting.
    fn on_step(&mut self, msg: &str);

    /// A warning. Always shown.
    fn on_warning(&mut self, msg: &str);

    /// Shown in verbose mode only.
    fn on_debug(&mut self, msg: &str);
}

/// Discards everything.
pub struct NullSink;

impl ProgressSink for NullSink {
    fn on_step(&mut self, _msg: &str) {}
    fn on_warning(&mut self, _msg: &str) {}
    fn on_debug(&mut self, _msg: &str) {}
}
