//! User-facing output, kept apart from the operations that produce it.
//!
//! Commands take `&mut dyn Output` and never call `println!` themselves, so the
//! same command code can be driven by a terminal ([`CliOutput`]) or by a test
//! that inspects what would have been printed ([`TestOutput`]).
//!
//! ```ignore
//! pub fn run(args: Args, output: &mut dyn Output) -> Result<()> {
//!     output.step("Creating worktree");
//!     output.result("Created worktree feature-x");
//!     Ok(())
//! }
//! ```

mod cli;

pub use cli::CliOutput;
pub use test::{OutputEntry, TestOutput};

/// Verbosity selected by the global flags.
#[derive(Debug, Clone, Default)]
pub struct OutputConfig {
    /// Only warnings, errors and raw output.
    pub quiet: bool,
    /// Also show steps and debug lines.
    pub verbose: bool,
}

impl OutputConfig {
    pub fn new(quiet: bool, verbose: bool) -> Self {
        Self { quiet, verbose }
    }
}

pub trait Output {
    /// Informational line. Suppressed when quiet.
    fn info(&mut self, msg: &str);

    /// Suppressed when quiet.
    fn success(&mut self, msg: &str);

    /// Always shown, on stderr.
    fn warning(&mut self, msg: &str);

    /// Always shown, on stderr.
    fn error(&mut self, msg: &str);

    /// Verbose only.
    fn debug(&mut self, msg: &str);

    /// An intermediate step of a longer operation. Verbose only.
    fn step(&mut self, msg: &str);

    /// The one or two line summary a command ends with.
    fn result(&mut self, msg: &str);

    /// `  key: value`
    fn detail(&mut self, key: &str, value: &str);

    /// ` - item`
    fn list_item(&mut self, item: &str);

    /// Unformatted content such as tables or JSON. Never suppressed.
    fn raw(&mut self, content: &str);

    fn is_quiet(&self) -> bool;

    fn is_verbose(&self) -> bool;
}
