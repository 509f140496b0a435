use super::ProgressSink;
use crate::output::Output;

/// Forwards [`ProgressSink`] calls to an `Output`.
///
/// ```ignore
/// let mut output = CliOutput::new(config);
/// let report = {
///     let mut sink = OutputSink(&mut output);
///     core::worktree::create::execute(&params, &project, &git, &scaffolder, &mut sink)?
/// };
/// output.success(&format!("Created {}", report.path.display()));
/// ```
pub struct OutputSink<'a>(pub &'a mut dyn Output);

impl ProgressSink for OutputSink<'_> {
    fn on_step(&mut self, msg: &str) {
        self.0.step(msg);
    }

    fn on_warning(&mut self, msg: &str) {
        self.0.warning(msg);
    }

    fn on_debug(&mut self, msg: &str) {
        self.0.debug(msg);
    }
}
