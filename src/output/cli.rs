//! Terminal implementation of [`Output`].

use super::{Output, OutputConfig};
use crate::styles::{self, colors_enabled, colors_enabled_stderr, paint};

/// Writes to stdout/stderr in a git-like format:
/// lowercase `warning:` / `error:` prefixes, steps only when verbose.
#[derive(Debug)]
pub struct CliOutput {
    config: OutputConfig,
}

impl CliOutput {
    pub fn new(config: OutputConfig) -> Self {
        Self { config }
    }

    pub fn default_output() -> Self {
        Self::new(OutputConfig::default())
    }
}

impl Output for CliOutput {
    fn info(&mut self, msg: &str) {
        if !self.config.quiet {
            println!("{msg}");
        }
    }

    fn success(&mut self, msg: &str) {
        if !self.config.quiet {
            println!("{}", paint(msg, styles::GREEN, colors_enabled()));
        }
    }

    fn warning(&mut self, msg: &str) {
        let prefix = paint("warning:", styles::YELLOW, colors_enabled_stderr());
        eprintln!("{prefix} {msg}");
    }

    fn error(&mut self, msg: &str) {
        let prefix = paint("error:", styles::RED, colors_enabled_stderr());
        eprintln!("{prefix} {msg}");
    }

    fn debug(&mut self, msg: &str) {
        if self.config.verbose {
            println!("{}", paint(&format!("debug: {msg}"), styles::DIM, colors_enabled()));
        }
    }

    fn step(&mut self, msg: &str) {
        if self.config.verbose && !self.config.quiet {
            println!("{}", paint(msg, styles::DIM, colors_enabled()));
        }
    }

    fn result(&mut self, msg: &str) {
        if !self.config.quiet {
            println!("{}", paint(msg, styles::BOLD, colors_enabled()));
        }
    }

    fn detail(&mut self, key: &str, value: &str) {
        if !self.config.quiet {
            let key = paint(&format!("{key}:"), styles::BOLD, colors_enabled());
            println!("  {key} {value}");
        }
    }

    fn list_item(&mut self, item: &str) {
        if !self.config.quiet {
            println!(" - {item}");
        }
    }

    fn raw(&mut self, content: &str) {
        print!("{content}");
    }

    fn is_quiet(&self) -> bool {
        self.config.quiet
    }

    fn is_verbose(&self) -> bool {
        self.config.verbose
    }
}
