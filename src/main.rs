//! arbor - parallel git worktrees with per-checkout scaffolding.
//!
//! Parses the command line, wires up logging, output and ctrl-c handling,
//! and turns the command's error into an exit code.

use arbor::commands::{self, Cli, Session};
use arbor::error::{exit_code_for, exit_codes};
use arbor::log_debug;
use arbor::logging::init_logging;
use arbor::output::{CliOutput, Output, OutputConfig};
use arbor::process::CancelToken;
use clap::Parser;

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // Help and version exit 0, usage errors exit 2
            e.print().ok();
            std::process::exit(e.exit_code());
        }
    };

    init_logging(cli.verbose, cli.quiet);

    let cancel = CancelToken::new();
    let handler_token = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || handler_token.cancel()) {
        log_debug!("Could not install ctrl-c handler: {e}");
    }

    let (verbose, quiet) = (cli.verbose, cli.quiet);
    let mut output = CliOutput::new(OutputConfig::new(quiet, verbose));
    let result = Session::current(cancel, verbose, quiet)
        .and_then(|session| commands::run(cli, &session, &mut output));

    let code = match result {
        Ok(()) => exit_codes::SUCCESS,
        Err(e) => {
            output.error(&format!("{e:#}"));
            exit_code_for(&e)
        }
    };
    std::process::exit(code);
}
