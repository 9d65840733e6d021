//! CLI entrypoint for `rep`.
//!
//! The binary delegates to [`rep_cli::run`], which loads configuration,
//! parses the command line, evaluates the code on the configured nREPL
//! server, and maps the outcome onto the process exit status.

use std::io::{self, StderrLock, StdoutLock};
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stdout: StdoutLock<'_> = io::stdout().lock();
    let mut stderr: StderrLock<'_> = io::stderr().lock();
    rep_cli::run(std::env::args_os(), &mut stdout, &mut stderr)
}
