//! Command-line runtime for `rep`, a single-shot nREPL client.
//!
//! The module owns argument parsing, configuration bootstrapping, endpoint
//! resolution and the session exchange with the server. The runtime can be
//! driven from the binary entrypoint or from tests, where the configuration
//! loader and IO streams are substituted.

use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;

use clap::Parser;
use clap::error::ErrorKind;
use rep_config::Endpoint;
use tracing::debug;

mod cli;
mod config;
mod errors;
mod options;
mod print;
mod session;
mod telemetry;
mod transport;

#[cfg(test)]
mod tests;

use cli::Cli;
use config::{command_arguments, split_config_arguments};
pub(crate) use config::{ConfigLoader, OrthoConfigLoader};
pub(crate) use errors::AppError;
use options::Settings;
use session::Session;

/// CLI flags recognised by the configuration loader.
///
/// MAINTENANCE: keep in sync with the fields of `rep_config::Config`.
const CONFIG_CLI_FLAGS: &[&str] = &["--config-path", "--log-filter", "--log-format"];

/// Exit status when the server reported an exception or error.
pub(crate) const EXIT_EVALUATION_FAILURE: u8 = 1;
/// Exit status for usage, configuration, connection and protocol errors.
pub(crate) const EXIT_FATAL: u8 = 2;

const RUNTIME_TARGET: &str = "rep::runtime";

/// Bundles the IO streams provided to the CLI runtime.
pub(crate) struct IoStreams<'a, W: Write, E: Write> {
    pub(crate) stdout: &'a mut W,
    pub(crate) stderr: &'a mut E,
}

impl<'a, W: Write, E: Write> IoStreams<'a, W, E> {
    pub(crate) const fn new(stdout: &'a mut W, stderr: &'a mut E) -> Self {
        Self { stdout, stderr }
    }
}

struct CliRunner<'a, W: Write, E: Write, L: ConfigLoader> {
    io: &'a mut IoStreams<'a, W, E>,
    loader: &'a L,
}

impl<'a, W, E, L> CliRunner<'a, W, E, L>
where
    W: Write,
    E: Write,
    L: ConfigLoader,
{
    const fn new(io: &'a mut IoStreams<'a, W, E>, loader: &'a L) -> Self {
        Self { io, loader }
    }

    fn run<I>(&mut self, args: I) -> ExitCode
    where
        I: IntoIterator<Item = OsString>,
    {
        let arguments: Vec<OsString> = args.into_iter().collect();
        let split = split_config_arguments(&arguments);

        let cli = match Cli::try_parse_from(command_arguments(&arguments, &split)) {
            Ok(cli) => cli,
            Err(error) => return self.report_usage(&error),
        };

        match self.execute(cli, &split.config_arguments) {
            Ok(exit_code) => exit_code,
            Err(error) => {
                let _ = writeln!(self.io.stderr, "rep: {error}");
                ExitCode::from(EXIT_FATAL)
            }
        }
    }

    /// Help and version requests succeed on stdout; other parse failures
    /// are fatal and reported on stderr.
    fn report_usage(&mut self, error: &clap::Error) -> ExitCode {
        let rendered = error.render().to_string();
        if matches!(
            error.kind(),
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion
        ) {
            let _ = write!(self.io.stdout, "{rendered}");
            return ExitCode::SUCCESS;
        }
        let _ = write!(self.io.stderr, "{rendered}");
        ExitCode::from(EXIT_FATAL)
    }

    fn execute(&mut self, cli: Cli, config_arguments: &[OsString]) -> Result<ExitCode, AppError> {
        let config = self.loader.load(config_arguments)?;
        telemetry::initialise(&config)?;

        let settings = Settings::from_cli(cli, &config)?;
        let endpoint = Endpoint::resolve(&settings.port)?;
        debug!(target: RUNTIME_TARGET, %endpoint, port = %settings.port, "resolved endpoint");

        let connection = transport::connect(&endpoint)?;
        let outcome = Session::new(connection).run(
            &settings.evaluation,
            &settings.filters,
            &mut *self.io,
        )?;
        debug!(target: RUNTIME_TARGET, ?outcome, "session finished");
        Ok(outcome.exit_code())
    }
}

/// Runs the CLI using the provided arguments and IO handles.
///
/// Returns `0` when the evaluation succeeded, `1` when the server reported an
/// exception or error, and `2` for any fatal error.
#[must_use]
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    let mut io = IoStreams::new(stdout, stderr);
    run_with_loader(args, &mut io, &OrthoConfigLoader)
}

/// Runs the CLI with a custom configuration loader.
#[must_use]
pub(crate) fn run_with_loader<'a, I, W, E, L>(
    args: I,
    io: &'a mut IoStreams<'a, W, E>,
    loader: &'a L,
) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
    L: ConfigLoader,
{
    CliRunner::new(io, loader).run(args)
}
