//! Command-line argument definitions for `rep`.

use clap::Parser;

/// Single-shot nREPL client.
///
/// Connects to a running nREPL server, evaluates CODE in a fresh session,
/// prints the replies, and closes the session again.
#[derive(Parser, Debug)]
#[command(name = "rep", version)]
pub(crate) struct Cli {
    /// Sets the reference file, line and column for errors.
    #[arg(short = 'l', long, value_name = "[FILE:]LINE[:COLUMN]")]
    pub(crate) line: Option<String>,
    /// Evaluates code in NS (default: user).
    #[arg(short = 'n', long, value_name = "NS")]
    pub(crate) namespace: Option<String>,
    /// nREPL operation to send.
    #[arg(long, value_name = "OP", default_value = "eval")]
    pub(crate) op: String,
    /// TCP port, HOST:PORT, @PORTFILE, or @FILE@DIRECTORY.
    #[arg(short = 'p', long, value_name = "ADDRESS")]
    pub(crate) port: Option<String>,
    /// Prints FORMAT to FD whenever KEY is present in a reply.
    #[arg(long, value_name = "KEY|KEY,FD,FORMAT")]
    pub(crate) print: Vec<String>,
    /// Drops every print rule triggered by KEY.
    #[arg(long = "no-print", value_name = "KEY")]
    pub(crate) no_print: Vec<String>,
    /// Sends an additional KEY of VALUE with the request.
    #[arg(long, value_name = "KEY,TYPE,VALUE")]
    pub(crate) send: Vec<String>,
    /// Code to evaluate; words are joined with single spaces. Options may
    /// appear between words; use `--` before words that start with `-`.
    #[arg(value_name = "CODE", num_args = 0..)]
    pub(crate) code: Vec<String>,
}

impl Cli {
    /// Joins the positional words into the code payload.
    pub(crate) fn code(&self) -> String {
        self.code.join(" ")
    }
}
