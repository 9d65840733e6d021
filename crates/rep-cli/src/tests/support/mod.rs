//! Test support utilities for `rep` behavioural coverage.
//!
//! Supplies a scripted fake server, a fixed configuration loader and a test
//! world that captures CLI output, so step definitions and unit tests remain
//! focused on their assertions.

mod fake_server;

use std::cell::RefCell;
use std::ffi::OsString;
use std::fs;
use std::process::ExitCode;

use anyhow::{Context, Result, ensure};
use camino::Utf8PathBuf;
use rep_config::Config;
use rep_protocol::Value;
use rstest::fixture;
use tempfile::TempDir;

use crate::{AppError, ConfigLoader, IoStreams, run_with_loader};

pub(super) use fake_server::{FakeServer, ReplyBatch};

/// A config loader that returns a fixed configuration for tests.
pub(super) struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    pub(super) fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self, _args: &[OsString]) -> Result<Config, AppError> {
        Ok(self.config.clone())
    }
}

/// Test world holding CLI state, the fake server, and captured output.
#[derive(Default)]
pub(super) struct TestWorld {
    pub config: Config,
    pub server: Option<FakeServer>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub exit_code: Option<ExitCode>,
    pub requests: Vec<Value>,
    pub temp_dir: Option<TempDir>,
}

impl TestWorld {
    /// Starts a server that clones `session`, answers the evaluation with
    /// `evaluation`, and acknowledges the close.
    pub fn start_session(&mut self, session: &str, evaluation: ReplyBatch) -> Result<()> {
        self.start_server(session_script(session, evaluation))
    }

    pub fn start_server(&mut self, script: Vec<ReplyBatch>) -> Result<()> {
        let server = FakeServer::spawn(script)?;
        self.config.port = Some(server.port().to_string());
        self.server = Some(server);
        Ok(())
    }

    /// Points the configured port at a port file discovered by searching
    /// upwards from a nested directory.
    pub fn advertise_port_in_file(&mut self) -> Result<()> {
        let port = self.server.as_ref().context("server running")?.port();
        let temp_dir = TempDir::new().context("create temporary directory")?;
        let root = Utf8PathBuf::from_path_buf(temp_dir.path().to_path_buf())
            .map_err(|path| anyhow::anyhow!("non-UTF-8 temp dir {}", path.display()))?;
        let nested = root.join("src").join("app");
        fs::create_dir_all(&nested).context("create nested directory")?;
        fs::write(root.join(".nrepl-port"), format!("{port}\n")).context("write port file")?;
        self.config.port = Some(format!("@.nrepl-port@{nested}"));
        self.temp_dir = Some(temp_dir);
        Ok(())
    }

    pub fn run(&mut self, command: &str) -> Result<()> {
        self.stdout.clear();
        self.stderr.clear();
        self.requests.clear();
        let args = Self::build_args(command);
        let loader = StaticConfigLoader::new(self.config.clone());
        let mut io = IoStreams::new(&mut self.stdout, &mut self.stderr);
        let exit = run_with_loader(args, &mut io, &loader);
        self.exit_code = Some(exit);
        if let Some(server) = self.server.as_mut() {
            self.requests = server.take_requests()?;
        }
        self.server = None;
        Ok(())
    }

    fn build_args(command: &str) -> Vec<OsString> {
        let mut args = vec![OsString::from("rep")];
        let trimmed = command.trim();
        if !trimmed.is_empty() {
            args.extend(
                trimmed
                    .split_whitespace()
                    .map(|token| OsString::from(token.trim_matches('"'))),
            );
        }
        args
    }

    pub fn stdout_text(&self) -> Result<String> {
        decode_utf8(self.stdout.clone(), "stdout")
    }

    pub fn stderr_text(&self) -> Result<String> {
        decode_utf8(self.stderr.clone(), "stderr")
    }

    pub fn assert_exit_code(&self, expected: u8) -> Result<()> {
        let exit = self.exit_code.context("exit code recorded")?;
        ensure!(
            exit == ExitCode::from(expected),
            "expected exit code {expected}, got {:?}",
            exit
        );
        Ok(())
    }

    /// Returns the ops of the recorded requests, in order.
    pub fn request_ops(&self) -> Vec<String> {
        self.requests
            .iter()
            .filter_map(|request| request.get("op"))
            .filter_map(Value::as_bytes)
            .map(|op| String::from_utf8_lossy(op).into_owned())
            .collect()
    }

    /// Looks up a text field of the evaluation request.
    pub fn evaluation_field(&self, key: &str) -> Result<String> {
        let request = self.requests.get(1).context("evaluation request recorded")?;
        let value = request
            .get(key)
            .and_then(Value::as_bytes)
            .with_context(|| format!("evaluation request lacks {key}"))?;
        Ok(String::from_utf8_lossy(value).into_owned())
    }
}

fn decode_utf8(bytes: Vec<u8>, stream: &str) -> Result<String> {
    String::from_utf8(bytes).with_context(|| format!("{stream} is not UTF-8"))
}

/// Builds a reply dictionary from text fields.
pub(super) fn reply(entries: &[(&str, &str)]) -> Value {
    Value::dictionary(
        entries
            .iter()
            .map(|(key, value)| (*key, Value::bytes(*value))),
    )
}

/// Builds a reply carrying only the given status flags.
pub(super) fn status_reply(flags: &[&str]) -> Value {
    Value::dictionary([(
        "status",
        Value::list(flags.iter().map(|flag| Value::bytes(*flag))),
    )])
}

/// Clone, evaluate and close batches for one complete session.
pub(super) fn session_script(session: &str, evaluation: ReplyBatch) -> Vec<ReplyBatch> {
    vec![
        vec![Value::dictionary([
            ("new-session", Value::bytes(session)),
            (
                "status",
                Value::list([Value::bytes("done")]),
            ),
        ])],
        evaluation,
        vec![status_reply(&["done", "session-closed"])],
    ]
}

#[fixture]
pub(super) fn world() -> RefCell<TestWorld> {
    RefCell::new(TestWorld::default())
}
