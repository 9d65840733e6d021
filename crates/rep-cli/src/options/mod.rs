//! Turns parsed command-line values into evaluation settings.
//!
//! Every option value is validated and every print template compiled here, so
//! that configuration mistakes surface before the client touches the network.

use std::str::FromStr;

use rep_config::Config;
use rep_protocol::{FieldValue, Request};
use thiserror::Error;

use crate::cli::Cli;
use crate::print::{PrintFilters, PrintSpecError};

/// Errors raised while interpreting option values.
#[derive(Debug, Error)]
pub(crate) enum OptionsError {
    #[error("invalid value for --line: '{0}'")]
    InvalidLine(String),
    #[error("--send value must be KEY,TYPE,VALUE")]
    SendShape,
    #[error("--send TYPE must be 'string' or 'integer', not '{0}'")]
    SendType(String),
    #[error("--send integer value '{0}' is not a number")]
    SendInteger(String),
    #[error(transparent)]
    Print(#[from] PrintSpecError),
}

/// Source position attached to evaluated code for error reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LineReference {
    pub(crate) file: Option<String>,
    pub(crate) line: i64,
    pub(crate) column: Option<i64>,
}

impl FromStr for LineReference {
    type Err = OptionsError;

    /// Accepts `FILE:LINE:COLUMN`, `LINE:COLUMN`, `FILE:LINE`, `LINE`, or
    /// `FILE` (which implies line 1). FILE may be empty only in the
    /// three-part form.
    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let invalid = || OptionsError::InvalidLine(text.to_owned());
        let number = |part: &str| {
            if is_number(part) {
                part.parse::<i64>().map_err(|_| invalid())
            } else {
                Err(invalid())
            }
        };
        let file = |part: &str| {
            if part.is_empty() {
                Err(invalid())
            } else {
                Ok(Some(part.to_owned()))
            }
        };

        match text.split(':').collect::<Vec<_>>().as_slice() {
            &[name, line, column] => Ok(Self {
                file: Some(name.to_owned()),
                line: number(line)?,
                column: Some(number(column)?),
            }),
            &[line, column] if is_number(line) => Ok(Self {
                file: None,
                line: number(line)?,
                column: Some(number(column)?),
            }),
            &[name, line] => Ok(Self {
                file: file(name)?,
                line: number(line)?,
                column: None,
            }),
            &[line] if is_number(line) => Ok(Self {
                file: None,
                line: number(line)?,
                column: None,
            }),
            &[name] => Ok(Self {
                file: file(name)?,
                line: 1,
                column: None,
            }),
            _ => Err(invalid()),
        }
    }
}

fn is_number(text: &str) -> bool {
    !text.is_empty() && text.bytes().all(|byte| byte.is_ascii_digit())
}

/// Extra request field supplied with `--send KEY,TYPE,VALUE`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SendField {
    pub(crate) key: String,
    pub(crate) value: FieldValue,
}

impl FromStr for SendField {
    type Err = OptionsError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let mut parts = text.splitn(3, ',');
        let (Some(key), Some(kind), Some(raw)) = (parts.next(), parts.next(), parts.next()) else {
            return Err(OptionsError::SendShape);
        };
        let value = match kind {
            "string" => FieldValue::from(raw),
            "integer" => raw
                .trim()
                .parse::<i64>()
                .map(FieldValue::Integer)
                .map_err(|_| OptionsError::SendInteger(raw.to_owned()))?,
            other => return Err(OptionsError::SendType(other.to_owned())),
        };
        Ok(Self {
            key: key.to_owned(),
            value,
        })
    }
}

/// Everything needed to build the evaluation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Evaluation {
    pub(crate) op: String,
    pub(crate) namespace: String,
    pub(crate) code: String,
    pub(crate) extras: Vec<SendField>,
    pub(crate) line: Option<LineReference>,
}

impl Evaluation {
    /// Builds the request for `session`.
    ///
    /// Field order is fixed: `op`, `ns`, `session`, `code`, the `--send`
    /// extras in command-line order, then `line`, `column` and `file`.
    pub(crate) fn request(&self, session: &[u8]) -> Request {
        let mut request = Request::new(self.op.as_str())
            .with("ns", self.namespace.as_str())
            .with("session", FieldValue::Text(session.to_vec()))
            .with("code", self.code.as_str());
        for extra in &self.extras {
            request.push(extra.key.as_str(), extra.value.clone());
        }
        if let Some(reference) = &self.line {
            request.push("line", reference.line);
            if let Some(column) = reference.column {
                request.push("column", column);
            }
            if let Some(file) = &reference.file {
                request.push("file", file.as_str());
            }
        }
        request
    }
}

/// Fully validated settings for one invocation.
#[derive(Debug)]
pub(crate) struct Settings {
    pub(crate) port: String,
    pub(crate) evaluation: Evaluation,
    pub(crate) filters: PrintFilters,
}

impl Settings {
    /// Merges command-line values over `config`.
    ///
    /// `--port` and `--namespace` take precedence over configuration.
    pub(crate) fn from_cli(cli: Cli, config: &Config) -> Result<Self, OptionsError> {
        let code = cli.code();
        let line = cli.line.as_deref().map(str::parse).transpose()?;
        let extras = cli
            .send
            .iter()
            .map(|spec| spec.parse())
            .collect::<Result<Vec<SendField>, _>>()?;
        let filters = PrintFilters::configure(&cli.print, &cli.no_print)?;
        Ok(Self {
            port: cli.port.unwrap_or_else(|| config.port().to_owned()),
            evaluation: Evaluation {
                op: cli.op,
                namespace: cli
                    .namespace
                    .unwrap_or_else(|| config.namespace().to_owned()),
                code,
                extras,
                line,
            },
            filters,
        })
    }
}
