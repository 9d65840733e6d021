//! Endpoint specification resolution.
//!
//! An endpoint specification takes one of four forms:
//!
//! - `PORT`, connecting to the loopback address;
//! - `HOST:PORT`;
//! - `@FILE`, whose first line is itself an endpoint specification;
//! - `@FILE@DIR`, which searches `DIR` and each of its ancestors for `FILE`
//!   and then behaves like `@FILE` on the first match.
//!
//! Relative paths are taken against the working directory. File indirection
//! is followed recursively up to [`MAX_INDIRECTION_DEPTH`] levels.

use std::fmt;
use std::fs;
use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;

/// Host used when a specification carries only a port.
pub const LOOPBACK_HOST: &str = "127.0.0.1";

/// Deepest chain of `@FILE` indirections followed before giving up.
pub const MAX_INDIRECTION_DEPTH: usize = 16;

/// A resolved TCP endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    host: String,
    port: u16,
}

impl Endpoint {
    /// Builds an endpoint from its parts.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Host name or address literal.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// TCP port.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Resolves `spec` relative to the process working directory.
    ///
    /// # Errors
    ///
    /// Returns [`EndpointError`] when the working directory is unavailable or
    /// the specification cannot be resolved.
    pub fn resolve(spec: &str) -> Result<Self, EndpointError> {
        let cwd = std::env::current_dir().map_err(EndpointError::CurrentDirectory)?;
        let cwd = Utf8PathBuf::from_path_buf(cwd)
            .map_err(|path| EndpointError::NonUtf8Directory { path })?;
        Self::resolve_from(spec, &cwd)
    }

    /// Resolves `spec`, taking relative paths against `cwd`.
    ///
    /// # Errors
    ///
    /// Returns [`EndpointError`] when a referenced file is missing, empty, or
    /// unreadable, when no ancestor holds the searched file, when a port does
    /// not parse, or when indirection is nested too deeply.
    pub fn resolve_from(spec: &str, cwd: &Utf8Path) -> Result<Self, EndpointError> {
        Resolver { cwd }.resolve(spec, 0)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(formatter, "[{}]:{}", self.host, self.port)
        } else {
            write!(formatter, "{}:{}", self.host, self.port)
        }
    }
}

/// Errors raised while resolving an endpoint specification.
#[derive(Debug, Error)]
pub enum EndpointError {
    /// The working directory could not be determined.
    #[error("failed to determine the working directory: {0}")]
    CurrentDirectory(#[source] io::Error),
    /// The working directory is not valid UTF-8.
    #[error("working directory '{}' is not valid UTF-8", .path.display())]
    NonUtf8Directory {
        /// Offending directory.
        path: std::path::PathBuf,
    },
    /// A referenced port file does not exist.
    #[error("{path}: no such file")]
    MissingFile {
        /// Path that was looked up.
        path: Utf8PathBuf,
    },
    /// A referenced port file could not be read.
    #[error("failed to read {path}: {source}")]
    ReadFile {
        /// Path that was read.
        path: Utf8PathBuf,
        /// Underlying failure.
        #[source]
        source: io::Error,
    },
    /// A referenced port file has no first line.
    #[error("{path} is empty")]
    EmptyFile {
        /// Path that was read.
        path: Utf8PathBuf,
    },
    /// The port component is not a number in range.
    #[error("invalid port in endpoint '{spec}'")]
    InvalidPort {
        /// Specification being resolved.
        spec: String,
    },
    /// `@FILE` references nest deeper than [`MAX_INDIRECTION_DEPTH`].
    #[error("endpoint '{spec}' nests file references more than {} deep", MAX_INDIRECTION_DEPTH)]
    TooDeep {
        /// Specification at which the limit was hit.
        spec: String,
    },
    /// No directory from the start up to the root holds the file.
    #[error("No ancestor of {directory} contains {file}")]
    NoAncestor {
        /// Directory the search started from.
        directory: Utf8PathBuf,
        /// File name searched for.
        file: String,
    },
}

struct Resolver<'a> {
    cwd: &'a Utf8Path,
}

impl Resolver<'_> {
    fn resolve(&self, spec: &str, depth: usize) -> Result<Endpoint, EndpointError> {
        let Some(reference) = spec.strip_prefix('@') else {
            return parse_address(spec);
        };
        if depth >= MAX_INDIRECTION_DEPTH {
            return Err(EndpointError::TooDeep {
                spec: spec.to_owned(),
            });
        }
        match reference.split_once('@') {
            None => self.resolve_file(&self.cwd.join(reference), depth),
            Some((file, directory)) => {
                let start = self.cwd.join(directory);
                let found = search_ancestors(&start, file)?;
                self.resolve_file(&found, depth)
            }
        }
    }

    fn resolve_file(&self, path: &Utf8Path, depth: usize) -> Result<Endpoint, EndpointError> {
        let contents = fs::read_to_string(path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                EndpointError::MissingFile {
                    path: path.to_owned(),
                }
            } else {
                EndpointError::ReadFile {
                    path: path.to_owned(),
                    source,
                }
            }
        })?;
        let line = contents
            .lines()
            .next()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .ok_or_else(|| EndpointError::EmptyFile {
                path: path.to_owned(),
            })?;
        self.resolve(line, depth + 1)
    }
}

fn search_ancestors(start: &Utf8Path, file: &str) -> Result<Utf8PathBuf, EndpointError> {
    start
        .ancestors()
        .map(|directory| directory.join(file))
        .find(|candidate| candidate.exists())
        .ok_or_else(|| EndpointError::NoAncestor {
            directory: start.to_owned(),
            file: file.to_owned(),
        })
}

fn parse_address(spec: &str) -> Result<Endpoint, EndpointError> {
    let (host, port) = match spec.rsplit_once(':') {
        Some((host, port)) => (host.trim_start_matches('[').trim_end_matches(']'), port),
        None => (LOOPBACK_HOST, spec),
    };
    let port = port
        .trim()
        .parse::<u16>()
        .map_err(|_| EndpointError::InvalidPort {
            spec: spec.to_owned(),
        })?;
    let host = if host.is_empty() { LOOPBACK_HOST } else { host };
    Ok(Endpoint::new(host, port))
}
