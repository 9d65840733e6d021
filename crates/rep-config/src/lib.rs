//! Shared configuration for the `rep` client.
//!
//! Configuration is layered by `ortho_config`: built-in defaults, then an
//! optional configuration file, then `REP_*` environment variables, then the
//! configuration flags given on the command line. Every field is optional so
//! that absent layers fall through to the defaults exposed by the accessors.
//!
//! The crate also owns endpoint resolution, which turns the configured port
//! specification into a concrete host and port.

mod defaults;
pub mod endpoint;
mod logging;

use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

pub use defaults::{
    DEFAULT_LOG_FILTER, DEFAULT_NAMESPACE, DEFAULT_PORT, default_log_filter, default_log_format,
    default_namespace, default_port,
};
pub use endpoint::{Endpoint, EndpointError, MAX_INDIRECTION_DEPTH};
pub use logging::{LogFormat, LogFormatParseError};

/// Layered client configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "REP")]
pub struct Config {
    /// Endpoint specification: `PORT`, `HOST:PORT`, `@FILE` or `@FILE@DIR`.
    pub port: Option<String>,
    /// Namespace code is evaluated in.
    pub namespace: Option<String>,
    /// `tracing` filter expression for diagnostics.
    pub log_filter: Option<String>,
    /// Diagnostic output format.
    pub log_format: Option<LogFormat>,
}

impl Config {
    /// Endpoint specification, falling back to [`DEFAULT_PORT`].
    #[must_use]
    pub fn port(&self) -> &str {
        self.port.as_deref().unwrap_or(DEFAULT_PORT)
    }

    /// Evaluation namespace, falling back to [`DEFAULT_NAMESPACE`].
    #[must_use]
    pub fn namespace(&self) -> &str {
        self.namespace.as_deref().unwrap_or(DEFAULT_NAMESPACE)
    }

    /// Log filter expression, falling back to [`DEFAULT_LOG_FILTER`].
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_deref().unwrap_or(DEFAULT_LOG_FILTER)
    }

    /// Diagnostic output format.
    #[must_use]
    pub fn log_format(&self) -> LogFormat {
        self.log_format.unwrap_or_else(default_log_format)
    }
}
