use crate::logging::LogFormat;

/// Endpoint used when none is configured: search the working directory and
/// its ancestors for a `.nrepl-port` file.
pub const DEFAULT_PORT: &str = "@.nrepl-port@.";

/// Namespace code is evaluated in when none is configured.
pub const DEFAULT_NAMESPACE: &str = "user";

/// Default log filter expression.
pub const DEFAULT_LOG_FILTER: &str = "warn";

/// Default endpoint specification.
#[must_use]
pub const fn default_port() -> &'static str {
    DEFAULT_PORT
}

/// Default evaluation namespace.
#[must_use]
pub const fn default_namespace() -> &'static str {
    DEFAULT_NAMESPACE
}

/// Default log filter expression.
#[must_use]
pub const fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Default diagnostic output format.
#[must_use]
pub const fn default_log_format() -> LogFormat {
    LogFormat::Compact
}
