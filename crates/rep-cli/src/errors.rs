//! Error types for the CLI runtime.

use std::io;
use std::sync::Arc;

use rep_config::EndpointError;
use thiserror::Error;

use crate::options::OptionsError;
use crate::session::SessionError;
use crate::telemetry::TelemetryError;

/// Fatal errors; every variant maps to the fatal exit status.
#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("failed to load configuration: {0}")]
    LoadConfiguration(Arc<ortho_config::OrthoError>),
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    #[error(transparent)]
    Options(#[from] OptionsError),
    #[error(transparent)]
    Endpoint(#[from] EndpointError),
    #[error("failed to resolve {endpoint}: {source}")]
    Resolve { endpoint: String, source: io::Error },
    #[error("failed to connect to {endpoint}: {source}")]
    Connect { endpoint: String, source: io::Error },
    #[error(transparent)]
    Session(#[from] SessionError),
}
