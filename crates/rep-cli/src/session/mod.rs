//! Session engine.
//!
//! A run is three strictly sequential exchanges over one connection: clone a
//! new session, evaluate the code in it, then close it. Each exchange sends
//! one request and consumes replies until one carries a `done` status. Every
//! reply in every phase passes through the print filters and is checked for
//! exception and error signals; the close phase runs whatever the evaluation
//! reported.

use std::fmt;
use std::io::{self, BufReader, Read, Write};
use std::process::ExitCode;

use rep_protocol::{ByteString, DecodeError, Decoder, Request, Value};
use thiserror::Error;
use tracing::{debug, info};

use crate::EXIT_EVALUATION_FAILURE;
use crate::options::Evaluation;
use crate::print::{PrintError, PrintFilters, Sink, Sinks};

const SESSION_TARGET: &str = "rep::session";

/// Line written to stderr when the server cannot find the namespace.
pub(crate) const NAMESPACE_NOT_FOUND: &[u8] = b"rep: namespace not found\n";

/// Exchange currently in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Phase {
    Clone,
    Evaluate,
    Close,
}

impl fmt::Display for Phase {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(match self {
            Self::Clone => "clone",
            Self::Evaluate => "evaluate",
            Self::Close => "close",
        })
    }
}

/// Result of a completed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Outcome {
    /// No reply signalled an exception or error.
    Success,
    /// At least one reply carried `ex` or an error status.
    Failure,
}

impl Outcome {
    /// Process exit status for the outcome.
    pub(crate) fn exit_code(self) -> ExitCode {
        match self {
            Self::Success => ExitCode::SUCCESS,
            Self::Failure => ExitCode::from(EXIT_EVALUATION_FAILURE),
        }
    }
}

/// Fatal errors that abort a run.
#[derive(Debug, Error)]
pub(crate) enum SessionError {
    #[error("failed to send {phase} request: {source}")]
    Send {
        phase: Phase,
        #[source]
        source: io::Error,
    },
    #[error("failed to read {phase} reply: {source}")]
    Receive {
        phase: Phase,
        #[source]
        source: DecodeError,
    },
    #[error("server closed the connection during {phase}")]
    Closed { phase: Phase },
    #[error("server did not return a session id")]
    NoSession,
    #[error(transparent)]
    Print(#[from] PrintError),
}

/// Client side of one nREPL session.
pub(crate) struct Session<C> {
    stream: BufReader<C>,
    id: Option<ByteString>,
    exception_observed: bool,
}

impl<C: Read + Write> Session<C> {
    pub(crate) fn new(connection: C) -> Self {
        Self {
            stream: BufReader::new(connection),
            id: None,
            exception_observed: false,
        }
    }

    /// Session id captured during the clone phase.
    pub(crate) const fn id(&self) -> Option<&ByteString> {
        self.id.as_ref()
    }

    /// Runs clone, evaluate and close in order.
    pub(crate) fn run<S: Sinks>(
        &mut self,
        evaluation: &Evaluation,
        filters: &PrintFilters,
        sinks: &mut S,
    ) -> Result<Outcome, SessionError> {
        self.exception_observed = false;
        let session = self.open(filters, sinks)?;
        self.exchange(
            Phase::Evaluate,
            &evaluation.request(session.as_bytes()),
            filters,
            sinks,
        )?;
        self.exchange(
            Phase::Close,
            &Request::close_session(session.as_bytes()),
            filters,
            sinks,
        )?;
        Ok(if self.exception_observed {
            Outcome::Failure
        } else {
            Outcome::Success
        })
    }

    fn open<S: Sinks>(
        &mut self,
        filters: &PrintFilters,
        sinks: &mut S,
    ) -> Result<ByteString, SessionError> {
        self.exchange(Phase::Clone, &Request::clone_session(), filters, sinks)?;
        let session = self.id().cloned().ok_or(SessionError::NoSession)?;
        debug!(target: SESSION_TARGET, session = %session, "session established");
        Ok(session)
    }

    fn exchange<S: Sinks>(
        &mut self,
        phase: Phase,
        request: &Request,
        filters: &PrintFilters,
        sinks: &mut S,
    ) -> Result<(), SessionError> {
        debug!(target: SESSION_TARGET, %phase, op = request.op(), "sending request");
        request
            .write_to(self.stream.get_mut())
            .map_err(|source| SessionError::Send { phase, source })?;

        loop {
            let reply = Decoder::new(&mut self.stream)
                .read_message()
                .map_err(|source| SessionError::Receive { phase, source })?
                .ok_or(SessionError::Closed { phase })?;
            if self.dispatch(phase, &reply, filters, sinks)? {
                debug!(target: SESSION_TARGET, %phase, "exchange complete");
                return Ok(());
            }
        }
    }

    /// Handles one reply and reports whether it completes the exchange.
    fn dispatch<S: Sinks>(
        &mut self,
        phase: Phase,
        reply: &Value,
        filters: &PrintFilters,
        sinks: &mut S,
    ) -> Result<bool, SessionError> {
        if phase == Phase::Clone
            && let Some(Value::ByteString(session)) = reply.get("new-session")
        {
            self.id = Some(session.clone());
        }

        filters.apply(reply, sinks)?;

        if reply.contains_key("ex") {
            self.exception_observed = true;
        }

        let status = reply.get("status");
        let has_status = |flag: &str| status.is_some_and(|value| value.has_str(flag));
        if has_status("error") {
            info!(target: SESSION_TARGET, %phase, "server reported an error status");
            self.exception_observed = true;
        }
        if has_status("namespace-not-found") {
            sinks
                .write_sink(Sink::Stderr, NAMESPACE_NOT_FOUND)
                .map_err(PrintError::Write)?;
            self.exception_observed = true;
        }
        Ok(has_status("done"))
    }
}
