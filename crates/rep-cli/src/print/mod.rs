//! Print filters project reply fields onto output sinks.
//!
//! Every reply is offered to each filter in order. A filter whose trigger key
//! is present renders its template against the whole reply and writes the
//! result to its sink. Filters never suppress one another.

use std::io::{self, Write};
use std::str::FromStr;

use rep_protocol::{Template, TemplateError, Value};
use thiserror::Error;

use crate::IoStreams;

/// Filters installed when no `--print` option is given.
const DEFAULT_FILTERS: [&str; 3] = ["out,1,%{out}", "err,2,%{err}", "value,1,%{value}%n"];

/// Destination of rendered output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Sink {
    Stdout,
    Stderr,
    /// Any other descriptor inherited from the parent process.
    #[cfg(unix)]
    Descriptor(std::os::unix::io::RawFd),
}

impl Sink {
    /// Maps a numbered descriptor onto a sink.
    pub(crate) const fn from_descriptor(descriptor: i32) -> Option<Self> {
        match descriptor {
            1 => Some(Self::Stdout),
            2 => Some(Self::Stderr),
            #[cfg(unix)]
            other if other >= 0 => Some(Self::Descriptor(other)),
            _ => None,
        }
    }

    /// Reports whether the sink's descriptor is currently open.
    fn is_open(self) -> bool {
        match self {
            Self::Stdout | Self::Stderr => true,
            #[cfg(unix)]
            Self::Descriptor(descriptor) => {
                // SAFETY: F_GETFD only reads the descriptor flags.
                unsafe { libc::fcntl(descriptor, libc::F_GETFD) != -1 }
            }
        }
    }
}

/// Writes rendered bytes to a sink.
pub(crate) trait Sinks {
    fn write_sink(&mut self, sink: Sink, bytes: &[u8]) -> io::Result<()>;
}

impl<W: Write, E: Write> Sinks for IoStreams<'_, W, E> {
    fn write_sink(&mut self, sink: Sink, bytes: &[u8]) -> io::Result<()> {
        match sink {
            Sink::Stdout => {
                self.stdout.write_all(bytes)?;
                self.stdout.flush()
            }
            Sink::Stderr => {
                self.stderr.write_all(bytes)?;
                self.stderr.flush()
            }
            #[cfg(unix)]
            Sink::Descriptor(descriptor) => write_descriptor(descriptor, bytes),
        }
    }
}

#[cfg(unix)]
fn write_descriptor(descriptor: std::os::unix::io::RawFd, bytes: &[u8]) -> io::Result<()> {
    use std::fs::File;
    use std::mem::ManuallyDrop;
    use std::os::unix::io::FromRawFd;

    // SAFETY: the descriptor is non-negative and remains owned by the parent
    // process; ManuallyDrop keeps it open after the write.
    let mut file = ManuallyDrop::new(unsafe { File::from_raw_fd(descriptor) });
    file.write_all(bytes)?;
    file.flush()
}

/// Errors raised while parsing a `--print` value.
#[derive(Debug, Error)]
pub(crate) enum PrintSpecError {
    #[error("--print option is either KEY or KEY,FD,FORMAT")]
    Shape,
    #[error("--print descriptor '{0}' is not an open file descriptor")]
    Descriptor(String),
    #[error("--print format for '{key}' is invalid: {source}")]
    Template {
        key: String,
        #[source]
        source: TemplateError,
    },
}

/// Errors raised while applying filters to a reply.
#[derive(Debug, Error)]
pub(crate) enum PrintError {
    #[error("cannot print '{key}': {source}")]
    Render {
        key: String,
        #[source]
        source: TemplateError,
    },
    #[error("failed to write output: {0}")]
    Write(#[source] io::Error),
}

/// A `(trigger key, sink, template)` rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PrintFilter {
    key: String,
    sink: Sink,
    template: Template,
}

impl PrintFilter {
    pub(crate) fn new(key: impl Into<String>, sink: Sink, template: Template) -> Self {
        Self {
            key: key.into(),
            sink,
            template,
        }
    }

    pub(crate) fn key(&self) -> &str {
        &self.key
    }

    pub(crate) const fn sink(&self) -> Sink {
        self.sink
    }

    pub(crate) const fn template(&self) -> &Template {
        &self.template
    }
}

impl FromStr for PrintFilter {
    type Err = PrintSpecError;

    /// Parses `KEY`, shorthand for `KEY,1,%{KEY}`, or `KEY,FD,FORMAT`. The
    /// format is everything after the second comma.
    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let (key, sink, format) = match text.split_once(',') {
            None => (text, Sink::Stdout, format!("%{{{text}}}")),
            Some((key, rest)) => {
                let (descriptor, format) = rest.split_once(',').ok_or(PrintSpecError::Shape)?;
                let sink = descriptor
                    .trim()
                    .parse::<i32>()
                    .ok()
                    .and_then(Sink::from_descriptor)
                    .filter(|sink| sink.is_open())
                    .ok_or_else(|| PrintSpecError::Descriptor(descriptor.to_owned()))?;
                (key, sink, format.to_owned())
            }
        };
        let template = Template::parse(&format).map_err(|source| PrintSpecError::Template {
            key: key.to_owned(),
            source,
        })?;
        Ok(Self::new(key, sink, template))
    }
}

/// Ordered list of print filters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PrintFilters {
    filters: Vec<PrintFilter>,
    customised: bool,
}

impl PrintFilters {
    /// The stock `out`, `err` and `value` filters.
    pub(crate) fn defaults() -> Result<Self, PrintSpecError> {
        let filters = DEFAULT_FILTERS
            .iter()
            .map(|spec| spec.parse::<PrintFilter>())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            filters,
            customised: false,
        })
    }

    /// Builds the list from `--print` values, then drops the keys named by
    /// `--no-print`.
    pub(crate) fn configure(
        prints: &[String],
        removals: &[String],
    ) -> Result<Self, PrintSpecError> {
        let mut filters = Self::defaults()?;
        for spec in prints {
            filters.push(spec.parse()?);
        }
        for key in removals {
            filters.remove(key);
        }
        Ok(filters)
    }

    /// Appends `filter`. The first custom filter replaces the defaults.
    pub(crate) fn push(&mut self, filter: PrintFilter) {
        if !self.customised {
            self.filters.clear();
            self.customised = true;
        }
        self.filters.push(filter);
    }

    /// Removes every filter triggered by `key`.
    pub(crate) fn remove(&mut self, key: &str) {
        self.filters.retain(|filter| filter.key != key);
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &PrintFilter> {
        self.filters.iter()
    }

    /// Renders `reply` through every matching filter, in order.
    pub(crate) fn apply<S: Sinks>(&self, reply: &Value, sinks: &mut S) -> Result<(), PrintError> {
        for filter in self.iter().filter(|filter| reply.contains_key(filter.key())) {
            let rendered = filter
                .template()
                .render(reply)
                .map_err(|source| PrintError::Render {
                    key: filter.key().to_owned(),
                    source,
                })?;
            sinks
                .write_sink(filter.sink(), rendered.as_bytes())
                .map_err(PrintError::Write)?;
        }
        Ok(())
    }
}
