//! Reply templates used by print filters.
//!
//! A template is a format string compiled once into a short list of
//! directives and then rendered against each reply:
//!
//! - any byte other than `%` is copied literally;
//! - `%%` renders `%` and `%n` renders a newline;
//! - `%.` renders the current value as a scalar;
//! - `%{KEY}` looks up `KEY` in the current dictionary, rendering a scalar
//!   directly and each item of a list with `%.%n`;
//! - `%{KEY,FORMAT}` renders each item of a list with `FORMAT`. A scalar is
//!   rendered directly and `FORMAT` is ignored.
//!
//! The closing brace of `%{...}` is the first `}` not consumed by a nested
//! directive, so sub-formats may themselves contain `%{...}`.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::value::{ByteString, Value};

/// Errors raised while compiling or rendering a template.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TemplateError {
    /// `%` was followed by a character with no meaning.
    #[error("invalid character '{found}' in format {format:?}")]
    InvalidDirective {
        /// Full format string.
        format: String,
        /// Character following `%`.
        found: char,
    },
    /// The format ended directly after `%`.
    #[error("format {format:?} ends with a lone '%'")]
    TrailingPercent {
        /// Full format string.
        format: String,
    },
    /// A `%{` had no matching `}`.
    #[error("no closing brace in format {format:?}")]
    UnclosedBrace {
        /// Full format string.
        format: String,
    },
    /// A list or dictionary was rendered where a scalar was required.
    #[error("cannot render a {kind} as a scalar")]
    NotScalar {
        /// Kind of the offending value.
        kind: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Directive {
    Literal(Vec<u8>),
    Current,
    Lookup {
        key: Vec<u8>,
        each: Option<Vec<Directive>>,
    },
}

/// A compiled reply template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    source: String,
    directives: Vec<Directive>,
}

impl Template {
    /// Compiles `format`.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError`] when the format contains an unknown
    /// directive, a trailing `%`, or an unclosed `%{`.
    pub fn parse(format: &str) -> Result<Self, TemplateError> {
        let mut parser = Parser {
            format,
            bytes: format.as_bytes(),
            position: 0,
        };
        let directives = parser.sequence(false)?;
        Ok(Self {
            source: format.to_owned(),
            directives,
        })
    }

    /// Returns the format string the template was compiled from.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Renders the template against `value`.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::NotScalar`] when a list or dictionary reaches
    /// a scalar position.
    pub fn render(&self, value: &Value) -> Result<ByteString, TemplateError> {
        let mut out = ByteString::with_capacity(128);
        render_directives(&self.directives, value, &mut out)?;
        Ok(out)
    }
}

impl FromStr for Template {
    type Err = TemplateError;

    fn from_str(format: &str) -> Result<Self, Self::Err> {
        Self::parse(format)
    }
}

impl fmt::Display for Template {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.source)
    }
}

struct Parser<'a> {
    format: &'a str,
    bytes: &'a [u8],
    position: usize,
}

impl Parser<'_> {
    /// Parses directives until the end of input, or until an unconsumed `}`
    /// when `nested` is set. The closing brace is left for the caller.
    fn sequence(&mut self, nested: bool) -> Result<Vec<Directive>, TemplateError> {
        let mut directives = Vec::new();
        let mut literal = Vec::new();

        while let Some(&byte) = self.bytes.get(self.position) {
            if nested && byte == b'}' {
                flush_literal(&mut literal, &mut directives);
                return Ok(directives);
            }
            self.position += 1;
            if byte != b'%' {
                literal.push(byte);
                continue;
            }

            let Some(&directive) = self.bytes.get(self.position) else {
                return Err(TemplateError::TrailingPercent {
                    format: self.format.to_owned(),
                });
            };
            self.position += 1;
            match directive {
                b'%' => literal.push(b'%'),
                b'n' => literal.push(b'\n'),
                b'.' => {
                    flush_literal(&mut literal, &mut directives);
                    directives.push(Directive::Current);
                }
                b'{' => {
                    flush_literal(&mut literal, &mut directives);
                    directives.push(self.lookup()?);
                }
                other => {
                    return Err(TemplateError::InvalidDirective {
                        format: self.format.to_owned(),
                        found: self.char_at(self.position - 1).unwrap_or(char::from(other)),
                    });
                }
            }
        }

        if nested {
            return Err(self.unclosed());
        }
        flush_literal(&mut literal, &mut directives);
        Ok(directives)
    }

    fn lookup(&mut self) -> Result<Directive, TemplateError> {
        let start = self.position;
        loop {
            match self.bytes.get(self.position) {
                None => return Err(self.unclosed()),
                Some(b'}') => {
                    let key = self.slice(start);
                    self.position += 1;
                    return Ok(Directive::Lookup { key, each: None });
                }
                Some(b',') => {
                    let key = self.slice(start);
                    self.position += 1;
                    let each = self.sequence(true)?;
                    self.position += 1;
                    return Ok(Directive::Lookup {
                        key,
                        each: Some(each),
                    });
                }
                Some(_) => self.position += 1,
            }
        }
    }

    fn slice(&self, start: usize) -> Vec<u8> {
        self.bytes
            .get(start..self.position)
            .unwrap_or_default()
            .to_vec()
    }

    fn char_at(&self, index: usize) -> Option<char> {
        self.format.get(index..).and_then(|rest| rest.chars().next())
    }

    fn unclosed(&self) -> TemplateError {
        TemplateError::UnclosedBrace {
            format: self.format.to_owned(),
        }
    }
}

fn flush_literal(literal: &mut Vec<u8>, directives: &mut Vec<Directive>) {
    if !literal.is_empty() {
        directives.push(Directive::Literal(std::mem::take(literal)));
    }
}

fn render_directives(
    directives: &[Directive],
    value: &Value,
    out: &mut ByteString,
) -> Result<(), TemplateError> {
    for directive in directives {
        match directive {
            Directive::Literal(bytes) => out.append(bytes),
            Directive::Current => render_scalar(value, out)?,
            Directive::Lookup { key, each } => match value.get_bytes(key) {
                None => {}
                Some(Value::List(items)) => {
                    for item in items {
                        render_item(item, each.as_deref(), out)?;
                    }
                }
                Some(embedded) => render_scalar(embedded, out)?,
            },
        }
    }
    Ok(())
}

/// Renders one list item with `each`, or with `%.%n` when no sub-format was
/// given.
fn render_item(
    item: &Value,
    each: Option<&[Directive]>,
    out: &mut ByteString,
) -> Result<(), TemplateError> {
    match each {
        Some(directives) => render_directives(directives, item, out),
        None => {
            render_scalar(item, out)?;
            out.push(b'\n');
            Ok(())
        }
    }
}

fn render_scalar(value: &Value, out: &mut ByteString) -> Result<(), TemplateError> {
    match value {
        Value::Integer(number) => out.append(number.to_string().as_bytes()),
        Value::ByteString(bytes) => out.append(bytes.as_bytes()),
        Value::List(_) | Value::Dictionary(_) => {
            return Err(TemplateError::NotScalar { kind: value.kind() });
        }
    }
    Ok(())
}
