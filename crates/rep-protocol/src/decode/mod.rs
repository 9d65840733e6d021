//! Streaming bencode decoder.
//!
//! [`Decoder`] reads one top-level value at a time from any buffered byte
//! source using a single byte of lookahead. Decoding is blocking recursive
//! descent: a call returns only once a complete value has been read, and any
//! framing violation is reported as an error. The stream is not
//! resynchronised after an error.

use std::io::{self, BufRead, Read};

use thiserror::Error;

use crate::value::{ByteString, Value};

/// Errors raised while decoding a bencode stream.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The input ended before a value was complete.
    #[error("unexpected end of input while reading {context}")]
    UnexpectedEof {
        /// Production being decoded when input ran out.
        context: &'static str,
    },
    /// A byte that the grammar does not allow at this position.
    #[error("bad character '{}' in nREPL stream while reading {context}", .found.escape_ascii())]
    UnexpectedByte {
        /// Offending byte.
        found: u8,
        /// Production being decoded.
        context: &'static str,
    },
    /// A byte string length prefix that does not fit in memory.
    #[error("byte string length overflows")]
    LengthOverflow,
    /// Reading from the underlying source failed.
    #[error("failed to read from the connection: {0}")]
    Io(#[from] io::Error),
}

/// Recursive-descent decoder over a buffered byte source.
#[derive(Debug)]
pub struct Decoder<R> {
    reader: R,
}

impl<R: BufRead> Decoder<R> {
    /// Wraps a buffered reader.
    pub const fn new(reader: R) -> Self {
        Self { reader }
    }

    /// Returns the underlying reader.
    pub fn into_inner(self) -> R {
        self.reader
    }

    /// Returns the next byte without consuming it, or `None` at end of input.
    pub fn peek_byte(&mut self) -> Result<Option<u8>, DecodeError> {
        loop {
            match self.reader.fill_buf() {
                Ok(buffer) => return Ok(buffer.first().copied()),
                Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
                Err(error) => return Err(DecodeError::Io(error)),
            }
        }
    }

    /// Consumes and returns the next byte, or `None` at end of input.
    pub fn next_byte(&mut self) -> Result<Option<u8>, DecodeError> {
        let byte = self.peek_byte()?;
        if byte.is_some() {
            self.reader.consume(1);
        }
        Ok(byte)
    }

    /// Decodes the next top-level message.
    ///
    /// Returns `Ok(None)` when the input ends cleanly between messages.
    pub fn read_message(&mut self) -> Result<Option<Value>, DecodeError> {
        if self.peek_byte()?.is_none() {
            return Ok(None);
        }
        self.read_value().map(Some)
    }

    /// Decodes exactly one value; end of input is an error.
    pub fn read_value(&mut self) -> Result<Value, DecodeError> {
        match self.peek_required("a value")? {
            b'i' => self.read_integer().map(Value::Integer),
            b'l' => self.read_list(),
            b'd' => self.read_dictionary(),
            b'0'..=b'9' => self.read_byte_string().map(Value::ByteString),
            found => Err(DecodeError::UnexpectedByte {
                found,
                context: "a value",
            }),
        }
    }

    fn peek_required(&mut self, context: &'static str) -> Result<u8, DecodeError> {
        self.peek_byte()?
            .ok_or(DecodeError::UnexpectedEof { context })
    }

    fn next_required(&mut self, context: &'static str) -> Result<u8, DecodeError> {
        self.next_byte()?
            .ok_or(DecodeError::UnexpectedEof { context })
    }

    fn read_integer(&mut self) -> Result<i64, DecodeError> {
        const CONTEXT: &str = "an integer";
        self.reader.consume(1);
        let negative = self.peek_required(CONTEXT)? == b'-';
        if negative {
            self.reader.consume(1);
        }

        let mut value: i64 = 0;
        let mut digits = 0_usize;
        loop {
            match self.next_required(CONTEXT)? {
                b'e' if digits > 0 => break,
                digit @ b'0'..=b'9' => {
                    value = value
                        .wrapping_mul(10)
                        .wrapping_add(i64::from(digit - b'0'));
                    digits += 1;
                }
                found => {
                    return Err(DecodeError::UnexpectedByte {
                        found,
                        context: CONTEXT,
                    });
                }
            }
        }
        Ok(if negative { value.wrapping_neg() } else { value })
    }

    fn read_byte_string(&mut self) -> Result<ByteString, DecodeError> {
        const CONTEXT: &str = "a byte string";
        let mut length: u64 = 0;
        loop {
            match self.next_required(CONTEXT)? {
                b':' => break,
                digit @ b'0'..=b'9' => {
                    length = length
                        .checked_mul(10)
                        .and_then(|value| value.checked_add(u64::from(digit - b'0')))
                        .ok_or(DecodeError::LengthOverflow)?;
                }
                found => {
                    return Err(DecodeError::UnexpectedByte {
                        found,
                        context: CONTEXT,
                    });
                }
            }
        }

        let mut bytes = Vec::new();
        let read = self.reader.by_ref().take(length).read_to_end(&mut bytes)?;
        if u64::try_from(read) != Ok(length) {
            return Err(DecodeError::UnexpectedEof { context: CONTEXT });
        }
        Ok(ByteString::from(bytes))
    }

    fn read_list(&mut self) -> Result<Value, DecodeError> {
        self.reader.consume(1);
        let mut items = Vec::new();
        while self.peek_required("a list")? != b'e' {
            items.push(self.read_value()?);
        }
        self.reader.consume(1);
        Ok(Value::List(items))
    }

    fn read_dictionary(&mut self) -> Result<Value, DecodeError> {
        self.reader.consume(1);
        let mut entries = Vec::new();
        while self.peek_required("a dictionary")? != b'e' {
            let key = self.read_value()?;
            let value = self.read_value()?;
            entries.push((key, value));
        }
        self.reader.consume(1);
        Ok(Value::Dictionary(entries))
    }
}
