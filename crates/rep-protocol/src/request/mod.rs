//! Request encoding.
//!
//! The client only ever sends flat dictionaries of byte strings and
//! integers, so requests are encoded straight to bytes without building a
//! [`Value`](crate::Value) tree first.

use std::io::{self, Write};

use crate::value::encode_bytes;

/// Value carried by a request field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// Length-prefixed byte string.
    Text(Vec<u8>),
    /// Integer.
    Integer(i64),
}

impl From<&str> for FieldValue {
    fn from(text: &str) -> Self {
        Self::Text(text.as_bytes().to_vec())
    }
}

impl From<String> for FieldValue {
    fn from(text: String) -> Self {
        Self::Text(text.into_bytes())
    }
}

impl From<i64> for FieldValue {
    fn from(number: i64) -> Self {
        Self::Integer(number)
    }
}

/// A request dictionary, encoded in insertion order with `op` first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    op: String,
    fields: Vec<(String, FieldValue)>,
}

impl Request {
    /// Starts a request for operation `op`.
    #[must_use]
    pub fn new(op: impl Into<String>) -> Self {
        Self {
            op: op.into(),
            fields: Vec::new(),
        }
    }

    /// Builds the request that opens a new session.
    #[must_use]
    pub fn clone_session() -> Self {
        Self::new("clone")
    }

    /// Builds the request that closes `session`.
    #[must_use]
    pub fn close_session(session: &[u8]) -> Self {
        Self::new("close").with("session", FieldValue::Text(session.to_vec()))
    }

    /// Appends a field.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.push(key, value);
        self
    }

    /// Appends a field in place.
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<FieldValue>) {
        self.fields.push((key.into(), value.into()));
    }

    /// Returns the operation name.
    #[must_use]
    pub fn op(&self) -> &str {
        &self.op
    }

    /// Returns the value of the first field named `key`.
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(candidate, _)| candidate == key)
            .map(|(_, value)| value)
    }

    /// Encodes the request as a bencode dictionary.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(64);
        out.push(b'd');
        encode_bytes(b"op", &mut out);
        encode_bytes(self.op.as_bytes(), &mut out);
        for (key, value) in &self.fields {
            encode_bytes(key.as_bytes(), &mut out);
            match value {
                FieldValue::Text(bytes) => encode_bytes(bytes, &mut out),
                FieldValue::Integer(number) => {
                    out.push(b'i');
                    out.extend_from_slice(number.to_string().as_bytes());
                    out.push(b'e');
                }
            }
        }
        out.push(b'e');
        out
    }

    /// Writes the encoded request and flushes `writer`.
    ///
    /// # Errors
    ///
    /// Propagates any write or flush failure.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(&self.encode())?;
        writer.flush()
    }
}
