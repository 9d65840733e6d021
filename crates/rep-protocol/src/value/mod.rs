//! Decoded bencode values.
//!
//! Replies are small trees of integers, byte strings, lists, and
//! dictionaries. A parent owns its children outright, so dropping a reply
//! releases the whole tree. Sibling sequences are plain vectors: dropping walks
//! them iteratively and only recurses into nested containers, which keeps the
//! drop depth bounded by nesting rather than by reply length.

use std::borrow::Cow;
use std::fmt;

/// Growable raw byte payload.
///
/// The bytes are not guaranteed to be text; the length is authoritative and
/// embedded NUL bytes are preserved.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct ByteString(Vec<u8>);

impl ByteString {
    /// Creates an empty byte string.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Creates an empty byte string with room for `capacity` bytes.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self(Vec::with_capacity(capacity))
    }

    /// Appends `bytes`, growing the backing buffer geometrically.
    pub fn append(&mut self, bytes: &[u8]) {
        self.0.extend_from_slice(bytes);
    }

    /// Appends a single byte.
    pub fn push(&mut self, byte: u8) {
        self.0.push(byte);
    }

    /// Returns the raw bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns the number of bytes held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true when no bytes are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Consumes the byte string and returns the backing buffer.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    /// Returns the bytes as text, replacing invalid UTF-8 sequences.
    #[must_use]
    pub fn to_string_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.0)
    }

    /// Returns true when the bytes equal `literal` exactly.
    #[must_use]
    pub fn eq_str(&self, literal: &str) -> bool {
        self.0 == literal.as_bytes()
    }
}

impl fmt::Debug for ByteString {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "b\"{}\"", self.0.escape_ascii())
    }
}

impl fmt::Display for ByteString {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.to_string_lossy())
    }
}

impl From<Vec<u8>> for ByteString {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for ByteString {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl From<&str> for ByteString {
    fn from(text: &str) -> Self {
        Self(text.as_bytes().to_vec())
    }
}

impl From<String> for ByteString {
    fn from(text: String) -> Self {
        Self(text.into_bytes())
    }
}

/// A decoded protocol value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Value {
    /// Signed integer; arithmetic wraps like native fixed-width integers.
    Integer(i64),
    /// Length-prefixed raw bytes.
    ByteString(ByteString),
    /// Ordered sequence of values.
    List(Vec<Value>),
    /// Ordered key/value pairs; duplicate keys are kept and the first wins.
    Dictionary(Vec<(Value, Value)>),
}

impl Value {
    /// Builds a byte string value.
    #[must_use]
    pub fn bytes(bytes: impl Into<ByteString>) -> Self {
        Self::ByteString(bytes.into())
    }

    /// Builds a list value.
    #[must_use]
    pub fn list(items: impl IntoIterator<Item = Self>) -> Self {
        Self::List(items.into_iter().collect())
    }

    /// Builds a dictionary whose keys are byte strings.
    #[must_use]
    pub fn dictionary<K>(entries: impl IntoIterator<Item = (K, Self)>) -> Self
    where
        K: Into<ByteString>,
    {
        Self::Dictionary(
            entries
                .into_iter()
                .map(|(key, value)| (Self::ByteString(key.into()), value))
                .collect(),
        )
    }

    /// Human-readable name of the variant, used in diagnostics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Integer(_) => "integer",
            Self::ByteString(_) => "byte string",
            Self::List(_) => "list",
            Self::Dictionary(_) => "dictionary",
        }
    }

    /// Returns the payload of a byte string value.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::ByteString(bytes) => Some(bytes.as_bytes()),
            _ => None,
        }
    }

    /// Returns true when this is a byte string equal to `literal`.
    #[must_use]
    pub fn is_str(&self, literal: &str) -> bool {
        matches!(self, Self::ByteString(bytes) if bytes.eq_str(literal))
    }

    /// Returns true when this is a list with an item equal to `literal`.
    #[must_use]
    pub fn contains_str(&self, literal: &str) -> bool {
        match self {
            Self::List(items) => items.iter().any(|item| item.is_str(literal)),
            _ => false,
        }
    }

    /// Returns true when the value is `literal` or a list containing it.
    ///
    /// Status fields arrive in both shapes.
    #[must_use]
    pub fn has_str(&self, literal: &str) -> bool {
        self.is_str(literal) || self.contains_str(literal)
    }

    /// Looks up `key` in a dictionary.
    ///
    /// Scans in insertion order and returns the first match. Empty lists and
    /// empty dictionaries are reported as absent, as is any lookup on a value
    /// that is not a dictionary.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Self> {
        self.get_bytes(key.as_bytes())
    }

    /// Byte-keyed variant of [`Value::get`].
    #[must_use]
    pub fn get_bytes(&self, key: &[u8]) -> Option<&Self> {
        let Self::Dictionary(entries) = self else {
            return None;
        };
        entries
            .iter()
            .find(|(candidate, _)| candidate.as_bytes() == Some(key))
            .map(|(_, value)| value)
            .filter(|value| !value.is_empty_container())
    }

    /// Returns true when `key` is present with a non-empty value.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    fn is_empty_container(&self) -> bool {
        match self {
            Self::List(items) => items.is_empty(),
            Self::Dictionary(entries) => entries.is_empty(),
            Self::Integer(_) | Self::ByteString(_) => false,
        }
    }

    /// Appends the wire encoding of this value to `out`.
    pub fn encode_to(&self, out: &mut Vec<u8>) {
        match self {
            Self::Integer(number) => {
                out.push(b'i');
                out.extend_from_slice(number.to_string().as_bytes());
                out.push(b'e');
            }
            Self::ByteString(bytes) => encode_bytes(bytes.as_bytes(), out),
            Self::List(items) => {
                out.push(b'l');
                for item in items {
                    item.encode_to(out);
                }
                out.push(b'e');
            }
            Self::Dictionary(entries) => {
                out.push(b'd');
                for (key, value) in entries {
                    key.encode_to(out);
                    value.encode_to(out);
                }
                out.push(b'e');
            }
        }
    }

    /// Returns the wire encoding of this value.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.encode_to(&mut out);
        out
    }
}

/// Appends a length-prefixed byte string to `out`.
pub(crate) fn encode_bytes(bytes: &[u8], out: &mut Vec<u8>) {
    out.extend_from_slice(bytes.len().to_string().as_bytes());
    out.push(b':');
    out.extend_from_slice(bytes);
}
