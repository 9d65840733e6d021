//! Wire-level building blocks for the nREPL protocol.
//!
//! The crate owns the bencode value tree, the streaming decoder that reads
//! replies off a connection, the template language print filters use to
//! project replies onto output streams, and the encoder for the request
//! shapes the client sends.

pub mod decode;
pub mod request;
pub mod template;
pub mod value;

pub use decode::{DecodeError, Decoder};
pub use request::{FieldValue, Request};
pub use template::{Template, TemplateError};
pub use value::{ByteString, Value};
