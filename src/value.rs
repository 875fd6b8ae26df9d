//! RESP reply values.
//!
//! `Value` is the datum produced by the parser and handed to reply handlers.
//! RESP distinguishes a nil reply from an empty bulk string and from an empty
//! array, so `Null` is its own variant rather than an `Option` wrapper.

use bytes::{Bytes, BytesMut};

/// A decoded RESP reply.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Nil bulk (`$-1\r\n`) or nil array (`*-1\r\n`).
    Null,
    /// Integer: `:1000\r\n`
    Integer(i64),
    /// Simple string: `+OK\r\n`
    Status(String),
    /// Error: `-ERR message\r\n`
    Error(String),
    /// Bulk string: `$5\r\nhello\r\n`; binary-safe, length-exact.
    Bulk(Bytes),
    /// Array: `*2\r\n...`; may nest arbitrarily.
    Array(Vec<Value>),
}

/// Tag identifying a `Value` variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Null,
    Integer,
    Status,
    Error,
    Bulk,
    Array,
}

impl Value {
    /// Create a nil value
    pub fn null() -> Value {
        Value::Null
    }

    /// Create an integer value
    pub fn integer(n: i64) -> Value {
        Value::Integer(n)
    }

    /// Create a simple-string value
    pub fn status<S: Into<String>>(s: S) -> Value {
        Value::Status(s.into())
    }

    /// Create an error value
    pub fn error<S: Into<String>>(s: S) -> Value {
        Value::Error(s.into())
    }

    /// Create a bulk value
    pub fn bulk<B: Into<Bytes>>(data: B) -> Value {
        Value::Bulk(data.into())
    }

    /// Create an array value
    pub fn array(values: Vec<Value>) -> Value {
        Value::Array(values)
    }

    /// The variant tag of this value.
    pub fn kind(&self) -> Kind {
        match self {
            Value::Null => Kind::Null,
            Value::Integer(_) => Kind::Integer,
            Value::Status(_) => Kind::Status,
            Value::Error(_) => Kind::Error,
            Value::Bulk(_) => Kind::Bulk,
            Value::Array(_) => Kind::Array,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Value::Error(_))
    }

    /// The integer payload, or 0 for any other variant.
    ///
    /// Accessors are deliberately permissive: callers that care about the
    /// variant check `kind()` first.
    pub fn as_integer(&self) -> i64 {
        match self {
            Value::Integer(n) => *n,
            _ => 0,
        }
    }

    /// The textual payload of a `Bulk`, `Status` or `Error`, or an empty
    /// slice for any other variant.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Value::Bulk(data) => data,
            Value::Status(s) | Value::Error(s) => s.as_bytes(),
            _ => &[],
        }
    }

    /// The elements of an `Array`, or an empty slice for any other variant.
    pub fn as_array(&self) -> &[Value] {
        match self {
            Value::Array(values) => values,
            _ => &[],
        }
    }

    /// Encode this value to RESP wire format.
    pub fn encode(&self) -> BytesMut {
        let mut buf = BytesMut::new();
        self.encode_into(&mut buf);
        buf
    }

    /// Encode this value into an existing buffer.
    pub fn encode_into(&self, buf: &mut BytesMut) {
        match self {
            Value::Null => {
                buf.extend_from_slice(b"$-1\r\n");
            }
            Value::Integer(n) => {
                buf.extend_from_slice(b":");
                buf.extend_from_slice(n.to_string().as_bytes());
                buf.extend_from_slice(b"\r\n");
            }
            Value::Status(s) => {
                buf.extend_from_slice(b"+");
                buf.extend_from_slice(s.as_bytes());
                buf.extend_from_slice(b"\r\n");
            }
            Value::Error(s) => {
                buf.extend_from_slice(b"-");
                buf.extend_from_slice(s.as_bytes());
                buf.extend_from_slice(b"\r\n");
            }
            Value::Bulk(data) => {
                buf.extend_from_slice(b"$");
                buf.extend_from_slice(data.len().to_string().as_bytes());
                buf.extend_from_slice(b"\r\n");
                buf.extend_from_slice(data);
                buf.extend_from_slice(b"\r\n");
            }
            Value::Array(values) => {
                buf.extend_from_slice(b"*");
                buf.extend_from_slice(values.len().to_string().as_bytes());
                buf.extend_from_slice(b"\r\n");
                for value in values {
                    value.encode_into(buf);
                }
            }
        }
    }
}
