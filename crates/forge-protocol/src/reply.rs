//! Direct-to-buffer reply serialization.
//!
//! Replies are single newline-terminated lines. Integer-to-string
//! conversion uses `itoa` for stack-based formatting.

use bytes::{BufMut, Bytes, BytesMut};

/// A single server reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// `+PONG\n`
    Pong,
    /// `+OK\n`
    Ok,
    /// Value payload, `$<bytes>\n`.
    Value(Bytes),
    /// Absent value, `$nil\n`.
    Nil,
    /// `:<n>\n`
    Integer(i64),
    /// `-ERR <message>\n`
    Error(String),
}

impl Reply {
    /// Serializes this reply into the provided buffer, including the
    /// trailing newline.
    pub fn serialize(&self, dst: &mut BytesMut) {
        match self {
            Reply::Pong => dst.put_slice(b"+PONG\n"),
            Reply::Ok => dst.put_slice(b"+OK\n"),
            Reply::Value(data) => {
                dst.put_u8(b'$');
                dst.put_slice(data);
                dst.put_u8(b'\n');
            }
            Reply::Nil => dst.put_slice(b"$nil\n"),
            Reply::Integer(n) => {
                dst.put_u8(b':');
                let mut buf = itoa::Buffer::new();
                dst.put_slice(buf.format(*n).as_bytes());
                dst.put_u8(b'\n');
            }
            Reply::Error(message) => {
                dst.put_slice(b"-ERR ");
                dst.put_slice(message.as_bytes());
                dst.put_u8(b'\n');
            }
        }
    }
}
