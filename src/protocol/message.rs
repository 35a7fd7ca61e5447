//! Message struct with typed accessors.
//!
//! Represents a complete protocol message with header and payload.
//! Uses `bytes::Bytes` for zero-copy payload sharing.
//!
//! # Example
//!
//! ```
//! use pdmirror::protocol::{kind, Message};
//! use bytes::Bytes;
//!
//! let message = Message::new(kind::AUDIO_FORMAT_ACK, Bytes::from_static(&[0x01, 0x00]));
//!
//! assert_eq!(message.message_type(), 0x0015);
//! assert_eq!(message.payload(), &[0x01, 0x00]);
//! ```

use bytes::Bytes;

use super::wire_format::{Header, HEADER_SIZE};

/// A complete protocol message, valid until it has been dispatched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Message type code.
    pub message_type: u16,
    /// Payload bytes (zero-copy via `bytes::Bytes`).
    pub payload: Bytes,
}

impl Message {
    /// Create a new message from type and payload.
    pub fn new(message_type: u16, payload: Bytes) -> Self {
        Self {
            message_type,
            payload,
        }
    }

    /// Create a message from raw bytes (copies data).
    pub fn from_parts(message_type: u16, payload: &[u8]) -> Self {
        Self {
            message_type,
            payload: Bytes::copy_from_slice(payload),
        }
    }

    /// Get the message type.
    #[inline]
    pub fn message_type(&self) -> u16 {
        self.message_type
    }

    /// Get a reference to the payload bytes.
    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Get the payload length.
    #[inline]
    pub fn payload_len(&self) -> usize {
        self.payload.len()
    }
}

/// Build a complete message as a single byte vector.
///
/// This is the exact byte sequence the device puts on the wire. Payloads
/// longer than `u16::MAX` cannot be represented and are truncated to it.
///
/// # Example
///
/// ```
/// use pdmirror::protocol::{build_message, kind};
///
/// let bytes = build_message(kind::FRAME_END, b"");
/// assert_eq!(bytes, [0x0B, 0x00, 0x00, 0x00]);
/// ```
pub fn build_message(message_type: u16, payload: &[u8]) -> Vec<u8> {
    let length = u16::try_from(payload.len()).unwrap_or(u16::MAX);
    let payload = &payload[..length as usize];

    let mut buf = Vec::with_capacity(HEADER_SIZE + payload.len());
    buf.extend_from_slice(&Header::new(message_type, length).encode());
    buf.extend_from_slice(payload);
    buf
}
