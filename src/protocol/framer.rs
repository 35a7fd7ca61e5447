//! Stream framer for accumulating partial reads.
//!
//! Uses `bytes::BytesMut` for zero-copy buffer management. Serial reads
//! arrive in arbitrary chunks; the framer keeps the unconsumed tail (a
//! partial header, or a header plus a partial payload) until the next push.
//!
//! # Example
//!
//! ```
//! use pdmirror::protocol::{build_message, kind, MessageFramer};
//!
//! let mut framer = MessageFramer::new();
//! let bytes = build_message(kind::FRAME_START, b"");
//!
//! assert!(framer.push(&bytes[..3]).unwrap().is_empty());
//! let messages = framer.push(&bytes[3..]).unwrap();
//! assert_eq!(messages[0].message_type(), kind::FRAME_START);
//! ```

use bytes::BytesMut;

use super::wire_format::{Header, HEADER_SIZE};
use super::Message;
use crate::error::{MirrorError, Result};

/// Initial capacity of the accumulation buffer.
const DEFAULT_CAPACITY: usize = 16 * 1024;

/// Buffer for accumulating incoming bytes and extracting complete messages.
///
/// After every [`push`](Self::push) the buffer holds only the bytes of an
/// incomplete trailing message.
pub struct MessageFramer {
    /// Accumulated bytes from transport reads.
    buffer: BytesMut,
    /// Optional ceiling on announced payload length.
    max_payload: Option<u16>,
}

impl MessageFramer {
    /// Create a new framer with no payload ceiling.
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(DEFAULT_CAPACITY),
            max_payload: None,
        }
    }

    /// Create a framer that rejects payloads longer than `max_payload`.
    pub fn with_max_payload(max_payload: u16) -> Self {
        Self {
            buffer: BytesMut::with_capacity(DEFAULT_CAPACITY),
            max_payload: Some(max_payload),
        }
    }

    /// Push data into the buffer and extract all complete messages, in order.
    ///
    /// Safe to call with any chunk size, including zero.
    ///
    /// # Errors
    ///
    /// Returns [`MirrorError::Protocol`] if any header in the buffer announces
    /// a payload above the configured ceiling. Headers are checked before
    /// anything is extracted, so a failed push consumes no message.
    pub fn push(&mut self, data: &[u8]) -> Result<Vec<Message>> {
        self.buffer.extend_from_slice(data);
        self.check_ceiling()?;

        let mut messages = Vec::new();
        while let Some(message) = self.try_extract_one() {
            messages.push(message);
        }

        Ok(messages)
    }

    /// Walk every header reachable in the buffer and enforce the ceiling.
    fn check_ceiling(&self) -> Result<()> {
        let Some(max) = self.max_payload else {
            return Ok(());
        };

        let mut offset = 0;
        while let Some(header) = self.buffer.get(offset..).and_then(Header::decode) {
            if header.payload_length > max {
                return Err(MirrorError::Protocol(format!(
                    "Payload size {} exceeds maximum {}",
                    header.payload_length, max
                )));
            }
            offset += header.message_size();
        }
        Ok(())
    }

    /// Try to extract a single message from the front of the buffer.
    fn try_extract_one(&mut self) -> Option<Message> {
        let header = Header::decode(&self.buffer)?;
        if self.buffer.len() < header.message_size() {
            return None;
        }

        let _ = self.buffer.split_to(HEADER_SIZE);
        let payload = self
            .buffer
            .split_to(header.payload_length as usize)
            .freeze();

        Some(Message::new(header.message_type, payload))
    }

    /// Get the number of buffered bytes.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Discard every buffered byte, including any partial message.
    pub fn reset(&mut self) {
        self.buffer.clear();
    }
}

impl Default for MessageFramer {
    fn default() -> Self {
        Self::new()
    }
}
