//! Wire format encoding and decoding.
//!
//! Every message starts with a 4-byte header:
//! ```text
//! ┌──────────────┬────────────────┐
//! │ Message type │ Payload length │
//! │ 2 bytes      │ 2 bytes        │
//! │ uint16 LE    │ uint16 LE      │
//! └──────────────┴────────────────┘
//! ```
//!
//! All multi-byte integers are Little Endian.

/// Header size in bytes (fixed, exactly 4).
pub const HEADER_SIZE: usize = 4;

/// Message type codes sent by the device.
pub mod kind {
    /// Button and crank state.
    pub const INPUT_STATE: u16 = 0x0001;
    /// Start of a new frame.
    pub const FRAME_START: u16 = 0x000A;
    /// End of the current frame.
    pub const FRAME_END: u16 = 0x000B;
    /// One scanline of the bitplane.
    pub const ROW_UPDATE: u16 = 0x000C;
    /// Alternate start-of-frame marker.
    pub const FRAME_START_ALT: u16 = 0x000D;
    /// Several audio sample frames.
    pub const AUDIO_FRAMES: u16 = 0x0014;
    /// Acknowledgment of an audio format switch.
    pub const AUDIO_FORMAT_ACK: u16 = 0x0015;
    /// A single audio sample frame.
    pub const AUDIO_FRAME: u16 = 0x0016;
}

/// Decoded header from wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Message type (see [`kind`]).
    pub message_type: u16,
    /// Payload length in bytes.
    pub payload_length: u16,
}

impl Header {
    /// Create a new header.
    pub fn new(message_type: u16, payload_length: u16) -> Self {
        Self {
            message_type,
            payload_length,
        }
    }

    /// Encode header to bytes (Little Endian).
    ///
    /// # Example
    ///
    /// ```
    /// use pdmirror::protocol::{kind, Header};
    ///
    /// let bytes = Header::new(kind::ROW_UPDATE, 52).encode();
    /// assert_eq!(bytes, [0x0C, 0x00, 0x34, 0x00]);
    /// ```
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..2].copy_from_slice(&self.message_type.to_le_bytes());
        buf[2..4].copy_from_slice(&self.payload_length.to_le_bytes());
        buf
    }

    /// Decode header from bytes (Little Endian).
    ///
    /// Returns `None` if buffer is too short. Bytes past the header are ignored.
    ///
    /// # Example
    ///
    /// ```
    /// use pdmirror::protocol::Header;
    ///
    /// let header = Header::decode(&[0x15, 0x00, 0x02, 0x00]).unwrap();
    /// assert_eq!(header.message_type, 0x0015);
    /// assert_eq!(header.payload_length, 2);
    /// ```
    pub fn decode(buf: &[u8]) -> Option<Self> {
        match buf {
            [t0, t1, l0, l1, ..] => Some(Self {
                message_type: u16::from_le_bytes([*t0, *t1]),
                payload_length: u16::from_le_bytes([*l0, *l1]),
            }),
            _ => None,
        }
    }

    /// Total encoded size of the message this header announces.
    #[inline]
    pub fn message_size(&self) -> usize {
        HEADER_SIZE + self.payload_length as usize
    }
}
