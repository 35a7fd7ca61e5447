//! Typed views over the payloads the host actually interprets.
//!
//! Row update (type `0x000C`), exactly 52 bytes:
//! ```text
//! ┌───────────────┬──────────────────────────┬────────┐
//! │ Row index     │ Packed pixels, MSB first │ Unused │
//! │ 1 byte        │ 50 bytes                 │ 1 byte │
//! │ bit-reversed  │ 1 = set, 0 = clear       │        │
//! └───────────────┴──────────────────────────┴────────┘
//! ```
//!
//! Audio format ack (type `0x0015`): `flags: u16 LE`.

use thiserror::Error;

use crate::screen::{BYTES_PER_ROW, SCREEN_HEIGHT};

/// Exact size of a row update payload.
pub const ROW_PAYLOAD_SIZE: usize = 52;

/// Why a row update was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RowError {
    /// Payload was not exactly [`ROW_PAYLOAD_SIZE`] bytes.
    #[error("invalid row payload size {0}, expected 52")]
    WrongLength(usize),

    /// Decoded row index was outside `1..=SCREEN_HEIGHT`.
    #[error("invalid row index byte 0x{raw:02x} (decoded {row})")]
    RowOutOfRange {
        /// Index byte as received.
        raw: u8,
        /// Index after bit reversal.
        row: u8,
    },
}

/// Decode the wire row index byte, whose bit order is mirrored.
///
/// Reversal is its own inverse.
///
/// ```
/// use pdmirror::protocol::decode_row_index;
///
/// assert_eq!(decode_row_index(0x80), 1);
/// assert_eq!(decode_row_index(0x0F), 0xF0);
/// ```
#[inline]
pub fn decode_row_index(raw: u8) -> u8 {
    raw.reverse_bits()
}

/// A validated row update borrowing its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowUpdate<'a> {
    /// 1-based row index.
    pub row: u8,
    /// The row's packed pixel bytes.
    pub data: &'a [u8],
}

impl<'a> RowUpdate<'a> {
    /// Validate a row update payload.
    pub fn parse(payload: &'a [u8]) -> Result<Self, RowError> {
        if payload.len() != ROW_PAYLOAD_SIZE {
            return Err(RowError::WrongLength(payload.len()));
        }

        let raw = payload[0];
        let row = decode_row_index(raw);
        if row == 0 || usize::from(row) > SCREEN_HEIGHT {
            return Err(RowError::RowOutOfRange { raw, row });
        }

        Ok(Self {
            row,
            data: &payload[1..1 + BYTES_PER_ROW],
        })
    }

    /// Byte offset of this row inside the screen buffer.
    #[inline]
    pub fn offset(&self) -> usize {
        (usize::from(self.row) - 1) * BYTES_PER_ROW
    }
}

/// Decoded audio format acknowledgment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioFormatAck {
    /// Format flags reported by the device.
    pub flags: u16,
}

impl AudioFormatAck {
    /// Decode the flags field. Returns `None` if the payload is shorter than 2 bytes.
    pub fn parse(payload: &[u8]) -> Option<Self> {
        match payload {
            [lo, hi, ..] => Some(Self {
                flags: u16::from_le_bytes([*lo, *hi]),
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row_payload(index_byte: u8, fill: u8) -> Vec<u8> {
        let mut payload = vec![fill; ROW_PAYLOAD_SIZE];
        payload[0] = index_byte;
        payload
    }

    #[test]
    fn test_reversal_is_involution() {
        for value in 0..=u8::MAX {
            assert_eq!(decode_row_index(decode_row_index(value)), value);
        }
    }

    #[test]
    fn test_reversal_matches_bit_mirror() {
        for value in 0..=u8::MAX {
            let mut expected = 0u8;
            for bit in 0..8 {
                if value & (1 << bit) != 0 {
                    expected |= 1 << (7 - bit);
                }
            }
            assert_eq!(decode_row_index(value), expected);
        }
    }

    #[test]
    fn test_parse_first_row() {
        let payload = row_payload(0x80, 0xFF);
        let update = RowUpdate::parse(&payload).unwrap();

        assert_eq!(update.row, 1);
        assert_eq!(update.offset(), 0);
        assert_eq!(update.data.len(), BYTES_PER_ROW);
    }

    #[test]
    fn test_parse_last_row() {
        // 240 = 0b1111_0000, mirrored 0b0000_1111
        let payload = row_payload(0x0F, 0x00);
        let update = RowUpdate::parse(&payload).unwrap();

        assert_eq!(update.row, 240);
        assert_eq!(update.offset(), 239 * BYTES_PER_ROW);
    }

    #[test]
    fn test_parse_ignores_trailing_byte() {
        let mut payload = row_payload(0x80, 0x11);
        payload[ROW_PAYLOAD_SIZE - 1] = 0xEE;

        let update = RowUpdate::parse(&payload).unwrap();
        assert!(update.data.iter().all(|&b| b == 0x11));
    }

    #[test]
    fn test_parse_wrong_length() {
        assert_eq!(
            RowUpdate::parse(&[0x80; 51]),
            Err(RowError::WrongLength(51))
        );
        assert_eq!(
            RowUpdate::parse(&[0x80; 53]),
            Err(RowError::WrongLength(53))
        );
        assert_eq!(RowUpdate::parse(&[]), Err(RowError::WrongLength(0)));
    }

    #[test]
    fn test_parse_row_zero() {
        let payload = row_payload(0x00, 0);
        assert_eq!(
            RowUpdate::parse(&payload),
            Err(RowError::RowOutOfRange { raw: 0, row: 0 })
        );
    }

    #[test]
    fn test_parse_row_past_bottom() {
        // 241 = 0b1111_0001, mirrored 0b1000_1111
        let payload = row_payload(0x8F, 0);
        assert_eq!(
            RowUpdate::parse(&payload),
            Err(RowError::RowOutOfRange { raw: 0x8F, row: 241 })
        );
    }

    #[test]
    fn test_audio_format_ack() {
        assert_eq!(
            AudioFormatAck::parse(&[0x34, 0x12]),
            Some(AudioFormatAck { flags: 0x1234 })
        );
        assert_eq!(AudioFormatAck::parse(&[0x01]), None);
    }
}
