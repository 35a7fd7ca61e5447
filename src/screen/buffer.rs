//! Packed bitplane reconstructed from row updates.

use tracing::warn;

use super::canvas::{Palette, PixelCanvas};
use super::{BYTES_PER_ROW, SCREEN_BUFFER_SIZE};
use crate::protocol::{RowError, RowUpdate};

/// The device's monochrome bitplane, `SCREEN_HEIGHT` rows of
/// `BYTES_PER_ROW` bytes, MSB-first within each byte.
///
/// The size is fixed for the lifetime of the buffer.
#[derive(Clone, PartialEq, Eq)]
pub struct ScreenBuffer {
    bytes: Box<[u8]>,
}

impl ScreenBuffer {
    /// Create an all-zero buffer.
    pub fn new() -> Self {
        Self {
            bytes: vec![0u8; SCREEN_BUFFER_SIZE].into_boxed_slice(),
        }
    }

    /// Apply a row update payload. Returns `true` if the row was written.
    ///
    /// Malformed payloads are logged and leave the buffer untouched.
    pub fn apply_row(&mut self, payload: &[u8]) -> bool {
        match self.try_apply_row(payload) {
            Ok(_) => true,
            Err(e) => {
                warn!("Dropping row update: {}", e);
                false
            }
        }
    }

    /// Apply a row update payload, returning the 1-based row written.
    pub fn try_apply_row(&mut self, payload: &[u8]) -> Result<u8, RowError> {
        let update = RowUpdate::parse(payload)?;
        let offset = update.offset();
        self.bytes[offset..offset + BYTES_PER_ROW].copy_from_slice(update.data);
        Ok(update.row)
    }

    /// Packed bytes of a 1-based row, or `None` if out of range.
    pub fn row(&self, row: usize) -> Option<&[u8]> {
        let start = row.checked_sub(1)? * BYTES_PER_ROW;
        self.bytes.get(start..start + BYTES_PER_ROW)
    }

    /// The whole packed buffer.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Zero-fill the whole buffer.
    pub fn clear(&mut self) {
        self.bytes.fill(0);
    }

    /// Expand into a freshly allocated canvas.
    pub fn expand(&self, palette: &Palette) -> PixelCanvas {
        let mut canvas = PixelCanvas::filled(palette.clear_bit);
        self.expand_into(palette, &mut canvas);
        canvas
    }

    /// Regenerate every pixel of `canvas` from this buffer.
    pub fn expand_into(&self, palette: &Palette, canvas: &mut PixelCanvas) {
        for (byte, pixels) in self.bytes.iter().zip(canvas.pixels_mut().chunks_exact_mut(8)) {
            for (bit, pixel) in pixels.iter_mut().enumerate() {
                *pixel = if byte & (0x80 >> bit) != 0 {
                    palette.set_bit
                } else {
                    palette.clear_bit
                };
            }
        }
    }
}

impl Default for ScreenBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ScreenBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let lit = self.bytes.iter().map(|b| b.count_ones()).sum::<u32>();
        f.debug_struct("ScreenBuffer")
            .field("len", &self.bytes.len())
            .field("set_bits", &lit)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ROW_PAYLOAD_SIZE;
    use crate::screen::{SCREEN_HEIGHT, SCREEN_WIDTH};

    fn row_payload(row: u8, data: &[u8]) -> Vec<u8> {
        let mut payload = vec![0u8; ROW_PAYLOAD_SIZE];
        payload[0] = row.reverse_bits();
        payload[1..1 + data.len()].copy_from_slice(data);
        payload
    }

    #[test]
    fn test_new_buffer_is_zeroed() {
        let screen = ScreenBuffer::new();
        assert_eq!(screen.as_bytes().len(), SCREEN_BUFFER_SIZE);
        assert!(screen.as_bytes().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_apply_row_isolated() {
        let mut screen = ScreenBuffer::new();
        let data: Vec<u8> = (0..BYTES_PER_ROW as u8).collect();

        assert!(screen.apply_row(&row_payload(7, &data)));

        let bytes = screen.as_bytes();
        let offset = 6 * BYTES_PER_ROW;
        assert_eq!(&bytes[offset..offset + BYTES_PER_ROW], &data[..]);
        assert!(bytes[..offset].iter().all(|&b| b == 0));
        assert!(bytes[offset + BYTES_PER_ROW..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_last_update_wins() {
        let mut screen = ScreenBuffer::new();

        screen.apply_row(&row_payload(3, &[0xFF; BYTES_PER_ROW]));
        screen.apply_row(&row_payload(3, &[0x0F; BYTES_PER_ROW]));

        assert_eq!(screen.row(3).unwrap(), &[0x0F; BYTES_PER_ROW][..]);
    }

    #[test]
    fn test_rejected_rows_leave_buffer_unchanged() {
        let mut screen = ScreenBuffer::new();
        screen.apply_row(&row_payload(1, &[0xAA; BYTES_PER_ROW]));
        let before = screen.clone();

        let mut short = row_payload(2, &[0xFF; BYTES_PER_ROW]);
        short.pop();
        assert!(!screen.apply_row(&short));

        let mut zero = vec![0xFF; ROW_PAYLOAD_SIZE];
        zero[0] = 0;
        assert!(!screen.apply_row(&zero));

        let mut past_bottom = vec![0xFF; ROW_PAYLOAD_SIZE];
        past_bottom[0] = 241u8.reverse_bits();
        assert!(!screen.apply_row(&past_bottom));

        assert!(screen == before);
    }

    #[test]
    fn test_row_accessor_bounds() {
        let screen = ScreenBuffer::new();
        assert!(screen.row(0).is_none());
        assert!(screen.row(1).is_some());
        assert!(screen.row(SCREEN_HEIGHT).is_some());
        assert!(screen.row(SCREEN_HEIGHT + 1).is_none());
    }

    #[test]
    fn test_clear() {
        let mut screen = ScreenBuffer::new();
        screen.apply_row(&row_payload(120, &[0xFF; BYTES_PER_ROW]));

        screen.clear();

        assert!(screen.as_bytes().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_pixel_mapping() {
        let palette = Palette::default();
        let mut data = [0u8; BYTES_PER_ROW];
        data[0] = 0xFF;
        data[1] = 0x00;
        data[2] = 0b1000_0000;

        let mut screen = ScreenBuffer::new();
        screen.apply_row(&row_payload(1, &data));
        let canvas = screen.expand(&palette);
        let row = &canvas.pixels()[..SCREEN_WIDTH];

        assert!(row[0..8].iter().all(|&p| p == palette.set_bit));
        assert!(row[8..16].iter().all(|&p| p == palette.clear_bit));
        assert_eq!(row[16], palette.set_bit);
        assert!(row[17..24].iter().all(|&p| p == palette.clear_bit));
    }

    #[test]
    fn test_blank_expands_to_clear_colour() {
        let palette = Palette::default();
        let canvas = ScreenBuffer::new().expand(&palette);

        assert_eq!(canvas.pixels().len(), SCREEN_WIDTH * SCREEN_HEIGHT);
        assert!(canvas.pixels().iter().all(|&p| p == palette.clear_bit));
    }

    #[test]
    fn test_expand_into_overwrites_stale_pixels() {
        let palette = Palette::default();
        let mut canvas = PixelCanvas::filled(palette.set_bit);

        ScreenBuffer::new().expand_into(&palette, &mut canvas);

        assert!(canvas.pixels().iter().all(|&p| p == palette.clear_bit));
    }

    #[test]
    fn test_row_maps_to_canvas_line() {
        let palette = Palette::default();
        let mut screen = ScreenBuffer::new();
        screen.apply_row(&row_payload(SCREEN_HEIGHT as u8, &[0xFF; BYTES_PER_ROW]));

        let canvas = screen.expand(&palette);
        let last_line = (SCREEN_HEIGHT - 1) * SCREEN_WIDTH;

        assert!(canvas.pixels()[last_line..].iter().all(|&p| p == palette.set_bit));
        assert!(canvas.pixels()[..last_line]
            .iter()
            .all(|&p| p == palette.clear_bit));
    }
}
