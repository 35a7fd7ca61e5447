//! Screen module - the device bitplane and its expansion into pixels.
//!
//! - [`ScreenBuffer`] - packed 1-bit-per-pixel copy of the device screen
//! - [`PixelCanvas`] - full-colour expansion handed to the renderer
//! - [`Palette`] - the two colours a bit maps to

mod buffer;
mod canvas;

pub use buffer::ScreenBuffer;
pub use canvas::{Palette, PixelCanvas, Rgb};

/// Device screen width in pixels.
pub const SCREEN_WIDTH: usize = 400;

/// Device screen height in pixels (number of rows).
pub const SCREEN_HEIGHT: usize = 240;

/// Packed bytes per row, one bit per pixel.
pub const BYTES_PER_ROW: usize = SCREEN_WIDTH / 8;

/// Total size of the packed bitplane.
pub const SCREEN_BUFFER_SIZE: usize = BYTES_PER_ROW * SCREEN_HEIGHT;
