//! Full-colour canvas expanded from the bitplane.

use std::path::Path;

use image::RgbImage;
use serde::Deserialize;

use super::{SCREEN_HEIGHT, SCREEN_WIDTH};
use crate::error::Result;

/// An opaque RGB colour.
///
/// Deserializes from a `[r, g, b]` array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(from = "[u8; 3]")]
pub struct Rgb {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

impl Rgb {
    /// Create a colour from its channels.
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Packed `0xAARRGGBB` with full alpha.
    #[inline]
    pub fn to_argb(self) -> u32 {
        0xFF00_0000 | (u32::from(self.r) << 16) | (u32::from(self.g) << 8) | u32::from(self.b)
    }
}

impl From<[u8; 3]> for Rgb {
    fn from([r, g, b]: [u8; 3]) -> Self {
        Self { r, g, b }
    }
}

/// The two colours of the device's two-tone screen.
///
/// A set bit (1) maps to `set_bit`, a clear bit (0) to `clear_bit`. A blank,
/// all-zero buffer is therefore entirely `clear_bit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Palette {
    /// Colour for a 1 bit.
    pub set_bit: Rgb,
    /// Colour for a 0 bit.
    pub clear_bit: Rgb,
}

impl Palette {
    /// Light reflective-panel tone.
    pub const LIGHT: Rgb = Rgb::new(177, 175, 168);
    /// Dark reflective-panel tone.
    pub const DARK: Rgb = Rgb::new(49, 47, 40);
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            set_bit: Self::LIGHT,
            clear_bit: Self::DARK,
        }
    }
}

/// `SCREEN_WIDTH × SCREEN_HEIGHT` pixels, row-major.
#[derive(Clone, PartialEq, Eq)]
pub struct PixelCanvas {
    pixels: Vec<Rgb>,
}

impl PixelCanvas {
    /// Create a canvas with every pixel set to `colour`.
    pub fn filled(colour: Rgb) -> Self {
        Self {
            pixels: vec![colour; SCREEN_WIDTH * SCREEN_HEIGHT],
        }
    }

    /// Width in pixels.
    #[inline]
    pub fn width(&self) -> usize {
        SCREEN_WIDTH
    }

    /// Height in pixels.
    #[inline]
    pub fn height(&self) -> usize {
        SCREEN_HEIGHT
    }

    /// All pixels, row-major.
    #[inline]
    pub fn pixels(&self) -> &[Rgb] {
        &self.pixels
    }

    pub(crate) fn pixels_mut(&mut self) -> &mut [Rgb] {
        &mut self.pixels
    }

    /// Pixel at `(x, y)`, or `None` outside the canvas.
    pub fn pixel(&self, x: usize, y: usize) -> Option<Rgb> {
        if x >= SCREEN_WIDTH {
            return None;
        }
        self.pixels.get(y * SCREEN_WIDTH + x).copied()
    }

    /// Pixels packed as `0xAARRGGBB`, the layout most bitmap APIs take.
    pub fn to_argb(&self) -> Vec<u32> {
        self.pixels.iter().map(|p| p.to_argb()).collect()
    }

    /// Copy into an `image` buffer for encoding or further processing.
    pub fn to_rgb_image(&self) -> RgbImage {
        RgbImage::from_fn(SCREEN_WIDTH as u32, SCREEN_HEIGHT as u32, |x, y| {
            let p = self.pixels[y as usize * SCREEN_WIDTH + x as usize];
            image::Rgb([p.r, p.g, p.b])
        })
    }

    /// Save the canvas to `path`; the format follows the extension
    /// (`.png`, `.ppm`).
    ///
    /// # Errors
    ///
    /// [`MirrorError::Image`](crate::MirrorError::Image) if encoding or the
    /// file write fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        self.to_rgb_image().save(path)?;
        Ok(())
    }
}

impl std::fmt::Debug for PixelCanvas {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PixelCanvas")
            .field("width", &SCREEN_WIDTH)
            .field("height", &SCREEN_HEIGHT)
            .finish_non_exhaustive()
    }
}
