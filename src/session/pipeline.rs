//! Framer, dispatcher and screen buffer behind one lock.
//!
//! The reader feeds each chunk through [`DecodePipeline::ingest`] while
//! holding the session's pipeline lock, so framing and dispatch of one chunk
//! are atomic with respect to [`DecodePipeline::reset`].

use tracing::trace;

use crate::dispatch::MessageDispatcher;
use crate::error::Result;
use crate::protocol::MessageFramer;
use crate::screen::{Palette, PixelCanvas, ScreenBuffer};

/// Bytes in, canvases out.
///
/// Chunks are ignored until [`start`](Self::start) is called, and again
/// after [`reset`](Self::reset).
///
/// # Example
///
/// ```
/// use pdmirror::protocol::{build_message, kind};
/// use pdmirror::screen::Palette;
/// use pdmirror::session::DecodePipeline;
///
/// let mut pipeline = DecodePipeline::new(Palette::default(), None);
/// pipeline.start();
///
/// let mut row = vec![0xFF; 52];
/// row[0] = 0x80;
/// let canvas = pipeline.ingest(&build_message(kind::ROW_UPDATE, &row)).unwrap();
/// assert!(canvas.is_some());
/// ```
pub struct DecodePipeline {
    framer: MessageFramer,
    dispatcher: MessageDispatcher,
    screen: ScreenBuffer,
    palette: Palette,
    accepting: bool,
}

impl DecodePipeline {
    /// Create an idle pipeline.
    pub fn new(palette: Palette, max_payload: Option<u16>) -> Self {
        let framer = match max_payload {
            Some(max) => MessageFramer::with_max_payload(max),
            None => MessageFramer::new(),
        };
        Self {
            framer,
            dispatcher: MessageDispatcher::new(),
            screen: ScreenBuffer::new(),
            palette,
            accepting: false,
        }
    }

    /// Clear all state, begin accepting chunks, and return the blank canvas.
    pub fn start(&mut self) -> PixelCanvas {
        self.framer.reset();
        self.screen.clear();
        self.accepting = true;
        self.screen.expand(&self.palette)
    }

    /// Frame and dispatch one chunk.
    ///
    /// Returns a regenerated canvas if at least one row changed. Expansion is
    /// batched per chunk, so a burst of rows costs a single expansion.
    ///
    /// # Errors
    ///
    /// Only a payload above the configured ceiling; the stream cannot be
    /// re-synchronised after that.
    pub fn ingest(&mut self, chunk: &[u8]) -> Result<Option<PixelCanvas>> {
        if !self.accepting {
            trace!("Dropping {} bytes received while not streaming", chunk.len());
            return Ok(None);
        }

        let mut dirty = false;
        for message in self.framer.push(chunk)? {
            dirty |= self
                .dispatcher
                .dispatch(&message, &mut self.screen)
                .is_screen_update();
        }

        Ok(dirty.then(|| self.screen.expand(&self.palette)))
    }

    /// Stop accepting chunks and drop all buffered and screen state.
    pub fn reset(&mut self) {
        self.accepting = false;
        self.framer.reset();
        self.screen.clear();
    }

    /// Whether chunks are currently processed.
    #[inline]
    pub fn is_accepting(&self) -> bool {
        self.accepting
    }

    /// Current screen buffer.
    #[inline]
    pub fn screen(&self) -> &ScreenBuffer {
        &self.screen
    }

    /// Bytes of an incomplete message waiting for more input.
    #[inline]
    pub fn buffered(&self) -> usize {
        self.framer.len()
    }
}
