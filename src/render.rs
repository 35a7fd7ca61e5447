//! Hand-off point to whatever draws the mirrored screen.
//!
//! The reader task calls [`FrameSink::present`] directly, so implementations
//! must return immediately; post the frame to another context instead of
//! drawing inline. Channel senders already behave that way and implement
//! the trait.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};

use crate::screen::PixelCanvas;

/// What the renderer should show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Presentation {
    /// A freshly expanded screen.
    Canvas(Arc<PixelCanvas>),
    /// No active stream; show a placeholder.
    NoSignal,
}

impl Presentation {
    /// The canvas, if any.
    pub fn canvas(&self) -> Option<&PixelCanvas> {
        match self {
            Self::Canvas(canvas) => Some(canvas),
            Self::NoSignal => None,
        }
    }
}

/// Receives frames from the session. Must not block.
pub trait FrameSink: Send + Sync + 'static {
    /// Show `frame`.
    fn present(&self, frame: Presentation);
}

impl FrameSink for mpsc::UnboundedSender<Presentation> {
    fn present(&self, frame: Presentation) {
        // A dropped receiver means nobody is watching; frames are disposable.
        let _ = self.send(frame);
    }
}

/// Keeps only the newest frame; a slow renderer skips intermediate ones.
impl FrameSink for watch::Sender<Presentation> {
    fn present(&self, frame: Presentation) {
        self.send_replace(frame);
    }
}

/// Sink that drops every frame, for headless sessions.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl FrameSink for NullSink {
    fn present(&self, _frame: Presentation) {}
}
