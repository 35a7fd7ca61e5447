//! Message dispatch by type code.
//!
//! Routes each framed message to the component that owns it. Only row
//! updates mutate state; every other known type is accepted and dropped,
//! and unknown types are logged so newer device firmware never breaks the
//! stream.
//!
//! # Example
//!
//! ```
//! use pdmirror::dispatch::{Dispatched, MessageDispatcher};
//! use pdmirror::protocol::{kind, Message};
//! use pdmirror::screen::ScreenBuffer;
//!
//! let dispatcher = MessageDispatcher::new();
//! let mut screen = ScreenBuffer::new();
//!
//! let outcome = dispatcher.dispatch(&Message::from_parts(0x7777, b""), &mut screen);
//! assert_eq!(outcome, Dispatched::Unknown(0x7777));
//! ```

use tracing::{debug, trace, warn};

use crate::error::MirrorError;
use crate::protocol::{kind, AudioFormatAck, Message};
use crate::screen::ScreenBuffer;

/// What the dispatcher did with a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatched {
    /// Input state, accepted without processing.
    Input,
    /// Frame start or end marker.
    FrameMarker,
    /// Row update written to the screen buffer (1-based row).
    RowApplied(u8),
    /// Row update rejected; the screen buffer is unchanged.
    RowRejected,
    /// Audio samples, not decoded.
    Audio,
    /// Audio format acknowledgment; `None` if the payload was too short.
    AudioFormat(Option<u16>),
    /// Unrecognised type code; payload discarded.
    Unknown(u16),
}

impl Dispatched {
    /// Whether the screen buffer changed.
    #[inline]
    pub fn is_screen_update(&self) -> bool {
        matches!(self, Self::RowApplied(_))
    }
}

/// Routes decoded messages by type code.
#[derive(Debug, Default, Clone, Copy)]
pub struct MessageDispatcher;

impl MessageDispatcher {
    /// Create a dispatcher.
    pub fn new() -> Self {
        Self
    }

    /// Dispatch one message. Never fails; anomalies are logged and dropped.
    pub fn dispatch(&self, message: &Message, screen: &mut ScreenBuffer) -> Dispatched {
        match message.message_type() {
            kind::INPUT_STATE => Dispatched::Input,
            kind::FRAME_START | kind::FRAME_START_ALT | kind::FRAME_END => {
                Dispatched::FrameMarker
            }
            kind::ROW_UPDATE => match screen.try_apply_row(message.payload()) {
                Ok(row) => {
                    trace!("Row {} updated", row);
                    Dispatched::RowApplied(row)
                }
                Err(e) => {
                    warn!("{}", MirrorError::MalformedRow(e));
                    Dispatched::RowRejected
                }
            },
            kind::AUDIO_FRAMES | kind::AUDIO_FRAME => Dispatched::Audio,
            kind::AUDIO_FORMAT_ACK => match AudioFormatAck::parse(message.payload()) {
                Some(ack) => {
                    debug!("Audio format ack: flags=0x{:04x}", ack.flags);
                    Dispatched::AudioFormat(Some(ack.flags))
                }
                None => {
                    warn!(
                        "Audio format ack too short: {} bytes",
                        message.payload_len()
                    );
                    Dispatched::AudioFormat(None)
                }
            },
            other => {
                warn!("{}", MirrorError::UnknownMessageType(other));
                Dispatched::Unknown(other)
            }
        }
    }
}
