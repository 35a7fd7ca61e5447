//! Protocol module - wire format, framing, payloads and commands.
//!
//! This module implements the host side of the link:
//! - 4-byte little-endian header encoding/decoding
//! - Framer for accumulating partial reads
//! - Message struct and typed payload views
//! - Outbound text commands

mod command;
mod framer;
mod message;
mod payload;
mod wire_format;

pub use command::Command;
pub use framer::MessageFramer;
pub use message::{build_message, Message};
pub use payload::{decode_row_index, AudioFormatAck, RowError, RowUpdate, ROW_PAYLOAD_SIZE};
pub use wire_format::{kind, Header, HEADER_SIZE};
