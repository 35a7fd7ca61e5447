//! Error types for pdmirror.

use std::time::Duration;

use thiserror::Error;

use crate::protocol::RowError;

/// Main error type for all mirroring operations.
#[derive(Debug, Error)]
pub enum MirrorError {
    /// I/O error outside a more specific context.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error while loading configuration.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Canvas image encoding or saving failed.
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// Invalid configuration value.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// The transport could not be opened.
    #[error("Failed to open transport: {0}")]
    TransportOpen(#[source] std::io::Error),

    /// The `stream enable` command could not be sent.
    #[error("Failed to enable stream: {0}")]
    HandshakeWrite(#[source] Box<MirrorError>),

    /// The transport reported a read failure.
    #[error("Read error: {0}")]
    Read(#[source] std::io::Error),

    /// A keepalive poke could not be sent. Never fatal on its own.
    #[error("Keepalive poke failed: {0}")]
    KeepAliveWrite(#[source] Box<MirrorError>),

    /// A row update was malformed.
    #[error("Malformed row payload: {0}")]
    MalformedRow(#[from] RowError),

    /// A message type this host does not know.
    #[error("Unknown message type: 0x{0:04x}")]
    UnknownMessageType(u16),

    /// Stream-level protocol violation (payload above the configured ceiling).
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// A command write did not complete in time.
    #[error("Write timed out after {0:?}")]
    WriteTimeout(Duration),

    /// Connection closed by the device or by teardown.
    #[error("Connection closed")]
    ConnectionClosed,
}

/// Result type alias using MirrorError.
pub type Result<T> = std::result::Result<T, MirrorError>;
