//! Serial line parameters and the transport seam.
//!
//! Opening the USB-serial device is platform plumbing that lives outside
//! this crate. The session only needs a byte stream; a [`TransportOpener`]
//! is how callers let the session open one on demand.

use std::future::Future;

use serde::Deserialize;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::error::{MirrorError, Result};

/// Parity bit setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Parity {
    /// No parity bit.
    #[default]
    None,
    /// Odd parity.
    Odd,
    /// Even parity.
    Even,
}

/// Serial line configuration. Defaults to 115200 8N1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SerialConfig {
    /// Line speed in baud.
    pub baud_rate: u32,
    /// Data bits per character (5-8).
    pub data_bits: u8,
    /// Stop bits (1 or 2).
    pub stop_bits: u8,
    /// Parity setting.
    pub parity: Parity,
}

impl SerialConfig {
    /// Check the line parameters are representable on a UART.
    pub fn validate(&self) -> Result<()> {
        if self.baud_rate == 0 {
            return Err(MirrorError::Config("baud_rate must be positive".to_string()));
        }
        if !(5..=8).contains(&self.data_bits) {
            return Err(MirrorError::Config(format!(
                "data_bits must be 5-8, got {}",
                self.data_bits
            )));
        }
        if !matches!(self.stop_bits, 1 | 2) {
            return Err(MirrorError::Config(format!(
                "stop_bits must be 1 or 2, got {}",
                self.stop_bits
            )));
        }
        Ok(())
    }
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud_rate: 115_200,
            data_bits: 8,
            stop_bits: 1,
            parity: Parity::None,
        }
    }
}

/// A full-duplex byte stream to the device.
///
/// Anything async-readable and -writable qualifies: a serial port wrapper,
/// a socket, or `tokio::io::duplex` in tests.
pub trait Transport: AsyncRead + AsyncWrite + Send + 'static {}

impl<T> Transport for T where T: AsyncRead + AsyncWrite + Send + 'static {}

/// Opens and configures a transport on behalf of a session.
pub trait TransportOpener {
    /// The opened stream.
    type Stream: Transport;

    /// Open the device with the given line configuration.
    fn open(
        &self,
        config: &SerialConfig,
    ) -> impl Future<Output = std::io::Result<Self::Stream>> + Send;
}
