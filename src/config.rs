//! Session configuration.
//!
//! Every field has a default matching the device's expectations, so an
//! empty JSON object is a valid configuration.
//!
//! # Example
//!
//! ```
//! use pdmirror::MirrorConfig;
//! use std::time::Duration;
//!
//! let config = MirrorConfig::from_json(r#"{"keepalive_interval_ms": 500}"#).unwrap();
//! assert_eq!(config.keepalive_interval(), Duration::from_millis(500));
//! assert_eq!(config.serial.baud_rate, 115_200);
//! ```

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{MirrorError, Result};
use crate::screen::Palette;
use crate::transport::SerialConfig;

/// Default interval between keepalive pokes.
pub const DEFAULT_KEEPALIVE_INTERVAL_MS: u64 = 800;

/// Default timeout for a single command write.
pub const DEFAULT_WRITE_TIMEOUT_MS: u64 = 500;

/// Default timeout for a single transport read.
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 1000;

/// Default size of the reader's chunk buffer.
pub const DEFAULT_READ_BUFFER_SIZE: usize = 16 * 1024;

/// Configuration for a [`ConnectionSession`](crate::session::ConnectionSession).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MirrorConfig {
    /// Serial line parameters handed to a [`TransportOpener`](crate::transport::TransportOpener).
    pub serial: SerialConfig,
    /// Interval between keepalive pokes, measured from the previous poke.
    pub keepalive_interval_ms: u64,
    /// Timeout for a single command write.
    pub write_timeout_ms: u64,
    /// Timeout for a single read; elapsing means "no data yet".
    pub read_timeout_ms: u64,
    /// Size of the reader's chunk buffer.
    pub read_buffer_size: usize,
    /// Optional ceiling on announced payload length.
    pub max_payload: Option<u16>,
    /// Colours for set and clear bits.
    pub palette: Palette,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            serial: SerialConfig::default(),
            keepalive_interval_ms: DEFAULT_KEEPALIVE_INTERVAL_MS,
            write_timeout_ms: DEFAULT_WRITE_TIMEOUT_MS,
            read_timeout_ms: DEFAULT_READ_TIMEOUT_MS,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            max_payload: None,
            palette: Palette::default(),
        }
    }
}

impl MirrorConfig {
    /// Parse and validate a JSON configuration.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Reject values that would stall or spin the session tasks.
    pub fn validate(&self) -> Result<()> {
        if self.keepalive_interval_ms == 0 {
            return Err(MirrorError::Config(
                "keepalive_interval_ms must be positive".to_string(),
            ));
        }
        if self.write_timeout_ms == 0 {
            return Err(MirrorError::Config(
                "write_timeout_ms must be positive".to_string(),
            ));
        }
        if self.read_timeout_ms == 0 {
            return Err(MirrorError::Config(
                "read_timeout_ms must be positive".to_string(),
            ));
        }
        if self.read_buffer_size == 0 {
            return Err(MirrorError::Config(
                "read_buffer_size must be positive".to_string(),
            ));
        }
        self.serial.validate()
    }

    /// Keepalive interval as a `Duration`.
    #[inline]
    pub fn keepalive_interval(&self) -> Duration {
        Duration::from_millis(self.keepalive_interval_ms)
    }

    /// Write timeout as a `Duration`.
    #[inline]
    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    /// Read timeout as a `Duration`.
    #[inline]
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}
