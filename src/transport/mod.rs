//! Transport module - the byte stream to the device and its line settings.

mod serial;

pub use serial::{Parity, SerialConfig, Transport, TransportOpener};
