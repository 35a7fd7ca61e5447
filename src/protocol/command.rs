//! Outbound text commands.
//!
//! Commands are newline-terminated ASCII lines. The device sends no reply;
//! a command counts as delivered when the transport write succeeds.

use std::fmt;

/// A command the host sends to the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Start streaming the screen.
    StreamEnable,
    /// Stop streaming the screen.
    StreamDisable,
    /// Keep an active stream alive.
    StreamPoke,
}

impl Command {
    /// The exact bytes written to the transport.
    pub fn as_bytes(&self) -> &'static [u8] {
        match self {
            Self::StreamEnable => b"stream enable\n",
            Self::StreamDisable => b"stream disable\n",
            Self::StreamPoke => b"stream poke\n",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let line = match self {
            Self::StreamEnable => "stream enable",
            Self::StreamDisable => "stream disable",
            Self::StreamPoke => "stream poke",
        };
        f.write_str(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_bytes() {
        assert_eq!(Command::StreamEnable.as_bytes(), b"stream enable\n");
        assert_eq!(Command::StreamDisable.as_bytes(), b"stream disable\n");
        assert_eq!(Command::StreamPoke.as_bytes(), b"stream poke\n");
    }

    #[test]
    fn test_command_display_drops_newline() {
        assert_eq!(Command::StreamPoke.to_string(), "stream poke");
    }
}
