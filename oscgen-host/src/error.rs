//! Error types for the host side of the link.

use oscgen_protocol::{CommandError, FrameError};
use thiserror::Error;

/// Main error type for host operations.
#[derive(Debug, Error)]
pub enum HostError {
    /// I/O error on the serial port or a file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serial port could not be opened or enumerated.
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// Configuration file did not parse.
    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),

    /// Outgoing frame could not be built.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// Command payload could not be built or a reply did not parse.
    #[error("command error: {0}")]
    Command(#[from] CommandError),

    /// A setting cannot be expressed on the wire.
    #[error("invalid setting: {0}")]
    InvalidSetting(String),

    /// No reply arrived in time.
    #[error("timed out waiting for reply 0x{0:02x}")]
    Timeout(u8),

    /// The receiver thread panicked.
    #[error("receiver thread panicked")]
    ReceiverPanicked,
}

/// Result type alias using HostError.
pub type Result<T> = std::result::Result<T, HostError>;
