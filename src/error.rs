//! Error types for the connection driver and its default codecs.

use thiserror::Error;

/// Result type alias for connection operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the connection driver.
///
/// Handshake and unsupported-operation failures reach the application
/// through the error callback; frame decode errors tear the connection
/// down without an error callback. Nothing here is fatal to the hosting
/// process.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// The server's handshake response failed validation.
    #[error("Invalid handshake: {0}")]
    InvalidHandshake(String),

    /// The negotiated protocol version cannot express this frame kind.
    #[error("Frame kind '{kind}' is not supported in protocol version {version}")]
    UnsupportedFrameKind {
        /// Name of the refused frame kind.
        kind: &'static str,
        /// The version negotiated during the handshake.
        version: u8,
    },

    /// Malformed inbound frame.
    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    /// The peer violated a protocol rule.
    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),

    /// Invalid UTF-8 in a text frame.
    #[error("Invalid UTF-8 in text frame")]
    InvalidUtf8,

    /// Frame payload exceeds the configured maximum.
    #[error("Frame too large: {size} bytes (max: {max})")]
    FrameTooLarge {
        /// Actual frame size.
        size: usize,
        /// Maximum allowed size.
        max: usize,
    },

    /// Reassembled message exceeds the configured maximum.
    #[error("Message too large: {size} bytes (max: {max})")]
    MessageTooLarge {
        /// Actual message size.
        size: usize,
        /// Maximum allowed size.
        max: usize,
    },

    /// Too many fragments in a single message.
    #[error("Too many fragments: {count} (max: {max})")]
    TooManyFragments {
        /// Actual fragment count.
        count: usize,
        /// Maximum allowed fragments.
        max: usize,
    },

    /// Handshake response exceeds the configured maximum.
    #[error("Handshake too large: {size} bytes (max: {max})")]
    HandshakeTooLarge {
        /// Bytes buffered so far.
        size: usize,
        /// Maximum allowed size.
        max: usize,
    },

    /// Reserved opcode received.
    #[error("Reserved opcode: {0:#x}")]
    ReservedOpcode(u8),

    /// Server frames must arrive unmasked.
    #[error("Server frame must not be masked")]
    MaskedServerFrame,

    /// Control frames cannot be fragmented.
    #[error("Control frames cannot be fragmented")]
    FragmentedControlFrame,

    /// Control frame payload above the 125-byte ceiling.
    #[error("Control frame payload too large: {0} bytes (max: 125)")]
    ControlFrameTooLarge(usize),

    /// The connect URI could not be decomposed into scheme/host/port.
    #[error("Invalid URI: {0}")]
    InvalidUri(String),

    /// I/O error from the transport.
    #[error("I/O error: {0}")]
    Io(String),

    /// TLS setup or handshake failure.
    #[error("TLS error: {0}")]
    Tls(String),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}
