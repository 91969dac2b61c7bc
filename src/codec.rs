//! Collaborator seams: frame and handshake codecs.
//!
//! The connection state machine does not hard-wire a protocol revision.
//! It takes the frame codec and the handshake codec as constructor-supplied
//! capabilities, so a connection can be driven against the bundled RFC 6455
//! implementation (see [`crate::protocol`]) or against a stand-in codec in
//! tests.

use crate::config::ConnectConfig;
use crate::error::{Error, Result};

/// Frame kinds the sender accepts from application code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum FrameKind {
    /// UTF-8 text payload. The default kind for application data.
    Text,
    /// Arbitrary binary payload.
    Binary,
    /// Keepalive probe; the peer answers with a pong.
    Ping,
    /// Answer to a ping, or an unsolicited heartbeat.
    Pong,
    /// Close handshake frame.
    Close,
}

impl FrameKind {
    /// Lowercase name, as used in diagnostics.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            FrameKind::Text => "text",
            FrameKind::Binary => "binary",
            FrameKind::Ping => "ping",
            FrameKind::Pong => "pong",
            FrameKind::Close => "close",
        }
    }

    /// Whether this is a control frame kind.
    #[must_use]
    pub const fn is_control(self) -> bool {
        matches!(self, FrameKind::Ping | FrameKind::Pong | FrameKind::Close)
    }
}

impl std::fmt::Display for FrameKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Tag handed to the message callback alongside the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// The payload arrived in a text frame.
    Text,
    /// The payload arrived in a binary frame.
    Binary,
}

/// One decoded inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundFrame {
    /// Frame kind; never `Text`/`Binary` fragments, reassembly happens
    /// inside the assembler.
    pub kind: FrameKind,
    /// Unmasked payload bytes.
    pub payload: Vec<u8>,
}

/// Outcome of encoding an outgoing frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Encode {
    /// Wire bytes ready for the transport.
    Frame(Vec<u8>),
    /// The frame is valid but nothing needs to be transmitted.
    Skip,
}

/// Builds outgoing frames and data-phase assemblers.
pub trait FrameCodec {
    /// The inbound byte-stream assembler this codec produces.
    type Assembler: FrameAssembler;

    /// Encode `payload` as a frame of the given kind for `version`.
    ///
    /// `close_code` is prepended to the payload of close frames when
    /// present; it is ignored for every other kind.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedFrameKind`] when the negotiated version
    /// cannot express this kind. Other errors describe invalid outgoing
    /// frames (e.g. an oversized control payload).
    fn encode(
        &mut self,
        kind: FrameKind,
        payload: &[u8],
        close_code: Option<u16>,
        version: u8,
    ) -> Result<Encode>;

    /// Construct the inbound assembler bound to the negotiated version.
    fn assembler(&self, version: u8) -> Self::Assembler;
}

/// Accumulates raw inbound bytes and yields decoded frames.
///
/// Each `extend` makes a finite batch of frames available through `next`;
/// a frame is yielded only once it is fully contained in the buffered
/// bytes, and yielded frames are never replayed.
pub trait FrameAssembler {
    /// Feed raw bytes received from the transport.
    fn extend(&mut self, data: &[u8]);

    /// Pull the next complete frame, if one is buffered.
    fn next(&mut self) -> Option<InboundFrame>;

    /// Terminal decode error, set once the byte stream turned out to be
    /// malformed. No further frames are yielded after this is `Some`.
    fn error(&self) -> Option<&Error>;
}

/// Builds handshake sessions from connection configuration.
pub trait HandshakeCodec {
    /// The per-connection session type.
    type Session: HandshakeSession;

    /// Create a session for one opening handshake.
    ///
    /// # Errors
    ///
    /// Fails when the configuration requests something this codec cannot
    /// negotiate (e.g. an unknown protocol version).
    fn session(&self, config: &ConnectConfig) -> Result<Self::Session>;
}

/// One opening-handshake exchange.
///
/// Owned exclusively by the connection while it is connecting and dropped
/// once the connection opens or fails.
pub trait HandshakeSession {
    /// The upgrade request to write once the transport reports ready.
    ///
    /// # Errors
    ///
    /// Fails when a request cannot be built from the configuration.
    fn request(&self) -> Result<Vec<u8>>;

    /// Feed bytes received while connecting.
    fn extend(&mut self, data: &[u8]);

    /// Whether the response has been fully received.
    fn finished(&self) -> bool;

    /// Whether the completed handshake validated. Meaningful only after
    /// [`finished`](Self::finished) returns `true`.
    fn valid(&self) -> bool;

    /// The negotiated protocol version.
    fn version(&self) -> u8;

    /// Diagnostic message for an invalid handshake.
    fn error(&self) -> Option<&str>;

    /// Bytes received beyond the handshake boundary, surrendered once.
    ///
    /// These already belong to the data phase and must be fed to the
    /// frame assembler immediately after the connection opens.
    fn take_leftovers(&mut self) -> Option<Vec<u8>>;

    /// Bytes to echo back before the data phase, for handshake variants
    /// that require a response. `None` for RFC 6455.
    fn response(&self) -> Option<Vec<u8>>;
}

/// Convenience used by default-codec diagnostics.
pub(crate) fn unsupported(kind: FrameKind, version: u8) -> Error {
    Error::UnsupportedFrameKind {
        kind: kind.name(),
        version,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_kind_names() {
        assert_eq!(FrameKind::Text.name(), "text");
        assert_eq!(FrameKind::Close.to_string(), "close");
    }

    #[test]
    fn test_frame_kind_control() {
        assert!(FrameKind::Ping.is_control());
        assert!(FrameKind::Pong.is_control());
        assert!(FrameKind::Close.is_control());
        assert!(!FrameKind::Text.is_control());
        assert!(!FrameKind::Binary.is_control());
    }

    #[test]
    fn test_unsupported_diagnostic() {
        let err = unsupported(FrameKind::Ping, 76);
        assert!(err.to_string().contains("'ping'"));
        assert!(err.to_string().contains("76"));
    }
}
