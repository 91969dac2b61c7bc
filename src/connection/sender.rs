//! The single outbound path of a connection.

use tracing::{debug, trace};

use crate::codec::{Encode, FrameCodec, FrameKind};
use crate::connection::State;
use crate::transport::Transport;

/// Outbound half of a connection: frame encoding, the plain byte path for
/// handshake data, and the close sequencing that goes with it.
///
/// The `Sender` owns the lifecycle [`State`], so it is also the handle
/// every callback receives: handlers may send, ping or close from inside
/// the dispatch loop without touching the rest of the connection.
///
/// Error diagnostics raised here (an unsupported frame kind, an invalid
/// outgoing frame) are queued rather than dispatched, because the error
/// callback may be the very handler currently running. The connection
/// drains the queue into the error callback as soon as the current call
/// or callback returns.
pub struct Sender<T, F> {
    transport: T,
    codec: F,
    state: State,
    version: u8,
    close_sent: bool,
    trace: bool,
    errors: Vec<String>,
    pending_close: Option<Vec<u8>>,
}

impl<T, F> Sender<T, F> {
    pub(crate) fn new(transport: T, codec: F, trace: bool) -> Self {
        Self {
            transport,
            codec,
            state: State::Connecting,
            version: 0,
            close_sent: false,
            trace,
            errors: Vec::new(),
            pending_close: None,
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> State {
        self.state
    }

    /// Whether the connection is open for application data.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state == State::Open
    }

    /// Negotiated protocol version; 0 until the handshake completes.
    #[must_use]
    pub fn version(&self) -> u8 {
        self.version
    }

    pub(crate) fn codec(&self) -> &F {
        &self.codec
    }

    pub(crate) fn set_version(&mut self, version: u8) {
        self.version = version;
    }

    pub(crate) fn set_state(&mut self, state: State) {
        self.state = state;
    }

    pub(crate) fn take_errors(&mut self) -> Vec<String> {
        std::mem::take(&mut self.errors)
    }

    pub(crate) fn take_pending_close(&mut self) -> Option<Vec<u8>> {
        self.pending_close.take()
    }

    /// Record the transition into `Closed` and shut the transport down.
    fn enter_closed(&mut self) {
        self.state = State::Closed;
        if self.pending_close.is_none() {
            self.pending_close = Some(Vec::new());
        }
    }
}

impl<T: Transport, F: FrameCodec> Sender<T, F> {
    /// Send application data as a frame of the given kind.
    ///
    /// Returns `true` when bytes were handed to the transport. Returns
    /// `false` when the kind is unsupported at the negotiated version
    /// (an error callback follows), when the codec decided no bytes need
    /// to be transmitted, or when the connection no longer accepts sends.
    pub fn send(&mut self, payload: &[u8], kind: FrameKind) -> bool {
        self.send_frame(payload, kind, None)
    }

    /// Send a text frame. Shorthand for [`send`](Self::send) with
    /// [`FrameKind::Text`].
    pub fn send_text(&mut self, text: &str) -> bool {
        self.send(text.as_bytes(), FrameKind::Text)
    }

    /// Send a binary frame.
    pub fn send_binary(&mut self, data: &[u8]) -> bool {
        self.send(data, FrameKind::Binary)
    }

    /// Send a ping probe.
    pub fn ping(&mut self, payload: &[u8]) -> bool {
        self.send(payload, FrameKind::Ping)
    }

    /// Send a pong, solicited or not.
    pub fn pong(&mut self, payload: &[u8]) -> bool {
        self.send(payload, FrameKind::Pong)
    }

    /// Close the connection.
    ///
    /// From `Open` this initiates the close handshake: a close frame
    /// carrying `code` and `reason` goes out and the method returns
    /// `false`, meaning the connection is not fully closed until the peer
    /// answers or the transport tears down. In every other state the
    /// close completes immediately and the method returns `true`. Calling
    /// close on an already closed connection is a no-op.
    pub fn close(&mut self, code: u16, reason: &[u8]) -> bool {
        self.close_with(Some(code), reason)
    }

    /// The close-sequencing walk shared by the public `close` and the
    /// dispatcher's close-frame echo (which passes the peer's payload
    /// verbatim, without re-encoding a code).
    pub(crate) fn close_with(&mut self, code: Option<u16>, reason: &[u8]) -> bool {
        match self.state {
            State::Open => {
                self.state = State::Closing;
                if self.send_frame(reason, FrameKind::Close, code) {
                    self.close_sent = true;
                    return false;
                }
                // the close frame was refused, nothing more will go out
                self.enter_closed();
                self.transport.close_after_writing();
                true
            }
            State::Closing => {
                if !self.close_sent && self.send_frame(reason, FrameKind::Close, code) {
                    self.close_sent = true;
                }
                self.enter_closed();
                self.transport.close_after_writing();
                true
            }
            State::Connecting => {
                self.enter_closed();
                self.transport.close_after_writing();
                true
            }
            State::Closed => true,
        }
    }

    /// Immediate teardown without a close-frame exchange: decode errors
    /// and transport teardown land here.
    pub(crate) fn abort(&mut self) {
        if self.state == State::Closed {
            return;
        }
        self.enter_closed();
        self.transport.close_after_writing();
    }

    pub(crate) fn send_frame(
        &mut self,
        payload: &[u8],
        kind: FrameKind,
        close_code: Option<u16>,
    ) -> bool {
        if !self.state.receives_frames() {
            return false;
        }
        match self.codec.encode(kind, payload, close_code, self.version) {
            Ok(Encode::Frame(bytes)) => self.write(&bytes),
            Ok(Encode::Skip) => false,
            Err(err) => {
                self.errors.push(err.to_string());
                false
            }
        }
    }

    /// Write bytes verbatim, bypassing the frame codec. Only the
    /// handshake driver uses this path.
    pub(crate) fn send_raw(&mut self, bytes: &[u8]) -> bool {
        self.write(bytes)
    }

    fn write(&mut self, bytes: &[u8]) -> bool {
        self.trace_wire("send", bytes);
        match self.transport.write(bytes) {
            Ok(()) => true,
            Err(err) => {
                // transport failures surface as teardown, not as onerror
                debug!(error = %err, "transport write failed");
                false
            }
        }
    }

    pub(crate) fn trace_wire(&self, direction: &'static str, data: &[u8]) {
        if !self.trace || self.state == State::Connecting {
            return;
        }
        trace!(target: "evws::wire", "{direction} {}", hex_dump(data));
    }
}

fn hex_dump(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len() * 4);
    for byte in data {
        out.push_str(&format!("\\x{byte:02x}"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_dump() {
        assert_eq!(hex_dump(&[0x00, 0x1f, 0xff]), "\\x00\\x1f\\xff");
        assert_eq!(hex_dump(&[]), "");
    }
}
