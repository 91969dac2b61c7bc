//! The per-connection state machine.

use tracing::debug;

use crate::callbacks::Callbacks;
use crate::codec::{FrameAssembler, FrameCodec, FrameKind, HandshakeCodec, HandshakeSession, MessageKind};
use crate::config::ConnectConfig;
use crate::connection::{Sender, State};
use crate::error::Result;
use crate::transport::Transport;

/// One WebSocket client connection, end to end.
///
/// A `Connection` models exactly one TCP flow. It is created in the
/// `Connecting` state together with its handshake session; whatever
/// drives the socket (see [`crate::driver`] for the bundled tokio
/// reactor) feeds it four events on a single thread:
///
/// - [`connection_completed`](Self::connection_completed) once TCP is up,
/// - [`tls_handshake_completed`](Self::tls_handshake_completed) once TLS
///   is up (secure connections only),
/// - [`receive_data`](Self::receive_data) for every inbound byte chunk,
/// - [`unbind`](Self::unbind) exactly once on teardown.
///
/// Decoded frames are dispatched to the registered callbacks in arrival
/// order; all callbacks run synchronously on the caller's thread.
///
/// ## Example
///
/// ```rust,ignore
/// use evws::{ConnectConfig, FrameKind};
///
/// let config = ConnectConfig::from_uri("ws://echo.example.com/chat")?;
/// let (mut conn, driver) = evws::driver::client(config)?;
///
/// conn.on_open(|sender| {
///     sender.send_text("hello");
/// });
/// conn.on_message(|sender, payload, _kind| {
///     sender.close(1000, b"done");
/// });
///
/// driver.run(&mut conn).await?;
/// ```
pub struct Connection<T, F: FrameCodec, H: HandshakeCodec> {
    config: ConnectConfig,
    sender: Sender<T, F>,
    handshake: Option<H::Session>,
    assembler: Option<F::Assembler>,
    callbacks: Callbacks<T, F>,
    close_fired: bool,
}

impl<T, F, H> Connection<T, F, H>
where
    T: Transport,
    F: FrameCodec,
    H: HandshakeCodec,
{
    /// Create a connection in the `Connecting` state.
    ///
    /// The handshake session is created here, in the same step; its
    /// upgrade request goes out once the transport reports ready.
    ///
    /// # Errors
    ///
    /// Fails when the handshake codec rejects the configuration.
    pub fn new(transport: T, frame_codec: F, handshake_codec: &H, config: ConnectConfig) -> Result<Self> {
        let handshake = handshake_codec.session(&config)?;
        let trace = config.trace;
        Ok(Self {
            config,
            sender: Sender::new(transport, frame_codec, trace),
            handshake: Some(handshake),
            assembler: None,
            callbacks: Callbacks::new(),
            close_fired: false,
        })
    }

    /// The configuration this connection was created with.
    #[must_use]
    pub fn config(&self) -> &ConnectConfig {
        &self.config
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> State {
        self.sender.state()
    }

    /// Whether the connection is open for application data.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.sender.is_open()
    }

    // ------------------------------------------------------------------
    // Callback registration. One slot per event kind, last one wins.
    // ------------------------------------------------------------------

    /// Called once when the handshake completes and the connection opens.
    pub fn on_open(&mut self, handler: impl FnMut(&mut Sender<T, F>) + 'static) {
        self.callbacks.set_open(handler);
    }

    /// Called once when the connection closes, with the peer's close
    /// payload, or an empty payload on abrupt teardown.
    pub fn on_close(&mut self, handler: impl FnMut(&mut Sender<T, F>, &[u8]) + 'static) {
        self.callbacks.set_close(handler);
    }

    /// Called with a diagnostic message on handshake failure or a
    /// refused send.
    pub fn on_error(&mut self, handler: impl FnMut(&mut Sender<T, F>, &str) + 'static) {
        self.callbacks.set_error(handler);
    }

    /// Called for every text or binary message, with a tag telling the
    /// two apart.
    pub fn on_message(
        &mut self,
        handler: impl FnMut(&mut Sender<T, F>, &[u8], MessageKind) + 'static,
    ) {
        self.callbacks.set_message(handler);
    }

    /// Called for every ping, after the automatic pong reply went out.
    pub fn on_ping(&mut self, handler: impl FnMut(&mut Sender<T, F>, &[u8]) + 'static) {
        self.callbacks.set_ping(handler);
    }

    /// Called for every pong.
    pub fn on_pong(&mut self, handler: impl FnMut(&mut Sender<T, F>, &[u8]) + 'static) {
        self.callbacks.set_pong(handler);
    }

    // ------------------------------------------------------------------
    // Send surface, forwarded to the sender.
    // ------------------------------------------------------------------

    /// Send application data. See [`Sender::send`].
    pub fn send(&mut self, payload: &[u8], kind: FrameKind) -> bool {
        let accepted = self.sender.send(payload, kind);
        self.flush_events();
        accepted
    }

    /// Send a text frame.
    pub fn send_text(&mut self, text: &str) -> bool {
        self.send(text.as_bytes(), FrameKind::Text)
    }

    /// Send a binary frame.
    pub fn send_binary(&mut self, data: &[u8]) -> bool {
        self.send(data, FrameKind::Binary)
    }

    /// Send a ping probe. See [`Sender::ping`].
    pub fn ping(&mut self, payload: &[u8]) -> bool {
        let accepted = self.sender.ping(payload);
        self.flush_events();
        accepted
    }

    /// Send a pong. See [`Sender::pong`].
    pub fn pong(&mut self, payload: &[u8]) -> bool {
        let accepted = self.sender.pong(payload);
        self.flush_events();
        accepted
    }

    /// Close the connection. See [`Sender::close`] for the sequencing.
    pub fn close(&mut self, code: u16, reason: &[u8]) -> bool {
        let closed = self.sender.close(code, reason);
        self.flush_events();
        closed
    }

    // ------------------------------------------------------------------
    // Reactor surface.
    // ------------------------------------------------------------------

    /// The transport established the TCP connection.
    ///
    /// For plain connections the upgrade request goes out now. Secure
    /// connections hold it back until
    /// [`tls_handshake_completed`](Self::tls_handshake_completed).
    pub fn connection_completed(&mut self) {
        if self.config.secure {
            debug!(host = %self.config.host, "tcp established, waiting for tls");
            return;
        }
        self.write_handshake_request();
    }

    /// The transport finished the TLS handshake.
    pub fn tls_handshake_completed(&mut self) {
        self.write_handshake_request();
    }

    /// Inbound bytes from the transport, in arrival order.
    pub fn receive_data(&mut self, data: &[u8]) {
        self.sender.trace_wire("recv", data);
        match self.sender.state() {
            State::Connecting => self.handle_connecting(data),
            State::Open | State::Closing => self.handle_frames(data),
            State::Closed => {}
        }
        self.flush_events();
    }

    /// The transport tore down.
    ///
    /// Idempotent: the first notification closes the connection and fires
    /// the close callback with an empty payload (unless a close callback
    /// already fired); later notifications do nothing.
    pub fn unbind(&mut self) {
        if self.sender.state() == State::Closed {
            self.flush_events();
            return;
        }
        debug!(host = %self.config.host, "transport teardown");
        self.sender.abort();
        self.flush_events();
    }

    // ------------------------------------------------------------------
    // Handshake driver: owns the Connecting phase.
    // ------------------------------------------------------------------

    fn write_handshake_request(&mut self) {
        let request = match self.handshake.as_ref() {
            Some(session) => session.request(),
            None => return,
        };
        match request {
            Ok(bytes) => {
                debug!(host = %self.config.host, "sending upgrade request");
                self.sender.send_raw(&bytes);
            }
            Err(err) => self.fail_handshake(&err.to_string()),
        }
    }

    fn handle_connecting(&mut self, data: &[u8]) {
        let finished = match self.handshake.as_mut() {
            Some(session) => {
                session.extend(data);
                session.finished()
            }
            None => return,
        };
        if !finished {
            return;
        }

        let Some(mut session) = self.handshake.take() else {
            return;
        };

        if !session.valid() {
            let message = session
                .error()
                .unwrap_or("handshake validation failed")
                .to_string();
            self.fail_handshake(&message);
            return;
        }

        // some handshake variants must echo bytes back before data flows
        if let Some(echo) = session.response() {
            self.sender.send_raw(&echo);
        }

        let version = session.version();
        self.assembler = Some(self.sender.codec().assembler(version));
        self.sender.set_version(version);
        self.sender.set_state(State::Open);
        debug!(host = %self.config.host, version, "connection open");
        self.callbacks.open(&mut self.sender);
        self.flush_events();

        // bytes past the handshake boundary already belong to the data
        // phase and must not wait for the next chunk
        if let Some(leftovers) = session.take_leftovers() {
            if !leftovers.is_empty() && self.sender.state().receives_frames() {
                self.handle_frames(&leftovers);
            }
        }
    }

    fn fail_handshake(&mut self, message: &str) {
        debug!(host = %self.config.host, %message, "handshake failed");
        self.callbacks.error(&mut self.sender, message);
        self.sender.close_with(None, &[]);
        self.fire_close(&[]);
        self.flush_events();
    }

    // ------------------------------------------------------------------
    // Frame dispatcher: owns the Open and Closing phases.
    // ------------------------------------------------------------------

    fn handle_frames(&mut self, data: &[u8]) {
        let Some(assembler) = self.assembler.as_mut() else {
            return;
        };
        assembler.extend(data);

        while self.sender.state().receives_frames() {
            let Some(frame) = self.assembler.as_mut().and_then(FrameAssembler::next) else {
                break;
            };
            match frame.kind {
                FrameKind::Close => {
                    self.sender.set_state(State::Closing);
                    self.sender.close_with(None, &frame.payload);
                    self.fire_close(&frame.payload);
                }
                FrameKind::Ping => {
                    // the reply goes out before the callback runs
                    self.sender.pong(&frame.payload);
                    self.callbacks.ping(&mut self.sender, &frame.payload);
                }
                FrameKind::Pong => self.callbacks.pong(&mut self.sender, &frame.payload),
                FrameKind::Text => {
                    self.callbacks
                        .message(&mut self.sender, &frame.payload, MessageKind::Text);
                }
                FrameKind::Binary => {
                    self.callbacks
                        .message(&mut self.sender, &frame.payload, MessageKind::Binary);
                }
            }
            self.flush_events();
        }

        let decode_error = self
            .assembler
            .as_ref()
            .and_then(FrameAssembler::error)
            .cloned();
        if let Some(err) = decode_error {
            // a half-decoded stream cannot be resynchronized
            debug!(error = %err, "frame decode failed, tearing down");
            self.sender.abort();
            self.flush_events();
        }
    }

    // ------------------------------------------------------------------
    // Event plumbing.
    // ------------------------------------------------------------------

    /// Drain sender-side events into callbacks: queued error diagnostics
    /// first, then at most one close notification per connection.
    fn flush_events(&mut self) {
        for message in self.sender.take_errors() {
            self.callbacks.error(&mut self.sender, &message);
        }
        if let Some(payload) = self.sender.take_pending_close() {
            self.fire_close(&payload);
        }
    }

    fn fire_close(&mut self, payload: &[u8]) {
        if self.close_fired {
            return;
        }
        self.close_fired = true;
        self.callbacks.close(&mut self.sender, payload);
    }
}
