//! # evws - Event-driven WebSocket Client Connection Driver
//!
//! `evws` drives one WebSocket client connection end to end on a
//! single-threaded reactor: the HTTP upgrade handshake, the open data
//! phase with frame dispatch to per-event callbacks, and a shutdown
//! sequence symmetric with the protocol's close handshake.
//!
//! ## Design
//!
//! - **Callback-based** - register at most one handler per event kind
//!   (`open`, `close`, `error`, `message`, `ping`, `pong`); handlers run
//!   synchronously on the reactor thread and receive a [`Sender`] to
//!   answer or close with
//! - **Pluggable codecs** - the frame codec and handshake codec are
//!   constructor-supplied capabilities; RFC 6455 implementations are
//!   bundled in [`protocol`]
//! - **Reactor-agnostic core** - the state machine consumes plain events
//!   (`connection_completed`, `receive_data`, `unbind`); a tokio driver
//!   ships behind the `async-tokio` feature, TLS behind `tls-rustls`
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use evws::ConnectConfig;
//!
//! let config = ConnectConfig::from_uri("ws://0.0.0.0:8080/")?;
//! let (mut conn, driver) = evws::driver::client(config)?;
//!
//! conn.on_open(|sender| {
//!     sender.send_text("data");
//! });
//! conn.on_message(|sender, payload, _kind| {
//!     sender.send_text(&format!("Pong: {}", String::from_utf8_lossy(payload)));
//! });
//!
//! driver.run(&mut conn).await?;
//! ```

pub mod callbacks;
pub mod codec;
pub mod config;
pub mod connection;
pub mod error;
pub mod protocol;
pub mod transport;

#[cfg(feature = "async-tokio")]
pub mod driver;

#[cfg(feature = "tls-rustls")]
pub mod tls;

pub use callbacks::Callbacks;
pub use codec::{
    Encode, FrameAssembler, FrameCodec, FrameKind, HandshakeCodec, HandshakeSession, InboundFrame,
    MessageKind,
};
pub use config::{ConnectConfig, Limits};
pub use connection::{Connection, Sender, State};
pub use error::{Error, Result};
pub use protocol::{IncomingFrames, Rfc6455Codec, Rfc6455Handshake, compute_accept_key};
pub use transport::Transport;

#[cfg(feature = "async-tokio")]
pub use driver::{Client, Driver, QueuedTransport, client};

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_send<T: Send>() {}

    #[test]
    fn test_vocabulary_types_are_send() {
        assert_send::<Error>();
        assert_send::<ConnectConfig>();
        assert_send::<Limits>();
        assert_send::<State>();
        assert_send::<FrameKind>();
        assert_send::<MessageKind>();
        assert_send::<InboundFrame>();
        assert_send::<Encode>();
    }
}
