//! Tokio reactor driver.
//!
//! The driver owns the socket half of a connection: it connects, performs
//! the optional TLS step, pumps inbound bytes into the state machine and
//! drains queued writes to the wire. Everything for one connection runs
//! on a single task, so callbacks fire sequentially and nothing needs a
//! lock.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::debug;

use crate::codec::{FrameCodec, HandshakeCodec};
use crate::config::ConnectConfig;
use crate::connection::Connection;
use crate::error::{Error, Result};
use crate::protocol::{Rfc6455Codec, Rfc6455Handshake};
use crate::transport::Transport;

enum Cmd {
    Write(Vec<u8>),
    Shutdown,
}

/// Write side handed to the connection: bytes are queued to the driver
/// task, which owns the socket and applies them in order.
pub struct QueuedTransport {
    tx: mpsc::UnboundedSender<Cmd>,
}

impl Transport for QueuedTransport {
    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        self.tx
            .send(Cmd::Write(bytes.to_vec()))
            .map_err(|_| Error::Io("write queue closed".into()))
    }

    fn close_after_writing(&mut self) {
        let _ = self.tx.send(Cmd::Shutdown);
    }
}

/// A connection wired with the bundled RFC 6455 codecs and a queued
/// transport.
pub type Client = Connection<QueuedTransport, Rfc6455Codec, Rfc6455Handshake>;

/// Build a [`Client`] and the [`Driver`] that will run it.
///
/// Register callbacks on the returned connection, then hand it to
/// [`Driver::run`].
///
/// # Errors
///
/// Fails when the handshake codec rejects the configuration.
pub fn client(config: ConnectConfig) -> Result<(Client, Driver)> {
    let frame_codec = Rfc6455Codec::new(config.limits.clone());
    with_codecs(config, frame_codec, &Rfc6455Handshake)
}

/// Build a connection with caller-supplied codecs and the [`Driver`] that
/// will run it.
///
/// # Errors
///
/// Fails when the handshake codec rejects the configuration.
pub fn with_codecs<F, H>(
    config: ConnectConfig,
    frame_codec: F,
    handshake_codec: &H,
) -> Result<(Connection<QueuedTransport, F, H>, Driver)>
where
    F: FrameCodec,
    H: HandshakeCodec,
{
    let (tx, rx) = mpsc::unbounded_channel();
    let connection = Connection::new(QueuedTransport { tx }, frame_codec, handshake_codec, config)?;
    Ok((connection, Driver { rx }))
}

/// The reactor task for one connection.
pub struct Driver {
    rx: mpsc::UnboundedReceiver<Cmd>,
}

impl Driver {
    /// Run the connection to completion.
    ///
    /// Resolves the target from the connection's configuration, connects,
    /// performs TLS when the configuration asks for it, then pumps until
    /// the transport tears down. The connection's `unbind` fires exactly
    /// once, from here.
    ///
    /// # Errors
    ///
    /// Connect, TLS and socket I/O failures; the connection itself is
    /// torn down before an error is returned.
    pub async fn run<F, H>(
        self,
        connection: &mut Connection<QueuedTransport, F, H>,
    ) -> Result<()>
    where
        F: FrameCodec,
        H: HandshakeCodec,
    {
        let host = connection.config().host.clone();
        let port = connection.config().effective_port();
        let secure = connection.config().secure;

        debug!(%host, port, secure, "connecting");
        let stream = match TcpStream::connect((host.as_str(), port)).await {
            Ok(stream) => stream,
            Err(err) => {
                connection.unbind();
                return Err(Error::Io(err.to_string()));
            }
        };

        if secure {
            #[cfg(feature = "tls-rustls")]
            {
                let stream = match crate::tls::connect(&host, stream).await {
                    Ok(stream) => stream,
                    Err(err) => {
                        connection.unbind();
                        return Err(err);
                    }
                };
                connection.connection_completed();
                connection.tls_handshake_completed();
                return self.pump(stream, connection).await;
            }
            #[cfg(not(feature = "tls-rustls"))]
            {
                connection.unbind();
                return Err(Error::Tls(
                    "secure connection requested but the tls-rustls feature is disabled".into(),
                ));
            }
        }

        connection.connection_completed();
        self.pump(stream, connection).await
    }

    async fn pump<S, F, H>(
        mut self,
        mut stream: S,
        connection: &mut Connection<QueuedTransport, F, H>,
    ) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin,
        F: FrameCodec,
        H: HandshakeCodec,
    {
        let mut buf = vec![0u8; 8192];
        loop {
            tokio::select! {
                cmd = self.rx.recv() => match cmd {
                    Some(Cmd::Write(bytes)) => {
                        if let Err(err) = stream.write_all(&bytes).await {
                            connection.unbind();
                            return Err(Error::Io(err.to_string()));
                        }
                    }
                    Some(Cmd::Shutdown) | None => {
                        let _ = stream.shutdown().await;
                        connection.unbind();
                        return Ok(());
                    }
                },
                read = stream.read(&mut buf) => match read {
                    Ok(0) => {
                        connection.unbind();
                        return Ok(());
                    }
                    Ok(n) => connection.receive_data(&buf[..n]),
                    Err(err) => {
                        connection.unbind();
                        return Err(Error::Io(err.to_string()));
                    }
                },
            }
        }
    }
}
