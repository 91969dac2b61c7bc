//! TLS support for secure (`wss`) connections, backed by rustls.

use std::sync::Arc;

use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tokio_rustls::client::TlsStream;
use tokio_rustls::rustls::pki_types::ServerName;
use tokio_rustls::rustls::{ClientConfig, RootCertStore};

use crate::error::{Error, Result};

/// Client configuration trusting the bundled webpki roots.
#[must_use]
pub fn client_config() -> Arc<ClientConfig> {
    let roots = RootCertStore::from_iter(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    Arc::new(
        ClientConfig::builder()
            .with_root_certificates(roots)
            .with_no_client_auth(),
    )
}

/// Wrap an established TCP stream in a TLS session for `host`.
///
/// # Errors
///
/// Fails when `host` is not a valid server name or the TLS handshake is
/// rejected.
pub async fn connect(host: &str, stream: TcpStream) -> Result<TlsStream<TcpStream>> {
    let name = ServerName::try_from(host.to_string()).map_err(|e| Error::Tls(e.to_string()))?;
    let connector = TlsConnector::from(client_config());
    connector
        .connect(name, stream)
        .await
        .map_err(|e| Error::Tls(e.to_string()))
}
