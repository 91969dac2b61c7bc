//! The bundled handshake codec: RFC 6455 client-side HTTP upgrade.

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use sha1::{Digest, Sha1};
use std::collections::HashMap;

use crate::codec::{HandshakeCodec, HandshakeSession};
use crate::config::ConnectConfig;
use crate::error::{Error, Result};

/// GUID mixed into the accept-key digest (RFC 6455 §1.3).
pub const WS_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// Compute the `Sec-WebSocket-Accept` value for a request key:
/// `Base64(SHA-1(key + GUID))`.
///
/// # Example
///
/// ```
/// use evws::protocol::handshake::compute_accept_key;
///
/// let accept = compute_accept_key("dGhlIHNhbXBsZSBub25jZQ==");
/// assert_eq!(accept, "s3pPLMBiTxaQ9kYGzzhZRbK+xOo=");
/// ```
#[must_use]
pub fn compute_accept_key(key: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(key.as_bytes());
    hasher.update(WS_GUID.as_bytes());
    BASE64.encode(hasher.finalize())
}

fn generate_key() -> Result<String> {
    let mut nonce = [0u8; 16];
    getrandom::getrandom(&mut nonce).map_err(|e| Error::Io(e.to_string()))?;
    Ok(BASE64.encode(nonce))
}

/// Builds [`Rfc6455Session`]s. Stateless; one value can serve any number
/// of connections.
#[derive(Debug, Clone, Copy, Default)]
pub struct Rfc6455Handshake;

impl HandshakeCodec for Rfc6455Handshake {
    type Session = Rfc6455Session;

    fn session(&self, config: &ConnectConfig) -> Result<Rfc6455Session> {
        if config.version != 13 {
            return Err(Error::InvalidHandshake(format!(
                "cannot negotiate protocol version {} (this codec speaks 13)",
                config.version
            )));
        }
        Rfc6455Session::new(config)
    }
}

#[derive(Debug)]
enum Verdict {
    Valid,
    Invalid(String),
}

/// One client handshake exchange: upgrade request out, response
/// validated in, leftover data-phase bytes captured.
pub struct Rfc6455Session {
    request: Vec<u8>,
    key: String,
    buffer: Vec<u8>,
    max_size: usize,
    verdict: Option<Verdict>,
    leftovers: Option<Vec<u8>>,
}

impl Rfc6455Session {
    fn new(config: &ConnectConfig) -> Result<Self> {
        let key = generate_key()?;

        let host = if config.is_default_port() {
            config.host.clone()
        } else {
            format!("{}:{}", config.host, config.effective_port())
        };

        let mut request = format!(
            "GET {} HTTP/1.1\r\n\
             Host: {}\r\n\
             Upgrade: websocket\r\n\
             Connection: Upgrade\r\n\
             Sec-WebSocket-Key: {}\r\n\
             Sec-WebSocket-Version: 13\r\n",
            config.path, host, key
        );
        for (name, value) in &config.headers {
            request.push_str(name);
            request.push_str(": ");
            request.push_str(value);
            request.push_str("\r\n");
        }
        request.push_str("\r\n");

        Ok(Self {
            request: request.into_bytes(),
            key,
            buffer: Vec::new(),
            max_size: config.limits.max_handshake_size,
            verdict: None,
            leftovers: None,
        })
    }

    fn try_complete(&mut self) {
        if self.verdict.is_some() {
            return;
        }

        let Some(boundary) = find_terminator(&self.buffer) else {
            if self.buffer.len() > self.max_size {
                let err = Error::HandshakeTooLarge {
                    size: self.buffer.len(),
                    max: self.max_size,
                };
                self.verdict = Some(Verdict::Invalid(err.to_string()));
            }
            return;
        };

        let verdict = match validate_response(&self.buffer[..boundary], &self.key) {
            Ok(()) => Verdict::Valid,
            Err(err) => Verdict::Invalid(err.to_string()),
        };

        if boundary < self.buffer.len() {
            self.leftovers = Some(self.buffer.split_off(boundary));
        }
        self.verdict = Some(verdict);
    }
}

/// Position just past the `\r\n\r\n` header terminator, if present.
fn find_terminator(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n").map(|i| i + 4)
}

fn validate_response(head: &[u8], key: &str) -> Result<()> {
    let text = std::str::from_utf8(head)
        .map_err(|_| Error::InvalidHandshake("response is not valid UTF-8".into()))?;

    let mut lines = text.lines();
    let status_line = lines
        .next()
        .ok_or_else(|| Error::InvalidHandshake("empty response".into()))?;
    if !status_line.starts_with("HTTP/1.1 101") {
        return Err(Error::InvalidHandshake(format!(
            "expected 101 status, got: {status_line}"
        )));
    }

    let mut headers: HashMap<String, String> = HashMap::new();
    for line in lines {
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            headers.insert(name.trim().to_lowercase(), value.trim().to_string());
        }
    }

    let upgrade = headers
        .get("upgrade")
        .ok_or_else(|| Error::InvalidHandshake("missing Upgrade header".into()))?;
    if !upgrade.eq_ignore_ascii_case("websocket") {
        return Err(Error::InvalidHandshake(format!(
            "invalid Upgrade header: {upgrade}"
        )));
    }

    let connection = headers
        .get("connection")
        .ok_or_else(|| Error::InvalidHandshake("missing Connection header".into()))?;
    if !connection.to_lowercase().contains("upgrade") {
        return Err(Error::InvalidHandshake(format!(
            "invalid Connection header: {connection}"
        )));
    }

    let accept = headers
        .get("sec-websocket-accept")
        .ok_or_else(|| Error::InvalidHandshake("missing Sec-WebSocket-Accept header".into()))?;
    if *accept != compute_accept_key(key) {
        return Err(Error::InvalidHandshake(
            "Sec-WebSocket-Accept does not match the request key".into(),
        ));
    }

    Ok(())
}

impl HandshakeSession for Rfc6455Session {
    fn request(&self) -> Result<Vec<u8>> {
        Ok(self.request.clone())
    }

    fn extend(&mut self, data: &[u8]) {
        if self.verdict.is_some() {
            // anything past the boundary belongs to the data phase
            self.leftovers
                .get_or_insert_with(Vec::new)
                .extend_from_slice(data);
            return;
        }
        self.buffer.extend_from_slice(data);
        self.try_complete();
    }

    fn finished(&self) -> bool {
        self.verdict.is_some()
    }

    fn valid(&self) -> bool {
        matches!(self.verdict, Some(Verdict::Valid))
    }

    fn version(&self) -> u8 {
        13
    }

    fn error(&self) -> Option<&str> {
        match &self.verdict {
            Some(Verdict::Invalid(message)) => Some(message),
            _ => None,
        }
    }

    fn take_leftovers(&mut self) -> Option<Vec<u8>> {
        self.leftovers.take()
    }

    fn response(&self) -> Option<Vec<u8>> {
        // version 13 has nothing to echo before the data phase
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ConnectConfig {
        ConnectConfig::new("server.example.com")
    }

    fn session() -> Rfc6455Session {
        Rfc6455Handshake.session(&config()).unwrap()
    }

    fn valid_response_for(session: &Rfc6455Session) -> Vec<u8> {
        format!(
            "HTTP/1.1 101 Switching Protocols\r\n\
             Upgrade: websocket\r\n\
             Connection: Upgrade\r\n\
             Sec-WebSocket-Accept: {}\r\n\
             \r\n",
            compute_accept_key(&session.key)
        )
        .into_bytes()
    }

    #[test]
    fn test_accept_key_rfc_example() {
        // RFC 6455 §1.3
        assert_eq!(
            compute_accept_key("dGhlIHNhbXBsZSBub25jZQ=="),
            "s3pPLMBiTxaQ9kYGzzhZRbK+xOo="
        );
    }

    #[test]
    fn test_request_shape() {
        let session = session();
        let request = String::from_utf8(session.request().unwrap()).unwrap();
        assert!(request.starts_with("GET / HTTP/1.1\r\n"));
        assert!(request.contains("Host: server.example.com\r\n"));
        assert!(request.contains("Upgrade: websocket\r\n"));
        assert!(request.contains("Sec-WebSocket-Version: 13\r\n"));
        assert!(request.contains(&format!("Sec-WebSocket-Key: {}\r\n", session.key)));
        assert!(request.ends_with("\r\n\r\n"));
    }

    #[test]
    fn test_request_includes_port_and_headers() {
        let config = ConnectConfig::new("example.com")
            .with_port(9001)
            .with_path("/chat")
            .with_header("Authorization", "Bearer t0ken");
        let session = Rfc6455Handshake.session(&config).unwrap();
        let request = String::from_utf8(session.request().unwrap()).unwrap();
        assert!(request.starts_with("GET /chat HTTP/1.1\r\n"));
        assert!(request.contains("Host: example.com:9001\r\n"));
        assert!(request.contains("Authorization: Bearer t0ken\r\n"));
    }

    #[test]
    fn test_valid_response_accepted() {
        let mut session = session();
        let response = valid_response_for(&session);
        session.extend(&response);
        assert!(session.finished());
        assert!(session.valid());
        assert_eq!(session.version(), 13);
        assert!(session.take_leftovers().is_none());
    }

    #[test]
    fn test_response_accepted_across_chunks() {
        let mut session = session();
        let response = valid_response_for(&session);
        for chunk in response.chunks(7) {
            assert!(!session.valid());
            session.extend(chunk);
        }
        assert!(session.finished());
        assert!(session.valid());
    }

    #[test]
    fn test_leftovers_captured() {
        let mut session = session();
        let mut data = valid_response_for(&session);
        data.extend_from_slice(&[0x81, 0x02, b'h', b'i']);
        session.extend(&data);
        assert!(session.valid());
        assert_eq!(
            session.take_leftovers().unwrap(),
            vec![0x81, 0x02, b'h', b'i']
        );
        // surrendered exactly once
        assert!(session.take_leftovers().is_none());
    }

    #[test]
    fn test_wrong_status_rejected() {
        let mut session = session();
        session.extend(b"HTTP/1.1 404 Not Found\r\n\r\n");
        assert!(session.finished());
        assert!(!session.valid());
        assert!(session.error().unwrap().contains("404"));
    }

    #[test]
    fn test_accept_mismatch_rejected() {
        let mut session = session();
        session.extend(
            b"HTTP/1.1 101 Switching Protocols\r\n\
              Upgrade: websocket\r\n\
              Connection: Upgrade\r\n\
              Sec-WebSocket-Accept: bm90IHRoZSByaWdodCBrZXk=\r\n\
              \r\n",
        );
        assert!(session.finished());
        assert!(!session.valid());
        assert!(session.error().unwrap().contains("Sec-WebSocket-Accept"));
    }

    #[test]
    fn test_missing_upgrade_rejected() {
        let mut session = session();
        session.extend(
            b"HTTP/1.1 101 Switching Protocols\r\n\
              Connection: Upgrade\r\n\
              \r\n",
        );
        assert!(!session.valid());
        assert!(session.error().unwrap().contains("Upgrade"));
    }

    #[test]
    fn test_oversized_response_rejected() {
        let config = config();
        let mut session = Rfc6455Handshake.session(&config).unwrap();
        let filler = vec![b'A'; config.limits.max_handshake_size + 1];
        session.extend(&filler);
        assert!(session.finished());
        assert!(!session.valid());
        assert!(session.error().unwrap().contains("too large"));
    }

    #[test]
    fn test_rejects_unknown_version() {
        let config = ConnectConfig::new("example.com").with_version(8);
        assert!(matches!(
            Rfc6455Handshake.session(&config),
            Err(Error::InvalidHandshake(_))
        ));
    }

    #[test]
    fn test_keys_differ_between_sessions() {
        let a = session();
        let b = session();
        assert_ne!(a.key, b.key);
    }
}
