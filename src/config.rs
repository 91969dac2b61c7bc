//! Connection configuration and resource limits.

use crate::error::{Error, Result};

/// Resource limits enforced by the default codecs.
///
/// These bound memory usage for a single connection; a peer cannot make
/// the assembler buffer more than `max_message_size` bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Limits {
    /// Maximum size of a single inbound frame in bytes.
    ///
    /// Default: 16 MB
    pub max_frame_size: usize,

    /// Maximum size of a reassembled message in bytes.
    ///
    /// Default: 64 MB
    pub max_message_size: usize,

    /// Maximum number of fragments in a single message.
    ///
    /// Default: 128
    pub max_fragment_count: usize,

    /// Maximum size of the buffered handshake response in bytes.
    ///
    /// Default: 8 KB
    pub max_handshake_size: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_frame_size: 16 * 1024 * 1024,
            max_message_size: 64 * 1024 * 1024,
            max_fragment_count: 128,
            max_handshake_size: 8192,
        }
    }
}

impl Limits {
    /// Validate a reassembled message size.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MessageTooLarge`] if `size` exceeds the configured maximum.
    pub const fn check_message_size(&self, size: usize) -> Result<()> {
        if size > self.max_message_size {
            Err(Error::MessageTooLarge {
                size,
                max: self.max_message_size,
            })
        } else {
            Ok(())
        }
    }

    /// Validate a fragment count.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TooManyFragments`] if `count` exceeds the configured maximum.
    pub const fn check_fragment_count(&self, count: usize) -> Result<()> {
        if count > self.max_fragment_count {
            Err(Error::TooManyFragments {
                count,
                max: self.max_fragment_count,
            })
        } else {
            Ok(())
        }
    }
}

/// Connection configuration, immutable once the connection is created.
///
/// Built either from an explicit host (`ConnectConfig::new`) or from a
/// `ws://` / `wss://` URI (`ConnectConfig::from_uri`), which is decomposed
/// into host, port, path and scheme exactly once at construction.
#[derive(Debug, Clone)]
pub struct ConnectConfig {
    /// Target host name or address.
    pub host: String,

    /// Explicit port; when `None` the scheme default applies
    /// (80 plain, 443 secure).
    pub port: Option<u16>,

    /// Request path (and query) for the upgrade request.
    ///
    /// Default: "/"
    pub path: String,

    /// Requested protocol version.
    ///
    /// Default: 13
    pub version: u8,

    /// Use TLS for this connection.
    pub secure: bool,

    /// Extra HTTP headers appended verbatim to the upgrade request.
    pub headers: Vec<(String, String)>,

    /// Mirror wire traffic to the trace log as hex dumps.
    ///
    /// Per-connection flag; suppressed during the handshake so
    /// credentials in upgrade headers never reach the log.
    pub trace: bool,

    /// Resource limits for the default codecs.
    pub limits: Limits,
}

impl ConnectConfig {
    /// Create a configuration for a plain connection to `host`.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: None,
            path: "/".to_string(),
            version: 13,
            secure: false,
            headers: Vec::new(),
            trace: false,
            limits: Limits::default(),
        }
    }

    /// Create a configuration from a `ws://` or `wss://` URI.
    ///
    /// The `wss` scheme implies a secure connection.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUri`] if the scheme is not `ws`/`wss`, the
    /// authority is missing, or the port is not a valid integer.
    pub fn from_uri(uri: &str) -> Result<Self> {
        let (scheme, rest) = uri
            .split_once("://")
            .ok_or_else(|| Error::InvalidUri(format!("missing scheme: {uri}")))?;

        let secure = match scheme {
            "ws" => false,
            "wss" => true,
            other => return Err(Error::InvalidUri(format!("unsupported scheme: {other}"))),
        };

        let (authority, path) = match rest.find('/') {
            Some(i) => (&rest[..i], rest[i..].to_string()),
            None => (rest, "/".to_string()),
        };
        if authority.is_empty() {
            return Err(Error::InvalidUri(format!("missing host: {uri}")));
        }

        let (host, port) = split_authority(authority)?;

        Ok(Self {
            host,
            port,
            path,
            secure,
            ..Self::new("")
        })
    }

    /// Set an explicit port.
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Set the request path.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Request a specific protocol version.
    #[must_use]
    pub const fn with_version(mut self, version: u8) -> Self {
        self.version = version;
        self
    }

    /// Enable or disable TLS.
    #[must_use]
    pub const fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Append an extra header to the upgrade request.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Enable the hex wire trace for this connection.
    #[must_use]
    pub const fn with_trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }

    /// Set custom resource limits.
    #[must_use]
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// The port this connection targets: the explicit port if one was
    /// given, otherwise the scheme default (80 plain, 443 secure).
    #[must_use]
    pub fn effective_port(&self) -> u16 {
        self.port.unwrap_or(if self.secure { 443 } else { 80 })
    }

    /// Whether the effective port is the default for the scheme.
    #[must_use]
    pub fn is_default_port(&self) -> bool {
        self.effective_port() == if self.secure { 443 } else { 80 }
    }
}

/// Split `host[:port]`, tolerating a bracketed IPv6 literal.
fn split_authority(authority: &str) -> Result<(String, Option<u16>)> {
    if let Some(rest) = authority.strip_prefix('[') {
        let (host, after) = rest
            .split_once(']')
            .ok_or_else(|| Error::InvalidUri(format!("unterminated IPv6 literal: {authority}")))?;
        let port = match after.strip_prefix(':') {
            Some(p) => Some(parse_port(p)?),
            None if after.is_empty() => None,
            None => return Err(Error::InvalidUri(format!("invalid authority: {authority}"))),
        };
        return Ok((host.to_string(), port));
    }

    match authority.rsplit_once(':') {
        Some((host, port)) => Ok((host.to_string(), Some(parse_port(port)?))),
        None => Ok((authority.to_string(), None)),
    }
}

fn parse_port(s: &str) -> Result<u16> {
    s.parse::<u16>()
        .map_err(|_| Error::InvalidUri(format!("invalid port: {s}")))
}
