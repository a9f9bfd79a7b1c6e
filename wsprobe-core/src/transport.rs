//! Transport layer abstraction
//!
//! A probe talks to exactly one server over one byte stream. The stream may be
//! plain TCP, TLS, or an in-memory pipe in tests; [`Connector`] opens it and
//! [`TransportStream`] is what the probe driver reads and writes.

use crate::error::{ConfigError, Error};
use crate::handshake::host_literal;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Minimum TLS protocol version accepted during negotiation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum TlsVersion {
    /// TLS 1.2
    #[default]
    Tls12,
    /// TLS 1.3
    Tls13,
}

impl fmt::Display for TlsVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TlsVersion::Tls12 => f.write_str("TLSv1.2"),
            TlsVersion::Tls13 => f.write_str("TLSv1.3"),
        }
    }
}

impl FromStr for TlsVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tlsv1.2" | "tls1.2" | "1.2" => Ok(TlsVersion::Tls12),
            "tlsv1.3" | "tls1.3" | "1.3" => Ok(TlsVersion::Tls13),
            _ => Err(ConfigError::InvalidValue {
                field: "tls_min_version".to_string(),
                value: s.to_string(),
            }
            .into()),
        }
    }
}

/// TLS client options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsOptions {
    /// Verify the server certificate chain and host name
    pub verify_host: bool,
    /// Name sent for SNI and checked against the certificate; defaults to the host
    pub server_name: Option<String>,
    /// Extra PEM file of trusted root certificates
    pub ca_file: Option<PathBuf>,
    /// Minimum negotiated protocol version
    pub min_version: TlsVersion,
}

impl Default for TlsOptions {
    fn default() -> Self {
        Self {
            verify_host: true,
            server_name: None,
            ca_file: None,
            min_version: TlsVersion::Tls12,
        }
    }
}

/// Where and how to open the probe's socket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectOptions {
    /// Server host name or address
    pub host: String,
    /// Server port
    pub port: u16,
    /// TLS settings; `None` for a plain TCP connection
    pub tls: Option<TlsOptions>,
    /// Upper bound for connect (and TLS negotiation)
    pub connect_timeout: Duration,
    /// Disable Nagle's algorithm
    pub nodelay: bool,
}

impl ConnectOptions {
    /// Plain TCP options for `host:port`
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            tls: None,
            connect_timeout: Duration::from_secs(10),
            nodelay: true,
        }
    }

    /// `host:port` for display, with IPv6 literals bracketed
    pub fn address(&self) -> String {
        format!("{}:{}", host_literal(&self.host), self.port)
    }

    /// Host and port pair for name resolution
    pub fn socket_addr(&self) -> (&str, u16) {
        (self.host.as_str(), self.port)
    }

    /// Name the TLS layer should present and verify
    pub fn server_name(&self) -> &str {
        self.tls
            .as_ref()
            .and_then(|tls| tls.server_name.as_deref())
            .unwrap_or(&self.host)
    }
}

#[cfg(feature = "tokio-runtime")]
pub use self::runtime::*;

#[cfg(feature = "tokio-runtime")]
mod runtime {
    use super::ConnectOptions;
    use crate::error::{Error, Result};
    use std::net::SocketAddr;
    use tokio::io::{AsyncRead, AsyncWrite};

    /// Byte stream the probe runs over
    pub trait TransportStream: AsyncRead + AsyncWrite + Unpin + Send + 'static {
        /// Get the remote address
        fn remote_addr(&self) -> Result<SocketAddr>;

        /// Get the local address
        fn local_addr(&self) -> Result<SocketAddr>;

        /// Whether the stream is encrypted
        fn is_secure(&self) -> bool {
            false
        }
    }

    /// Opens transport streams
    #[async_trait::async_trait]
    pub trait Connector: Send + Sync {
        /// The stream type produced by this connector
        type Stream: TransportStream;

        /// Open a connection as described by `options`
        async fn connect(&self, options: &ConnectOptions) -> Result<Self::Stream>;
    }

    /// In-memory pipe, used to drive a probe without a socket
    impl TransportStream for tokio::io::DuplexStream {
        fn remote_addr(&self) -> Result<SocketAddr> {
            Err(Error::Connection("in-memory stream has no address".to_string()))
        }

        fn local_addr(&self) -> Result<SocketAddr> {
            Err(Error::Connection("in-memory stream has no address".to_string()))
        }
    }
}
