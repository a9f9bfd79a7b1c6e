//! TLS Transport for wsprobe
//!
//! Client side only: a TCP connection upgraded with tokio-rustls.

use async_trait::async_trait;
use rustls::client::{ServerCertVerified, ServerCertVerifier};
use rustls::{Certificate, ClientConfig, RootCertStore, ServerName};
use std::fs::File;
use std::io::{self, BufReader};
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::SystemTime;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream as TokioTcpStream;
use wsprobe_core::{
    error::{ConfigError, TimeoutError},
    transport::{ConnectOptions, Connector, TlsOptions, TlsVersion, TransportStream},
    Error, Result,
};

/// Accepts any server certificate
struct NoVerification;

impl ServerCertVerifier for NoVerification {
    fn verify_server_cert(
        &self,
        _end_entity: &Certificate,
        _intermediates: &[Certificate],
        _server_name: &ServerName,
        _scts: &mut dyn Iterator<Item = &[u8]>,
        _ocsp_response: &[u8],
        _now: SystemTime,
    ) -> std::result::Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }
}

fn root_store(options: &TlsOptions) -> Result<RootCertStore> {
    let mut root_store = RootCertStore::empty();
    root_store.add_trust_anchors(webpki_roots::TLS_SERVER_ROOTS.iter().map(|ta| {
        rustls::OwnedTrustAnchor::from_subject_spki_name_constraints(
            ta.subject,
            ta.spki,
            ta.name_constraints,
        )
    }));

    if let Some(path) = &options.ca_file {
        let file = File::open(path).map_err(|e| ConfigError::InvalidValue {
            field: "ca_file".to_string(),
            value: format!("{}: {}", path.display(), e),
        })?;
        let certs = rustls_pemfile::certs(&mut BufReader::new(file)).map_err(|e| {
            ConfigError::InvalidValue {
                field: "ca_file".to_string(),
                value: format!("{}: {}", path.display(), e),
            }
        })?;
        let (_added, ignored) = root_store.add_parsable_certificates(&certs);
        if certs.is_empty() || ignored == certs.len() {
            return Err(ConfigError::InvalidValue {
                field: "ca_file".to_string(),
                value: format!("{}: no usable certificates", path.display()),
            }
            .into());
        }
    }

    Ok(root_store)
}

/// Build a rustls client configuration from probe TLS options
pub fn client_config(options: &TlsOptions) -> Result<ClientConfig> {
    let versions: &[&'static rustls::SupportedProtocolVersion] = match options.min_version {
        TlsVersion::Tls12 => &[&rustls::version::TLS13, &rustls::version::TLS12],
        TlsVersion::Tls13 => &[&rustls::version::TLS13],
    };

    let mut config = ClientConfig::builder()
        .with_safe_default_cipher_suites()
        .with_safe_default_kx_groups()
        .with_protocol_versions(versions)
        .map_err(|e| Error::Tls(e.to_string()))?
        .with_root_certificates(root_store(options)?)
        .with_no_client_auth();

    if !options.verify_host {
        config
            .dangerous()
            .set_certificate_verifier(Arc::new(NoVerification));
    }

    Ok(config)
}

/// Opens TLS connections
#[derive(Clone)]
pub struct TlsConnector {
    config: Option<Arc<ClientConfig>>,
}

impl std::fmt::Debug for TlsConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsConnector")
            .field("preconfigured", &self.config.is_some())
            .finish()
    }
}

impl Default for TlsConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl TlsConnector {
    /// Connector that builds its rustls configuration from each [`ConnectOptions`]
    pub fn new() -> Self {
        Self { config: None }
    }

    /// Connector with a fixed rustls configuration
    pub fn with_config(config: Arc<ClientConfig>) -> Self {
        Self {
            config: Some(config),
        }
    }

    async fn handshake(
        &self,
        options: &ConnectOptions,
        tls: &TlsOptions,
    ) -> Result<TlsStream> {
        let config = match &self.config {
            Some(config) => config.clone(),
            None => Arc::new(client_config(tls)?),
        };

        let domain = ServerName::try_from(options.server_name()).map_err(|e| {
            Error::Tls(format!("invalid server name {}: {}", options.server_name(), e))
        })?;

        let tcp_stream = TokioTcpStream::connect(options.socket_addr())
            .await
            .map_err(Error::Io)?;
        if options.nodelay {
            tcp_stream.set_nodelay(true).map_err(Error::Io)?;
        }

        let stream = tokio_rustls::TlsConnector::from(config)
            .connect(domain, tcp_stream)
            .await
            .map_err(|e| Error::Tls(format!("TLS connection failed: {}", e)))?;

        Ok(TlsStream { inner: stream })
    }
}

#[async_trait]
impl Connector for TlsConnector {
    type Stream = TlsStream;

    async fn connect(&self, options: &ConnectOptions) -> Result<Self::Stream> {
        let default_tls = TlsOptions::default();
        let tls = options.tls.as_ref().unwrap_or(&default_tls);

        tokio::time::timeout(options.connect_timeout, self.handshake(options, tls))
            .await
            .map_err(|_| TimeoutError::Connect {
                timeout: options.connect_timeout,
            })?
    }
}

/// TLS stream implementation
#[derive(Debug)]
pub struct TlsStream {
    inner: tokio_rustls::client::TlsStream<TokioTcpStream>,
}

impl TlsStream {
    /// Negotiated protocol version, once the handshake completed
    pub fn protocol_version(&self) -> Option<rustls::ProtocolVersion> {
        self.inner.get_ref().1.protocol_version()
    }
}

impl AsyncRead for TlsStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

impl AsyncWrite for TlsStream {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.inner).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}

impl TransportStream for TlsStream {
    fn remote_addr(&self) -> Result<SocketAddr> {
        self.inner.get_ref().0.peer_addr().map_err(Error::Io)
    }

    fn local_addr(&self) -> Result<SocketAddr> {
        self.inner.get_ref().0.local_addr().map_err(Error::Io)
    }

    fn is_secure(&self) -> bool {
        true
    }
}
