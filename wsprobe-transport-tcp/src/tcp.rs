//! TCP transport implementation for wsprobe

use async_trait::async_trait;
use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream as TokioTcpStream;
use wsprobe_core::{
    error::TimeoutError,
    transport::{ConnectOptions, Connector, TransportStream},
    Error, Result,
};

/// Opens plain TCP connections
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector;

impl TcpConnector {
    /// Create a new TCP connector
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Connector for TcpConnector {
    type Stream = TcpStream;

    async fn connect(&self, options: &ConnectOptions) -> Result<Self::Stream> {
        let connect = TokioTcpStream::connect(options.socket_addr());
        let stream = tokio::time::timeout(options.connect_timeout, connect)
            .await
            .map_err(|_| TimeoutError::Connect {
                timeout: options.connect_timeout,
            })?
            .map_err(Error::Io)?;

        if options.nodelay {
            stream.set_nodelay(true).map_err(Error::Io)?;
        }

        Ok(TcpStream::from_tokio(stream))
    }
}

/// TCP stream implementation
#[derive(Debug)]
pub struct TcpStream {
    inner: TokioTcpStream,
}

impl TcpStream {
    /// Wrap a connected tokio TCP stream
    pub fn from_tokio(stream: TokioTcpStream) -> Self {
        Self { inner: stream }
    }

    /// Connect to a remote address
    pub async fn connect(addr: SocketAddr) -> Result<Self> {
        let stream = TokioTcpStream::connect(addr).await.map_err(Error::Io)?;
        Ok(Self::from_tokio(stream))
    }

    /// Access the underlying tokio stream
    pub fn get_ref(&self) -> &TokioTcpStream {
        &self.inner
    }

    /// Unwrap into the underlying tokio stream
    pub fn into_inner(self) -> TokioTcpStream {
        self.inner
    }
}

impl AsyncRead for TcpStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

impl AsyncWrite for TcpStream {
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

impl TransportStream for TcpStream {
    fn remote_addr(&self) -> Result<SocketAddr> {
        self.inner.peer_addr().map_err(Error::Io)
    }

    fn local_addr(&self) -> Result<SocketAddr> {
        self.inner.local_addr().map_err(Error::Io)
    }
}
