//! Prelude module for wsprobe Core
//!
//! This module re-exports commonly used types and traits to make them
//! easily accessible for users of the library.

pub use crate::error::{Error, ErrorKind, Result};
pub use crate::frame::{Frame, FrameEncoder, FrameParser};
pub use crate::handshake::{HandshakeContext, HandshakeRequestOptions};
pub use crate::protocol::Opcode;
pub use crate::transport::{ConnectOptions, TlsOptions, TlsVersion};

// Re-export commonly used external dependencies
pub use bytes::{Bytes, BytesMut};

// Feature-gated re-exports
#[cfg(feature = "tokio-runtime")]
pub use crate::transport::{Connector, TransportStream};

#[cfg(feature = "tokio-runtime")]
pub use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
