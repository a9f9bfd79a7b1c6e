//! # wsprobe Core
//!
//! Wire level building blocks for the wsprobe WebSocket probe:
//!
//! - Error handling and types
//! - WebSocket frame parsing, masking and fragmentation
//! - Client side opening handshake
//! - Protocol constants and utilities
//! - Transport layer abstractions

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs, missing_debug_implementations, rust_2018_idioms)]
#![doc(html_root_url = "https://docs.rs/wsprobe-core/")]

// Core modules
pub mod error;
pub mod frame;
pub mod handshake;
pub mod protocol;
pub mod transport;

// Prelude module with common imports
pub mod prelude;

// Re-export key types for convenience
pub use error::{Error, ErrorKind, Result};
pub use frame::{Frame, FrameDump, FrameEncoder, FrameParser, FragmentState};
pub use handshake::{HandshakeContext, HandshakeRequestOptions, HandshakeResponse};
pub use protocol::Opcode;
pub use transport::{ConnectOptions, TlsOptions, TlsVersion};
#[cfg(feature = "tokio-runtime")]
pub use transport::{Connector, TransportStream};
