//! TCP Transport for wsprobe
//!
//! Plain TCP [`Connector`](wsprobe_core::transport::Connector) used for `ws://`
//! style probes.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs, missing_debug_implementations, rust_2018_idioms)]
#![doc(html_root_url = "https://docs.rs/wsprobe-transport-tcp/")]

#[cfg(feature = "tokio-runtime")]
pub mod tcp;

// Re-export TCP transport types
#[cfg(feature = "tokio-runtime")]
pub use tcp::{TcpConnector, TcpStream};

/// Prelude module
#[cfg(feature = "tokio-runtime")]
pub mod prelude {
    pub use crate::tcp::{TcpConnector, TcpStream};
    pub use wsprobe_core::transport::{ConnectOptions, Connector, TransportStream};
}
