//! TLS Transport for wsprobe
//!
//! rustls based [`Connector`](wsprobe_core::transport::Connector) for `wss://`
//! style probes. Certificate verification can be switched off for test servers
//! with self-signed certificates.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs, missing_debug_implementations, rust_2018_idioms)]
#![doc(html_root_url = "https://docs.rs/wsprobe-transport-tls/")]

#[cfg(feature = "tokio-runtime")]
pub mod tls;

// Re-export TLS transport types
#[cfg(feature = "tokio-runtime")]
pub use tls::{client_config, TlsConnector, TlsStream};

/// Prelude module
#[cfg(feature = "tokio-runtime")]
pub mod prelude {
    pub use crate::tls::{TlsConnector, TlsStream};
    pub use wsprobe_core::transport::{ConnectOptions, Connector, TlsOptions, TransportStream};
}
