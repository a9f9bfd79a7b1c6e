//! # wsprobe
//!
//! **Raw RFC 6455 WebSocket probe for heartbeat-driven servers**
//!
//! wsprobe opens a TCP or TLS socket, performs the HTTP Upgrade handshake by
//! hand, and walks a fixed sequence against the server: PING/PONG, one
//! unexpected text message, a wait for periodic `HEARTBEAT` messages, and a
//! close handshake. The outcome is a [`ProbeReport`](client::ProbeReport).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use wsprobe::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
//!     wsprobe::client::init_logging()?;
//!
//!     let report = ProbeClient::from_env()?.run().await?;
//!     if report.is_error() {
//!         std::process::exit(1);
//!     }
//!
//!     Ok(())
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs, missing_debug_implementations, rust_2018_idioms)]
#![doc(html_root_url = "https://docs.rs/wsprobe/")]

// Re-export core components
pub use wsprobe_core::*;

#[cfg(feature = "transport-tcp")]
pub use wsprobe_transport_tcp as transport_tcp;

#[cfg(feature = "transport-tls")]
pub use wsprobe_transport_tls as transport_tls;

#[cfg(feature = "client")]
pub use wsprobe_client as client;

/// Prelude module with common imports
pub mod prelude {
    pub use wsprobe_core::prelude::*;

    #[cfg(feature = "client")]
    pub use wsprobe_client::prelude::*;

    #[cfg(feature = "transport-tcp")]
    pub use wsprobe_transport_tcp::prelude::*;

    #[cfg(feature = "transport-tls")]
    pub use wsprobe_transport_tls::prelude::*;
}
