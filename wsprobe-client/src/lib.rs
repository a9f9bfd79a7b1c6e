//! wsprobe Client
//!
//! Raw RFC 6455 probe for heartbeat-driven WebSocket servers. A probe opens a
//! socket, writes the upgrade request itself, exchanges PING/PONG, sends one
//! unexpected message, waits for heartbeats and closes, then reports what it
//! observed.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use wsprobe_client::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
//!     let config = ProbeConfig::from_url("http://localhost:3003")?
//!         .cookie("irc-hybrid-client=s%3Aabc");
//!
//!     let report = ProbeClient::new(config)?.run().await?;
//!     match report.error_message() {
//!         Some(message) => eprintln!("probe failed: {}", message),
//!         None => println!("probe passed: {}", report),
//!     }
//!
//!     Ok(())
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs, missing_debug_implementations, rust_2018_idioms)]
#![doc(html_root_url = "https://docs.rs/wsprobe-client/")]

// Public modules
pub mod client;
pub mod config;
pub mod connection;
pub mod logging;
pub mod report;
pub mod sequencer;

// Prelude module
pub mod prelude;

// Re-export key types for convenience
pub use client::ProbeClient;
pub use config::{ProbeConfig, TlsConfig};
pub use connection::Probe;
pub use logging::init_logging;
pub use report::{ProbeFailure, ProbeReport};
pub use sequencer::{ProbeState, Sequencer, WatchdogPolicy};
