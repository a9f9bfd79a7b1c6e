//! Prelude module for wsprobe Client
//!
//! This module re-exports commonly used types and traits to make them
//! easily accessible for users of the client library.

pub use crate::client::ProbeClient;
pub use crate::config::{ProbeConfig, TlsConfig};
pub use crate::connection::{Probe, SocketEvent};
pub use crate::report::{ProbeFailure, ProbeReport};
pub use crate::sequencer::{Action, ProbeState, Sequencer, WatchdogPolicy};

// Re-export core types for convenience
pub use wsprobe_core::prelude::*;

// Re-export commonly used external dependencies
pub use std::time::Duration;
