//! Probe entry point
//!
//! [`ProbeClient`] picks the transport from the configuration (plain TCP or
//! TLS) and runs the probe over it.

use crate::config::ProbeConfig;
use crate::connection::Probe;
use crate::report::ProbeReport;
use wsprobe_core::Result;

/// Runs probes over the transport the configuration asks for
#[derive(Debug, Clone)]
pub struct ProbeClient {
    probe: Probe,
}

impl ProbeClient {
    /// Create a client, validating the configuration
    pub fn new(config: ProbeConfig) -> Result<Self> {
        Ok(Self {
            probe: Probe::new(config)?,
        })
    }

    /// Create a client configured from the environment
    pub fn from_env() -> Result<Self> {
        Self::new(ProbeConfig::from_env()?)
    }

    /// Get the probe configuration
    pub fn config(&self) -> &ProbeConfig {
        self.probe.config()
    }

    /// Run one probe
    ///
    /// Fails only when the transport the configuration needs was compiled out;
    /// everything that goes wrong on the wire ends up in the report.
    pub async fn run(&self) -> Result<ProbeReport> {
        match &self.probe.config().tls {
            #[cfg(feature = "transport-tls")]
            Some(_) => Ok(self
                .probe
                .run_with(&wsprobe_transport_tls::TlsConnector::new())
                .await),
            #[cfg(feature = "transport-tcp")]
            None => Ok(self
                .probe
                .run_with(&wsprobe_transport_tcp::TcpConnector::new())
                .await),
            #[allow(unreachable_patterns)]
            transport => Err(wsprobe_core::error::ConfigError::Validation(format!(
                "{} transport is not enabled in this build",
                if transport.is_some() { "TLS" } else { "TCP" }
            ))
            .into()),
        }
    }
}
