//! Probe outcome

use crate::sequencer::ProbeState;
use std::fmt;
use std::time::Duration;
use wsprobe_core::ErrorKind;

/// One recorded failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeFailure {
    /// Failure classification
    pub kind: ErrorKind,
    /// Human readable message
    pub message: String,
}

impl ProbeFailure {
    /// Create a failure record
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for ProbeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}

/// Result of one probe run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeReport {
    /// State the sequencer ended in, `Done` for any finished run
    pub state: ProbeState,
    /// PONG frames received
    pub pong_count: u32,
    /// Heartbeat messages received
    pub heartbeat_count: u32,
    /// Failures in the order they were recorded
    pub failures: Vec<ProbeFailure>,
    /// Wall clock duration of the run
    pub elapsed: Duration,
}

impl ProbeReport {
    /// Whether any failure was recorded
    pub fn is_error(&self) -> bool {
        !self.failures.is_empty()
    }

    /// All failure messages, one per line
    pub fn error_message(&self) -> Option<String> {
        if self.failures.is_empty() {
            return None;
        }
        Some(
            self.failures
                .iter()
                .map(|f| f.message.as_str())
                .collect::<Vec<_>>()
                .join("\n"),
        )
    }

    /// Kind of the first recorded failure
    pub fn first_error_kind(&self) -> Option<ErrorKind> {
        self.failures.first().map(|f| f.kind)
    }
}

impl fmt::Display for ProbeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "state={} pongs={} heartbeats={} elapsed={:?}",
            self.state, self.pong_count, self.heartbeat_count, self.elapsed
        )?;
        for failure in &self.failures {
            write!(f, "\n  {}", failure)?;
        }
        Ok(())
    }
}
