//! Error types for wsprobe
//!
//! Every fallible operation in the workspace returns [`Error`]. Each error
//! maps onto a coarse [`ErrorKind`] so that probe reports can classify a
//! failure without matching on the full error tree.

#![allow(missing_docs)]

use std::fmt;
use thiserror::Error;

/// Result type alias for wsprobe operations
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type
#[derive(Error, Debug)]
pub enum Error {
    /// Frame decoding or encoding errors
    #[error("Frame error: {0}")]
    Frame(#[from] FrameError),

    /// Opening handshake errors
    #[error("Handshake error: {0}")]
    Handshake(#[from] HandshakeError),

    /// I/O errors from the underlying socket
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Timeout errors
    #[error("Timeout error: {0}")]
    Timeout(#[from] TimeoutError),

    /// TLS setup or negotiation errors
    #[error("TLS error: {0}")]
    Tls(String),

    /// Connection errors that are not plain I/O failures
    #[error("Connection error: {0}")]
    Connection(String),

    /// A caller passed an argument outside the accepted domain
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl Error {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Frame(_) => ErrorKind::ProtocolViolation,
            Error::Handshake(_) => ErrorKind::HandshakeRejected,
            Error::Io(_) | Error::Tls(_) | Error::Connection(_) => ErrorKind::TransportError,
            Error::Config(_) => ErrorKind::Config,
            Error::Timeout(_) => ErrorKind::Timeout,
            Error::InvalidArgument(_) => ErrorKind::InvalidArgument,
        }
    }
}

/// Coarse classification of failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The server did not answer with a valid `101 Switching Protocols`
    HandshakeRejected,
    /// Socket-level error or unexpected close
    TransportError,
    /// An overall deadline elapsed before the probe could complete
    Timeout,
    /// Malformed or forbidden frame received
    ProtocolViolation,
    /// Caller supplied an invalid argument
    InvalidArgument,
    /// The exchange completed but a required observation was missing
    ExpectationUnmet,
    /// Invalid configuration
    Config,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::HandshakeRejected => "handshake rejected",
            ErrorKind::TransportError => "transport error",
            ErrorKind::Timeout => "timeout",
            ErrorKind::ProtocolViolation => "protocol violation",
            ErrorKind::InvalidArgument => "invalid argument",
            ErrorKind::ExpectationUnmet => "expectation unmet",
            ErrorKind::Config => "configuration",
        };
        f.write_str(name)
    }
}

/// Frame parsing and processing errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// Insufficient data to parse frame
    #[error("Insufficient data: need {needed} bytes, have {have}")]
    InsufficientData { needed: usize, have: usize },

    /// Frame too large
    #[error("Frame too large: {size} bytes (max: {max})")]
    TooLarge { size: u64, max: usize },

    /// Invalid frame header
    #[error("Invalid frame header: {0}")]
    InvalidHeader(String),

    /// Invalid opcode
    #[error("Invalid opcode: {0:#04x}")]
    InvalidOpcode(u8),

    /// Reserved bits set
    #[error("Reserved bits set in frame: {0:#04x}")]
    ReservedBitsSet(u8),

    /// Control frames cannot be fragmented
    #[error("Control frames cannot be fragmented")]
    FragmentedControlFrame,

    /// Control frame payload above 125 bytes
    #[error("Control frame payload too large: {0} bytes")]
    ControlFrameTooLarge(usize),
}

impl FrameError {
    /// Whether more input may turn this error into a complete frame
    pub fn is_incomplete(&self) -> bool {
        matches!(self, FrameError::InsufficientData { .. })
    }
}

/// Opening handshake errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HandshakeError {
    /// Server refused the upgrade with a 4xx or 5xx status
    #[error("{status_line}")]
    Rejected { status_line: String },

    /// Server answered with a status other than 101
    #[error("Websocket handshake failed: unexpected HTTP status {0}")]
    UnexpectedStatus(u16),

    /// Required response header is missing
    #[error("Websocket handshake failed: missing header {0}")]
    MissingHeader(String),

    /// Response header has the wrong value
    #[error("Websocket handshake failed: invalid value for {header}: {value}")]
    InvalidHeaderValue { header: String, value: String },

    /// Sec-WebSocket-Accept did not match the key we sent
    #[error("Websocket handshake failed: accept key mismatch, expected {expected}, received {received}")]
    InvalidAcceptKey { expected: String, received: String },

    /// Response could not be parsed as HTTP
    #[error("Websocket handshake failed: {0}")]
    Malformed(String),

    /// Response header block exceeded the size limit
    #[error("Websocket handshake failed: header block of {size} bytes exceeds {max}")]
    HeadersTooLarge { size: usize, max: usize },
}

/// Configuration errors
#[derive(Error, Debug, Clone)]
pub enum ConfigError {
    /// Invalid configuration value
    #[error("Invalid configuration value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    /// Missing required configuration
    #[error("Missing required configuration: {field}")]
    MissingField { field: String },

    /// Configuration validation failed
    #[error("Configuration validation failed: {0}")]
    Validation(String),
}

/// Timeout errors
#[derive(Error, Debug, Clone)]
pub enum TimeoutError {
    /// TCP or TLS connect did not finish in time
    #[error("Connect timeout: {timeout:?}")]
    Connect { timeout: std::time::Duration },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_mapping() {
        assert_eq!(
            Error::from(FrameError::InvalidOpcode(3)).kind(),
            ErrorKind::ProtocolViolation
        );
        assert_eq!(
            Error::from(HandshakeError::UnexpectedStatus(200)).kind(),
            ErrorKind::HandshakeRejected
        );
        assert_eq!(
            Error::from(std::io::Error::from(std::io::ErrorKind::ConnectionReset)).kind(),
            ErrorKind::TransportError
        );
        assert_eq!(
            Error::from(TimeoutError::Connect {
                timeout: std::time::Duration::from_secs(10)
            })
            .kind(),
            ErrorKind::Timeout
        );
        assert_eq!(
            Error::InvalidArgument("opcode".into()).kind(),
            ErrorKind::InvalidArgument
        );
    }

    #[test]
    fn test_rejected_display_is_status_line() {
        let err = HandshakeError::Rejected {
            status_line: "HTTP/1.1 401 Unauthorized".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP/1.1 401 Unauthorized");
    }

    #[test]
    fn test_insufficient_data_is_incomplete() {
        assert!(FrameError::InsufficientData { needed: 2, have: 1 }.is_incomplete());
        assert!(!FrameError::ReservedBitsSet(0x40).is_incomplete());
    }
}
