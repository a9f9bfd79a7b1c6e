//! WebSocket protocol constants and utilities
//!
//! Opcodes, frame header bits and the handful of HTTP names the opening
//! handshake needs, as defined by RFC 6455.

use std::fmt;

/// WebSocket opcodes as defined in RFC 6455 Section 5.2
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    /// Continuation frame
    Continuation = 0x0,
    /// Text frame
    Text = 0x1,
    /// Binary frame
    Binary = 0x2,
    /// Close frame
    Close = 0x8,
    /// Ping frame
    Ping = 0x9,
    /// Pong frame
    Pong = 0xA,
}

impl Opcode {
    /// Create an Opcode from its 4-bit wire value
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x0 => Some(Opcode::Continuation),
            0x1 => Some(Opcode::Text),
            0x2 => Some(Opcode::Binary),
            0x8 => Some(Opcode::Close),
            0x9 => Some(Opcode::Ping),
            0xA => Some(Opcode::Pong),
            _ => None,
        }
    }

    /// Get the numeric value of the opcode
    pub fn value(&self) -> u8 {
        *self as u8
    }

    /// Check if this is a control opcode
    pub fn is_control(&self) -> bool {
        matches!(self, Opcode::Close | Opcode::Ping | Opcode::Pong)
    }

    /// Check if this is a data opcode
    pub fn is_data(&self) -> bool {
        matches!(self, Opcode::Text | Opcode::Binary | Opcode::Continuation)
    }

    /// Human readable label used in frame traces
    pub fn label(&self) -> &'static str {
        match self {
            Opcode::Continuation => "continuation frame",
            Opcode::Text => "text frame",
            Opcode::Binary => "binary frame",
            Opcode::Close => "connection close",
            Opcode::Ping => "ping",
            Opcode::Pong => "pong",
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02x}({})", self.value(), self.label())
    }
}

/// WebSocket protocol constants
pub mod constants {
    /// WebSocket protocol version
    pub const WEBSOCKET_VERSION: &str = "13";

    /// GUID appended to the key when computing Sec-WebSocket-Accept
    pub const WEBSOCKET_MAGIC: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

    /// Characters the handshake nonce is drawn from
    pub const NONCE_CHARSET: &[u8] =
        b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

    /// Handshake nonce length in bytes, before base64
    pub const WEBSOCKET_KEY_LEN: usize = 16;

    /// Maximum frame size (default)
    pub const DEFAULT_MAX_FRAME_SIZE: usize = 16 * 1024 * 1024; // 16MB

    /// Maximum size of the HTTP response header block
    pub const MAX_HEADER_SIZE: usize = 8192; // 8KB

    /// Maximum number of response headers parsed
    pub const MAX_HEADERS: usize = 32;

    /// Largest payload a control frame may carry
    pub const MAX_CONTROL_PAYLOAD: usize = 125;

    /// HTTP line terminator
    pub const CRLF: &str = "\r\n";
}

/// Frame header bit positions and masks
pub mod frame {
    /// FIN bit position
    pub const FIN_BIT: u8 = 0x80;

    /// RSV1, RSV2 and RSV3 together
    pub const RSV_MASK: u8 = 0x70;

    /// Opcode mask
    pub const OPCODE_MASK: u8 = 0x0F;

    /// MASK bit position
    pub const MASK_BIT: u8 = 0x80;

    /// Payload length mask for 7-bit length
    pub const PAYLOAD_LEN_MASK: u8 = 0x7F;

    /// Extended payload length (16-bit) marker
    pub const PAYLOAD_LEN_16: u8 = 126;

    /// Extended payload length (64-bit) marker
    pub const PAYLOAD_LEN_64: u8 = 127;

    /// Masking key length
    pub const MASKING_KEY_LEN: usize = 4;
}

/// HTTP status codes used in WebSocket handshake
pub mod http_status {
    /// HTTP Switching Protocols status
    pub const SWITCHING_PROTOCOLS: u16 = 101;
}

/// HTTP header names as written in the upgrade request
pub mod http_header {
    /// Host header
    pub const HOST: &str = "Host";

    /// Origin header
    pub const ORIGIN: &str = "Origin";

    /// Connection header
    pub const CONNECTION: &str = "Connection";

    /// Upgrade header
    pub const UPGRADE: &str = "Upgrade";

    /// Sec-WebSocket-Key header
    pub const SEC_WEBSOCKET_KEY: &str = "Sec-WebSocket-Key";

    /// Sec-WebSocket-Version header
    pub const SEC_WEBSOCKET_VERSION: &str = "Sec-WebSocket-Version";

    /// Sec-WebSocket-Accept header
    pub const SEC_WEBSOCKET_ACCEPT: &str = "Sec-WebSocket-Accept";

    /// Cookie header
    pub const COOKIE: &str = "Cookie";
}

/// HTTP header values
pub mod http_value {
    /// WebSocket upgrade value
    pub const WEBSOCKET: &str = "websocket";

    /// Upgrade connection value
    pub const UPGRADE: &str = "Upgrade";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opcode_conversion() {
        assert_eq!(Opcode::from_u8(0x1), Some(Opcode::Text));
        assert_eq!(Opcode::from_u8(0x3), None);
        assert_eq!(Opcode::from_u8(0xFF), None);
        assert_eq!(Opcode::Pong.value(), 0xA);
        assert!(Opcode::Ping.is_control());
        assert!(!Opcode::Ping.is_data());
        assert!(Opcode::Continuation.is_data());
    }

    #[test]
    fn test_opcode_display() {
        assert_eq!(Opcode::Text.to_string(), "0x01(text frame)");
        assert_eq!(Opcode::Close.to_string(), "0x08(connection close)");
    }

    #[test]
    fn test_nonce_charset_is_alphanumeric() {
        assert_eq!(constants::NONCE_CHARSET.len(), 62);
        assert!(constants::NONCE_CHARSET.iter().all(u8::is_ascii_alphanumeric));
    }
}
