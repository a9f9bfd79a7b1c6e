//! WebSocket opening handshake, client side
//!
//! Builds the HTTP Upgrade request line by line (the probe writes one line per
//! pacing tick) and validates the server's `101 Switching Protocols` answer as
//! defined in RFC 6455 section 4.

use crate::error::{Error, HandshakeError, Result};
use crate::protocol::constants::*;
use crate::protocol::http_header::*;
use crate::protocol::http_status::SWITCHING_PROTOCOLS;
use crate::protocol::http_value;
use base64::{engine::general_purpose, Engine as _};
use bytes::Bytes;
use rand::Rng;
use sha1::{Digest, Sha1};
use std::borrow::Cow;

/// Generate a 16 character alphanumeric nonce
pub fn generate_nonce() -> String {
    let mut rng = rand::thread_rng();
    (0..WEBSOCKET_KEY_LEN)
        .map(|_| NONCE_CHARSET[rng.gen_range(0..NONCE_CHARSET.len())] as char)
        .collect()
}

/// Generate a random `Sec-WebSocket-Key`: the base64 encoding of a fresh nonce
pub fn generate_key() -> String {
    encode_nonce(&generate_nonce())
}

/// Base64 encode a nonce into a `Sec-WebSocket-Key` value
pub fn encode_nonce(nonce: &str) -> String {
    general_purpose::STANDARD.encode(nonce.as_bytes())
}

/// Compute WebSocket accept key from client key
pub fn compute_accept_key(client_key: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(client_key.as_bytes());
    hasher.update(WEBSOCKET_MAGIC.as_bytes());
    general_purpose::STANDARD.encode(hasher.finalize())
}

/// Host as it appears in an authority: IPv6 literals get their brackets back
pub fn host_literal(host: &str) -> Cow<'_, str> {
    if host.contains(':') && !host.starts_with('[') {
        Cow::Owned(format!("[{}]", host))
    } else {
        Cow::Borrowed(host)
    }
}

/// Target of the upgrade request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeRequestOptions {
    /// Server host name, as sent in the `Host` header
    pub host: String,
    /// Server port; omitted from `Host` when 80 or 443
    pub port: u16,
    /// Request path, e.g. `/irc/ws`
    pub path: String,
    /// `Origin` header value
    pub origin: String,
    /// Session cookie, sent verbatim when present and non-empty
    pub cookie: Option<String>,
}

/// State of one opening handshake: the key we sent, the accept value we
/// expect back, and the literal request lines.
#[derive(Debug, Clone)]
pub struct HandshakeContext {
    key: String,
    expected_accept: String,
    lines: Vec<String>,
}

impl HandshakeContext {
    /// Build a handshake with a freshly generated key
    pub fn new(options: &HandshakeRequestOptions) -> Self {
        Self::with_key(options, generate_key())
    }

    /// Build a handshake with a caller supplied `Sec-WebSocket-Key`
    pub fn with_key(options: &HandshakeRequestOptions, key: impl Into<String>) -> Self {
        let key = key.into();
        let expected_accept = compute_accept_key(&key);

        let host = match options.port {
            80 | 443 => host_literal(&options.host).into_owned(),
            port => format!("{}:{}", host_literal(&options.host), port),
        };

        let mut lines = vec![
            format!("GET {} HTTP/1.1", options.path),
            format!("{}: {}", HOST, host),
            format!("{}: {}", ORIGIN, options.origin),
            format!("{}: {}", CONNECTION, http_value::UPGRADE),
            format!("{}: {}", UPGRADE, http_value::WEBSOCKET),
            format!("{}: {}", SEC_WEBSOCKET_KEY, key),
            format!("{}: {}", SEC_WEBSOCKET_VERSION, WEBSOCKET_VERSION),
        ];
        if let Some(cookie) = options.cookie.as_deref().filter(|c| !c.is_empty()) {
            lines.push(format!("{}: {}", COOKIE, cookie));
        }

        Self {
            key,
            expected_accept,
            lines,
        }
    }

    /// The `Sec-WebSocket-Key` sent to the server
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The `Sec-WebSocket-Accept` value the server must answer with
    pub fn expected_accept(&self) -> &str {
        &self.expected_accept
    }

    /// Request lines without terminators, in send order
    pub fn request_lines(&self) -> &[String] {
        &self.lines
    }

    /// The whole request, each line CRLF terminated, followed by the empty line
    pub fn request_bytes(&self) -> Bytes {
        let mut request = String::new();
        for line in &self.lines {
            request.push_str(line);
            request.push_str(CRLF);
        }
        request.push_str(CRLF);
        Bytes::from(request)
    }

    /// Validate a parsed response against this handshake
    pub fn validate(&self, response: &HandshakeResponse) -> Result<()> {
        validate_response(response, &self.expected_accept)
    }
}

/// Parsed server handshake response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeResponse {
    /// HTTP minor version (1 for HTTP/1.1)
    pub version: u8,
    /// HTTP status code
    pub status: u16,
    /// HTTP reason phrase
    pub reason: String,
    /// Headers in arrival order
    pub headers: Vec<(String, String)>,
}

impl HandshakeResponse {
    /// First value of a header, matched case-insensitively
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Status line as received, e.g. `HTTP/1.1 401 Unauthorized`
    pub fn status_line(&self) -> String {
        format!("HTTP/1.{} {} {}", self.version, self.status, self.reason)
            .trim_end()
            .to_string()
    }
}

/// Parse a server handshake response from the start of `buf`
///
/// Returns `Ok(None)` while the header block is incomplete. On success the
/// second element is the length of the header block; anything after it
/// already belongs to the WebSocket stream.
pub fn parse_response(buf: &[u8]) -> Result<Option<(HandshakeResponse, usize)>> {
    let parsed = match parse_with(buf, &mut [httparse::EMPTY_HEADER; MAX_HEADERS]) {
        Err(httparse::Error::TooManyHeaders) => {
            // every header line takes at least 4 bytes, so this fits any
            // block within MAX_HEADER_SIZE
            let mut headers = vec![httparse::EMPTY_HEADER; MAX_HEADER_SIZE / 4];
            parse_with(buf, &mut headers)
        }
        other => other,
    };

    let parsed = match parsed {
        Ok(parsed) => parsed,
        Err(httparse::Error::TooManyHeaders) => {
            return Err(HandshakeError::HeadersTooLarge {
                size: buf.len(),
                max: MAX_HEADER_SIZE,
            }
            .into())
        }
        Err(e) => return Err(HandshakeError::Malformed(e.to_string()).into()),
    };

    match parsed {
        Some((_, header_len)) if header_len > MAX_HEADER_SIZE => {
            Err(HandshakeError::HeadersTooLarge {
                size: header_len,
                max: MAX_HEADER_SIZE,
            }
            .into())
        }
        None if buf.len() > MAX_HEADER_SIZE => Err(HandshakeError::HeadersTooLarge {
            size: buf.len(),
            max: MAX_HEADER_SIZE,
        }
        .into()),
        parsed => Ok(parsed),
    }
}

fn parse_with<'b>(
    buf: &'b [u8],
    headers: &mut [httparse::Header<'b>],
) -> std::result::Result<Option<(HandshakeResponse, usize)>, httparse::Error> {
    let mut response = httparse::Response::new(headers);
    let header_len = match response.parse(buf)? {
        httparse::Status::Complete(len) => len,
        httparse::Status::Partial => return Ok(None),
    };
    let status = response.code.ok_or(httparse::Error::Status)?;

    let headers = response
        .headers
        .iter()
        .map(|h| {
            (
                h.name.to_string(),
                String::from_utf8_lossy(h.value).trim().to_string(),
            )
        })
        .collect();

    Ok(Some((
        HandshakeResponse {
            version: response.version.unwrap_or(1),
            status,
            reason: response.reason.unwrap_or_default().to_string(),
            headers,
        },
        header_len,
    )))
}

/// Validate a server handshake response
pub fn validate_response(response: &HandshakeResponse, expected_accept: &str) -> Result<()> {
    if response.status != SWITCHING_PROTOCOLS {
        let err = if (400..600).contains(&response.status) {
            HandshakeError::Rejected {
                status_line: response.status_line(),
            }
        } else {
            HandshakeError::UnexpectedStatus(response.status)
        };
        return Err(err.into());
    }

    let upgrade = required_header(response, UPGRADE)?;
    if !upgrade.eq_ignore_ascii_case(http_value::WEBSOCKET) {
        return Err(invalid_value(UPGRADE, upgrade));
    }

    let connection = required_header(response, CONNECTION)?;
    let has_upgrade_token = connection
        .split(',')
        .any(|token| token.trim().eq_ignore_ascii_case(http_value::UPGRADE));
    if !has_upgrade_token {
        return Err(invalid_value(CONNECTION, connection));
    }

    let accept = required_header(response, SEC_WEBSOCKET_ACCEPT)?;
    if accept != expected_accept {
        return Err(HandshakeError::InvalidAcceptKey {
            expected: expected_accept.to_string(),
            received: accept.to_string(),
        }
        .into());
    }

    Ok(())
}

/// Parse and validate a complete response text
pub fn validate_response_text(raw: &str, expected_accept: &str) -> Result<()> {
    match parse_response(raw.as_bytes())? {
        Some((response, _)) => validate_response(&response, expected_accept),
        None => Err(HandshakeError::Malformed("incomplete HTTP response".to_string()).into()),
    }
}

fn required_header<'a>(response: &'a HandshakeResponse, name: &str) -> Result<&'a str> {
    response
        .header(name)
        .ok_or_else(|| HandshakeError::MissingHeader(name.to_string()).into())
}

fn invalid_value(header: &str, value: &str) -> Error {
    HandshakeError::InvalidHeaderValue {
        header: header.to_string(),
        value: value.to_string(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn options() -> HandshakeRequestOptions {
        HandshakeRequestOptions {
            host: "localhost".to_string(),
            port: 3003,
            path: "/irc/ws".to_string(),
            origin: "http://localhost:3003".to_string(),
            cookie: None,
        }
    }

    fn accepted(accept: &str) -> String {
        format!(
            "HTTP/1.1 101 Switching Protocols\r\n\
             Upgrade: websocket\r\n\
             Connection: Upgrade\r\n\
             Sec-WebSocket-Accept: {}\r\n\r\n",
            accept
        )
    }

    fn handshake_error(err: Error) -> HandshakeError {
        match err {
            Error::Handshake(e) => e,
            other => panic!("expected handshake error, got {other:?}"),
        }
    }

    #[test]
    fn test_accept_key_for_fixed_nonce() {
        let key = encode_nonce("aUb6mO7FA7CHaLsi");
        assert_eq!(key, "YVViNm1PN0ZBN0NIYUxzaQ==");
        assert_eq!(compute_accept_key(&key), "14MiFPaXo4OV/A+u+fcLHJOOPY4=");
    }

    #[test]
    fn test_accept_key_rfc_sample() {
        let key = "dGhlIHNhbXBsZSBub25jZQ=="; // "the sample nonce"
        assert_eq!(compute_accept_key(key), "s3pPLMBiTxaQ9kYGzzhZRbK+xOo=");
    }

    #[test]
    fn test_nonce_generation() {
        let nonce = generate_nonce();
        assert_eq!(nonce.len(), 16);
        assert!(nonce.bytes().all(|b| b.is_ascii_alphanumeric()));
        assert_eq!(generate_key().len(), 24);
        assert_ne!(generate_nonce(), generate_nonce());
    }

    #[test]
    fn test_request_lines_in_order() {
        let ctx = HandshakeContext::with_key(&options(), "YVViNm1PN0ZBN0NIYUxzaQ==");
        assert_eq!(
            ctx.request_lines(),
            &[
                "GET /irc/ws HTTP/1.1",
                "Host: localhost:3003",
                "Origin: http://localhost:3003",
                "Connection: Upgrade",
                "Upgrade: websocket",
                "Sec-WebSocket-Key: YVViNm1PN0ZBN0NIYUxzaQ==",
                "Sec-WebSocket-Version: 13",
            ]
        );
        assert_eq!(ctx.expected_accept(), "14MiFPaXo4OV/A+u+fcLHJOOPY4=");

        let request = ctx.request_bytes();
        assert!(request.starts_with(b"GET /irc/ws HTTP/1.1\r\nHost: localhost:3003\r\n"));
        assert!(request.ends_with(b"Sec-WebSocket-Version: 13\r\n\r\n"));
    }

    #[test]
    fn test_host_omits_default_ports() {
        for port in [80, 443] {
            let ctx = HandshakeContext::new(&HandshakeRequestOptions {
                port,
                host: "example.com".to_string(),
                ..options()
            });
            assert_eq!(ctx.request_lines()[1], "Host: example.com");
        }
    }

    #[test]
    fn test_host_brackets_ipv6_literal() {
        let ctx = HandshakeContext::new(&HandshakeRequestOptions {
            host: "::1".to_string(),
            ..options()
        });
        assert_eq!(ctx.request_lines()[1], "Host: [::1]:3003");
        assert_eq!(host_literal("[::1]"), "[::1]");
        assert_eq!(host_literal("localhost"), "localhost");
    }

    #[test]
    fn test_cookie_line() {
        let with_cookie = HandshakeContext::new(&HandshakeRequestOptions {
            cookie: Some("irc-hybrid-client=s%3Aabc".to_string()),
            ..options()
        });
        assert_eq!(
            with_cookie.request_lines().last().map(String::as_str),
            Some("Cookie: irc-hybrid-client=s%3Aabc")
        );

        let empty_cookie = HandshakeContext::new(&HandshakeRequestOptions {
            cookie: Some(String::new()),
            ..options()
        });
        assert_eq!(empty_cookie.request_lines().len(), 7);
    }

    #[test]
    fn test_parse_response_incremental() {
        let ctx = HandshakeContext::new(&options());
        let mut raw = accepted(ctx.expected_accept()).into_bytes();
        let header_len = raw.len();
        raw.extend_from_slice(&[0x81, 0x00]);

        assert!(parse_response(&raw[..20]).unwrap().is_none());

        let (response, len) = parse_response(&raw).unwrap().unwrap();
        assert_eq!(len, header_len);
        assert_eq!(&raw[len..], &[0x81, 0x00]);
        assert_eq!(response.status, 101);
        assert_eq!(response.header("sec-websocket-accept"), Some(ctx.expected_accept()));
        assert!(ctx.validate(&response).is_ok());
    }

    #[test]
    fn test_validate_accepts_case_variants() {
        let ctx = HandshakeContext::new(&options());
        let raw = format!(
            "HTTP/1.1 101 Switching Protocols\r\n\
             upgrade: WebSocket\r\n\
             connection: keep-alive, upgrade\r\n\
             sec-websocket-accept: {}\r\n\r\n",
            ctx.expected_accept()
        );
        assert!(validate_response_text(&raw, ctx.expected_accept()).is_ok());
    }

    #[test]
    fn test_rejected_status_keeps_status_line() {
        let err = validate_response_text(
            "HTTP/1.1 401 Unauthorized\r\nContent-Length: 0\r\n\r\n",
            "unused",
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::HandshakeRejected);
        assert_eq!(
            handshake_error(err),
            HandshakeError::Rejected {
                status_line: "HTTP/1.1 401 Unauthorized".to_string()
            }
        );
    }

    #[test]
    fn test_rejection_with_many_headers_keeps_status_line() {
        let mut raw = String::from("HTTP/1.1 401 Unauthorized\r\n");
        for n in 0..40 {
            raw.push_str(&format!("X-H{n}: v\r\n"));
        }
        raw.push_str("\r\n");

        let err = validate_response_text(&raw, "unused").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::HandshakeRejected);
        assert_eq!(err.to_string(), "Handshake error: HTTP/1.1 401 Unauthorized");
    }

    #[test]
    fn test_accept_with_many_headers() {
        let ctx = HandshakeContext::new(&options());
        let mut raw = String::from("HTTP/1.1 101 Switching Protocols\r\n");
        for n in 0..MAX_HEADERS {
            raw.push_str(&format!("X-H{n}: v\r\n"));
        }
        raw.push_str(&accepted(ctx.expected_accept())["HTTP/1.1 101 Switching Protocols\r\n".len()..]);

        let (response, len) = parse_response(raw.as_bytes()).unwrap().unwrap();
        assert_eq!(len, raw.len());
        assert_eq!(response.headers.len(), MAX_HEADERS + 3);
        assert!(ctx.validate(&response).is_ok());
    }

    #[test]
    fn test_unexpected_status() {
        let err = validate_response_text("HTTP/1.1 200 OK\r\n\r\n", "unused").unwrap_err();
        assert_eq!(handshake_error(err), HandshakeError::UnexpectedStatus(200));
    }

    #[test]
    fn test_missing_or_invalid_headers_rejected() {
        let accept = compute_accept_key("YVViNm1PN0ZBN0NIYUxzaQ==");
        let full = accepted(&accept);

        for dropped in ["Upgrade:", "Connection:", "Sec-WebSocket-Accept:"] {
            let raw: String = full
                .split_inclusive("\r\n")
                .filter(|line| !line.starts_with(dropped))
                .collect();
            let err = handshake_error(validate_response_text(&raw, &accept).unwrap_err());
            assert!(matches!(err, HandshakeError::MissingHeader(_)), "{dropped}");
        }

        let raw = full.replace("Upgrade: websocket", "Upgrade: h2c");
        let err = handshake_error(validate_response_text(&raw, &accept).unwrap_err());
        assert!(matches!(err, HandshakeError::InvalidHeaderValue { .. }));

        let raw = full.replace("Connection: Upgrade", "Connection: keep-alive");
        let err = handshake_error(validate_response_text(&raw, &accept).unwrap_err());
        assert!(matches!(err, HandshakeError::InvalidHeaderValue { .. }));

        let err = handshake_error(validate_response_text(&full, "bogus").unwrap_err());
        assert!(matches!(err, HandshakeError::InvalidAcceptKey { .. }));
    }

    #[test]
    fn test_oversized_header_block() {
        let mut raw = b"HTTP/1.1 101 Switching Protocols\r\nX-Pad: ".to_vec();
        raw.extend(std::iter::repeat(b'a').take(MAX_HEADER_SIZE));
        let err = handshake_error(parse_response(&raw).unwrap_err());
        assert!(matches!(err, HandshakeError::HeadersTooLarge { .. }));
    }

    #[test]
    fn test_garbage_is_malformed() {
        let err = handshake_error(parse_response(b"SSH-2.0-OpenSSH\r\n\r\n").unwrap_err());
        assert!(matches!(err, HandshakeError::Malformed(_)));
    }
}
