//! WebSocket frame parsing and serialization
//!
//! This module implements the RFC 6455 base framing protocol for a client:
//! strict decoding of server frames (incrementally, across socket reads),
//! masked encoding of client frames, the fragmentation state machine used
//! for outgoing data messages, and human readable frame dumps for tracing.

use crate::{
    error::{Error, FrameError, Result},
    protocol::{constants::MAX_CONTROL_PAYLOAD, frame::*, Opcode},
};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::fmt::Write as _;

/// Represents a WebSocket frame according to RFC 6455
///
/// `payload` always holds the application data in the clear. When `mask` is
/// set the masking is applied while writing, and removed while decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Indicates if this is the final frame in a message
    pub fin: bool,
    /// Reserved bits (RSV1, RSV2, RSV3)
    pub rsv: [bool; 3],
    /// Frame opcode
    pub opcode: Opcode,
    /// Masking key (if present)
    pub mask: Option<[u8; 4]>,
    /// Payload data
    pub payload: Bytes,
}

impl Frame {
    /// Create a new final, unmasked frame with the given opcode and payload
    pub fn new(opcode: Opcode, payload: impl Into<Bytes>) -> Self {
        Self {
            fin: true,
            rsv: [false; 3],
            opcode,
            mask: None,
            payload: payload.into(),
        }
    }

    /// Create a continuation frame
    pub fn continuation(payload: impl Into<Bytes>) -> Self {
        Self::new(Opcode::Continuation, payload)
    }

    /// Create a text frame
    pub fn text(payload: impl Into<Bytes>) -> Self {
        Self::new(Opcode::Text, payload)
    }

    /// Create a binary frame
    pub fn binary(payload: impl Into<Bytes>) -> Self {
        Self::new(Opcode::Binary, payload)
    }

    /// Create a close frame with optional code and reason
    pub fn close(code: Option<u16>, reason: Option<&str>) -> Self {
        let mut payload = BytesMut::new();

        if let Some(code) = code {
            payload.put_u16(code);
            if let Some(reason) = reason {
                payload.put_slice(reason.as_bytes());
            }
        }

        Self::new(Opcode::Close, payload.freeze())
    }

    /// Create a ping frame
    pub fn ping(payload: impl Into<Bytes>) -> Self {
        Self::new(Opcode::Ping, payload)
    }

    /// Create a pong frame
    pub fn pong(payload: impl Into<Bytes>) -> Self {
        Self::new(Opcode::Pong, payload)
    }

    /// Set the FIN bit
    pub fn fin(mut self, fin: bool) -> Self {
        self.fin = fin;
        self
    }

    /// Mask the frame with the given key when it is written
    pub fn masked_with(mut self, key: [u8; 4]) -> Self {
        self.mask = Some(key);
        self
    }

    /// Mask the frame with a fresh random key
    pub fn masked(self) -> Self {
        self.masked_with(rand::random::<[u8; 4]>())
    }

    /// Whether the MASK bit is set
    pub fn is_masked(&self) -> bool {
        self.mask.is_some()
    }

    /// Reserved bits as the 3-bit value found in bits 6-4 of the first byte
    pub fn rsv_bits(&self) -> u8 {
        ((self.rsv[0] as u8) << 2) | ((self.rsv[1] as u8) << 1) | (self.rsv[2] as u8)
    }

    /// Size of the encoded header, mask key included
    pub fn header_len(&self) -> usize {
        header_len_for(self.payload.len() as u64, self.is_masked())
    }

    /// Serialize the frame to bytes
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.header_len() + self.payload.len());
        self.write_to(&mut buf);
        buf.freeze()
    }

    /// Write the frame to a buffer
    pub fn write_to(&self, buf: &mut BytesMut) {
        let first_byte =
            ((self.fin as u8) << 7) | (self.rsv_bits() << 4) | self.opcode.value();
        buf.put_u8(first_byte);

        let payload_len = self.payload.len();
        let mask_bit = if self.is_masked() { MASK_BIT } else { 0 };

        if payload_len < PAYLOAD_LEN_16 as usize {
            buf.put_u8(mask_bit | payload_len as u8);
        } else if payload_len <= u16::MAX as usize {
            buf.put_u8(mask_bit | PAYLOAD_LEN_16);
            buf.put_u16(payload_len as u16);
        } else {
            buf.put_u8(mask_bit | PAYLOAD_LEN_64);
            buf.put_u64(payload_len as u64);
        }

        let start = match self.mask {
            Some(key) => {
                buf.put_slice(&key);
                Some((buf.len(), key))
            }
            None => None,
        };

        buf.put_slice(&self.payload);

        if let Some((offset, key)) = start {
            apply_mask(&mut buf[offset..], key);
        }
    }

    /// Decode one frame from the front of `buf`
    ///
    /// On success the frame's bytes are consumed. On any error, including
    /// [`FrameError::InsufficientData`], `buf` is left untouched. Header
    /// violations are reported as soon as the header is available, without
    /// waiting for the payload.
    pub fn decode(buf: &mut BytesMut, max_payload: usize) -> Result<Self> {
        let header = parse_header(&buf[..])?;

        if header.rsv != 0 {
            return Err(FrameError::ReservedBitsSet(header.rsv).into());
        }

        let opcode =
            Opcode::from_u8(header.opcode).ok_or(FrameError::InvalidOpcode(header.opcode))?;

        if header.payload_len >> 63 != 0 {
            return Err(FrameError::InvalidHeader(
                "most significant bit of 64-bit length is set".to_string(),
            )
            .into());
        }

        if opcode.is_control() {
            if !header.fin {
                return Err(FrameError::FragmentedControlFrame.into());
            }
            if header.payload_len > MAX_CONTROL_PAYLOAD as u64 {
                return Err(FrameError::ControlFrameTooLarge(header.payload_len as usize).into());
            }
        }

        if header.payload_len > max_payload as u64 {
            return Err(FrameError::TooLarge {
                size: header.payload_len,
                max: max_payload,
            }
            .into());
        }

        let payload_len = header.payload_len as usize;
        let total = header.header_len + payload_len;
        if buf.len() < total {
            return Err(FrameError::InsufficientData {
                needed: total,
                have: buf.len(),
            }
            .into());
        }

        buf.advance(header.header_len);
        let mut payload = buf.split_to(payload_len);
        if let Some(key) = header.mask {
            apply_mask(&mut payload, key);
        }

        Ok(Frame {
            fin: header.fin,
            rsv: [false; 3],
            opcode,
            mask: header.mask,
            payload: payload.freeze(),
        })
    }

    /// One-line description of the decoded header
    pub fn describe(&self) -> String {
        describe_header(
            self.opcode.value(),
            self.rsv_bits(),
            self.fin,
            self.mask,
            self.payload.len() as u64,
        )
    }

    /// Payload decoded as UTF-8, replacing invalid sequences
    pub fn payload_text(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }

    /// Check if this is a control frame
    pub fn is_control(&self) -> bool {
        self.opcode.is_control()
    }

    /// Check if this is a data frame
    pub fn is_data(&self) -> bool {
        self.opcode.is_data()
    }
}

/// XOR `data` in place with the 4-byte masking key
///
/// Masking is its own inverse: applying the same key twice restores the input.
pub fn apply_mask(data: &mut [u8], key: [u8; 4]) {
    for (i, byte) in data.iter_mut().enumerate() {
        *byte ^= key[i & 3];
    }
}

/// Render bytes as space separated lowercase hex pairs
pub fn hex_dump(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len() * 3);
    for byte in data {
        let _ = write!(out, "{:02x} ", byte);
    }
    out
}

fn header_len_for(payload_len: u64, masked: bool) -> usize {
    let base = if payload_len < PAYLOAD_LEN_16 as u64 {
        2
    } else if payload_len <= u16::MAX as u64 {
        4
    } else {
        10
    };
    if masked {
        base + MASKING_KEY_LEN
    } else {
        base
    }
}

fn describe_header(opcode: u8, rsv: u8, fin: bool, mask: Option<[u8; 4]>, len: u64) -> String {
    let mut out = format!("Header: opcode=0x{:02x}", opcode);
    if let Some(op) = Opcode::from_u8(opcode) {
        let _ = write!(out, "({})", op.label());
    }
    let _ = write!(out, " RSV=0x{:02x} FIN={}", rsv, fin);
    if !fin {
        out.push_str("(Fragment)");
    }
    let _ = write!(out, " MASK={}", mask.is_some());
    if let Some(key) = mask {
        let _ = write!(out, " mask=[{},{},{},{}]", key[0], key[1], key[2], key[3]);
    }
    let _ = write!(out, " length={}(bytes)", len);
    out
}

/// Raw header fields, before any validation
#[derive(Debug, Clone, Copy)]
struct RawHeader {
    fin: bool,
    rsv: u8,
    opcode: u8,
    mask: Option<[u8; 4]>,
    payload_len: u64,
    header_len: usize,
}

fn need(data: &[u8], needed: usize) -> std::result::Result<(), FrameError> {
    if data.len() < needed {
        Err(FrameError::InsufficientData {
            needed,
            have: data.len(),
        })
    } else {
        Ok(())
    }
}

fn parse_header(data: &[u8]) -> std::result::Result<RawHeader, FrameError> {
    need(data, 2)?;

    let first_byte = data[0];
    let second_byte = data[1];

    let mut offset = 2;
    let payload_len = match second_byte & PAYLOAD_LEN_MASK {
        PAYLOAD_LEN_16 => {
            need(data, 4)?;
            offset = 4;
            u16::from_be_bytes([data[2], data[3]]) as u64
        }
        PAYLOAD_LEN_64 => {
            need(data, 10)?;
            offset = 10;
            let mut len = [0u8; 8];
            len.copy_from_slice(&data[2..10]);
            u64::from_be_bytes(len)
        }
        len => len as u64,
    };

    let mask = if second_byte & MASK_BIT != 0 {
        need(data, offset + MASKING_KEY_LEN)?;
        let mut key = [0u8; 4];
        key.copy_from_slice(&data[offset..offset + MASKING_KEY_LEN]);
        offset += MASKING_KEY_LEN;
        Some(key)
    } else {
        None
    };

    Ok(RawHeader {
        fin: first_byte & FIN_BIT != 0,
        rsv: (first_byte & RSV_MASK) >> 4,
        opcode: first_byte & OPCODE_MASK,
        mask,
        payload_len,
        header_len: offset,
    })
}

/// Diagnostic view of one raw frame: hex, decoded header and text payload
///
/// Unlike [`Frame::decode`] this performs no validation, so it can render
/// whatever bytes went over the wire, including frames we sent ourselves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameDump {
    /// Hex rendering of the raw bytes
    pub hex: String,
    /// One-line header description
    pub header: String,
    /// Unmasked payload as lossy UTF-8
    pub message: String,
}

impl FrameDump {
    /// Inspect raw frame bytes
    ///
    /// Only a truncated header is an error; a short payload is rendered as far
    /// as it goes.
    pub fn inspect(raw: &[u8]) -> Result<Self> {
        let header = parse_header(raw).map_err(Error::Frame)?;
        let payload_len = usize::try_from(header.payload_len).unwrap_or(usize::MAX);
        let end = header.header_len.saturating_add(payload_len).min(raw.len());
        let mut payload = raw[header.header_len..end].to_vec();
        if let Some(key) = header.mask {
            apply_mask(&mut payload, key);
        }

        Ok(Self {
            hex: hex_dump(raw),
            header: describe_header(
                header.opcode,
                header.rsv,
                header.fin,
                header.mask,
                header.payload_len,
            ),
            message: String::from_utf8_lossy(&payload).into_owned(),
        })
    }
}

/// Frame parser for incremental parsing
///
/// Socket reads do not line up with frame boundaries; the parser buffers
/// partial input and yields every complete frame.
#[derive(Debug)]
pub struct FrameParser {
    /// Buffer for partial frame data
    buffer: BytesMut,
    /// Largest accepted payload
    max_frame_size: usize,
}

impl Default for FrameParser {
    fn default() -> Self {
        Self::with_max_frame_size(crate::protocol::constants::DEFAULT_MAX_FRAME_SIZE)
    }
}

impl FrameParser {
    /// Create a new frame parser
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a parser that rejects payloads above `max_frame_size`
    pub fn with_max_frame_size(max_frame_size: usize) -> Self {
        Self {
            buffer: BytesMut::new(),
            max_frame_size,
        }
    }

    /// Feed data to the parser and try to extract frames
    ///
    /// Parsing stops at the first error, which is returned last; the buffer
    /// is discarded since the stream cannot be resynchronized.
    pub fn feed(&mut self, data: &[u8]) -> Vec<Result<Frame>> {
        self.buffer.extend_from_slice(data);

        let mut frames = Vec::new();
        loop {
            match Frame::decode(&mut self.buffer, self.max_frame_size) {
                Ok(frame) => frames.push(Ok(frame)),
                Err(Error::Frame(ref e)) if e.is_incomplete() => break,
                Err(e) => {
                    self.buffer.clear();
                    frames.push(Err(e));
                    break;
                }
            }
        }
        frames
    }

    /// Get the number of bytes currently buffered
    pub fn buffered_bytes(&self) -> usize {
        self.buffer.len()
    }

    /// Clear the parser buffer
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

/// Position inside an outgoing fragmented message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FragmentState {
    /// No fragmented message in progress
    #[default]
    Idle,
    /// First fragment sent
    Started,
    /// At least one continuation fragment sent
    Middle,
}

/// Encoder for client-to-server frames
///
/// Every frame gets a fresh random mask. Data frames go through the
/// fragmentation state machine:
///
/// | state          | fragment | emits                    | next    |
/// |----------------|----------|--------------------------|---------|
/// | Idle           | yes      | FIN=0 data opcode        | Started |
/// | Started/Middle | yes      | FIN=0 continuation       | Middle  |
/// | Started/Middle | no       | FIN=1 continuation       | Idle    |
/// | Idle           | no       | FIN=1 data opcode        | Idle    |
#[derive(Debug, Default)]
pub struct FrameEncoder {
    state: FragmentState,
}

impl FrameEncoder {
    /// Create an encoder with no fragmented message in progress
    pub fn new() -> Self {
        Self::default()
    }

    /// Current fragmentation state
    pub fn state(&self) -> FragmentState {
        self.state
    }

    fn advance(&mut self, opcode: Opcode, fragment: bool) -> (bool, Opcode) {
        use FragmentState::*;

        let (next, fin, opcode) = match (self.state, fragment) {
            (Idle, true) => (Started, false, opcode),
            (Started | Middle, true) => (Middle, false, Opcode::Continuation),
            (Started | Middle, false) => (Idle, true, Opcode::Continuation),
            (Idle, false) => (Idle, true, opcode),
        };
        self.state = next;
        (fin, opcode)
    }

    /// Build the next masked data frame of a text message
    pub fn text_frame(&mut self, text: &str, fragment: bool) -> Frame {
        self.data_frame(Opcode::Text, Bytes::copy_from_slice(text.as_bytes()), fragment)
    }

    /// Build the next masked data frame of a binary message
    pub fn binary_frame(&mut self, data: &[u8], fragment: bool) -> Frame {
        self.data_frame(Opcode::Binary, Bytes::copy_from_slice(data), fragment)
    }

    fn data_frame(&mut self, opcode: Opcode, payload: Bytes, fragment: bool) -> Frame {
        let (fin, opcode) = self.advance(opcode, fragment);
        Frame::new(opcode, payload).fin(fin).masked()
    }

    /// Encode the next frame of a text message
    pub fn encode_text(&mut self, text: &str, fragment: bool) -> Bytes {
        self.text_frame(text, fragment).to_bytes()
    }

    /// Encode the next frame of a binary message
    pub fn encode_binary(&mut self, data: &[u8], fragment: bool) -> Bytes {
        self.binary_frame(data, fragment).to_bytes()
    }

    /// Encode a zero-length masked control frame
    ///
    /// Only close (8), ping (9) and pong (10) are accepted.
    pub fn encode_control(opcode: u8) -> Result<Bytes> {
        match Opcode::from_u8(opcode) {
            Some(op) if op.is_control() => Ok(Frame::new(op, Bytes::new()).masked().to_bytes()),
            _ => Err(Error::InvalidArgument(format!(
                "invalid websocket control opcode {:#04x}",
                opcode
            ))),
        }
    }

    /// Encode a masked pong echoing a ping payload
    pub fn encode_pong(payload: &[u8]) -> Result<Bytes> {
        if payload.len() > MAX_CONTROL_PAYLOAD {
            return Err(Error::InvalidArgument(format!(
                "pong payload of {} bytes exceeds {}",
                payload.len(),
                MAX_CONTROL_PAYLOAD
            )));
        }
        Ok(Frame::pong(Bytes::copy_from_slice(payload)).masked().to_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use proptest::prelude::*;

    fn decode(bytes: &[u8]) -> Result<Frame> {
        let mut buf = BytesMut::from(bytes);
        Frame::decode(&mut buf, usize::MAX)
    }

    #[test]
    fn test_text_frame_serialization() {
        let bytes = Frame::text("hello").to_bytes();

        assert_eq!(bytes[0], 0x81); // FIN=1, RSV=000, Opcode=0001
        assert_eq!(bytes[1], 0x05); // MASK=0, Length=5
        assert_eq!(&bytes[2..], b"hello");
    }

    #[test]
    fn test_masked_frame_layout() {
        let key = [0x37, 0xfa, 0x21, 0x3d];
        let bytes = Frame::text("Hello").masked_with(key).to_bytes();

        // RFC 6455 section 5.7 example
        assert_eq!(
            &bytes[..],
            &[0x81, 0x85, 0x37, 0xfa, 0x21, 0x3d, 0x7f, 0x9f, 0x4d, 0x51, 0x58]
        );
    }

    #[test]
    fn test_roundtrip_across_length_encodings() {
        let mut encoder = FrameEncoder::new();
        for (len, header_len) in [
            (0usize, 6usize),
            (1, 6),
            (125, 6),
            (126, 8),
            (65535, 8),
            (65536, 14),
        ] {
            let text = "a".repeat(len);
            let bytes = encoder.encode_text(&text, false);
            assert_eq!(bytes.len(), header_len + len, "length {}", len);

            let frame = decode(&bytes).unwrap();
            assert_eq!(frame.opcode, Opcode::Text);
            assert!(frame.fin);
            assert!(frame.is_masked());
            assert_eq!(frame.payload.len(), len);
            assert_eq!(&frame.payload[..], text.as_bytes());
        }
    }

    #[test]
    fn test_extended_length_fields() {
        let bytes = Frame::binary(vec![0u8; 126]).to_bytes();
        assert_eq!(bytes[1], 126);
        assert_eq!(&bytes[2..4], &126u16.to_be_bytes());

        let bytes = Frame::binary(vec![0u8; 65536]).to_bytes();
        assert_eq!(bytes[1], 127);
        assert_eq!(&bytes[2..10], &65536u64.to_be_bytes());
    }

    #[test]
    fn test_decode_consumes_exactly_one_frame() {
        let mut buf = BytesMut::new();
        Frame::text("one").write_to(&mut buf);
        Frame::pong(Bytes::new()).write_to(&mut buf);

        let first = Frame::decode(&mut buf, usize::MAX).unwrap();
        assert_eq!(first.payload_text(), "one");
        let second = Frame::decode(&mut buf, usize::MAX).unwrap();
        assert_eq!(second.opcode, Opcode::Pong);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_decode_truncated_leaves_buffer_untouched() {
        let bytes = Frame::text("truncated payload").masked().to_bytes();
        for cut in [1, 2, 5, 8] {
            let mut buf = BytesMut::from(&bytes[..cut]);
            let err = Frame::decode(&mut buf, usize::MAX).unwrap_err();
            assert!(matches!(err, Error::Frame(FrameError::InsufficientData { .. })));
            assert_eq!(buf.len(), cut);
        }
    }

    #[test]
    fn test_decode_rejects_reserved_bits() {
        let err = decode(&[0xC1, 0x00]).unwrap_err();
        assert!(matches!(err, Error::Frame(FrameError::ReservedBitsSet(0x4))));
        assert_eq!(err.kind(), ErrorKind::ProtocolViolation);
    }

    #[test]
    fn test_decode_rejects_unknown_opcode() {
        let err = decode(&[0x83, 0x00]).unwrap_err();
        assert!(matches!(err, Error::Frame(FrameError::InvalidOpcode(0x3))));
    }

    #[test]
    fn test_decode_rejects_bad_control_frames() {
        let err = decode(&[0x09, 0x00]).unwrap_err();
        assert!(matches!(err, Error::Frame(FrameError::FragmentedControlFrame)));

        let mut raw = vec![0x89, 126, 0x00, 0x7e];
        raw.extend_from_slice(&[0u8; 126]);
        let err = decode(&raw).unwrap_err();
        assert!(matches!(err, Error::Frame(FrameError::ControlFrameTooLarge(126))));
    }

    #[test]
    fn test_decode_rejects_length_with_high_bit() {
        let raw = [0x82, 127, 0x80, 0, 0, 0, 0, 0, 0, 1];
        let err = decode(&raw).unwrap_err();
        assert!(matches!(err, Error::Frame(FrameError::InvalidHeader(_))));
    }

    #[test]
    fn test_decode_enforces_max_payload() {
        let bytes = Frame::binary(vec![1u8; 300]).to_bytes();
        let mut buf = BytesMut::from(&bytes[..4]);
        let err = Frame::decode(&mut buf, 256).unwrap_err();
        assert!(matches!(err, Error::Frame(FrameError::TooLarge { size: 300, max: 256 })));
    }

    #[test]
    fn test_close_frame() {
        let bytes = Frame::close(Some(1000), Some("Goodbye")).to_bytes();

        assert_eq!(bytes[0], 0x88);
        assert_eq!(bytes[1], 0x09); // 2 byte code + 7 byte reason
        assert_eq!(&bytes[2..4], 1000u16.to_be_bytes());
        assert_eq!(&bytes[4..], b"Goodbye");
    }

    #[test]
    fn test_frame_parser_reassembles_split_reads() {
        let mut parser = FrameParser::new();
        let bytes1 = Frame::text("frame1").to_bytes();
        let bytes2 = Frame::pong(Bytes::new()).to_bytes();

        assert!(parser.feed(&bytes1[..1]).is_empty());
        assert!(parser.feed(&bytes1[1..5]).is_empty());
        assert_eq!(parser.buffered_bytes(), 5);

        let mut tail = bytes1[5..].to_vec();
        tail.extend_from_slice(&bytes2);
        let frames = parser.feed(&tail);
        assert_eq!(frames.len(), 2);
        assert!(frames[0].as_ref().unwrap().is_data());
        assert!(frames[1].as_ref().unwrap().is_control());
        assert_eq!(parser.buffered_bytes(), 0);
    }

    #[test]
    fn test_frame_parser_stops_on_error() {
        let mut parser = FrameParser::new();
        let mut raw = Frame::text("ok").to_bytes().to_vec();
        raw.extend_from_slice(&[0xF1, 0x00, 0x81, 0x00]);

        let frames = parser.feed(&raw);
        assert_eq!(frames.len(), 2);
        assert!(frames[0].is_ok());
        assert!(frames[1].is_err());
        assert_eq!(parser.buffered_bytes(), 0);
    }

    #[test]
    fn test_fragmentation_sequence() {
        let mut encoder = FrameEncoder::new();

        let start = decode(&encoder.encode_text("part1", true)).unwrap();
        assert_eq!((start.fin, start.opcode), (false, Opcode::Text));
        assert_eq!(encoder.state(), FragmentState::Started);

        for _ in 0..2 {
            let middle = decode(&encoder.encode_text("part2", true)).unwrap();
            assert_eq!((middle.fin, middle.opcode), (false, Opcode::Continuation));
            assert_eq!(encoder.state(), FragmentState::Middle);
        }

        let last = decode(&encoder.encode_text("part3", false)).unwrap();
        assert_eq!((last.fin, last.opcode), (true, Opcode::Continuation));
        assert_eq!(encoder.state(), FragmentState::Idle);

        let plain = decode(&encoder.encode_text("whole", false)).unwrap();
        assert_eq!((plain.fin, plain.opcode), (true, Opcode::Text));
    }

    #[test]
    fn test_two_fragment_message_has_no_middle() {
        let mut encoder = FrameEncoder::new();
        let first = decode(&encoder.encode_binary(b"ab", true)).unwrap();
        let last = decode(&encoder.encode_binary(b"cd", false)).unwrap();

        assert_eq!((first.fin, first.opcode), (false, Opcode::Binary));
        assert_eq!((last.fin, last.opcode), (true, Opcode::Continuation));
    }

    #[test]
    fn test_control_frames() {
        for opcode in [0x8u8, 0x9, 0xA] {
            let bytes = FrameEncoder::encode_control(opcode).unwrap();
            assert_eq!(bytes.len(), 6);
            assert_eq!(bytes[0], 0x80 | opcode);
            assert_eq!(bytes[1], 0x80);
        }
    }

    #[test]
    fn test_control_frame_rejects_other_opcodes() {
        for opcode in [0x0u8, 0x1, 0x2, 0x3, 0xB, 0xFF] {
            let err = FrameEncoder::encode_control(opcode).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        }
    }

    #[test]
    fn test_pong_echoes_payload() {
        let frame = decode(&FrameEncoder::encode_pong(b"keepalive").unwrap()).unwrap();
        assert_eq!(frame.opcode, Opcode::Pong);
        assert_eq!(&frame.payload[..], b"keepalive");
        assert!(FrameEncoder::encode_pong(&[0u8; 126]).is_err());
    }

    #[test]
    fn test_hex_dump() {
        assert_eq!(hex_dump(&[0x81, 0x05, 0xff]), "81 05 ff ");
        assert_eq!(hex_dump(&[]), "");
    }

    #[test]
    fn test_describe() {
        let frame = Frame::text("hello").masked_with([1, 2, 3, 4]).fin(false);
        assert_eq!(
            frame.describe(),
            "Header: opcode=0x01(text frame) RSV=0x00 FIN=false(Fragment) MASK=true mask=[1,2,3,4] length=5(bytes)"
        );
        assert_eq!(
            Frame::pong(Bytes::new()).describe(),
            "Header: opcode=0x0a(pong) RSV=0x00 FIN=true MASK=false length=0(bytes)"
        );
    }

    #[test]
    fn test_frame_dump_unmasks_outgoing_frames() {
        let raw = Frame::text("HEARTBEAT").masked_with([9, 8, 7, 6]).to_bytes();
        let dump = FrameDump::inspect(&raw).unwrap();

        assert_eq!(dump.message, "HEARTBEAT");
        assert!(dump.header.starts_with("Header: opcode=0x01(text frame)"));
        assert!(dump.hex.starts_with("81 89 09 08 07 06 "));
    }

    #[test]
    fn test_frame_dump_of_reserved_opcode() {
        let dump = FrameDump::inspect(&[0x83, 0x01, b'x']).unwrap();
        assert_eq!(
            dump.header,
            "Header: opcode=0x03 RSV=0x00 FIN=true MASK=false length=1(bytes)"
        );
        assert_eq!(dump.message, "x");
        assert!(FrameDump::inspect(&[0x81]).is_err());
    }

    proptest! {
        #[test]
        fn prop_mask_twice_is_identity(
            data in proptest::collection::vec(any::<u8>(), 0..512),
            key in any::<[u8; 4]>(),
        ) {
            let mut masked = data.clone();
            apply_mask(&mut masked, key);
            apply_mask(&mut masked, key);
            prop_assert_eq!(masked, data);
        }

        #[test]
        fn prop_masked_roundtrip(
            data in proptest::collection::vec(any::<u8>(), 0..70_000),
            fin in any::<bool>(),
        ) {
            let bytes = Frame::binary(data.clone()).fin(fin).masked().to_bytes();
            let frame = decode(&bytes).unwrap();
            prop_assert_eq!(frame.fin, fin);
            prop_assert_eq!(frame.opcode, Opcode::Binary);
            prop_assert_eq!(&frame.payload[..], &data[..]);
        }
    }
}
