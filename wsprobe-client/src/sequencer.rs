//! Probe sequence state machine
//!
//! [`Sequencer`] owns all state of one probe run and performs no I/O. The
//! driver feeds it socket events and timer expiries and carries out the
//! [`Action`]s it returns. One step of the sequence advances per pacing tick:
//!
//! 1. write the upgrade request, one line per tick
//! 2. wait for `101 Switching Protocols`
//! 3. send PING and expect a PONG
//! 4. send one unexpected text message
//! 5. once enough heartbeats arrived, send CLOSE and arm the watchdog
//! 6. finish on the server's CLOSE, socket close, or watchdog expiry

use crate::config::ProbeConfig;
use crate::report::{ProbeFailure, ProbeReport};
use bytes::{Bytes, BytesMut};
use std::fmt;
use std::time::Duration;
use wsprobe_core::frame::{Frame, FrameEncoder, FrameParser};
use wsprobe_core::handshake::{self, HandshakeContext};
use wsprobe_core::protocol::{constants::CRLF, Opcode};
use wsprobe_core::{Error, ErrorKind};

/// Step of the probe sequence
///
/// The numeric codes are stable and appear in logs and reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum ProbeState {
    /// Not started
    Init = 0,
    /// Opening the socket
    Connecting = 1,
    /// Socket open, writing the upgrade request
    SocketConnected = 2,
    /// Upgrade request written, waiting for the response
    HttpRequestSent = 3,
    /// Server accepted the upgrade
    UpgradeAccepted = 4,
    /// WebSocket open
    WebSocketConnected = 5,
    /// About to send PING
    SendingPing = 6,
    /// PING sent
    AwaitingPingResult = 7,
    /// About to send the ad-hoc message
    SendingAdHocMessage = 8,
    /// Ad-hoc message sent
    AwaitingAdHocResult = 9,
    /// Waiting for enough heartbeats to send CLOSE
    SendingClose = 10,
    /// CLOSE sent, waiting for the server or the watchdog
    ClosingWatchdog = 11,
    /// Finished
    Done = 99,
}

impl ProbeState {
    /// Stable numeric code
    pub fn code(self) -> u8 {
        self as u8
    }

    fn name(self) -> &'static str {
        match self {
            ProbeState::Init => "Init",
            ProbeState::Connecting => "Connecting",
            ProbeState::SocketConnected => "SocketConnected",
            ProbeState::HttpRequestSent => "HttpRequestSent",
            ProbeState::UpgradeAccepted => "UpgradeAccepted",
            ProbeState::WebSocketConnected => "WebSocketConnected",
            ProbeState::SendingPing => "SendingPing",
            ProbeState::AwaitingPingResult => "AwaitingPingResult",
            ProbeState::SendingAdHocMessage => "SendingAdHocMessage",
            ProbeState::AwaitingAdHocResult => "AwaitingAdHocResult",
            ProbeState::SendingClose => "SendingClose",
            ProbeState::ClosingWatchdog => "ClosingWatchdog",
            ProbeState::Done => "Done",
        }
    }
}

impl fmt::Display for ProbeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name(), self.code())
    }
}

/// What happens to recorded failures when the close watchdog expires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WatchdogPolicy {
    /// Keep every failure recorded so far
    #[default]
    PreserveErrors,
    /// Discard recorded failures and report success
    ForceSuccess,
}

/// Side effect requested by the sequencer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Write these bytes to the socket
    Write(Bytes),
    /// Start the close watchdog
    ArmWatchdog(Duration),
}

/// Sans-IO probe state machine
#[derive(Debug)]
pub struct Sequencer {
    state: ProbeState,
    handshake: HandshakeContext,
    next_line: usize,
    response: BytesMut,
    parser: FrameParser,
    encoder: FrameEncoder,
    pong_count: u32,
    heartbeat_count: u32,
    failures: Vec<ProbeFailure>,
    heartbeat_threshold: u32,
    heartbeat_token: String,
    ad_hoc_message: String,
    watchdog: Duration,
    watchdog_policy: WatchdogPolicy,
    show_frames: bool,
}

impl Sequencer {
    /// Create a sequencer with a freshly generated handshake key
    pub fn new(config: &ProbeConfig) -> Self {
        let handshake = HandshakeContext::new(&config.handshake_options());
        Self::with_handshake(config, handshake)
    }

    /// Create a sequencer for a prepared handshake
    pub fn with_handshake(config: &ProbeConfig, handshake: HandshakeContext) -> Self {
        Self {
            state: ProbeState::Init,
            handshake,
            next_line: 0,
            response: BytesMut::new(),
            parser: FrameParser::with_max_frame_size(config.max_frame_size),
            encoder: FrameEncoder::new(),
            pong_count: 0,
            heartbeat_count: 0,
            failures: Vec::new(),
            heartbeat_threshold: config.heartbeat_threshold,
            heartbeat_token: config.heartbeat_token.clone(),
            ad_hoc_message: config.ad_hoc_message.clone(),
            watchdog: config.watchdog,
            watchdog_policy: config.watchdog_policy,
            show_frames: config.show_frames,
        }
    }

    /// Current state
    pub fn state(&self) -> ProbeState {
        self.state
    }

    /// Whether the run has finished
    pub fn is_done(&self) -> bool {
        self.state == ProbeState::Done
    }

    /// PONG frames received so far
    pub fn pong_count(&self) -> u32 {
        self.pong_count
    }

    /// Heartbeats received so far
    pub fn heartbeat_count(&self) -> u32 {
        self.heartbeat_count
    }

    /// Failures recorded so far
    pub fn failures(&self) -> &[ProbeFailure] {
        &self.failures
    }

    /// The handshake this run uses
    pub fn handshake(&self) -> &HandshakeContext {
        &self.handshake
    }

    /// Snapshot the outcome
    pub fn report(&self, elapsed: Duration) -> ProbeReport {
        ProbeReport {
            state: self.state,
            pong_count: self.pong_count,
            heartbeat_count: self.heartbeat_count,
            failures: self.failures.clone(),
            elapsed,
        }
    }

    /// The socket is being opened
    pub fn start(&mut self) {
        if self.state == ProbeState::Init {
            self.transition(ProbeState::Connecting);
        }
    }

    /// The socket is open
    pub fn on_connected(&mut self) {
        if self.state == ProbeState::Connecting {
            self.transition(ProbeState::SocketConnected);
        }
    }

    /// Pacing tick: advance at most one step
    pub fn on_tick(&mut self) -> Vec<Action> {
        let mut actions = Vec::new();

        match self.state {
            ProbeState::SocketConnected => self.write_request_line(&mut actions),
            ProbeState::UpgradeAccepted => self.transition(ProbeState::WebSocketConnected),
            ProbeState::WebSocketConnected => self.transition(ProbeState::SendingPing),
            ProbeState::SendingPing => {
                self.send_control(Opcode::Ping, &mut actions);
                self.transition(ProbeState::AwaitingPingResult);
            }
            ProbeState::AwaitingPingResult => self.transition(ProbeState::SendingAdHocMessage),
            ProbeState::SendingAdHocMessage => {
                let bytes = self.encoder.encode_text(&self.ad_hoc_message, false);
                self.send_frame(bytes, &mut actions);
                self.transition(ProbeState::AwaitingAdHocResult);
            }
            ProbeState::AwaitingAdHocResult => self.transition(ProbeState::SendingClose),
            ProbeState::SendingClose if self.heartbeat_count >= self.heartbeat_threshold => {
                self.send_control(Opcode::Close, &mut actions);
                actions.push(Action::ArmWatchdog(self.watchdog));
                self.transition(ProbeState::ClosingWatchdog);
            }
            _ => {}
        }

        actions
    }

    /// Bytes arrived from the socket
    pub fn on_data(&mut self, data: &[u8]) -> Vec<Action> {
        let mut actions = Vec::new();

        match self.state {
            ProbeState::Done => {}
            state if state < ProbeState::UpgradeAccepted => {
                self.on_response_bytes(data, &mut actions)
            }
            _ => self.on_frame_bytes(data, &mut actions),
        }

        actions
    }

    /// The server closed the socket
    pub fn on_closed(&mut self) {
        match self.state {
            ProbeState::Done => {}
            ProbeState::ClosingWatchdog => {
                crate::log_debug!("socket closed after close frame");
                self.complete();
            }
            _ => self.abort(
                ErrorKind::TransportError,
                "Websocket connection closed unexpectedly",
            ),
        }
    }

    /// The socket failed
    pub fn on_error(&mut self, err: &Error) {
        match self.state {
            ProbeState::Done => {}
            ProbeState::ClosingWatchdog => {
                crate::log_debug!("socket error after close frame: {}", err);
                self.complete();
            }
            _ => {
                let kind = match err.kind() {
                    ErrorKind::Timeout => ErrorKind::Timeout,
                    _ => ErrorKind::TransportError,
                };
                self.abort(kind, failure_message(err));
            }
        }
    }

    /// The overall deadline elapsed
    pub fn on_deadline(&mut self) {
        if self.state < ProbeState::ClosingWatchdog {
            let message = format!("Websocket timed out waiting for {}", self.heartbeat_token);
            self.abort(ErrorKind::Timeout, message);
        }
    }

    /// The close watchdog expired
    pub fn on_watchdog(&mut self) {
        if self.state != ProbeState::ClosingWatchdog {
            return;
        }

        crate::log_debug!("close watchdog expired");
        self.complete();
        if self.watchdog_policy == WatchdogPolicy::ForceSuccess && !self.failures.is_empty() {
            crate::log_warn!("discarding {} failure(s) on watchdog", self.failures.len());
            self.failures.clear();
        }
    }

    fn transition(&mut self, next: ProbeState) {
        crate::log_debug!("probe state {} -> {}", self.state, next);
        self.state = next;
    }

    fn fail(&mut self, kind: ErrorKind, message: impl Into<String>) {
        let failure = ProbeFailure::new(kind, message);
        crate::log_warn!("probe failure: {}", failure);
        self.failures.push(failure);
    }

    fn abort(&mut self, kind: ErrorKind, message: impl Into<String>) {
        self.fail(kind, message);
        self.transition(ProbeState::Done);
    }

    fn abort_with(&mut self, err: &Error) {
        self.abort(err.kind(), failure_message(err));
    }

    /// Normal end of the sequence
    fn complete(&mut self) {
        if self.pong_count == 0 {
            self.fail(ErrorKind::ExpectationUnmet, "Failed to receive websocket PONG");
        }
        self.transition(ProbeState::Done);
    }

    fn write_request_line(&mut self, actions: &mut Vec<Action>) {
        let lines = self.handshake.request_lines();
        let total = lines.len();
        let Some(line) = lines.get(self.next_line) else {
            return;
        };

        crate::log_debug!("http request: {}", line);
        actions.push(Action::Write(Bytes::from(format!("{}{}", line, CRLF))));
        self.next_line += 1;

        if self.next_line == total {
            actions.push(Action::Write(Bytes::from_static(CRLF.as_bytes())));
            self.transition(ProbeState::HttpRequestSent);
        }
    }

    fn on_response_bytes(&mut self, data: &[u8], actions: &mut Vec<Action>) {
        self.response.extend_from_slice(data);

        let (response, header_len) = match handshake::parse_response(&self.response) {
            Ok(Some(parsed)) => parsed,
            Ok(None) => return,
            Err(err) => return self.abort_with(&err),
        };

        if let Err(err) = self.handshake.validate(&response) {
            return self.abort_with(&err);
        }

        crate::log_info!("Websocket connected: {}", response.status_line());
        self.transition(ProbeState::UpgradeAccepted);

        let early = self.response.split_off(header_len);
        self.response = BytesMut::new();
        if !early.is_empty() {
            self.on_frame_bytes(&early, actions);
        }
    }

    fn on_frame_bytes(&mut self, data: &[u8], actions: &mut Vec<Action>) {
        for result in self.parser.feed(data) {
            if self.is_done() {
                break;
            }
            match result {
                Ok(frame) => self.on_frame(frame, actions),
                Err(err) => {
                    self.abort_with(&err);
                    break;
                }
            }
        }
    }

    fn on_frame(&mut self, frame: Frame, actions: &mut Vec<Action>) {
        #[cfg(feature = "metrics")]
        metrics::counter!("wsprobe_frames_received_total").increment(1);

        if self.show_frames {
            crate::logging::print_frame("In", &frame.to_bytes());
        }
        crate::log_trace!("received {}", frame.describe());

        match frame.opcode {
            Opcode::Pong => {
                self.pong_count += 1;
                crate::log_info!("PONG detected");

                #[cfg(feature = "metrics")]
                metrics::counter!("wsprobe_pongs_total").increment(1);
            }
            Opcode::Text => {
                let text = frame.payload_text();
                if text.contains(self.heartbeat_token.as_str()) {
                    self.heartbeat_count += 1;
                    crate::log_info!(
                        "{} detected ({} so far)",
                        self.heartbeat_token,
                        self.heartbeat_count
                    );

                    #[cfg(feature = "metrics")]
                    metrics::counter!("wsprobe_heartbeats_total").increment(1);
                } else {
                    crate::log_debug!("text message: {}", text);
                }
            }
            Opcode::Ping => match FrameEncoder::encode_pong(&frame.payload) {
                Ok(bytes) => {
                    crate::log_debug!("answering server PING");
                    self.send_frame(bytes, actions);
                }
                Err(err) => self.abort_with(&err),
            },
            Opcode::Close if self.state == ProbeState::ClosingWatchdog => {
                crate::log_info!("Websocket close handshake complete");
                self.complete();
            }
            Opcode::Close => self.abort(
                ErrorKind::TransportError,
                "Websocket closed by server before the probe finished",
            ),
            Opcode::Binary | Opcode::Continuation => {
                crate::log_debug!("ignoring {} with {} bytes", frame.opcode, frame.payload.len());
            }
        }
    }

    fn send_control(&mut self, opcode: Opcode, actions: &mut Vec<Action>) {
        match FrameEncoder::encode_control(opcode.value()) {
            Ok(bytes) => self.send_frame(bytes, actions),
            Err(err) => self.abort_with(&err),
        }
    }

    fn send_frame(&mut self, bytes: Bytes, actions: &mut Vec<Action>) {
        #[cfg(feature = "metrics")]
        metrics::counter!("wsprobe_frames_sent_total").increment(1);

        if self.show_frames {
            crate::logging::print_frame("Out", &bytes);
        }
        actions.push(Action::Write(bytes));
    }
}

fn failure_message(err: &Error) -> String {
    match err {
        Error::Handshake(err) => err.to_string(),
        other => other.to_string(),
    }
}
