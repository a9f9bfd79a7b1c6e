//! Probe configuration
//!
//! Defaults match the irc-hybrid-client development server: plain HTTP on
//! `localhost:3003` with the WebSocket endpoint at `/irc/ws`.

use crate::sequencer::WatchdogPolicy;
use http::Uri;
use std::path::PathBuf;
use std::time::Duration;
use wsprobe_core::error::ConfigError;
use wsprobe_core::handshake::HandshakeRequestOptions;
use wsprobe_core::protocol::constants::{DEFAULT_MAX_FRAME_SIZE, MAX_CONTROL_PAYLOAD};
use wsprobe_core::transport::{ConnectOptions, TlsOptions, TlsVersion};
use wsprobe_core::{Error, Result};

/// Base URL of the web server under test
pub const ENV_WEB_URL: &str = "TESTENV_WEB_URL";
/// WebSocket path override
pub const ENV_WS_PATH: &str = "TESTENV_WS_PATH";
/// Session cookie sent with the upgrade request
pub const ENV_WS_COOKIE: &str = "TESTENV_WS_COOKIE";
/// `0` or `false` disables TLS certificate verification
pub const ENV_TLS_VERIFY: &str = "TESTENV_TLS_VERIFY";
/// `1` prints every frame to standard output
pub const ENV_SHOW_WEBSOCKET: &str = "SHOWWEBSOCKET";

/// Message sent to the server to exercise its handling of unexpected input
pub const DEFAULT_AD_HOC_MESSAGE: &str = "Test script: write websocket message to server";

/// Probe configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeConfig {
    /// Server host name
    pub host: String,
    /// Server port
    pub port: u16,
    /// WebSocket endpoint path
    pub path: String,
    /// `Origin` header value
    pub origin: String,
    /// TLS configuration; `None` for plain TCP
    pub tls: Option<TlsConfig>,
    /// Session cookie for the upgrade request
    pub cookie: Option<String>,
    /// Pacing interval between sequence steps
    pub tick_interval: Duration,
    /// Overall deadline for reaching the close step
    pub timeout: Duration,
    /// How long to wait for the server after sending CLOSE
    pub watchdog: Duration,
    /// Connect timeout, TLS negotiation included
    pub connect_timeout: Duration,
    /// Heartbeats required before the probe closes
    pub heartbeat_threshold: u32,
    /// Substring identifying a heartbeat text message
    pub heartbeat_token: String,
    /// Unexpected text message sent after the ping
    pub ad_hoc_message: String,
    /// Largest accepted frame payload
    pub max_frame_size: usize,
    /// Whether the watchdog discards recorded failures
    pub watchdog_policy: WatchdogPolicy,
    /// Print every frame to standard output
    pub show_frames: bool,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 3003,
            path: "/irc/ws".to_string(),
            origin: "http://localhost:3003".to_string(),
            tls: None,
            cookie: None,
            tick_interval: Duration::from_millis(10),
            timeout: Duration::from_secs(30),
            watchdog: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(10),
            heartbeat_threshold: 2,
            heartbeat_token: "HEARTBEAT".to_string(),
            ad_hoc_message: DEFAULT_AD_HOC_MESSAGE.to_string(),
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            watchdog_policy: WatchdogPolicy::default(),
            show_frames: false,
        }
    }
}

fn invalid(message: &str) -> Error {
    Error::Config(ConfigError::Validation(message.to_string()))
}

impl ProbeConfig {
    /// Configuration for a web server base URL, e.g. `https://irc.example.com/`
    ///
    /// `http`/`https` and `ws`/`wss` schemes are accepted. The origin is the
    /// URL's scheme and authority. A non-root path is only taken as the
    /// WebSocket path for `ws`/`wss` URLs.
    pub fn from_url(url: &str) -> Result<Self> {
        let uri: Uri = url.parse().map_err(|e: http::uri::InvalidUri| {
            ConfigError::InvalidValue {
                field: "url".to_string(),
                value: format!("{}: {}", url, e),
            }
        })?;

        let (secure, websocket) = match uri.scheme_str() {
            Some("http") => (false, false),
            Some("https") => (true, false),
            Some("ws") => (false, true),
            Some("wss") => (true, true),
            _ => {
                return Err(ConfigError::InvalidValue {
                    field: "url".to_string(),
                    value: format!("{}: unsupported scheme", url),
                }
                .into())
            }
        };

        let host = uri
            .host()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| ConfigError::MissingField {
                field: "url host".to_string(),
            })?;
        let port = uri.port_u16().unwrap_or(if secure { 443 } else { 80 });

        let authority = match uri.port_u16() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };
        let origin = format!("{}://{}", if secure { "https" } else { "http" }, authority);

        let mut config = Self {
            host: host.trim_matches(|c| c == '[' || c == ']').to_string(),
            port,
            origin,
            tls: secure.then(TlsConfig::default),
            ..Self::default()
        };
        if websocket && uri.path() != "/" && !uri.path().is_empty() {
            config.path = uri.path().to_string();
        }
        Ok(config)
    }

    /// Configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match lookup(ENV_WEB_URL) {
            Some(url) if !url.trim().is_empty() => Self::from_url(url.trim())?,
            _ => Self::default(),
        };

        if let Some(path) = lookup(ENV_WS_PATH).filter(|p| !p.is_empty()) {
            config.path = path;
        }
        if let Some(cookie) = lookup(ENV_WS_COOKIE).filter(|c| !c.is_empty()) {
            config.cookie = Some(cookie);
        }
        if let Some(verify) = lookup(ENV_TLS_VERIFY) {
            let verify = !matches!(verify.trim(), "0" | "false" | "no");
            if let Some(tls) = config.tls.as_mut() {
                tls.verify = verify;
            }
        }
        config.show_frames = lookup(ENV_SHOW_WEBSOCKET).is_some_and(|v| v.trim() == "1");

        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.host.is_empty() {
            return Err(invalid("host must not be empty"));
        }

        if self.port == 0 {
            return Err(invalid("port must be greater than 0"));
        }

        if !self.path.starts_with('/') {
            return Err(invalid("path must start with '/'"));
        }

        if self.tick_interval.is_zero() {
            return Err(invalid("tick_interval must be greater than 0"));
        }

        if self.timeout.is_zero() || self.watchdog.is_zero() || self.connect_timeout.is_zero() {
            return Err(invalid("timeouts must be greater than 0"));
        }

        if self.heartbeat_token.is_empty() {
            return Err(invalid("heartbeat_token must not be empty"));
        }

        if self.max_frame_size < MAX_CONTROL_PAYLOAD {
            return Err(invalid("max_frame_size must be at least 125"));
        }

        if self.cookie.as_deref().is_some_and(|c| c.contains(['\r', '\n'])) {
            return Err(invalid("cookie must not contain line breaks"));
        }

        Ok(())
    }

    /// Set host
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set port
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set WebSocket path
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Set origin
    pub fn origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = origin.into();
        self
    }

    /// Set TLS configuration
    pub fn tls(mut self, config: TlsConfig) -> Self {
        self.tls = Some(config);
        self
    }

    /// Set session cookie
    pub fn cookie(mut self, cookie: impl Into<String>) -> Self {
        self.cookie = Some(cookie.into());
        self
    }

    /// Set pacing interval
    pub fn tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// Set overall timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set close watchdog
    pub fn watchdog(mut self, watchdog: Duration) -> Self {
        self.watchdog = watchdog;
        self
    }

    /// Set connect timeout
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set required heartbeat count
    pub fn heartbeat_threshold(mut self, count: u32) -> Self {
        self.heartbeat_threshold = count;
        self
    }

    /// Set heartbeat token
    pub fn heartbeat_token(mut self, token: impl Into<String>) -> Self {
        self.heartbeat_token = token.into();
        self
    }

    /// Set the ad-hoc message
    pub fn ad_hoc_message(mut self, message: impl Into<String>) -> Self {
        self.ad_hoc_message = message.into();
        self
    }

    /// Set maximum frame size
    pub fn max_frame_size(mut self, size: usize) -> Self {
        self.max_frame_size = size;
        self
    }

    /// Set watchdog policy
    pub fn watchdog_policy(mut self, policy: WatchdogPolicy) -> Self {
        self.watchdog_policy = policy;
        self
    }

    /// Enable frame tracing to standard output
    pub fn show_frames(mut self, show: bool) -> Self {
        self.show_frames = show;
        self
    }

    /// Transport options for this probe
    pub fn connect_options(&self) -> ConnectOptions {
        ConnectOptions {
            host: self.host.clone(),
            port: self.port,
            tls: self.tls.as_ref().map(TlsConfig::to_options),
            connect_timeout: self.connect_timeout,
            nodelay: true,
        }
    }

    /// Upgrade request options for this probe
    pub fn handshake_options(&self) -> HandshakeRequestOptions {
        HandshakeRequestOptions {
            host: self.host.clone(),
            port: self.port,
            path: self.path.clone(),
            origin: self.origin.clone(),
            cookie: self.cookie.clone(),
        }
    }
}

/// TLS configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsConfig {
    /// Verify the server certificate and host name
    pub verify: bool,
    /// Path to CA certificate file
    pub ca_file: Option<PathBuf>,
    /// Server name for SNI
    pub server_name: Option<String>,
    /// Minimum TLS version
    pub min_version: TlsVersion,
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self {
            verify: true,
            ca_file: None,
            server_name: None,
            min_version: TlsVersion::Tls12,
        }
    }
}

impl TlsConfig {
    fn to_options(&self) -> TlsOptions {
        TlsOptions {
            verify_host: self.verify,
            server_name: self.server_name.clone(),
            ca_file: self.ca_file.clone(),
            min_version: self.min_version,
        }
    }
}
