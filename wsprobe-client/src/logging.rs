//! Logging utilities for the probe
//!
//! Leveled macros route to `tracing` when the `logging` feature is enabled and
//! to stderr otherwise. [`print_frame`] is the `SHOWWEBSOCKET` frame trace,
//! which always goes to stdout.

use wsprobe_core::frame::{hex_dump, FrameDump};

/// Log an error message
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        #[cfg(feature = "logging")]
        {
            tracing::error!($($arg)*);
        }
        #[cfg(not(feature = "logging"))]
        {
            eprintln!("[ERROR] {}", format!($($arg)*));
        }
    };
}

/// Log a warning message
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        #[cfg(feature = "logging")]
        {
            tracing::warn!($($arg)*);
        }
        #[cfg(not(feature = "logging"))]
        {
            eprintln!("[WARN] {}", format!($($arg)*));
        }
    };
}

/// Log an info message
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        #[cfg(feature = "logging")]
        {
            tracing::info!($($arg)*);
        }
        #[cfg(not(feature = "logging"))]
        {
            eprintln!("[INFO] {}", format!($($arg)*));
        }
    };
}

/// Log a debug message
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        #[cfg(feature = "logging")]
        {
            tracing::debug!($($arg)*);
        }
        #[cfg(not(feature = "logging"))]
        {
            eprintln!("[DEBUG] {}", format!($($arg)*));
        }
    };
}

/// Log a trace message
#[macro_export]
macro_rules! log_trace {
    ($($arg:tt)*) => {
        #[cfg(feature = "logging")]
        {
            tracing::trace!($($arg)*);
        }
        #[cfg(not(feature = "logging"))]
        {
            eprintln!("[TRACE] {}", format!($($arg)*));
        }
    };
}

/// Initialize logging subsystem
#[cfg(feature = "logging")]
pub fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .try_init()?;

    Ok(())
}

/// Initialize logging subsystem (no-op when logging feature is disabled)
#[cfg(not(feature = "logging"))]
pub fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    Ok(())
}

/// Render one raw frame for the frame trace
pub fn format_frame(direction: &str, raw: &[u8]) -> String {
    match FrameDump::inspect(raw) {
        Ok(dump) => format!(
            "---- {} ----\n{}\n{}\nMessage: {}",
            direction, dump.hex, dump.header, dump.message
        ),
        Err(err) => format!("---- {} ----\n{}\n{}", direction, hex_dump(raw), err),
    }
}

/// Print one raw frame to stdout
pub fn print_frame(direction: &str, raw: &[u8]) {
    println!("{}", format_frame(direction, raw));
}

#[cfg(test)]
mod tests {
    use super::*;
    use wsprobe_core::frame::Frame;

    #[test]
    fn test_logging_macros() {
        crate::log_info!("Test info message");
        crate::log_warn!("Test warning message");
        crate::log_error!("Test error message");
        crate::log_debug!("Test debug message {}", 42);
        crate::log_trace!("Test trace message");
    }

    #[test]
    fn test_format_frame() {
        let raw = Frame::text("HEARTBEAT").masked_with([1, 2, 3, 4]).to_bytes();
        let out = format_frame("In", &raw);
        let lines: Vec<&str> = out.lines().collect();

        assert_eq!(lines[0], "---- In ----");
        assert!(lines[1].starts_with("81 89 01 02 03 04 "));
        assert!(lines[2].starts_with("Header: opcode=0x01(text frame)"));
        assert_eq!(lines[3], "Message: HEARTBEAT");
    }

    #[test]
    fn test_format_truncated_frame() {
        let out = format_frame("Out", &[0x81]);
        assert!(out.starts_with("---- Out ----\n81 \n"));
    }
}
