//! Domain-specific error types for the display protocol stack.
//!
//! All fallible operations return `Result<T, ScreenError>`.
//! Nothing in the core panics or exits the process; every failure is
//! typed and handed back to the caller, who owns retry policy.

use std::time::Duration;
use thiserror::Error;

// ── ErrorClass ────────────────────────────────────────────────────

/// Coarse classification used by callers to pick a recovery strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Bad setup: missing port, oversized parameters or payloads.
    /// Never worth retrying.
    Configuration,
    /// The underlying byte channel failed. The caller may retry.
    Transport,
    /// A bitmap does not fit the device. Caller programming error.
    Bounds,
    /// A peer sent something the proxy or codec cannot accept.
    Protocol,
}

// ── ScreenError ───────────────────────────────────────────────────

/// The canonical error type for the display protocol stack.
#[derive(Debug, Error)]
pub enum ScreenError {
    // ── Configuration Errors ─────────────────────────────────────
    /// No serial port name contains the requested substring.
    #[error("serial port matching {0:?} not found")]
    PortNotFound(String),

    /// Too many command parameters, or one does not fit in 10 bits.
    #[error("parameter overflow: {0}")]
    ParamOverflow(&'static str),

    /// An option payload is larger than its fixed region.
    #[error("payload too large: {size} bytes (max {max})")]
    PayloadOverflow { size: usize, max: usize },

    /// No mixer effect is registered under this name.
    #[error("unknown effect: {0:?}")]
    UnknownEffect(String),

    /// `start` was called on a proxy that is running or has run.
    #[error("proxy already started")]
    AlreadyStarted,

    // ── Bounds Errors ────────────────────────────────────────────
    /// `x + image width` exceeds the device width.
    #[error("width overflow: {x} + {width} > {limit}")]
    WidthOverflow { x: u32, width: u32, limit: u32 },

    /// `y + image height` exceeds the device height.
    #[error("height overflow: {y} + {height} > {limit}")]
    HeightOverflow { y: u32, height: u32, limit: u32 },

    // ── Transport Errors ─────────────────────────────────────────
    /// The serial / TCP / IO layer reported an error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The serial driver reported an error while enumerating or opening.
    #[error("serial error: {0}")]
    Serial(#[from] serialport::Error),

    /// I/O was attempted on a transport that has been closed.
    #[error("transport closed")]
    TransportClosed,

    /// An mpsc channel was closed unexpectedly.
    #[error("channel closed")]
    ChannelClosed,

    /// An operation exceeded its deadline.
    #[error("timeout after {0:?}")]
    Timeout(Duration),

    // ── Protocol Errors ──────────────────────────────────────────
    /// The RPC `Command` name is not one of startup/shutdown/restart.
    #[error("unknown command: {0:?}")]
    UnknownCommand(String),

    /// An image payload could not be encoded or decoded.
    #[error("invalid image: {0}")]
    InvalidImage(String),

    /// Received bytes that do not start with the RPC magic.
    #[error("invalid magic bytes: expected USB0")]
    InvalidMagic,

    /// Frame size exceeded the codec limit.
    #[error("frame too large: {size} bytes (max {max})")]
    FrameTooLarge { size: usize, max: usize },

    /// Encoding or decoding of an RPC payload failed.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// A byte that is not part of the firmware opcode set.
    #[error("unknown opcode: {0}")]
    UnknownOpcode(u8),

    /// The remote proxy rejected the call; carries its error message.
    #[error("remote error: {0}")]
    Remote(String),

    /// Catch-all for errors that do not fit another variant.
    #[error("{0}")]
    Other(String),
}

impl ScreenError {
    /// Which part of the error taxonomy this error belongs to.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::PortNotFound(_)
            | Self::ParamOverflow(_)
            | Self::PayloadOverflow { .. }
            | Self::UnknownEffect(_)
            | Self::AlreadyStarted => ErrorClass::Configuration,
            Self::WidthOverflow { .. } | Self::HeightOverflow { .. } => ErrorClass::Bounds,
            Self::UnknownCommand(_)
            | Self::InvalidImage(_)
            | Self::InvalidMagic
            | Self::FrameTooLarge { .. }
            | Self::Encoding(_)
            | Self::UnknownOpcode(_)
            | Self::Remote(_) => ErrorClass::Protocol,
            Self::Io(_)
            | Self::Serial(_)
            | Self::TransportClosed
            | Self::ChannelClosed
            | Self::Timeout(_)
            | Self::Other(_) => ErrorClass::Transport,
        }
    }
}

// ── Convenient From implementations ──────────────────────────────

impl From<String> for ScreenError {
    fn from(s: String) -> Self {
        ScreenError::Other(s)
    }
}

impl From<&str> for ScreenError {
    fn from(s: &str) -> Self {
        ScreenError::Other(s.to_string())
    }
}

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for ScreenError {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        ScreenError::ChannelClosed
    }
}

impl From<Box<bincode::ErrorKind>> for ScreenError {
    fn from(e: Box<bincode::ErrorKind>) -> Self {
        ScreenError::Encoding(e.to_string())
    }
}

impl From<image::ImageError> for ScreenError {
    fn from(e: image::ImageError) -> Self {
        ScreenError::InvalidImage(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let e = ScreenError::PortNotFound("ttyACM".into());
        assert!(e.to_string().contains("ttyACM"));

        let e = ScreenError::PayloadOverflow { size: 17, max: 16 };
        assert!(e.to_string().contains("17"));
        assert!(e.to_string().contains("16"));

        let e = ScreenError::HeightOverflow {
            y: 470,
            height: 11,
            limit: 480,
        };
        assert!(e.to_string().contains("470 + 11 > 480"));
    }

    #[test]
    fn from_string() {
        let e: ScreenError = "something broke".into();
        assert!(matches!(e, ScreenError::Other(_)));
    }

    #[test]
    fn from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe broke");
        let e: ScreenError = io_err.into();
        assert!(matches!(e, ScreenError::Io(_)));
        assert_eq!(e.class(), ErrorClass::Transport);
    }

    #[test]
    fn classification() {
        assert_eq!(
            ScreenError::PortNotFound(String::new()).class(),
            ErrorClass::Configuration
        );
        assert_eq!(
            ScreenError::ParamOverflow("too many").class(),
            ErrorClass::Configuration
        );
        assert_eq!(
            ScreenError::WidthOverflow {
                x: 0,
                width: 321,
                limit: 320
            }
            .class(),
            ErrorClass::Bounds
        );
        assert_eq!(
            ScreenError::UnknownCommand("reboot".into()).class(),
            ErrorClass::Protocol
        );
        assert_eq!(
            ScreenError::InvalidImage("bad png".into()).class(),
            ErrorClass::Protocol
        );
        assert_eq!(
            ScreenError::UnknownEffect("fade".into()).class(),
            ErrorClass::Configuration
        );
        assert_eq!(ScreenError::AlreadyStarted.class(), ErrorClass::Configuration);
        assert_eq!(ScreenError::UnknownOpcode(0).class(), ErrorClass::Protocol);
    }
}
