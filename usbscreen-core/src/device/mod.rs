//! Display control devices.
//!
//! [`ControlDevice`] is the capability surface every variant offers:
//!
//! | Variant        | Module   | Backing                                  |
//! |----------------|----------|------------------------------------------|
//! | `LocalDevice`  | `local`  | frame protocol over a serial transport   |
//! | `RemoteClient` | `remote` | RPC calls to a `RemoteProxy`             |
//! | `MockDevice`   | `mock`   | logs and records calls, no hardware      |
//!
//! The variant is chosen once, from a [`DeviceTarget`], and held as
//! `Box<dyn ControlDevice>` for the rest of the process.

pub mod local;
pub mod mock;
pub mod remote;

pub use local::{DevicePhase, DeviceState, LocalDevice};
pub use mock::{DeviceCall, MockDevice};
pub use remote::RemoteClient;

use std::time::Duration;

use async_trait::async_trait;
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ScreenError;
use crate::transport::SerialOptions;

/// Native width of the reference 3.5" panel, portrait.
pub const DEFAULT_WIDTH: u32 = 320;
/// Native height of the reference 3.5" panel, portrait.
pub const DEFAULT_HEIGHT: u32 = 480;

// ── ControlDevice ────────────────────────────────────────────────

/// Operations every display variant supports.
///
/// Methods take `&mut self`: a device accepts one caller at a time and
/// frames from concurrent callers must never interleave.
#[async_trait]
pub trait ControlDevice: Send {
    async fn startup(&mut self) -> Result<(), ScreenError>;

    async fn shutdown(&mut self) -> Result<(), ScreenError>;

    async fn restart(&mut self) -> Result<(), ScreenError>;

    /// Backlight level.
    async fn set_light(&mut self, light: u8) -> Result<(), ScreenError>;

    async fn set_mirror(&mut self, mirror: bool) -> Result<(), ScreenError>;

    /// Switch between portrait and landscape, optionally upside down.
    async fn set_rotate(&mut self, landscape: bool, invert: bool) -> Result<(), ScreenError>;

    /// Draw `image` with its top-left corner at `(x, y)`.
    async fn draw_bitmap(
        &mut self,
        x: u16,
        y: u16,
        image: &RgbaImage,
    ) -> Result<(), ScreenError>;
}

// ── DeviceTarget ─────────────────────────────────────────────────

/// Which variant a target string selects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceTarget {
    /// Serial port name substring.
    Local(String),
    /// `host:port` of a remote proxy.
    Remote(String),
    /// No hardware.
    Mock,
}

impl DeviceTarget {
    /// `"mock"` selects the mock, anything containing `:` is a proxy
    /// address, everything else is a serial port name substring.
    pub fn parse(target: &str) -> Self {
        let target = target.trim();
        if target.eq_ignore_ascii_case("mock") {
            Self::Mock
        } else if target.contains(':') {
            Self::Remote(target.to_string())
        } else {
            Self::Local(target.to_string())
        }
    }
}

impl std::fmt::Display for DeviceTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local(name) => write!(f, "serial:{name}"),
            Self::Remote(addr) => write!(f, "remote:{addr}"),
            Self::Mock => write!(f, "mock"),
        }
    }
}

// ── DeviceConfig ─────────────────────────────────────────────────

/// Everything needed to construct a device variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Serial name substring, `host:port` of a proxy, or `mock`.
    pub target: String,
    /// Native panel width in portrait orientation.
    pub width: u32,
    /// Native panel height in portrait orientation.
    pub height: u32,
    /// Serial line settings (local variant only).
    pub serial: SerialOptions,
    /// Connect and per-call deadline for the remote variant, in ms.
    pub call_timeout_ms: u64,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            target: "ttyACM0".into(),
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            serial: SerialOptions::default(),
            call_timeout_ms: 30_000,
        }
    }
}

impl DeviceConfig {
    pub fn device_target(&self) -> DeviceTarget {
        DeviceTarget::parse(&self.target)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }
}

/// Construct the variant selected by `config.target`.
pub async fn connect(config: &DeviceConfig) -> Result<Box<dyn ControlDevice>, ScreenError> {
    let target = config.device_target();
    info!(%target, "opening display device");

    Ok(match target {
        DeviceTarget::Mock => Box::new(MockDevice::new()),
        DeviceTarget::Remote(addr) => {
            Box::new(RemoteClient::connect(&addr, config.call_timeout()).await?)
        }
        DeviceTarget::Local(name) => Box::new(LocalDevice::open(
            &name,
            &config.serial,
            config.width,
            config.height,
        )?),
    })
}

// ── Tests ────────────────────────────────────────────────────────
