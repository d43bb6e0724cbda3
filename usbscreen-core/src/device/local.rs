//! Directly attached display.
//!
//! Drives the panel with [`FrameProtocol`] over any [`Transport`],
//! normally a [`SerialTransport`].
//!
//! ```text
//!  (open) ──► Ready ──startup──► Running
//!               ▲                   │
//!               └─────shutdown──────┘
//! ```
//!
//! `restart` is a single device-side command with no local transition.

use async_trait::async_trait;
use image::RgbaImage;
use tracing::{debug, info};

use crate::bitmap;
use crate::device::ControlDevice;
use crate::error::ScreenError;
use crate::frame::OPTION_PAYLOAD_LEN;
use crate::opcode::Opcode;
use crate::protocol::FrameProtocol;
use crate::transport::{SerialOptions, SerialTransport, Transport};

/// Base value of the orientation variant byte.
const ROTATE_BASE: u8 = 100;

// ── DevicePhase ──────────────────────────────────────────────────

/// Power phase tracked on the host side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DevicePhase {
    /// Port open, panel not started.
    #[default]
    Ready,
    /// Panel started.
    Running,
}

impl std::fmt::Display for DevicePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ready => write!(f, "Ready"),
            Self::Running => write!(f, "Running"),
        }
    }
}

// ── DeviceState ──────────────────────────────────────────────────

/// Drawable area in the current orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceState {
    pub width: u32,
    pub height: u32,
}

/// Orientation variant byte understood by the firmware.
///
/// plain = base, invert only = base+1, landscape only = base+1,
/// landscape and invert = base+2.
pub const fn rotate_variant(landscape: bool, invert: bool) -> u8 {
    ROTATE_BASE + landscape as u8 + invert as u8
}

// ── LocalDevice ──────────────────────────────────────────────────

/// A display reached through a local byte transport.
pub struct LocalDevice<T: Transport = SerialTransport> {
    protocol: FrameProtocol<T>,
    native: DeviceState,
    state: DeviceState,
    phase: DevicePhase,
}

impl LocalDevice<SerialTransport> {
    /// Open the first serial port whose name contains `needle`.
    pub fn open(
        needle: &str,
        options: &SerialOptions,
        width: u32,
        height: u32,
    ) -> Result<Self, ScreenError> {
        let transport = SerialTransport::open(needle, options)?;
        Ok(Self::new(transport, width, height))
    }
}

impl<T: Transport> LocalDevice<T> {
    /// Wrap an already open transport. `width`/`height` are the native
    /// portrait dimensions of the panel.
    pub fn new(transport: T, width: u32, height: u32) -> Self {
        let native = DeviceState { width, height };
        Self {
            protocol: FrameProtocol::new(transport),
            native,
            state: native,
            phase: DevicePhase::Ready,
        }
    }

    pub fn state(&self) -> DeviceState {
        self.state
    }

    pub fn phase(&self) -> DevicePhase {
        self.phase
    }

    pub fn transport(&self) -> &T {
        self.protocol.transport()
    }

    /// Close the transport, consuming the device.
    pub fn close(mut self) -> Result<T, ScreenError> {
        self.protocol.close()?;
        Ok(self.protocol.into_transport())
    }

    fn check_bounds(&self, x: u16, y: u16, image: &RgbaImage) -> Result<(), ScreenError> {
        let (w, h) = image.dimensions();
        let (x, y) = (u32::from(x), u32::from(y));

        if u64::from(w) + u64::from(x) > u64::from(self.state.width) {
            return Err(ScreenError::WidthOverflow {
                x,
                width: w,
                limit: self.state.width,
            });
        }
        if u64::from(h) + u64::from(y) > u64::from(self.state.height) {
            return Err(ScreenError::HeightOverflow {
                y,
                height: h,
                limit: self.state.height,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl<T: Transport> ControlDevice for LocalDevice<T> {
    async fn startup(&mut self) -> Result<(), ScreenError> {
        self.protocol.send_command(Opcode::Startup, &[])?;
        self.phase = DevicePhase::Running;
        info!(phase = %self.phase, "display started");
        Ok(())
    }

    async fn shutdown(&mut self) -> Result<(), ScreenError> {
        self.protocol.send_command(Opcode::Shutdown, &[])?;
        self.phase = DevicePhase::Ready;
        info!(phase = %self.phase, "display shut down");
        Ok(())
    }

    async fn restart(&mut self) -> Result<(), ScreenError> {
        self.protocol.send_command(Opcode::Restart, &[])
    }

    async fn set_light(&mut self, light: u8) -> Result<(), ScreenError> {
        self.protocol
            .send_command(Opcode::SetLight, &[u16::from(light)])
    }

    async fn set_mirror(&mut self, mirror: bool) -> Result<(), ScreenError> {
        self.protocol
            .send_option(Opcode::SetMirror, OPTION_PAYLOAD_LEN, &[mirror as u8])
    }

    async fn set_rotate(&mut self, landscape: bool, invert: bool) -> Result<(), ScreenError> {
        let state = if landscape {
            DeviceState {
                width: self.native.height,
                height: self.native.width,
            }
        } else {
            self.native
        };

        let mut payload = Vec::with_capacity(5);
        payload.push(rotate_variant(landscape, invert));
        payload.extend_from_slice(&(state.width as u16).to_be_bytes());
        payload.extend_from_slice(&(state.height as u16).to_be_bytes());

        self.protocol
            .send_option(Opcode::SetRotate, OPTION_PAYLOAD_LEN, &payload)?;
        self.state = state;
        debug!(landscape, invert, ?state, "orientation set");
        Ok(())
    }

    async fn draw_bitmap(
        &mut self,
        x: u16,
        y: u16,
        image: &RgbaImage,
    ) -> Result<(), ScreenError> {
        self.check_bounds(x, y, image)?;

        let (w, h) = image.dimensions();
        if w == 0 || h == 0 {
            return Ok(());
        }

        let right = u32::from(x) + w - 1;
        let bottom = u32::from(y) + h - 1;
        self.protocol.send_command(
            Opcode::DrawBitmap,
            &[x, y, right as u16, bottom as u16],
        )?;
        self.protocol.send_bytes(&bitmap::encode(image))
    }
}

// ── Tests ────────────────────────────────────────────────────────
