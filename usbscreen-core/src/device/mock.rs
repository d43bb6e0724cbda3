//! Hardware-free display.
//!
//! Logs every call and records it for inspection. Clones share the
//! same call log.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use image::RgbaImage;
use tracing::info;

use crate::device::ControlDevice;
use crate::error::ScreenError;

/// One recorded call.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCall {
    Startup,
    Shutdown,
    Restart,
    SetLight(u8),
    SetMirror(bool),
    SetRotate { landscape: bool, invert: bool },
    DrawBitmap { x: u16, y: u16, image: RgbaImage },
}

#[derive(Debug, Default)]
struct Log {
    calls: Vec<DeviceCall>,
    /// Draws left before every further draw fails.
    draws_before_failure: Option<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct MockDevice {
    log: Arc<Mutex<Log>>,
}

impl MockDevice {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Log> {
        self.log.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Every call recorded so far, oldest first.
    pub fn calls(&self) -> Vec<DeviceCall> {
        self.lock().calls.clone()
    }

    /// Recorded draw calls as `(x, y, width, height)`.
    pub fn draws(&self) -> Vec<(u16, u16, u32, u32)> {
        self.lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                DeviceCall::DrawBitmap { x, y, image } => {
                    Some((*x, *y, image.width(), image.height()))
                }
                _ => None,
            })
            .collect()
    }

    /// Accept `n` more draws, then fail every draw after that.
    pub fn fail_draws_after(&self, n: usize) {
        self.lock().draws_before_failure = Some(n);
    }

    fn record(&self, call: DeviceCall) {
        self.lock().calls.push(call);
    }
}

#[async_trait]
impl ControlDevice for MockDevice {
    async fn startup(&mut self) -> Result<(), ScreenError> {
        info!("startup");
        self.record(DeviceCall::Startup);
        Ok(())
    }

    async fn shutdown(&mut self) -> Result<(), ScreenError> {
        info!("shutdown");
        self.record(DeviceCall::Shutdown);
        Ok(())
    }

    async fn restart(&mut self) -> Result<(), ScreenError> {
        info!("restart");
        self.record(DeviceCall::Restart);
        Ok(())
    }

    async fn set_light(&mut self, light: u8) -> Result<(), ScreenError> {
        info!(light, "set-light");
        self.record(DeviceCall::SetLight(light));
        Ok(())
    }

    async fn set_mirror(&mut self, mirror: bool) -> Result<(), ScreenError> {
        info!(mirror, "set-mirror");
        self.record(DeviceCall::SetMirror(mirror));
        Ok(())
    }

    async fn set_rotate(&mut self, landscape: bool, invert: bool) -> Result<(), ScreenError> {
        info!(landscape, invert, "set-rotate");
        self.record(DeviceCall::SetRotate { landscape, invert });
        Ok(())
    }

    async fn draw_bitmap(
        &mut self,
        x: u16,
        y: u16,
        image: &RgbaImage,
    ) -> Result<(), ScreenError> {
        {
            let mut log = self.lock();
            if let Some(left) = log.draws_before_failure.as_mut() {
                if *left == 0 {
                    return Err(ScreenError::Other("mock draw failure".into()));
                }
                *left -= 1;
            }
        }

        info!(x, y, w = image.width(), h = image.height(), "draw-bitmap");
        self.record(DeviceCall::DrawBitmap {
            x,
            y,
            image: image.clone(),
        });
        Ok(())
    }
}
