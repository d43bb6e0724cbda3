//! Full-frame drawing through effects.
//!
//! The [`Mixer`] owns a device and a set of [`Effect`]s. Each canvas is
//! either drawn in one piece or handed to one effect, chosen uniformly at
//! random, which decomposes it into a [`WriteStream`] of positioned
//! fragments:
//!
//! ```text
//! canvas ──► Effect::process ──► [producer] ══cap 1══► WriteStream ──► draw_bitmap
//! ```
//!
//! The channel has room for a single write, so the producer never runs
//! more than one tile ahead of the device. A draw error ends the canvas
//! immediately; tiles already drawn stay on the panel.

pub mod block;

pub use block::BlockEffect;

use std::sync::Arc;

use image::RgbaImage;
use rand::seq::SliceRandom;
use tokio::sync::mpsc;
use tracing::debug;

use crate::device::ControlDevice;
use crate::error::ScreenError;

// ── Write ────────────────────────────────────────────────────────

/// One positioned fragment of a canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct Write {
    pub position: (u16, u16),
    pub image: RgbaImage,
}

/// Lazy, finite, single-pass sequence of [`Write`]s.
///
/// Dropping the stream closes the channel; the producer stops at its
/// next send.
#[derive(Debug)]
pub struct WriteStream {
    rx: mpsc::Receiver<Write>,
}

impl WriteStream {
    /// A stream and the sender feeding it, with room for one write.
    pub fn channel() -> (mpsc::Sender<Write>, Self) {
        let (tx, rx) = mpsc::channel(1);
        (tx, Self { rx })
    }

    /// The next write, or `None` once the producer has finished.
    pub async fn next(&mut self) -> Option<Write> {
        self.rx.recv().await
    }
}

// ── Effect ───────────────────────────────────────────────────────

/// Strategy that turns a canvas into a stream of writes.
pub trait Effect: Send + Sync {
    /// Name used in configuration.
    fn name(&self) -> &str;

    /// Start producing writes for `image`.
    fn process(&self, image: Arc<RgbaImage>) -> Result<WriteStream, ScreenError>;
}

/// Build an effect from its configured name.
pub fn effect_by_name(name: &str) -> Result<Box<dyn Effect>, ScreenError> {
    match name {
        block::NAME => Ok(Box::new(BlockEffect::new())),
        other => Err(ScreenError::UnknownEffect(other.to_string())),
    }
}

// ── Mixer ────────────────────────────────────────────────────────

pub struct Mixer {
    device: Box<dyn ControlDevice>,
    effects: Vec<Box<dyn Effect>>,
}

impl Mixer {
    /// A mixer that draws every canvas in one piece.
    pub fn new(device: Box<dyn ControlDevice>) -> Self {
        Self {
            device,
            effects: Vec::new(),
        }
    }

    pub fn with_effects(mut self, effects: Vec<Box<dyn Effect>>) -> Self {
        self.effects = effects;
        self
    }

    pub fn device_mut(&mut self) -> &mut dyn ControlDevice {
        self.device.as_mut()
    }

    pub fn into_device(self) -> Box<dyn ControlDevice> {
        self.device
    }

    /// Draw a full canvas at the origin.
    pub async fn canvas(&mut self, image: &RgbaImage) -> Result<(), ScreenError> {
        let effect = self.effects.choose(&mut rand::thread_rng());
        let Some(effect) = effect else {
            return self.device.draw_bitmap(0, 0, image).await;
        };

        debug!(
            effect = effect.name(),
            w = image.width(),
            h = image.height(),
            "mixing canvas"
        );
        let mut stream = effect.process(Arc::new(image.clone()))?;

        let mut count = 0usize;
        while let Some(write) = stream.next().await {
            let (x, y) = write.position;
            self.device.draw_bitmap(x, y, &write.image).await?;
            count += 1;
        }

        debug!(writes = count, "canvas done");
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────
