//! Network RPC for remote displays.
//!
//! # Wire Protocol
//!
//! Every message travels in one codec frame (see [`RpcCodec`]) and is a
//! bincode-encoded [`Message`].
//!
//! ```text
//! Client ──[Request { id, Command("startup") }]──────────► Proxy
//! Proxy  ──[Response { id, error: None }]────────────────► Client
//!
//! Client ──[Request { id, DrawBitmap { x, y, png } }]────► Proxy
//! Proxy  ──[Response { id, error: Some("...") }]─────────► Client
//! ```
//!
//! Images cross the wire as PNG, never as device pixel bytes, so the
//! proxy re-derives the pixel format for whatever panel it drives.

pub mod codec;
pub mod proxy;

pub use codec::{HEADER_LEN, MAX_FRAME_SIZE, RpcCodec};
pub use proxy::{ProxyService, RemoteProxy};

use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, ImageFormat, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::error::ScreenError;

/// `Command` names accepted by the proxy.
pub const COMMAND_STARTUP: &str = "startup";
pub const COMMAND_SHUTDOWN: &str = "shutdown";
pub const COMMAND_RESTART: &str = "restart";

// ── Payloads ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SetRotateRequest {
    pub landscape: bool,
    pub invert: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DrawBitmapRequest {
    pub x: u16,
    pub y: u16,
    /// PNG-encoded image.
    pub image: Vec<u8>,
}

impl DrawBitmapRequest {
    /// PNG-encode `image` for transmission.
    pub fn new(x: u16, y: u16, image: &RgbaImage) -> Result<Self, ScreenError> {
        Ok(Self {
            x,
            y,
            image: encode_png(image)?,
        })
    }

    /// Decode the carried image.
    pub fn decode_image(&self) -> Result<RgbaImage, ScreenError> {
        decode_png(&self.image)
    }
}

/// A remote method invocation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum Call {
    Command(String),
    SetLight(u8),
    SetMirror(bool),
    SetRotate(SetRotateRequest),
    DrawBitmap(DrawBitmapRequest),
}

impl Call {
    /// Method name, for logs.
    pub fn method(&self) -> &'static str {
        match self {
            Call::Command(_) => "Service.Command",
            Call::SetLight(_) => "Service.SetLight",
            Call::SetMirror(_) => "Service.SetMirror",
            Call::SetRotate(_) => "Service.SetRotate",
            Call::DrawBitmap(_) => "Service.DrawBitmap",
        }
    }
}

// ── Message ──────────────────────────────────────────────────────

/// Everything that crosses an RPC connection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum Message {
    /// Client → proxy.
    Request { id: u64, call: Call },
    /// Proxy → client. `error` is `None` on success.
    Response { id: u64, error: Option<String> },
}

impl Message {
    /// Serialize to bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, ScreenError> {
        bincode::serialize(self).map_err(|e| ScreenError::Encoding(e.to_string()))
    }

    /// Deserialize from bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ScreenError> {
        bincode::deserialize(bytes).map_err(|e| ScreenError::Encoding(e.to_string()))
    }

    pub fn id(&self) -> u64 {
        match self {
            Message::Request { id, .. } | Message::Response { id, .. } => *id,
        }
    }
}

// ── PNG ──────────────────────────────────────────────────────────

/// Lossless PNG encoding of an RGBA image.
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, ScreenError> {
    let mut buf = Vec::new();
    PngEncoder::new(&mut buf).write_image(
        image.as_raw(),
        image.width(),
        image.height(),
        ExtendedColorType::Rgba8,
    )?;
    Ok(buf)
}

/// Decode PNG bytes into an RGBA image.
pub fn decode_png(bytes: &[u8]) -> Result<RgbaImage, ScreenError> {
    Ok(image::load_from_memory_with_format(bytes, ImageFormat::Png)?.to_rgba8())
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn sample() -> RgbaImage {
        RgbaImage::from_fn(7, 5, |x, y| Rgba([(x * 30) as u8, (y * 50) as u8, 128, 255]))
    }

    #[test]
    fn png_is_lossless() {
        let img = sample();
        let png = encode_png(&img).unwrap();
        assert_eq!(&png[1..4], b"PNG");
        assert_eq!(decode_png(&png).unwrap(), img);
    }

    #[test]
    fn garbage_is_not_png() {
        let err = decode_png(b"definitely not a png").unwrap_err();
        assert!(matches!(err, ScreenError::InvalidImage(_)));
    }

    #[test]
    fn draw_request_carries_image() {
        let req = DrawBitmapRequest::new(4, 9, &sample()).unwrap();
        let msg = Message::Request {
            id: 3,
            call: Call::DrawBitmap(req),
        };
        let back = Message::from_bytes(&msg.to_bytes().unwrap()).unwrap();
        assert_eq!(back.id(), 3);
        match back {
            Message::Request {
                call: Call::DrawBitmap(req),
                ..
            } => {
                assert_eq!((req.x, req.y), (4, 9));
                assert_eq!(req.decode_image().unwrap(), sample());
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn method_names() {
        assert_eq!(Call::Command("startup".into()).method(), "Service.Command");
        assert_eq!(
            Call::SetRotate(SetRotateRequest {
                landscape: true,
                invert: false
            })
            .method(),
            "Service.SetRotate"
        );
    }

    #[test]
    fn truncated_message_fails() {
        let msg = Message::Response {
            id: 1,
            error: Some("boom".into()),
        };
        let bytes = msg.to_bytes().unwrap();
        let err = Message::from_bytes(&bytes[..bytes.len() - 2]).unwrap_err();
        assert!(matches!(err, ScreenError::Encoding(_)));
    }
}
