//! Length-prefixed framing for RPC messages.
//!
//! ```text
//! magic:   [u8; 4]  "USB0"
//! length:  u32 LE   payload bytes
//! payload: [u8]     bincode Message
//! ```

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::ScreenError;
use crate::rpc::Message;

/// Magic prefix of every frame.
pub const MAGIC: [u8; 4] = *b"USB0";

/// Magic + length.
pub const HEADER_LEN: usize = 8;

/// Largest payload accepted in either direction. A full 320×480 PNG is
/// well below this.
pub const MAX_FRAME_SIZE: usize = 8 * 1024 * 1024;

#[derive(Debug, Default, Clone, Copy)]
pub struct RpcCodec;

impl Decoder for RpcCodec {
    type Item = Message;
    type Error = ScreenError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < HEADER_LEN {
            return Ok(None);
        }
        if src[..4] != MAGIC {
            return Err(ScreenError::InvalidMagic);
        }

        let len = u32::from_le_bytes([src[4], src[5], src[6], src[7]]) as usize;
        if len > MAX_FRAME_SIZE {
            return Err(ScreenError::FrameTooLarge {
                size: len,
                max: MAX_FRAME_SIZE,
            });
        }
        if src.len() < HEADER_LEN + len {
            src.reserve(HEADER_LEN + len - src.len());
            return Ok(None);
        }

        src.advance(HEADER_LEN);
        let payload = src.split_to(len);
        Message::from_bytes(&payload).map(Some)
    }
}

impl Encoder<Message> for RpcCodec {
    type Error = ScreenError;

    fn encode(&mut self, item: Message, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let payload = item.to_bytes()?;
        if payload.len() > MAX_FRAME_SIZE {
            return Err(ScreenError::FrameTooLarge {
                size: payload.len(),
                max: MAX_FRAME_SIZE,
            });
        }

        dst.reserve(HEADER_LEN + payload.len());
        dst.put_slice(&MAGIC);
        dst.put_u32_le(payload.len() as u32);
        dst.put_slice(&payload);
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::Call;

    fn request() -> Message {
        Message::Request {
            id: 42,
            call: Call::SetLight(7),
        }
    }

    #[test]
    fn encode_then_decode() {
        let mut codec = RpcCodec;
        let mut buf = BytesMut::new();
        codec.encode(request(), &mut buf).unwrap();
        assert_eq!(&buf[..4], b"USB0");

        let decoded = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(decoded, request());
        assert!(buf.is_empty());
    }

    #[test]
    fn partial_frames_wait_for_more() {
        let mut codec = RpcCodec;
        let mut full = BytesMut::new();
        codec.encode(request(), &mut full).unwrap();

        let mut buf = BytesMut::from(&full[..3]);
        assert!(codec.decode(&mut buf).unwrap().is_none());

        buf.extend_from_slice(&full[3..full.len() - 1]);
        assert!(codec.decode(&mut buf).unwrap().is_none());

        buf.extend_from_slice(&full[full.len() - 1..]);
        assert_eq!(codec.decode(&mut buf).unwrap().unwrap(), request());
    }

    #[test]
    fn back_to_back_frames() {
        let mut codec = RpcCodec;
        let mut buf = BytesMut::new();
        codec.encode(request(), &mut buf).unwrap();
        codec
            .encode(
                Message::Response {
                    id: 42,
                    error: None,
                },
                &mut buf,
            )
            .unwrap();

        assert_eq!(codec.decode(&mut buf).unwrap().unwrap().id(), 42);
        assert!(matches!(
            codec.decode(&mut buf).unwrap().unwrap(),
            Message::Response { error: None, .. }
        ));
        assert!(codec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn bad_magic() {
        let mut codec = RpcCodec;
        let mut buf = BytesMut::from(&b"HTTP/1.1 200 OK"[..]);
        assert!(matches!(
            codec.decode(&mut buf),
            Err(ScreenError::InvalidMagic)
        ));
    }

    #[test]
    fn oversized_length() {
        let mut codec = RpcCodec;
        let mut buf = BytesMut::new();
        buf.put_slice(&MAGIC);
        buf.put_u32_le((MAX_FRAME_SIZE + 1) as u32);
        assert!(matches!(
            codec.decode(&mut buf),
            Err(ScreenError::FrameTooLarge { .. })
        ));
    }
}
