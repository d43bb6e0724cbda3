//! Frame protocol over a [`Transport`].
//!
//! Every send is synchronous: the full frame is written, then one read
//! bounded by the transport timeout drains any reply. Replies are not
//! interpreted; the command set is write-only from the host's point of
//! view.

use std::time::Instant;

use tracing::debug;

use crate::error::ScreenError;
use crate::frame::{CommandFrame, OptionFrame};
use crate::opcode::Opcode;
use crate::transport::Transport;

/// Sends at or below this size are logged with their hex payload.
const TRACE_PAYLOAD_LIMIT: usize = 16;

/// Scratch space for draining device replies.
const REPLY_BUF_LEN: usize = 64;

/// Serializes commands and options onto a transport.
pub struct FrameProtocol<T: Transport> {
    transport: T,
    reply: [u8; REPLY_BUF_LEN],
}

impl<T: Transport> FrameProtocol<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            reply: [0; REPLY_BUF_LEN],
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Send a 6-byte command frame with up to four 10-bit parameters.
    pub fn send_command(&mut self, opcode: Opcode, params: &[u16]) -> Result<(), ScreenError> {
        let frame = CommandFrame::new(opcode, params)?;
        self.send_bytes(&frame.encode())
    }

    /// Send an option frame: 6-byte header plus `fixed` payload bytes.
    ///
    /// Nothing is written when the payload does not fit.
    pub fn send_option(
        &mut self,
        opcode: Opcode,
        fixed: usize,
        payload: &[u8],
    ) -> Result<(), ScreenError> {
        let frame = OptionFrame::encode(opcode, fixed, payload)?;
        self.send_bytes(&frame)
    }

    /// Write raw bytes, then drain a reply.
    ///
    /// Used directly for the unframed pixel stream that follows a
    /// draw-bitmap command.
    pub fn send_bytes(&mut self, bytes: &[u8]) -> Result<(), ScreenError> {
        let start = Instant::now();
        let sent = self.transport.write_all(bytes)?;
        let cost = start.elapsed();

        if bytes.len() <= TRACE_PAYLOAD_LIMIT {
            debug!(sent, ?cost, data = %hex::encode(bytes), "transfer");
        } else {
            debug!(sent, ?cost, "transfer");
        }

        let n = self.transport.read(&mut self.reply)?;
        if n > 0 {
            debug!(len = n, data = %hex::encode(&self.reply[..n]), "device reply");
        }
        Ok(())
    }

    /// Close the underlying transport.
    pub fn close(&mut self) -> Result<(), ScreenError> {
        self.transport.close()
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{FRAME_LEN, OPTION_PAYLOAD_LEN};
    use crate::transport::MemoryTransport;

    fn protocol() -> (FrameProtocol<MemoryTransport>, MemoryTransport) {
        let recorder = MemoryTransport::new();
        (FrameProtocol::new(recorder.clone()), recorder)
    }

    #[test]
    fn command_is_six_bytes() {
        let (mut proto, recorder) = protocol();
        proto.send_command(Opcode::Startup, &[]).unwrap();
        assert_eq!(recorder.written(), vec![0, 0, 0, 0, 0, 109]);
    }

    #[test]
    fn option_is_header_plus_fixed() {
        let (mut proto, recorder) = protocol();
        proto
            .send_option(Opcode::SetMirror, OPTION_PAYLOAD_LEN, &[1])
            .unwrap();
        let out = recorder.written();
        assert_eq!(out.len(), FRAME_LEN + OPTION_PAYLOAD_LEN);
        assert_eq!(out[5], 122);
        assert_eq!(out[6], 1);
    }

    #[test]
    fn option_overflow_sends_nothing() {
        let (mut proto, recorder) = protocol();
        let err = proto
            .send_option(Opcode::SetRotate, 16, &[0u8; 17])
            .unwrap_err();
        assert!(matches!(err, ScreenError::PayloadOverflow { .. }));
        assert!(recorder.written().is_empty());
        assert_eq!(recorder.write_calls(), 0);
    }

    #[test]
    fn param_overflow_sends_nothing() {
        let (mut proto, recorder) = protocol();
        assert!(proto.send_command(Opcode::SetLight, &[2000]).is_err());
        assert!(recorder.written().is_empty());
    }

    #[test]
    fn replies_are_drained_and_ignored() {
        let (mut proto, recorder) = protocol();
        recorder.push_reply(&[0xAA, 0xBB]);
        proto.send_command(Opcode::Restart, &[]).unwrap();
        assert_eq!(recorder.written(), vec![0, 0, 0, 0, 0, 101]);
    }

    #[test]
    fn write_errors_surface_verbatim() {
        let (mut proto, recorder) = protocol();
        recorder.fail_writes(true);
        let err = proto.send_command(Opcode::Startup, &[]).unwrap_err();
        match err {
            ScreenError::Io(e) => assert_eq!(e.kind(), std::io::ErrorKind::BrokenPipe),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
