//! Device command frames.
//!
//! ## Command frame (6 bytes)
//!
//! Four 10-bit parameters are bit-packed across the first five bytes,
//! the opcode occupies the sixth:
//!
//! ```text
//! b0 = p0 >> 2
//! b1 = (p0 & 0x03) << 6 | p1 >> 4
//! b2 = (p1 & 0x0F) << 4 | p2 >> 6
//! b3 = (p2 & 0x3F) << 2 | p3 >> 8
//! b4 =  p3 & 0xFF
//! b5 =  opcode
//! ```
//!
//! ## Option frame (6 + fixed bytes)
//!
//! A command frame with all parameters zero, followed by a fixed-size
//! payload region holding raw configuration bytes, zero padded.

use crate::error::ScreenError;
use crate::opcode::Opcode;

/// Length of a command frame and of an option frame header.
pub const FRAME_LEN: usize = 6;

/// Payload region size used by the rotate and mirror options.
pub const OPTION_PAYLOAD_LEN: usize = 16;

/// Largest value a single parameter slot can carry.
pub const MAX_PARAM: u16 = 0x3FF;

/// Number of parameter slots in a command frame.
pub const MAX_PARAMS: usize = 4;

/// Encoded command frame bytes.
pub type FrameBytes = [u8; FRAME_LEN];

// ── CommandFrame ─────────────────────────────────────────────────

/// An opcode plus up to four 10-bit parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandFrame {
    opcode: Opcode,
    params: [u16; MAX_PARAMS],
}

impl CommandFrame {
    /// Build a frame; missing parameters are zero.
    pub fn new(opcode: Opcode, params: &[u16]) -> Result<Self, ScreenError> {
        if params.len() > MAX_PARAMS {
            return Err(ScreenError::ParamOverflow("more than four parameters"));
        }
        if params.iter().any(|&p| p > MAX_PARAM) {
            return Err(ScreenError::ParamOverflow("parameter exceeds 10 bits"));
        }

        let mut slots = [0u16; MAX_PARAMS];
        slots[..params.len()].copy_from_slice(params);
        Ok(Self {
            opcode,
            params: slots,
        })
    }

    pub fn opcode(&self) -> Opcode {
        self.opcode
    }

    pub fn params(&self) -> [u16; MAX_PARAMS] {
        self.params
    }

    /// Serialize to the 6-byte wire form.
    pub fn encode(&self) -> FrameBytes {
        pack(self.opcode.code(), self.params)
    }
}

/// Bit-pack four parameters and an opcode byte.
///
/// Parameters are masked to 10 bits; validation happens in
/// [`CommandFrame::new`].
pub fn pack(opcode: u8, params: [u16; MAX_PARAMS]) -> FrameBytes {
    let [p0, p1, p2, p3] = params.map(|p| p & MAX_PARAM);
    [
        (p0 >> 2) as u8,
        (((p0 & 0x03) << 6) | (p1 >> 4)) as u8,
        (((p1 & 0x0F) << 4) | (p2 >> 6)) as u8,
        (((p2 & 0x3F) << 2) | (p3 >> 8)) as u8,
        (p3 & 0xFF) as u8,
        opcode,
    ]
}

/// Inverse of [`pack`]: recover the parameters and opcode byte.
pub fn unpack(bytes: &FrameBytes) -> ([u16; MAX_PARAMS], u8) {
    let b = bytes.map(u16::from);
    let p0 = (b[0] << 2) | (b[1] >> 6);
    let p1 = ((b[1] & 0x3F) << 4) | (b[2] >> 4);
    let p2 = ((b[2] & 0x0F) << 6) | (b[3] >> 2);
    let p3 = ((b[3] & 0x03) << 8) | b[4];
    ([p0, p1, p2, p3], bytes[5])
}

// ── OptionFrame ──────────────────────────────────────────────────

/// Builder for option frames (header + fixed payload region).
pub struct OptionFrame;

impl OptionFrame {
    /// Encode `payload` into a frame of exactly `FRAME_LEN + fixed` bytes.
    ///
    /// Fails with [`ScreenError::PayloadOverflow`] when the payload does
    /// not fit the region.
    pub fn encode(opcode: Opcode, fixed: usize, payload: &[u8]) -> Result<Vec<u8>, ScreenError> {
        if payload.len() > fixed {
            return Err(ScreenError::PayloadOverflow {
                size: payload.len(),
                max: fixed,
            });
        }

        let mut frame = Vec::with_capacity(FRAME_LEN + fixed);
        frame.extend_from_slice(&pack(opcode.code(), [0; MAX_PARAMS]));
        frame.extend_from_slice(payload);
        frame.resize(FRAME_LEN + fixed, 0);
        Ok(frame)
    }
}

// ── Tests ────────────────────────────────────────────────────────
