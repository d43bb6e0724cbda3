//! Device command opcodes.
//!
//! The numbering is fixed by the display firmware.

use crate::error::ScreenError;
use std::fmt;

/// One-byte command identifiers understood by the display firmware.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    /// Reboot the display controller.
    Restart = 101,
    /// Turn the panel off.
    Shutdown = 108,
    /// Turn the panel on.
    Startup = 109,
    /// Backlight level, one parameter.
    SetLight = 110,
    /// Orientation option frame.
    SetRotate = 121,
    /// Mirror option frame.
    SetMirror = 122,
    /// Scattered pixel writes. Not issued by this crate yet.
    DrawPixels = 195,
    /// Rectangle write followed by a raw RGB565 stream.
    DrawBitmap = 197,
    /// Factory test pattern.
    Testing = 255,
}

impl Opcode {
    /// The byte placed in the sixth position of every frame header.
    pub const fn code(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for Opcode {
    type Error = ScreenError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            101 => Ok(Opcode::Restart),
            108 => Ok(Opcode::Shutdown),
            109 => Ok(Opcode::Startup),
            110 => Ok(Opcode::SetLight),
            121 => Ok(Opcode::SetRotate),
            122 => Ok(Opcode::SetMirror),
            195 => Ok(Opcode::DrawPixels),
            197 => Ok(Opcode::DrawBitmap),
            255 => Ok(Opcode::Testing),
            other => Err(ScreenError::UnknownOpcode(other)),
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Opcode::Restart => "restart",
            Opcode::Shutdown => "shutdown",
            Opcode::Startup => "startup",
            Opcode::SetLight => "set-light",
            Opcode::SetRotate => "set-rotate",
            Opcode::SetMirror => "set-mirror",
            Opcode::DrawPixels => "draw-pixels",
            Opcode::DrawBitmap => "draw-bitmap",
            Opcode::Testing => "testing",
        };
        write!(f, "{name}({})", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn firmware_numbering() {
        assert_eq!(Opcode::Restart.code(), 101);
        assert_eq!(Opcode::Shutdown.code(), 108);
        assert_eq!(Opcode::Startup.code(), 109);
        assert_eq!(Opcode::SetLight.code(), 110);
        assert_eq!(Opcode::SetRotate.code(), 121);
        assert_eq!(Opcode::SetMirror.code(), 122);
        assert_eq!(Opcode::DrawPixels.code(), 195);
        assert_eq!(Opcode::DrawBitmap.code(), 197);
        assert_eq!(Opcode::Testing.code(), 255);
    }

    #[test]
    fn try_from_known_and_unknown() {
        assert_eq!(Opcode::try_from(197).unwrap(), Opcode::DrawBitmap);
        assert!(matches!(
            Opcode::try_from(0),
            Err(ScreenError::UnknownOpcode(0))
        ));
        assert!(Opcode::try_from(102).is_err());
    }

    #[test]
    fn display_includes_code() {
        assert_eq!(Opcode::SetLight.to_string(), "set-light(110)");
    }
}
