//! Byte transports between the host and the display.
//!
//! | Module   | Purpose                                              |
//! |----------|------------------------------------------------------|
//! | `serial` | USB CDC serial link, port chosen by name substring   |
//! | `memory` | In-process recorder used by tests and diagnostics    |

pub mod memory;
pub mod serial;

pub use memory::MemoryTransport;
pub use serial::{SerialOptions, SerialTransport, list_ports, select_port};

use crate::error::ScreenError;

/// A blocking bidirectional byte channel.
///
/// Reads are bounded by a transport-specific timeout; a read that times
/// out returns `Ok(0)` rather than an error.
pub trait Transport: Send {
    /// Write as many bytes of `buf` as the channel accepts.
    fn write(&mut self, buf: &[u8]) -> Result<usize, ScreenError>;

    /// Read whatever is available into `buf`.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, ScreenError>;

    /// Release the underlying handle. Further I/O fails with
    /// [`ScreenError::TransportClosed`].
    fn close(&mut self) -> Result<(), ScreenError>;

    /// Write the whole buffer, retrying short writes.
    fn write_all(&mut self, mut buf: &[u8]) -> Result<usize, ScreenError> {
        let total = buf.len();
        while !buf.is_empty() {
            let n = self.write(buf)?;
            if n == 0 {
                return Err(ScreenError::Io(std::io::Error::new(
                    std::io::ErrorKind::WriteZero,
                    "transport accepted no bytes",
                )));
            }
            buf = &buf[n..];
        }
        Ok(total)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn write(&mut self, buf: &[u8]) -> Result<usize, ScreenError> {
        (**self).write(buf)
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, ScreenError> {
        (**self).read(buf)
    }

    fn close(&mut self) -> Result<(), ScreenError> {
        (**self).close()
    }
}
