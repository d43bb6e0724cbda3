//! In-memory transport.
//!
//! Records every written byte and serves scripted replies. Clones share
//! the same state, so a test keeps one clone while the device under test
//! owns another.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::ScreenError;
use crate::transport::Transport;

#[derive(Debug, Default)]
struct Inner {
    written: Vec<u8>,
    replies: VecDeque<u8>,
    writes: usize,
    fail_writes: bool,
    closed: bool,
}

/// A loopback byte recorder.
#[derive(Debug, Clone, Default)]
pub struct MemoryTransport {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A poisoned lock only means a test thread panicked mid-write;
        // the recorded bytes are still meaningful.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Everything written so far.
    pub fn written(&self) -> Vec<u8> {
        self.lock().written.clone()
    }

    /// Drain and return everything written so far.
    pub fn take_written(&self) -> Vec<u8> {
        std::mem::take(&mut self.lock().written)
    }

    /// Number of `write` calls that reached the transport.
    pub fn write_calls(&self) -> usize {
        self.lock().writes
    }

    /// Queue bytes to be returned by subsequent reads.
    pub fn push_reply(&self, bytes: &[u8]) {
        self.lock().replies.extend(bytes);
    }

    /// Make every following write fail with a broken pipe.
    pub fn fail_writes(&self, fail: bool) {
        self.lock().fail_writes = fail;
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }
}

impl Transport for MemoryTransport {
    fn write(&mut self, buf: &[u8]) -> Result<usize, ScreenError> {
        let mut inner = self.lock();
        if inner.closed {
            return Err(ScreenError::TransportClosed);
        }
        if inner.fail_writes {
            return Err(ScreenError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "memory transport write failure",
            )));
        }
        inner.writes += 1;
        inner.written.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, ScreenError> {
        let mut inner = self.lock();
        if inner.closed {
            return Err(ScreenError::TransportClosed);
        }
        let n = buf.len().min(inner.replies.len());
        for (slot, byte) in buf.iter_mut().zip(inner.replies.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn close(&mut self) -> Result<(), ScreenError> {
        self.lock().closed = true;
        Ok(())
    }
}
