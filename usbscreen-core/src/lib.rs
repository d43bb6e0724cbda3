//! # usbscreen-core
//!
//! Protocol stack for small USB-attached display panels.
//!
//! This crate contains:
//! - **Pixels**: `Rgb565` and `bitmap::encode`, the panel's native 5-6-5 format
//! - **Frames**: `CommandFrame` and `OptionFrame`, the 6-byte command wire format
//! - **Transport**: `Transport` trait with serial and in-memory implementations
//! - **Protocol**: `FrameProtocol`, frames and raw payloads over a transport
//! - **Devices**: `ControlDevice` with local, remote and mock variants
//! - **RPC**: `RemoteProxy` serving a device over TCP, `RpcCodec` framing
//! - **Mixer**: `Mixer` and `Effect`, tiled full-frame drawing
//! - **Error**: `ScreenError`, typed and `thiserror`-based

pub mod bitmap;
pub mod device;
pub mod error;
pub mod frame;
pub mod mixer;
pub mod opcode;
pub mod protocol;
pub mod rpc;
pub mod transport;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use bitmap::Rgb565;
pub use device::{
    ControlDevice, DeviceConfig, DeviceTarget, LocalDevice, MockDevice, RemoteClient, connect,
};
pub use error::{ErrorClass, ScreenError};
pub use frame::{CommandFrame, OptionFrame};
pub use mixer::{BlockEffect, Effect, Mixer, Write, WriteStream, effect_by_name};
pub use opcode::Opcode;
pub use protocol::FrameProtocol;
pub use rpc::{ProxyService, RemoteProxy, RpcCodec};
pub use transport::{MemoryTransport, SerialOptions, SerialTransport, Transport};
