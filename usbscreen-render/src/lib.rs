//! # usbscreen-render: Display Render Daemon
//!
//! Owns the serial link to a directly attached display and republishes
//! it over TCP through a `RemoteProxy`, so `usbscreen-draw` (or any
//! other `RemoteClient`) can drive the panel from another machine.
//!
//! ## Lifecycle
//!
//! - **Start**: open the device, bind the listener.
//! - **Run**: serve until Ctrl-C or until the listener fails.
//! - **Stop**: drain in-flight calls within the configured deadline.

pub mod config;
pub mod service;
