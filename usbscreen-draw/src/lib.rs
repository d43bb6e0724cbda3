//! # usbscreen-draw: Display Client
//!
//! Opens any display variant (serial, remote proxy or mock), applies the
//! configured power, backlight and orientation settings, and draws an
//! image file through the mixer.

pub mod config;
pub mod present;
