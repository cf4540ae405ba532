//! g213-colors-core: command encoding, USB sessions, and configuration replay
//! for Logitech G213 and G203 lighting.
//!
//! Lighting is set by sending fixed-layout payloads to the device in HID
//! SET_REPORT control transfers. The last applied setting is kept in a small
//! text file so it can be replayed at login or boot.

pub mod command;
pub mod diagnostics;
pub mod encoder;
pub mod error;
#[cfg(test)]
mod integration_tests;
pub mod product;
pub mod replay;
pub mod session;
pub mod store;
pub mod template;
pub mod transport;
pub mod usb;

/// Logitech USB Vendor ID.
pub const LOGITECH_VID: u16 = 0x046D;

/// Known Logitech Prodigy product IDs.
pub mod pids {
    /// G213 Prodigy keyboard.
    pub const G213: u16 = 0xC336;
    /// G203 Prodigy mouse.
    pub const G203: u16 = 0xC084;
}
