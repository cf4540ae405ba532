//! USB transport abstraction.
//!
//! The session only needs a handful of libusb operations. They are expressed
//! as a pair of traits so that the real `rusb` backend and the mock device
//! used in tests share the same interface.

use crate::error::Result;
use std::time::Duration;

/// `bmRequestType`: host-to-device, class request, recipient interface.
pub const REQUEST_TYPE: u8 = 0x21;
/// `bRequest`: HID SET_REPORT.
pub const SET_REPORT: u8 = 0x09;
/// Interrupt IN endpoint carrying the firmware's reply to color commands.
pub const ACK_ENDPOINT: u8 = 0x82;
/// Size of one interrupt report.
pub const ACK_LEN: usize = 64;
/// How long to wait for a reply before treating it as absent.
pub const ACK_TIMEOUT: Duration = Duration::from_millis(100);

/// Locates devices by USB identifiers.
pub trait UsbBackend {
    type Handle: UsbHandle;

    /// Open the first device matching `vendor_id`/`product_id`.
    ///
    /// Returns `Ok(None)` when no such device is attached, and an error when
    /// one is attached but cannot be opened.
    fn open(&self, vendor_id: u16, product_id: u16) -> Result<Option<Self::Handle>>;
}

/// An opened device. Dropping the handle closes it.
pub trait UsbHandle {
    fn kernel_driver_active(&self, interface: u8) -> Result<bool>;
    fn detach_kernel_driver(&mut self, interface: u8) -> Result<()>;
    fn attach_kernel_driver(&mut self, interface: u8) -> Result<()>;
    fn claim_interface(&mut self, interface: u8) -> Result<()>;
    fn release_interface(&mut self, interface: u8) -> Result<()>;

    /// Send `data` in a control transfer, blocking until it completes.
    fn write_control(
        &self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        data: &[u8],
    ) -> Result<usize>;

    /// Read one interrupt report. Fails with [`crate::error::Error::Timeout`]
    /// if nothing arrives within `timeout`.
    fn read_interrupt(&self, endpoint: u8, buf: &mut [u8], timeout: Duration) -> Result<usize>;
}
