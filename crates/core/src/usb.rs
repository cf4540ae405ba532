//! `rusb` (libusb) implementation of the transport traits.

use crate::error::{Error, Result};
use crate::transport::{UsbBackend, UsbHandle};
use rusb::{DeviceHandle, GlobalContext};
use std::time::Duration;
use tracing::{debug, trace};

/// libusb treats a zero timeout as "wait forever"; control transfers are
/// allowed to block until the device answers.
const CONTROL_TIMEOUT: Duration = Duration::ZERO;

/// Classify a libusb error so callers can tell "absent" from "denied".
pub fn map_rusb_error(err: rusb::Error) -> Error {
    match err {
        rusb::Error::Timeout => Error::Timeout(err.to_string()),
        rusb::Error::Access => Error::PermissionDenied(err.to_string()),
        rusb::Error::NoDevice | rusb::Error::NotFound => Error::DeviceNotFound(err.to_string()),
        other => Error::Usb(other.to_string()),
    }
}

/// Backend over the process-wide libusb context.
#[derive(Debug, Default, Clone, Copy)]
pub struct RusbBackend;

impl UsbBackend for RusbBackend {
    type Handle = RusbHandle;

    fn open(&self, vendor_id: u16, product_id: u16) -> Result<Option<RusbHandle>> {
        let devices = rusb::devices().map_err(map_rusb_error)?;
        for device in devices.iter() {
            let descriptor = match device.device_descriptor() {
                Ok(d) => d,
                Err(e) => {
                    trace!(bus = device.bus_number(), address = device.address(), error = %e, "Skipping unreadable descriptor");
                    continue;
                }
            };
            if descriptor.vendor_id() != vendor_id || descriptor.product_id() != product_id {
                continue;
            }
            debug!(
                vid = format_args!("0x{:04X}", vendor_id),
                pid = format_args!("0x{:04X}", product_id),
                bus = device.bus_number(),
                address = device.address(),
                "Opening USB device"
            );
            let handle = device.open().map_err(map_rusb_error)?;
            return Ok(Some(RusbHandle { handle }));
        }
        Ok(None)
    }
}

/// An open libusb device handle.
pub struct RusbHandle {
    handle: DeviceHandle<GlobalContext>,
}

impl UsbHandle for RusbHandle {
    fn kernel_driver_active(&self, interface: u8) -> Result<bool> {
        match self.handle.kernel_driver_active(interface) {
            Ok(active) => Ok(active),
            // Platforms without kernel drivers (macOS, Windows) report NotSupported.
            Err(rusb::Error::NotSupported) => Ok(false),
            Err(e) => Err(map_rusb_error(e)),
        }
    }

    fn detach_kernel_driver(&mut self, interface: u8) -> Result<()> {
        self.handle
            .detach_kernel_driver(interface)
            .map_err(map_rusb_error)
    }

    fn attach_kernel_driver(&mut self, interface: u8) -> Result<()> {
        self.handle
            .attach_kernel_driver(interface)
            .map_err(map_rusb_error)
    }

    fn claim_interface(&mut self, interface: u8) -> Result<()> {
        self.handle.claim_interface(interface).map_err(map_rusb_error)
    }

    fn release_interface(&mut self, interface: u8) -> Result<()> {
        self.handle
            .release_interface(interface)
            .map_err(map_rusb_error)
    }

    fn write_control(
        &self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        data: &[u8],
    ) -> Result<usize> {
        self.handle
            .write_control(request_type, request, value, index, data, CONTROL_TIMEOUT)
            .map_err(map_rusb_error)
    }

    fn read_interrupt(&self, endpoint: u8, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        self.handle
            .read_interrupt(endpoint, buf, timeout)
            .map_err(map_rusb_error)
    }
}
