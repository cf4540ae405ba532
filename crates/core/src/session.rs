//! Device session: the USB connection lifecycle for one product.
//!
//! ```text
//! Closed --connect--> Open --disconnect--> Closed
//! ```
//!
//! `connect` on an open session fails with [`Error::AlreadyConnected`].
//! `disconnect` on a closed session succeeds and does nothing. An open
//! session is disconnected when dropped, so the interface is released and
//! the kernel driver reattached on every exit path.

use crate::command::Command;
use crate::encoder::{self, LightingMode, SEGMENT_COUNT};
use crate::error::{Error, Result};
use crate::product::ProductProfile;
use crate::transport::{
    UsbBackend, UsbHandle, ACK_ENDPOINT, ACK_LEN, ACK_TIMEOUT, REQUEST_TYPE, SET_REPORT,
};
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// Pause between consecutive commands of one setting.
pub const COMMAND_PACING: Duration = Duration::from_millis(10);

/// Result of an acknowledgement read. None of these is an error: the
/// command it follows has already been accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckOutcome {
    /// The firmware replied with this many bytes.
    Received(usize),
    /// No reply within the ack timeout.
    TimedOut,
    /// The read failed for another reason (logged).
    Failed,
}

struct OpenDevice<H> {
    handle: H,
    kernel_driver_was_detached: bool,
}

/// A USB connection bound to one product profile.
pub struct Session<'a, B: UsbBackend> {
    backend: &'a B,
    profile: &'static ProductProfile,
    open: Option<OpenDevice<B::Handle>>,
}

impl<'a, B: UsbBackend> Session<'a, B> {
    /// Create a closed session.
    pub fn new(backend: &'a B, profile: &'static ProductProfile) -> Self {
        Self {
            backend,
            profile,
            open: None,
        }
    }

    /// Create a session and connect it.
    pub fn open(backend: &'a B, profile: &'static ProductProfile) -> Result<Self> {
        let mut session = Self::new(backend, profile);
        session.connect()?;
        Ok(session)
    }

    pub fn profile(&self) -> &'static ProductProfile {
        self.profile
    }

    pub fn is_connected(&self) -> bool {
        self.open.is_some()
    }

    /// Whether `connect` had to detach a kernel driver that `disconnect`
    /// will reattach.
    pub fn kernel_driver_was_detached(&self) -> bool {
        self.open
            .as_ref()
            .is_some_and(|o| o.kernel_driver_was_detached)
    }

    /// Find the device, detach the kernel driver if one owns the lighting
    /// interface, and claim it.
    pub fn connect(&mut self) -> Result<()> {
        if self.open.is_some() {
            return Err(Error::AlreadyConnected(self.profile.name));
        }
        let profile = self.profile;
        let iface = profile.interface_index;

        let mut handle = self
            .backend
            .open(profile.vendor_id, profile.product_id)?
            .ok_or_else(|| Error::DeviceNotFound(profile.to_string()))?;

        let mut detached = false;
        if handle.kernel_driver_active(iface)? {
            debug!(
                product = profile.name,
                interface = iface,
                "Detaching kernel driver"
            );
            handle
                .detach_kernel_driver(iface)
                .map_err(|e| Error::DriverDetachFailed(format!("{}: {e}", profile.name)))?;
            detached = true;
        }

        if let Err(e) = handle.claim_interface(iface) {
            if detached {
                if let Err(attach_err) = handle.attach_kernel_driver(iface) {
                    warn!(product = profile.name, error = %attach_err, "Kernel driver reattach failed");
                }
            }
            return Err(Error::InterfaceClaimFailed(format!("{}: {e}", profile.name)));
        }

        self.open = Some(OpenDevice {
            handle,
            kernel_driver_was_detached: detached,
        });
        info!(product = profile.name, detached, "Connected");
        Ok(())
    }

    /// Release the interface and close the device, reattaching the kernel
    /// driver if `connect` detached it.
    ///
    /// Reattach failures are logged only: the keyboard's special keys stop
    /// working until it is replugged, but the session still closes.
    pub fn disconnect(&mut self) -> Result<()> {
        let Some(mut open) = self.open.take() else {
            debug!(product = self.profile.name, "Disconnect on closed session");
            return Ok(());
        };
        let iface = self.profile.interface_index;

        if let Err(e) = open.handle.release_interface(iface) {
            warn!(product = self.profile.name, error = %e, "Interface release failed");
        }
        drop(open.handle);

        if open.kernel_driver_was_detached {
            self.reattach_kernel_driver();
        }
        info!(product = self.profile.name, "Disconnected");
        Ok(())
    }

    // The released handle may no longer be usable, so the device is found
    // again before reattaching.
    fn reattach_kernel_driver(&self) {
        let profile = self.profile;
        match self.backend.open(profile.vendor_id, profile.product_id) {
            Ok(Some(mut handle)) => match handle.attach_kernel_driver(profile.interface_index) {
                Ok(()) => debug!(product = profile.name, "Kernel driver reattached"),
                Err(e) => warn!(
                    product = profile.name,
                    error = %e,
                    "Kernel driver reattach failed; replug the device to restore special keys"
                ),
            },
            Ok(None) => warn!(
                product = profile.name,
                "Device disappeared before kernel driver reattach"
            ),
            Err(e) => warn!(
                product = profile.name,
                error = %e,
                "Could not reopen device for kernel driver reattach"
            ),
        }
    }

    fn handle(&self) -> Result<&B::Handle> {
        self.open
            .as_ref()
            .map(|o| &o.handle)
            .ok_or(Error::NotConnected)
    }

    /// Send one payload as a SET_REPORT control transfer.
    pub fn send(&self, command: &Command) -> Result<()> {
        let handle = self.handle()?;
        let bytes = command.to_bytes()?;
        trace!(
            product = self.profile.name,
            value = format_args!("0x{:04X}", self.profile.control_value),
            report_hex = format_args!("{:02X?}", bytes),
            "USB TX"
        );
        handle
            .write_control(
                REQUEST_TYPE,
                SET_REPORT,
                self.profile.control_value,
                u16::from(self.profile.interface_index),
                &bytes,
            )
            .map_err(|e| Error::TransferFailed(e.to_string()))?;
        Ok(())
    }

    /// Read the firmware's reply to a color command.
    pub fn receive_ack(&self) -> Result<AckOutcome> {
        let handle = self.handle()?;
        let mut buf = [0u8; ACK_LEN];
        match handle.read_interrupt(ACK_ENDPOINT, &mut buf, ACK_TIMEOUT) {
            Ok(n) => {
                trace!(product = self.profile.name, reply_hex = format_args!("{:02X?}", &buf[..n]), "USB RX");
                Ok(AckOutcome::Received(n))
            }
            Err(Error::Timeout(_)) => {
                debug!(product = self.profile.name, "No acknowledgement within timeout");
                Ok(AckOutcome::TimedOut)
            }
            Err(e) => {
                warn!(product = self.profile.name, error = %e, "Acknowledgement read failed");
                Ok(AckOutcome::Failed)
            }
        }
    }

    /// Send a payload and, if this model requires it, read the reply.
    pub fn send_acknowledged(&self, command: &Command) -> Result<()> {
        self.send(command)?;
        if self.profile.needs_ack_read {
            self.receive_ack()?;
        }
        Ok(())
    }

    pub fn send_color(&self, field: u8, color: u32) -> Result<Command> {
        let command = encoder::encode_color(self.profile, field, color)?;
        self.send_acknowledged(&command)?;
        Ok(command)
    }

    pub fn send_breathe(&self, color: u32, speed_ms: u32) -> Result<Command> {
        let command = encoder::encode_breathe(self.profile, color, speed_ms)?;
        self.send(&command)?;
        Ok(command)
    }

    pub fn send_cycle(&self, speed_ms: u32) -> Result<Command> {
        let command = encoder::encode_cycle(self.profile, speed_ms)?;
        self.send(&command)?;
        Ok(command)
    }

    /// Color each segment in field order, pacing the commands.
    pub fn send_segments(&self, colors: &[u32; SEGMENT_COUNT]) -> Result<Vec<Command>> {
        self.apply(&LightingMode::Segments { colors: *colors })
    }

    /// Send every command needed to reach `mode` and return them in send
    /// order. Stops at the first failure; nothing is returned for a setting
    /// that was only partly applied.
    pub fn apply(&self, mode: &LightingMode) -> Result<Vec<Command>> {
        let commands = encoder::encode_mode(self.profile, mode)?;
        self.handle()?;
        for (i, command) in commands.iter().enumerate() {
            if i > 0 {
                std::thread::sleep(COMMAND_PACING);
            }
            if mode.uses_color_commands() {
                self.send_acknowledged(command)?;
            } else {
                self.send(command)?;
            }
        }
        debug!(
            product = self.profile.name,
            mode = mode.label(),
            count = commands.len(),
            "Lighting applied"
        );
        Ok(commands)
    }
}

impl<B: UsbBackend> Drop for Session<'_, B> {
    fn drop(&mut self) {
        if self.open.is_some() {
            let _ = self.disconnect();
        }
    }
}
