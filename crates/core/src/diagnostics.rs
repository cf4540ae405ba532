//! Error classification and user guidance.
//!
//! Callers render failures to people; this module decides which kind of
//! problem an error is and what the user can do about it.

use crate::error::Error;
use crate::product::ProductProfile;
use crate::transport::UsbBackend;
use tracing::debug;

/// Classification of errors for user-facing reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The device is not attached.
    Disconnected,
    /// The device is attached but the process may not use it.
    PermissionDenied,
    /// Rejected parameters; nothing reached the device.
    InvalidInput,
    /// Configuration file missing, unreadable or malformed.
    Configuration,
    /// Any other transport failure.
    Transport,
}

impl ErrorClass {
    /// Classify an error.
    pub fn classify(err: &Error) -> Self {
        match err {
            Error::DeviceNotFound(_) => Self::Disconnected,
            Error::PermissionDenied(_) | Error::DriverDetachFailed(_) => Self::PermissionDenied,
            Error::InvalidField(_)
            | Error::InvalidColor(_)
            | Error::InvalidSpeed { .. }
            | Error::InvalidCommand(_)
            | Error::UnsupportedProduct(_) => Self::InvalidInput,
            Error::PersistenceFailed { .. } | Error::MalformedConfig(_) | Error::ConfigNotFound(_) => {
                Self::Configuration
            }
            Error::Usb(msg) | Error::TransferFailed(msg) | Error::InterfaceClaimFailed(msg) => {
                let lower = msg.to_lowercase();
                if lower.contains("no device") || lower.contains("not found") {
                    Self::Disconnected
                } else if lower.contains("access") || lower.contains("permission") {
                    Self::PermissionDenied
                } else {
                    Self::Transport
                }
            }
            Error::NotConnected | Error::AlreadyConnected(_) | Error::Timeout(_) => Self::Transport,
        }
    }
}

/// Suggest a fix for `err` on `profile`, if one is known.
pub fn hint(err: &Error, profile: Option<&ProductProfile>) -> Option<String> {
    let usb_id = profile.map_or_else(|| "046d:<product id>".to_string(), |p| p.usb_id());
    match ErrorClass::classify(err) {
        ErrorClass::Disconnected => Some(format!(
            "check that the device ({usb_id}) is plugged in; `lsusb` should list it"
        )),
        ErrorClass::PermissionDenied => {
            let (vid, pid) = usb_id.split_once(':').unwrap_or(("046d", "<product id>"));
            Some(format!(
                "run as root or add a udev rule such as \
                 SUBSYSTEM==\"usb\", ATTR{{idVendor}}==\"{vid}\", ATTR{{idProduct}}==\"{pid}\", MODE=\"0666\""
            ))
        }
        ErrorClass::Configuration => match err {
            Error::MalformedConfig(_) => Some(
                "the file must start with PRODUCT=<name> followed by one hex command per line"
                    .to_string(),
            ),
            Error::ConfigNotFound(_) => {
                Some("apply a setting with `set` first to create the file".to_string())
            }
            _ => None,
        },
        ErrorClass::InvalidInput | ErrorClass::Transport => None,
    }
}

/// Presence of a product, for listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceStatus {
    /// Attached and openable.
    Connected,
    /// Not attached.
    Disconnected,
    /// Attached but access was denied.
    PermissionError,
    /// Probing failed for another reason.
    Error,
}

impl std::fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Connected => "connected",
            Self::Disconnected => "not connected",
            Self::PermissionError => "permission denied",
            Self::Error => "error",
        };
        f.write_str(label)
    }
}

/// Check whether `profile`'s device is attached, without detaching or
/// claiming anything.
pub fn probe<B: UsbBackend>(backend: &B, profile: &ProductProfile) -> DeviceStatus {
    match backend.open(profile.vendor_id, profile.product_id) {
        Ok(Some(_)) => DeviceStatus::Connected,
        Ok(None) => DeviceStatus::Disconnected,
        Err(ref e) => {
            debug!(product = profile.name, error = %e, "Probe failed");
            match ErrorClass::classify(e) {
                ErrorClass::Disconnected => DeviceStatus::Disconnected,
                ErrorClass::PermissionDenied => DeviceStatus::PermissionError,
                _ => DeviceStatus::Error,
            }
        }
    }
}
