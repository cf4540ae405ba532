//! Error types for g213-colors-core.

use std::path::PathBuf;
use thiserror::Error;

/// Core library error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Product name not present in the profile registry.
    #[error("unsupported product: {0}")]
    UnsupportedProduct(String),

    /// No USB device with the profile's vendor/product id is attached.
    #[error("device not found: {0}")]
    DeviceNotFound(String),

    /// The kernel driver owns the interface and could not be detached.
    #[error("could not detach kernel driver: {0}")]
    DriverDetachFailed(String),

    /// The interface could not be claimed after detaching.
    #[error("could not claim interface: {0}")]
    InterfaceClaimFailed(String),

    /// Operation requires an open session.
    #[error("session is not connected")]
    NotConnected,

    /// `connect` called on a session that is already open.
    #[error("session is already connected to {0}")]
    AlreadyConnected(&'static str),

    /// Control transfer rejected by the transport.
    #[error("control transfer failed: {0}")]
    TransferFailed(String),

    /// Field index outside 0..=5.
    #[error("invalid field {0} (allowed 0..=5)")]
    InvalidField(u8),

    /// Color does not fit in 24 bits or is not six hex digits.
    #[error("invalid color: {0}")]
    InvalidColor(String),

    /// Effect speed outside the firmware range.
    #[error("invalid speed {value} ms (allowed {min}..={max})")]
    InvalidSpeed { value: u32, min: u32, max: u32 },

    /// Payload text is not a well-formed hex byte string.
    #[error("invalid command payload: {0}")]
    InvalidCommand(String),

    /// Configuration could not be written.
    #[error("could not write configuration {path}: {source}")]
    PersistenceFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration file exists but does not follow the line format.
    #[error("malformed configuration: {0}")]
    MalformedConfig(String),

    /// Configuration file does not exist.
    #[error("configuration not found: {}", .0.display())]
    ConfigNotFound(PathBuf),

    /// Access to the USB device was denied (usually missing udev rule).
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Transport operation timed out.
    #[error("timeout: {0}")]
    Timeout(String),

    /// Any other USB transport failure.
    #[error("USB error: {0}")]
    Usb(String),
}

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, Error>;
