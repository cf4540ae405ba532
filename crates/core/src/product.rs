//! Product profile registry: USB identifiers and command templates for each
//! supported model.
//!
//! The registry is a static table. There is no way to add or change a
//! profile at runtime; supporting another model means adding an entry here.

use crate::error::{Error, Result};
use crate::template::Template;
use crate::{pids, LOGITECH_VID};
use serde::Serialize;

/// Interface used for kernel-driver detach, claim and as `wIndex` of every
/// control transfer. Both supported models expose lighting on interface 1.
pub const LIGHTING_INTERFACE: u8 = 0x01;

/// Immutable descriptor of one hardware model.
#[derive(Debug, Serialize)]
pub struct ProductProfile {
    /// Short identifier, also written to configuration files.
    pub name: &'static str,
    /// Human-readable name.
    pub display_name: &'static str,
    pub vendor_id: u16,
    pub product_id: u16,
    /// `wValue` of every control transfer sent to this model.
    pub control_value: u16,
    pub interface_index: u8,
    /// Slots: field, color.
    pub color_template: Template,
    /// Slots: color, speed, brightness.
    pub breathe_template: Template,
    /// Slots: speed, brightness. Color is fixed by the firmware layout.
    pub cycle_template: Template,
    /// The firmware replies to color commands on the interrupt endpoint and
    /// expects the reply to be read before the next command.
    pub needs_ack_read: bool,
}

/// Logitech G213 Prodigy keyboard (five lighting zones).
pub static G213: ProductProfile = ProductProfile {
    name: "G213",
    display_name: "Logitech G213 Prodigy",
    vendor_id: LOGITECH_VID,
    product_id: pids::G213,
    control_value: 0x0211,
    interface_index: LIGHTING_INTERFACE,
    color_template: Template::new("11ff0c3a{field}01{color}0200000000000000000000"),
    breathe_template: Template::new("11ff0c3a0002{color}{speed}00{brightness}00000000000000"),
    cycle_template: Template::new("11ff0c3a0003ffffff0000{speed}{brightness}000000000000"),
    needs_ack_read: true,
};

/// Logitech G203 Prodigy mouse.
pub static G203: ProductProfile = ProductProfile {
    name: "G203",
    display_name: "Logitech G203 Prodigy",
    vendor_id: LOGITECH_VID,
    product_id: pids::G203,
    control_value: 0x0210,
    interface_index: LIGHTING_INTERFACE,
    color_template: Template::new("11ff0e3c{field}01{color}0200000000000000000000"),
    breathe_template: Template::new("11ff0e3c0003{color}{speed}00{brightness}00000000000000"),
    cycle_template: Template::new("11ff0e3c00020000000000{speed}{brightness}000000000000"),
    needs_ack_read: false,
};

static PROFILES: [&ProductProfile; 2] = [&G213, &G203];

/// All registered profiles, in display order.
pub fn all() -> &'static [&'static ProductProfile] {
    &PROFILES
}

/// Look up a profile by name (case-insensitive).
pub fn lookup(name: &str) -> Result<&'static ProductProfile> {
    PROFILES
        .iter()
        .copied()
        .find(|p| p.name.eq_ignore_ascii_case(name.trim()))
        .ok_or_else(|| Error::UnsupportedProduct(name.to_string()))
}

impl ProductProfile {
    /// `vvvv:pppp` form used by lsusb and udev rules.
    pub fn usb_id(&self) -> String {
        format!("{:04x}:{:04x}", self.vendor_id, self.product_id)
    }
}

impl std::fmt::Display for ProductProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.display_name, self.usb_id())
    }
}
