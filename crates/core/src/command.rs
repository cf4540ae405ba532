//! Fully-resolved command payloads.
//!
//! A command is held as lowercase hex text, the form it takes in templates
//! and in configuration files. It is decoded to bytes only when handed to
//! the USB transport.

use crate::error::{Error, Result};
use serde::Serialize;
use std::fmt;

/// A hex-encoded payload ready to be sent in one control transfer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Command(String);

impl Command {
    /// Parse a hex payload, rejecting anything that is not an even number of
    /// hex digits (separators, whitespace and `0x` prefixes included).
    pub fn from_hex(text: &str) -> Result<Self> {
        if text.is_empty() {
            return Err(Error::InvalidCommand("empty payload".into()));
        }
        if let Some(bad) = text.chars().find(|c| !c.is_ascii_hexdigit()) {
            return Err(Error::InvalidCommand(format!(
                "unexpected character {bad:?} in {text:?}"
            )));
        }
        if text.len() % 2 != 0 {
            return Err(Error::InvalidCommand(format!(
                "odd number of hex digits ({}) in {text:?}",
                text.len()
            )));
        }
        Ok(Self(text.to_ascii_lowercase()))
    }

    /// Hex text of the payload.
    pub fn as_hex(&self) -> &str {
        &self.0
    }

    /// Decode to the raw bytes sent over USB.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        hex::decode(&self.0).map_err(|e| Error::InvalidCommand(format!("{}: {e}", self.0)))
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_hex_normalizes_case() {
        let cmd = Command::from_hex("11FF0C3A").unwrap();
        assert_eq!(cmd.as_hex(), "11ff0c3a");
    }

    #[test]
    fn to_bytes_decodes_payload() {
        let cmd = Command::from_hex("11ff0c3a").unwrap();
        assert_eq!(cmd.to_bytes().unwrap(), vec![0x11, 0xFF, 0x0C, 0x3A]);
    }

    #[test]
    fn from_hex_rejects_separators() {
        assert!(matches!(
            Command::from_hex("11ff,0c3a"),
            Err(Error::InvalidCommand(_))
        ));
        assert!(Command::from_hex("11 ff").is_err());
        assert!(Command::from_hex("0x11ff").is_err());
    }

    #[test]
    fn from_hex_rejects_odd_length_and_empty() {
        assert!(Command::from_hex("11f").is_err());
        assert!(Command::from_hex("").is_err());
    }
}
