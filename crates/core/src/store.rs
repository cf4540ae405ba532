//! Configuration store: the applied commands of a lighting setting, tagged
//! with the product they belong to.
//!
//! File format, one item per line:
//!
//! ```text
//! PRODUCT=G213
//! 11ff0c3a0001ff00aa0200000000000000000000
//! ```
//!
//! The first line names the product; each following non-blank line is one
//! hex payload, replayed in file order. Parsing is strict: an unknown tag,
//! a second tag, or a line that is not one of the tagged product's commands
//! rejects the whole file.

use crate::command::Command;
use crate::encoder;
use crate::error::{Error, Result};
use crate::product;
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Prefix of the first line.
pub const PRODUCT_TAG: &str = "PRODUCT=";

/// Shared file replayed at boot by a privileged startup service.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/G213Colors.conf";

/// Directory under the user's config dir holding per-product files.
pub const USER_CONFIG_DIR: &str = "G213Colors";

/// A persisted lighting setting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredConfiguration {
    /// Canonical profile name.
    pub product: String,
    /// Payloads in send order.
    pub commands: Vec<Command>,
}

impl StoredConfiguration {
    pub fn new(product: impl Into<String>, commands: Vec<Command>) -> Self {
        Self {
            product: product.into(),
            commands,
        }
    }

    /// Render the file contents.
    pub fn to_text(&self) -> String {
        let mut text = format!("{PRODUCT_TAG}{}\n", self.product);
        for command in &self.commands {
            text.push_str(command.as_hex());
            text.push('\n');
        }
        text
    }

    /// Parse file contents.
    pub fn parse(text: &str) -> Result<Self> {
        let mut lines = text.lines().enumerate();

        let (_, first) = lines
            .next()
            .ok_or_else(|| Error::MalformedConfig("file is empty".into()))?;
        let name = first
            .trim()
            .strip_prefix(PRODUCT_TAG)
            .ok_or_else(|| {
                Error::MalformedConfig(format!(
                    "line 1: expected {PRODUCT_TAG}<name>, found {:?}",
                    first.trim()
                ))
            })?
            .trim();
        if name.is_empty() {
            return Err(Error::MalformedConfig("line 1: product name is empty".into()));
        }
        let profile = product::lookup(name)?;

        let mut commands = Vec::new();
        for (idx, raw) in lines {
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }
            let lineno = idx + 1;
            if line.starts_with(PRODUCT_TAG) {
                return Err(Error::MalformedConfig(format!(
                    "line {lineno}: only one {PRODUCT_TAG} line is allowed"
                )));
            }
            if line.contains(',') {
                return Err(Error::MalformedConfig(format!(
                    "line {lineno}: comma-separated commands are not supported, use one command per line"
                )));
            }
            let command = Command::from_hex(line)
                .map_err(|e| Error::MalformedConfig(format!("line {lineno}: {e}")))?;
            if encoder::decode(profile, &command).is_none() {
                return Err(Error::MalformedConfig(format!(
                    "line {lineno}: {command} is not a {} command",
                    profile.name
                )));
            }
            commands.push(command);
        }

        Ok(Self::new(profile.name, commands))
    }
}

/// Path of the system-wide configuration.
pub fn system_config_path() -> PathBuf {
    PathBuf::from(SYSTEM_CONFIG_PATH)
}

/// Directory holding per-product user configurations
/// (`$XDG_CONFIG_HOME/G213Colors` on Linux).
pub fn user_config_dir() -> Result<PathBuf> {
    dirs::config_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".config")))
        .map(|dir| dir.join(USER_CONFIG_DIR))
        .ok_or_else(|| Error::PersistenceFailed {
            path: PathBuf::from(USER_CONFIG_DIR),
            source: io::Error::new(
                io::ErrorKind::NotFound,
                "could not determine the user configuration directory",
            ),
        })
}

/// Per-product user configuration, e.g. `~/.config/G213Colors/G213.conf`.
pub fn user_config_path(product_name: &str) -> Result<PathBuf> {
    let profile = product::lookup(product_name)?;
    Ok(user_config_dir()?.join(format!("{}.conf", profile.name)))
}

/// Write `commands` for `product_name` to `path`, replacing any previous
/// contents.
///
/// The new contents are written to a sibling temporary file and renamed over
/// `path`, so readers see either the old file or the new one.
pub fn save(product_name: &str, commands: &[Command], path: &Path) -> Result<()> {
    let profile = product::lookup(product_name)?;
    let config = StoredConfiguration::new(profile.name, commands.to_vec());
    let persist_err = |source: io::Error| Error::PersistenceFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(persist_err)?;
    }

    let mut tmp_name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    fs::write(&tmp_path, config.to_text()).map_err(persist_err)?;
    if let Err(e) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(persist_err(e));
    }

    info!(
        product = profile.name,
        commands = commands.len(),
        path = %path.display(),
        "Configuration saved"
    );
    Ok(())
}

/// Read a configuration back.
pub fn load(path: &Path) -> Result<StoredConfiguration> {
    let text = fs::read_to_string(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => Error::ConfigNotFound(path.to_path_buf()),
        _ => Error::PersistenceFailed {
            path: path.to_path_buf(),
            source: e,
        },
    })?;
    let config = StoredConfiguration::parse(&text)?;
    debug!(
        product = %config.product,
        commands = config.commands.len(),
        path = %path.display(),
        "Configuration loaded"
    );
    Ok(config)
}
