//! Replay engine: reproduce a stored lighting setting without user input.

use crate::error::{Error, Result};
use crate::product;
use crate::session::{Session, COMMAND_PACING};
use crate::store::{self, StoredConfiguration};
use crate::transport::UsbBackend;
use std::path::Path;
use tracing::{info, warn};

/// How far a replay got once the device was open.
#[derive(Debug)]
pub enum ReplayOutcome {
    /// Every stored command was sent.
    Complete { product: &'static str, applied: usize },
    /// Sending stopped at `error`; the commands after `applied` were not sent.
    Partial {
        product: &'static str,
        applied: usize,
        total: usize,
        error: Error,
    },
}

impl ReplayOutcome {
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete { .. })
    }

    pub fn applied(&self) -> usize {
        match self {
            Self::Complete { applied, .. } | Self::Partial { applied, .. } => *applied,
        }
    }

    pub fn product(&self) -> &'static str {
        match self {
            Self::Complete { product, .. } | Self::Partial { product, .. } => *product,
        }
    }
}

/// Load the configuration at `path` and replay it.
///
/// Errors before the device is open (missing or malformed file, unsupported
/// product, device absent or inaccessible) are returned as `Err`. Once the
/// device is open the result is a [`ReplayOutcome`].
pub fn apply_from_file<B: UsbBackend>(backend: &B, path: &Path) -> Result<ReplayOutcome> {
    let config = store::load(path)?;
    replay(backend, &config)
}

/// Send each stored command in order, reading the acknowledgement after each
/// one when the product needs it. The session is disconnected on every path
/// out, including after a failed send.
pub fn replay<B: UsbBackend>(backend: &B, config: &StoredConfiguration) -> Result<ReplayOutcome> {
    let profile = product::lookup(&config.product)?;
    let total = config.commands.len();
    let mut session = Session::open(backend, profile)?;

    let mut applied = 0;
    let mut failure = None;
    for (i, command) in config.commands.iter().enumerate() {
        if i > 0 {
            std::thread::sleep(COMMAND_PACING);
        }
        match session.send_acknowledged(command) {
            Ok(()) => applied += 1,
            Err(e) => {
                failure = Some(e);
                break;
            }
        }
    }

    session.disconnect()?;

    Ok(match failure {
        None => {
            info!(product = profile.name, applied, "Replay complete");
            ReplayOutcome::Complete {
                product: profile.name,
                applied,
            }
        }
        Some(error) => {
            warn!(
                product = profile.name,
                applied,
                total,
                error = %error,
                "Replay stopped before all commands were sent"
            );
            ReplayOutcome::Partial {
                product: profile.name,
                applied,
                total,
                error,
            }
        }
    })
}
