//! g213-colors CLI: set and replay Logitech G213/G203 lighting.

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use g213_colors_core::diagnostics::{self, DeviceStatus};
use g213_colors_core::encoder::{self, LightingMode, DEFAULT_SPEED, SEGMENT_COUNT};
use g213_colors_core::error::Error;
use g213_colors_core::product::{self, ProductProfile};
use g213_colors_core::replay::{self, ReplayOutcome};
use g213_colors_core::session::Session;
use g213_colors_core::store;
use g213_colors_core::usb::RusbBackend;
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Parser)]
#[command(
    name = "g213-colors",
    version,
    about = "Set and restore lighting on Logitech G213 keyboards and G203 mice"
)]
struct Cli {
    /// Log debug output (overridden by RUST_LOG).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List supported products and whether they are connected.
    List {
        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },
    /// Apply a lighting setting and remember it.
    Set {
        /// Product name (G213, G203) or "all".
        #[arg(short, long, default_value = "G213")]
        product: String,
        /// Where to remember the setting.
        #[arg(long, value_enum, default_value_t = SaveTarget::User)]
        save: SaveTarget,
        /// Save to this file instead of the default location.
        #[arg(long)]
        config: Option<PathBuf>,
        #[command(subcommand)]
        mode: ModeArgs,
    },
    /// Replay a saved setting (system-wide file by default, for boot services).
    Apply {
        /// Replay this product's user configuration instead.
        #[arg(short, long, conflicts_with = "config")]
        product: Option<String>,
        /// Replay this file.
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Show a saved setting.
    Show {
        /// Show this product's user configuration.
        #[arg(short, long, conflicts_with = "config")]
        product: Option<String>,
        /// Show this file (defaults to the system-wide file).
        #[arg(long)]
        config: Option<PathBuf>,
        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum ModeArgs {
    /// One color for the whole device.
    Static {
        /// Hex color, e.g. ff00aa.
        color: String,
    },
    /// Fade a color in and out.
    Breathe {
        /// Hex color, e.g. ff00aa.
        color: String,
        /// Period in milliseconds (500-65535).
        #[arg(short, long, default_value_t = DEFAULT_SPEED)]
        speed: u32,
    },
    /// Cycle through all colors.
    Cycle {
        /// Period in milliseconds (500-65535).
        #[arg(short, long, default_value_t = DEFAULT_SPEED)]
        speed: u32,
    },
    /// One color per keyboard zone, left to right.
    Segments {
        /// Five hex colors.
        #[arg(num_args = SEGMENT_COUNT, required = true)]
        colors: Vec<String>,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SaveTarget {
    /// ~/.config/G213Colors/<PRODUCT>.conf
    User,
    /// /etc/G213Colors.conf (replayed at boot)
    System,
    /// Do not save.
    None,
}

impl ModeArgs {
    fn to_mode(&self) -> g213_colors_core::error::Result<LightingMode> {
        Ok(match self {
            Self::Static { color } => LightingMode::Static {
                color: encoder::parse_color(color)?,
            },
            Self::Breathe { color, speed } => LightingMode::Breathe {
                color: encoder::parse_color(color)?,
                speed_ms: encoder::validate_speed(*speed)?,
            },
            Self::Cycle { speed } => LightingMode::Cycle {
                speed_ms: encoder::validate_speed(*speed)?,
            },
            Self::Segments { colors } => {
                let mut parsed = [0u32; SEGMENT_COUNT];
                for (slot, text) in parsed.iter_mut().zip(colors) {
                    *slot = encoder::parse_color(text)?;
                }
                LightingMode::Segments { colors: parsed }
            }
        })
    }
}

/// Attach a suggested fix to a core error.
fn explain(err: Error, profile: Option<&ProductProfile>) -> anyhow::Error {
    match diagnostics::hint(&err, profile) {
        Some(hint) => anyhow::anyhow!("{err}\nhint: {hint}"),
        None => anyhow::Error::new(err),
    }
}

fn target_path(
    target: SaveTarget,
    config: Option<&PathBuf>,
    profile: &ProductProfile,
) -> Result<Option<PathBuf>> {
    if let Some(path) = config {
        return Ok(Some(path.clone()));
    }
    Ok(match target {
        SaveTarget::User => Some(store::user_config_path(profile.name)?),
        SaveTarget::System => Some(store::system_config_path()),
        SaveTarget::None => None,
    })
}

/// `--product all` writes one file per product, so it cannot share a
/// single destination: both an explicit `--config` and the system file hold
/// exactly one product.
fn check_set_all_target(save: SaveTarget, config: Option<&PathBuf>) -> Result<()> {
    if config.is_some() {
        anyhow::bail!("--config cannot be combined with --product all");
    }
    if save == SaveTarget::System {
        anyhow::bail!(
            "--save system cannot be combined with --product all: {} holds one product",
            store::SYSTEM_CONFIG_PATH
        );
    }
    Ok(())
}

fn config_path(product: Option<&str>, config: Option<PathBuf>) -> Result<PathBuf> {
    match (product, config) {
        (_, Some(path)) => Ok(path),
        (Some(name), None) => Ok(store::user_config_path(name)?),
        (None, None) => Ok(store::system_config_path()),
    }
}

/// Apply `mode` to one product and save the commands once all were sent.
fn set_one(
    backend: &RusbBackend,
    profile: &'static ProductProfile,
    mode: &LightingMode,
    save_to: Option<PathBuf>,
) -> Result<()> {
    let mut session = Session::new(backend, profile);
    session
        .connect()
        .map_err(|e| explain(e, Some(profile)))?;
    let applied = session.apply(mode);
    session.disconnect()?;
    let commands = applied.map_err(|e| explain(e, Some(profile)))?;
    info!(product = profile.name, mode = mode.label(), "Setting applied");

    match save_to {
        Some(path) => {
            store::save(profile.name, &commands, &path)?;
            println!(
                "{}: {} applied, saved to {}",
                profile.name,
                mode.label(),
                path.display()
            );
        }
        None => println!("{}: {} applied", profile.name, mode.label()),
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();

    let backend = RusbBackend;

    match cli.command {
        Commands::List { json } => {
            let rows: Vec<(&ProductProfile, DeviceStatus)> = product::all()
                .iter()
                .map(|p| (*p, diagnostics::probe(&backend, p)))
                .collect();
            if json {
                let value: Vec<serde_json::Value> = rows
                    .iter()
                    .map(|(p, status)| {
                        serde_json::json!({
                            "name": p.name,
                            "display_name": p.display_name,
                            "usb_id": p.usb_id(),
                            "status": status.to_string(),
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else {
                for (p, status) in &rows {
                    println!("{:<5} {:<24} {}  {}", p.name, p.display_name, p.usb_id(), status);
                }
            }
        }
        Commands::Set {
            product: name,
            save,
            config,
            mode,
        } => {
            let mode = mode.to_mode()?;
            if name.eq_ignore_ascii_case("all") {
                check_set_all_target(save, config.as_ref())?;
                let mut failed = Vec::new();
                for &profile in product::all() {
                    let path = target_path(save, None, profile)?;
                    if let Err(e) = set_one(&backend, profile, &mode, path) {
                        warn!(product = profile.name, error = %e, "Setting not applied");
                        eprintln!("{}: {e:#}", profile.name);
                        failed.push(profile.name);
                    }
                }
                if !failed.is_empty() {
                    anyhow::bail!("not applied to: {}", failed.join(", "));
                }
            } else {
                let profile = product::lookup(&name)?;
                let path = target_path(save, config.as_ref(), profile)?;
                set_one(&backend, profile, &mode, path)?;
            }
        }
        Commands::Apply { product, config } => {
            let path = config_path(product.as_deref(), config)?;
            info!(path = %path.display(), "Replaying saved setting");
            let outcome = replay::apply_from_file(&backend, &path).map_err(|e| {
                let profile = store::load(&path)
                    .ok()
                    .and_then(|c| product::lookup(&c.product).ok());
                explain(e, profile)
            })?;
            match outcome {
                ReplayOutcome::Complete { product, applied } => {
                    println!("{product}: replayed {applied} command(s) from {}", path.display());
                }
                ReplayOutcome::Partial {
                    product,
                    applied,
                    total,
                    error,
                } => {
                    let profile = product::lookup(product).ok();
                    return Err(explain(error, profile).context(format!(
                        "{product}: replay incomplete, {applied} of {total} command(s) applied"
                    )));
                }
            }
        }
        Commands::Show {
            product,
            config,
            json,
        } => {
            let path = config_path(product.as_deref(), config)?;
            let stored = store::load(&path)?;
            let profile = product::lookup(&stored.product)?;
            if json {
                let commands: Vec<serde_json::Value> = stored
                    .commands
                    .iter()
                    .map(|c| {
                        serde_json::json!({
                            "hex": c,
                            "decoded": encoder::decode(profile, c),
                        })
                    })
                    .collect();
                let value = serde_json::json!({
                    "path": path,
                    "product": stored.product,
                    "commands": commands,
                });
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else {
                println!("{} ({})", profile, path.display());
                for command in &stored.commands {
                    let meaning = match encoder::decode(profile, command) {
                        Some(decoded) => format!("{decoded:?}"),
                        None => "unrecognised".to_string(),
                    };
                    println!("  {command}  {meaning}");
                }
            }
        }
    }

    Ok(())
}
