//! Command encoder: turns a lighting intent into payloads for one model.
//!
//! Every function here is pure. All parameters are validated before a
//! template is touched, so an invalid request never produces a payload and
//! never reaches the device.

use crate::command::Command;
use crate::error::{Error, Result};
use crate::product::ProductProfile;
use crate::template::Slot;
use serde::Serialize;

/// Highest field index; 0 addresses the whole device.
pub const FIELD_MAX: u8 = 5;
/// Number of independently colored segments.
pub const SEGMENT_COUNT: usize = 5;
/// Largest 24-bit RGB value.
pub const COLOR_MAX: u32 = 0x00FF_FFFF;
/// Shortest effect period the firmware accepts, in milliseconds.
pub const SPEED_MIN: u32 = 500;
/// Longest effect period; the firmware field is 16 bits wide.
pub const SPEED_MAX: u32 = 65_535;
/// Brightness written into breathe and cycle commands (firmware maximum, 100%).
pub const BRIGHTNESS_MAX: u32 = 0x64;
/// Default effect period offered to users.
pub const DEFAULT_SPEED: u32 = 5_000;

pub fn validate_field(field: u8) -> Result<u8> {
    if field > FIELD_MAX {
        return Err(Error::InvalidField(field));
    }
    Ok(field)
}

pub fn validate_color(color: u32) -> Result<u32> {
    if color > COLOR_MAX {
        return Err(Error::InvalidColor(format!(
            "{color:#x} does not fit in 24 bits"
        )));
    }
    Ok(color)
}

pub fn validate_speed(speed_ms: u32) -> Result<u32> {
    if !(SPEED_MIN..=SPEED_MAX).contains(&speed_ms) {
        return Err(Error::InvalidSpeed {
            value: speed_ms,
            min: SPEED_MIN,
            max: SPEED_MAX,
        });
    }
    Ok(speed_ms)
}

/// Parse a six-digit hex color, with or without a leading `#`.
pub fn parse_color(text: &str) -> Result<u32> {
    let digits = text.trim().trim_start_matches('#');
    if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(Error::InvalidColor(format!(
            "{text:?} is not a six-digit hex color"
        )));
    }
    u32::from_str_radix(digits, 16).map_err(|e| Error::InvalidColor(format!("{text:?}: {e}")))
}

/// Static color for the whole device (`field` 0) or one segment (1..=5).
pub fn encode_color(profile: &ProductProfile, field: u8, color: u32) -> Result<Command> {
    let field = validate_field(field)?;
    let color = validate_color(color)?;
    profile
        .color_template
        .render(&[(Slot::Field, u32::from(field)), (Slot::Color, color)])
}

/// Breathing effect in `color` with a period of `speed_ms`.
pub fn encode_breathe(profile: &ProductProfile, color: u32, speed_ms: u32) -> Result<Command> {
    let color = validate_color(color)?;
    let speed = validate_speed(speed_ms)?;
    profile.breathe_template.render(&[
        (Slot::Color, color),
        (Slot::Speed, speed),
        (Slot::Brightness, BRIGHTNESS_MAX),
    ])
}

/// Color cycle with a period of `speed_ms`.
pub fn encode_cycle(profile: &ProductProfile, speed_ms: u32) -> Result<Command> {
    let speed = validate_speed(speed_ms)?;
    profile
        .cycle_template
        .render(&[(Slot::Speed, speed), (Slot::Brightness, BRIGHTNESS_MAX)])
}

/// One color command per segment, fields 1..=5 in ascending order.
///
/// The device applies segments one at a time, so the order here is the
/// order they must be sent and stored.
pub fn encode_segments(
    profile: &ProductProfile,
    colors: &[u32; SEGMENT_COUNT],
) -> Result<Vec<Command>> {
    for &color in colors {
        validate_color(color)?;
    }
    colors
        .iter()
        .zip(1..=FIELD_MAX)
        .map(|(&color, field)| encode_color(profile, field, color))
        .collect()
}

/// A complete lighting setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum LightingMode {
    Static { color: u32 },
    Breathe { color: u32, speed_ms: u32 },
    Cycle { speed_ms: u32 },
    Segments { colors: [u32; SEGMENT_COUNT] },
}

impl LightingMode {
    /// Whether the mode is sent as color commands, which some firmware
    /// acknowledges on the interrupt endpoint.
    pub fn uses_color_commands(&self) -> bool {
        matches!(self, Self::Static { .. } | Self::Segments { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Static { .. } => "static",
            Self::Breathe { .. } => "breathe",
            Self::Cycle { .. } => "cycle",
            Self::Segments { .. } => "segments",
        }
    }
}

/// Every payload needed to reach `mode`, in send order.
pub fn encode_mode(profile: &ProductProfile, mode: &LightingMode) -> Result<Vec<Command>> {
    match *mode {
        LightingMode::Static { color } => Ok(vec![encode_color(profile, 0, color)?]),
        LightingMode::Breathe { color, speed_ms } => {
            Ok(vec![encode_breathe(profile, color, speed_ms)?])
        }
        LightingMode::Cycle { speed_ms } => Ok(vec![encode_cycle(profile, speed_ms)?]),
        LightingMode::Segments { colors } => encode_segments(profile, &colors),
    }
}

/// What a stored payload does, recovered from the profile's templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DecodedCommand {
    Color { field: u8, color: u32 },
    Breathe { color: u32, speed_ms: u32 },
    Cycle { speed_ms: u32 },
}

/// Recognise a payload produced by one of `profile`'s templates.
pub fn decode(profile: &ProductProfile, command: &Command) -> Option<DecodedCommand> {
    let color_t = &profile.color_template;
    if color_t.matches(command) {
        return Some(DecodedCommand::Color {
            field: u8::try_from(color_t.extract(command, Slot::Field)?).ok()?,
            color: color_t.extract(command, Slot::Color)?,
        });
    }
    let breathe_t = &profile.breathe_template;
    if breathe_t.matches(command) {
        return Some(DecodedCommand::Breathe {
            color: breathe_t.extract(command, Slot::Color)?,
            speed_ms: breathe_t.extract(command, Slot::Speed)?,
        });
    }
    let cycle_t = &profile.cycle_template;
    if cycle_t.matches(command) {
        return Some(DecodedCommand::Cycle {
            speed_ms: cycle_t.extract(command, Slot::Speed)?,
        });
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::product::{self, G203, G213};

    #[test]
    fn static_color_whole_device() {
        let cmd = encode_color(&G213, 0, 0xff00aa).unwrap();
        assert_eq!(cmd.as_hex(), "11ff0c3a0001ff00aa0200000000000000000000");
    }

    #[test]
    fn color_every_field_matches_template_width() {
        for profile in product::all() {
            for field in 0..=FIELD_MAX {
                let cmd = encode_color(profile, field, 0x123456).unwrap();
                assert_eq!(cmd.as_hex().len(), profile.color_template.rendered_len());
                assert_eq!(cmd.to_bytes().unwrap().len(), 20);
                assert_eq!(cmd, encode_color(profile, field, 0x123456).unwrap());
            }
        }
    }

    #[test]
    fn color_rejects_bad_field() {
        assert!(matches!(
            encode_color(&G213, 6, 0xffffff),
            Err(Error::InvalidField(6))
        ));
    }

    #[test]
    fn color_rejects_wide_color() {
        assert!(matches!(
            encode_color(&G213, 0, 0x0100_0000),
            Err(Error::InvalidColor(_))
        ));
    }

    #[test]
    fn breathe_g213_layout() {
        let cmd = encode_breathe(&G213, 0xff00aa, 5000).unwrap();
        assert_eq!(cmd.as_hex(), "11ff0c3a0002ff00aa1388006400000000000000");
    }

    #[test]
    fn cycle_g203_speed_slot() {
        let cmd = encode_cycle(&G203, 5000).unwrap();
        assert_eq!(cmd.as_hex(), "11ff0e3c00020000000000138864000000000000");
        let offset = G203.cycle_template.slot_offset(Slot::Speed).unwrap();
        assert_eq!(&cmd.as_hex()[offset..offset + 4], "1388");
    }

    #[test]
    fn speed_bounds_are_enforced() {
        for speed in [0, 1, 499, 65_536, 100_000, u32::MAX] {
            assert!(matches!(
                encode_cycle(&G213, speed),
                Err(Error::InvalidSpeed { .. })
            ));
            assert!(matches!(
                encode_breathe(&G203, 0xffffff, speed),
                Err(Error::InvalidSpeed { .. })
            ));
        }
    }

    #[test]
    fn speed_field_reads_back() {
        for profile in product::all() {
            for speed in [SPEED_MIN, 501, 1000, 4096, 5000, 32_768, SPEED_MAX] {
                let cycle = encode_cycle(profile, speed).unwrap();
                assert_eq!(
                    profile.cycle_template.extract(&cycle, Slot::Speed),
                    Some(speed)
                );
                let breathe = encode_breathe(profile, 0x00ff00, speed).unwrap();
                assert_eq!(
                    decode(profile, &breathe),
                    Some(DecodedCommand::Breathe {
                        color: 0x00ff00,
                        speed_ms: speed
                    })
                );
            }
        }
    }

    #[test]
    fn segments_are_in_field_order() {
        let colors = [0x110000, 0x220000, 0x330000, 0x440000, 0x550000];
        let cmds = encode_segments(&G213, &colors).unwrap();
        assert_eq!(cmds.len(), SEGMENT_COUNT);
        for (i, cmd) in cmds.iter().enumerate() {
            assert_eq!(
                decode(&G213, cmd),
                Some(DecodedCommand::Color {
                    field: i as u8 + 1,
                    color: colors[i]
                })
            );
        }
    }

    #[test]
    fn segments_reject_any_bad_color() {
        let colors = [0, 0, 0x0100_0000, 0, 0];
        assert!(matches!(
            encode_segments(&G213, &colors),
            Err(Error::InvalidColor(_))
        ));
    }

    #[test]
    fn encode_mode_counts() {
        let count = |mode| encode_mode(&G213, &mode).unwrap().len();
        assert_eq!(count(LightingMode::Static { color: 0 }), 1);
        assert_eq!(
            count(LightingMode::Breathe {
                color: 0,
                speed_ms: 1000
            }),
            1
        );
        assert_eq!(count(LightingMode::Cycle { speed_ms: 1000 }), 1);
        assert_eq!(count(LightingMode::Segments { colors: [0; 5] }), 5);
    }

    #[test]
    fn decode_distinguishes_modes() {
        for profile in product::all() {
            let cycle = encode_cycle(profile, 2000).unwrap();
            assert_eq!(
                decode(profile, &cycle),
                Some(DecodedCommand::Cycle { speed_ms: 2000 })
            );
            let color = encode_color(profile, 0, 0xabcdef).unwrap();
            assert_eq!(
                decode(profile, &color),
                Some(DecodedCommand::Color {
                    field: 0,
                    color: 0xabcdef
                })
            );
        }
        let g203_color = encode_color(&G203, 0, 0).unwrap();
        assert_eq!(decode(&G213, &g203_color), None);
    }

    #[test]
    fn parse_color_accepts_hex() {
        assert_eq!(parse_color("ff00aa").unwrap(), 0xff00aa);
        assert_eq!(parse_color("#FF00AA").unwrap(), 0xff00aa);
        assert!(matches!(parse_color("ff00a"), Err(Error::InvalidColor(_))));
        assert!(parse_color("gg0000").is_err());
        assert!(parse_color("ff00aa00").is_err());
    }
}
