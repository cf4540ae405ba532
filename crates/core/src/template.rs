//! Command templates with named substitution slots.
//!
//! A template is a hex string with placeholders such as `{field}` or
//! `{color}`. Each slot has a fixed width in hex digits, so every payload a
//! template renders has the same length. The same slot table is used in
//! reverse to recognise a stored command and read its values back.

use crate::command::Command;
use crate::error::{Error, Result};
use serde::Serialize;

/// A named insertion point inside a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Slot {
    /// Field index: 0 = whole device, 1..=5 = one segment.
    Field,
    /// 24-bit RGB color.
    Color,
    /// Effect period in milliseconds.
    Speed,
    /// Effect brightness in percent.
    Brightness,
}

impl Slot {
    /// Placeholder name as written inside `{}` in a template.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Field => "field",
            Self::Color => "color",
            Self::Speed => "speed",
            Self::Brightness => "brightness",
        }
    }

    /// Width of the rendered value in hex digits.
    pub fn width(&self) -> usize {
        match self {
            Self::Field => 2,
            Self::Color => 6,
            Self::Speed => 4,
            Self::Brightness => 2,
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        match name {
            "field" => Some(Self::Field),
            "color" => Some(Self::Color),
            "speed" => Some(Self::Speed),
            "brightness" => Some(Self::Brightness),
            _ => None,
        }
    }

    fn max_value(&self) -> u64 {
        (1u64 << (4 * self.width())) - 1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Segment {
    Literal(&'static str),
    Slot(Slot),
}

/// A per-model command layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Template(&'static str);

impl Template {
    pub const fn new(pattern: &'static str) -> Self {
        Self(pattern)
    }

    pub fn pattern(&self) -> &'static str {
        self.0
    }

    fn segments(&self) -> Vec<Segment> {
        let mut segments = Vec::new();
        let mut rest = self.0;
        while let Some(open) = rest.find('{') {
            let Some(close) = rest[open..].find('}').map(|c| open + c) else {
                break;
            };
            match Slot::from_name(&rest[open + 1..close]) {
                Some(slot) => {
                    if open > 0 {
                        segments.push(Segment::Literal(&rest[..open]));
                    }
                    segments.push(Segment::Slot(slot));
                }
                None => segments.push(Segment::Literal(&rest[..=close])),
            }
            rest = &rest[close + 1..];
        }
        if !rest.is_empty() {
            segments.push(Segment::Literal(rest));
        }
        segments
    }

    /// Length in hex digits of every payload this template renders.
    pub fn rendered_len(&self) -> usize {
        self.segments()
            .iter()
            .map(|s| match s {
                Segment::Literal(text) => text.len(),
                Segment::Slot(slot) => slot.width(),
            })
            .sum()
    }

    /// Offset in hex digits of `slot` within a rendered payload.
    pub fn slot_offset(&self, slot: Slot) -> Option<usize> {
        let mut offset = 0;
        for segment in self.segments() {
            match segment {
                Segment::Slot(s) if s == slot => return Some(offset),
                Segment::Slot(s) => offset += s.width(),
                Segment::Literal(text) => offset += text.len(),
            }
        }
        None
    }

    /// Substitute every slot and produce a command.
    ///
    /// Each slot in the template must be supplied exactly once and its value
    /// must fit the slot width.
    pub fn render(&self, values: &[(Slot, u32)]) -> Result<Command> {
        let mut out = String::with_capacity(self.rendered_len());
        for segment in self.segments() {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Slot(slot) => {
                    let value = values
                        .iter()
                        .find(|(s, _)| *s == slot)
                        .map(|(_, v)| *v)
                        .ok_or_else(|| {
                            Error::InvalidCommand(format!(
                                "no value for slot {{{}}} in {}",
                                slot.name(),
                                self.0
                            ))
                        })?;
                    if u64::from(value) > slot.max_value() {
                        return Err(Error::InvalidCommand(format!(
                            "value {value:#x} does not fit slot {{{}}}",
                            slot.name()
                        )));
                    }
                    out.push_str(&format!("{:0width$x}", value, width = slot.width()));
                }
            }
        }
        Command::from_hex(&out)
    }

    /// Whether `command` has this template's layout: same length, identical
    /// literal parts and hex digits in every slot.
    pub fn matches(&self, command: &Command) -> bool {
        let text = command.as_hex();
        if text.len() != self.rendered_len() {
            return false;
        }
        let mut offset = 0;
        for segment in self.segments() {
            match segment {
                Segment::Literal(lit) => {
                    if !text[offset..offset + lit.len()].eq_ignore_ascii_case(lit) {
                        return false;
                    }
                    offset += lit.len();
                }
                Segment::Slot(slot) => offset += slot.width(),
            }
        }
        true
    }

    /// Read a slot value back out of a command rendered by this template.
    pub fn extract(&self, command: &Command, slot: Slot) -> Option<u32> {
        if !self.matches(command) {
            return None;
        }
        let offset = self.slot_offset(slot)?;
        let digits = &command.as_hex()[offset..offset + slot.width()];
        u32::from_str_radix(digits, 16).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COLOR: Template = Template::new("11ff0c3a{field}01{color}0200000000000000000000");

    #[test]
    fn slot_offsets_in_payload_order() {
        assert_eq!(COLOR.rendered_len(), 40);
        assert_eq!(COLOR.slot_offset(Slot::Field), Some(8));
        assert_eq!(COLOR.slot_offset(Slot::Color), Some(12));
        assert_eq!(COLOR.slot_offset(Slot::Speed), None);
    }

    #[test]
    fn render_pads_values_to_slot_width() {
        let cmd = COLOR
            .render(&[(Slot::Field, 3), (Slot::Color, 0x00_00ff)])
            .unwrap();
        assert_eq!(cmd.as_hex(), "11ff0c3a03010000ff0200000000000000000000");
    }

    #[test]
    fn render_rejects_missing_slot() {
        assert!(COLOR.render(&[(Slot::Field, 0)]).is_err());
    }

    #[test]
    fn render_rejects_oversized_value() {
        assert!(COLOR
            .render(&[(Slot::Field, 0x100), (Slot::Color, 0)])
            .is_err());
    }

    #[test]
    fn extract_reads_back_slot() {
        let cmd = COLOR
            .render(&[(Slot::Field, 5), (Slot::Color, 0x12_34ab)])
            .unwrap();
        assert!(COLOR.matches(&cmd));
        assert_eq!(COLOR.extract(&cmd, Slot::Field), Some(5));
        assert_eq!(COLOR.extract(&cmd, Slot::Color), Some(0x12_34ab));
    }

    #[test]
    fn matches_rejects_other_layouts() {
        let other = Command::from_hex("11ff0c3a0002ff00aa1388006400000000000000").unwrap();
        assert!(!COLOR.matches(&other));
        let short = Command::from_hex("11ff").unwrap();
        assert!(!COLOR.matches(&short));
    }

    #[test]
    fn unknown_placeholder_is_literal() {
        let t = Template::new("aa{bogus}bb");
        assert_eq!(t.slot_offset(Slot::Field), None);
        assert_eq!(t.slot_offset(Slot::Color), None);
        assert_eq!(t.rendered_len(), 11);
    }
}
