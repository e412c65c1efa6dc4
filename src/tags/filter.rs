//! Log line classification and encoded-value search
//!
//! Device lines look like
//!
//! ```text
//! [D][hwp.pk:410]: Chg   [D2B1][2A 2B 00 4C ][37] COND_1    (HEAT): ...
//! ```
//!
//! - the word after `]:` is the frame kind (`New`, `Chg`, `Ping`, `Same`, ...)
//! - the first word directly after a closing bracket is the frame type
//! - `(HEAT):` / `(CONT):` tells which side of the bus sent the frame
//! - the bracketed run after the 4-digit tag field holds the payload bytes

use regex::{Captures, Regex};
use std::sync::OnceLock;

use crate::decode::{decode_decimal, decode_temperature};
use crate::tags::{TagEntry, TagType};

/// Inverse video on
pub const INVERSE: &str = "\x1b[7m";
/// Inverse video off
pub const INVERSE_RESET: &str = "\x1b[27m";

/// Frame kinds eligible for tagging
const ELIGIBLE_KINDS: [&str; 3] = ["New", "Ping", "Chg"];

/// Frame types starting with this prefix are never tagged
const CLOCK_PREFIX: &str = "CLO";

/// Origin codes starting with this prefix come from the controller
const CONTROLLER_PREFIX: &str = "CONT";

struct Patterns {
    frame_kind: Regex,
    frame_type: Regex,
    origin: Regex,
    payload: Regex,
    hex_byte: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| Patterns {
        frame_kind: Regex::new(r"\]:\s*(\w+)").expect("valid frame kind pattern"),
        frame_type: Regex::new(r"\]\s*(\w+)").expect("valid frame type pattern"),
        origin: Regex::new(r"\((\w+)\s*\):").expect("valid origin pattern"),
        payload: Regex::new(r"^(.*\[[0-9A-F]{4}\]\[)([0-9A-F\s]*)(\].*)$")
            .expect("valid payload pattern"),
        hex_byte: Regex::new(r"[0-9A-F]{2}").expect("valid hex byte pattern"),
    })
}

/// Which side of the bus emitted a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Controller,
    Device,
}

/// Print category of the frame (`New`, `Chg`, ...), empty when absent
pub fn frame_kind(line: &str) -> &str {
    patterns()
        .frame_kind
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map_or("", |m| m.as_str())
}

/// Frame type name (`COND_1`, `CLOCK`, ...), empty when absent
pub fn frame_type(line: &str) -> &str {
    patterns()
        .frame_type
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map_or("", |m| m.as_str())
}

/// Raw origin code of a line (`CONT`, `HEAT`, ...), empty when absent
pub fn origin_code(line: &str) -> &str {
    patterns()
        .origin
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map_or("", |m| m.as_str())
}

/// Bus side of a line; anything not tagged `CONT...` counts as the device
pub fn origin(line: &str) -> Origin {
    if origin_code(line).starts_with(CONTROLLER_PREFIX) {
        Origin::Controller
    } else {
        Origin::Device
    }
}

/// True if `byte` decodes to `target` for the given search type
pub fn byte_matches(tag_type: TagType, byte: u8, target: f64) -> bool {
    match tag_type {
        TagType::Temperature => {
            decode_temperature(byte, false) == target || decode_temperature(byte, true) == target
        }
        TagType::Number => f64::from(byte) == target || decode_decimal(byte) == target,
        _ => false,
    }
}

/// Highlight every payload byte matching `target`
///
/// Returns `None` when the line carries no payload run.
pub fn highlight_payload(line: &str, tag_type: TagType, target: f64) -> Option<(bool, String)> {
    let patterns = patterns();
    let caps = patterns.payload.captures(line)?;

    let mut found = false;
    let payload = patterns
        .hex_byte
        .replace_all(&caps[2], |byte_caps: &Captures| {
            let hex = &byte_caps[0];
            let is_match = u8::from_str_radix(hex, 16)
                .map(|byte| byte_matches(tag_type, byte, target))
                .unwrap_or(false);
            if is_match {
                found = true;
                format!("{}{}{}", INVERSE, hex, INVERSE_RESET)
            } else {
                hex.to_string()
            }
        });

    Some((found, format!("{}{}{}", &caps[1], payload, &caps[3])))
}

impl TagEntry {
    /// Classify one log line against this tag
    ///
    /// Returns whether the line belongs to the tag and the line to print,
    /// with matched payload bytes highlighted for searchable tags.
    pub fn filter(&self, line: &str) -> (bool, String) {
        let eligible = match self.tag_type {
            TagType::Invalid | TagType::FlushBuffer => false,
            TagType::Event => origin(line) == Origin::Device,
            TagType::Change => origin(line) == Origin::Controller,
            TagType::Number | TagType::Temperature => true,
        };

        if !eligible
            || !ELIGIBLE_KINDS.contains(&frame_kind(line))
            || frame_type(line).starts_with(CLOCK_PREFIX)
        {
            return (false, line.to_string());
        }

        if !self.is_searchable() {
            return (true, line.to_string());
        }

        highlight_payload(line, self.tag_type, self.search_number)
            .unwrap_or_else(|| (false, line.to_string()))
    }
}
