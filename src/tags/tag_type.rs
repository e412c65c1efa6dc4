use std::fmt;

use crate::error::{Result, TaggerError};

/// Kind of tag an operator can issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagType {
    Invalid,
    FlushBuffer,
    Event,
    Change,
    Number,
    Temperature,
}

/// Per-variant metadata
struct TagInfo {
    code: &'static str,
    description: &'static str,
    prompt: &'static str,
}

impl TagType {
    /// Every variant, in menu order
    pub const ALL: [TagType; 6] = [
        TagType::Invalid,
        TagType::FlushBuffer,
        TagType::Event,
        TagType::Change,
        TagType::Number,
        TagType::Temperature,
    ];

    fn info(self) -> TagInfo {
        match self {
            Self::Invalid => TagInfo {
                code: "",
                description: "",
                prompt: "",
            },
            Self::FlushBuffer => TagInfo {
                code: "f",
                description: "flush the log buffer",
                prompt: "",
            },
            Self::Event => TagInfo {
                code: "e",
                description: "log an observed state change",
                prompt: "label for the observed state change",
            },
            Self::Change => TagInfo {
                code: "c",
                description: "log a config change",
                prompt: "label for the upcoming config change, then press enter once it shows in the logs",
            },
            Self::Number => TagInfo {
                code: "n",
                description: "search for number",
                prompt: "number to search for in previous frames",
            },
            Self::Temperature => TagInfo {
                code: "t",
                description: "search for a temperature",
                prompt: "temperature to search for in previous frames",
            },
        }
    }

    /// Single-character command code, empty for `Invalid`
    pub fn code(self) -> &'static str {
        self.info().code
    }

    pub fn description(self) -> &'static str {
        self.info().description
    }

    /// Name of the follow-up value, empty when the type takes no follow-up
    pub fn prompt(self) -> &'static str {
        self.info().prompt
    }

    pub fn has_prompt(self) -> bool {
        !self.prompt().is_empty()
    }

    /// Full text shown when asking for the follow-up value
    pub fn search_prompt(self) -> String {
        format!("Enter the {}: ", self.prompt())
    }

    /// Map a command character to its tag type (case-insensitive)
    pub fn from_char(c: char) -> Result<Self> {
        let lowered = c.to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .filter(|tag| *tag != Self::Invalid)
            .find(|tag| tag.code().chars().eq(std::iter::once(lowered)))
            .ok_or(TaggerError::InvalidTagType(c))
    }

    /// Command characters accepted on input
    pub fn allowed_chars() -> String {
        Self::ALL.iter().map(|tag| tag.code()).collect()
    }

    /// True when the tag marks log lines to flush, false for retrospective searches
    pub fn flush_logs(self) -> bool {
        !matches!(self, Self::Number | Self::Temperature)
    }

    pub fn is_searchable(self) -> bool {
        matches!(self, Self::Number | Self::Temperature)
    }

    /// Operator menu listing every real tag type
    pub fn menu() -> String {
        let commands: Vec<String> = Self::ALL
            .iter()
            .filter(|tag| !tag.description().is_empty())
            .map(|tag| format!("{}: {}", tag.code(), tag.description()))
            .collect();
        format!("followed by [duration(s|m|h)]\n\t{}", commands.join("\n\t"))
    }
}

impl fmt::Display for TagType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Invalid => write!(f, "INVALID"),
            Self::FlushBuffer => write!(f, "FLUSH_BUFFER"),
            Self::Event => write!(f, "EVENT"),
            Self::Change => write!(f, "CHANGE"),
            Self::Number => write!(f, "NUMBER"),
            Self::Temperature => write!(f, "TEMPERATURE"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_from_char_known_codes() {
        assert_eq!(TagType::from_char('f').unwrap(), TagType::FlushBuffer);
        assert_eq!(TagType::from_char('e').unwrap(), TagType::Event);
        assert_eq!(TagType::from_char('c').unwrap(), TagType::Change);
        assert_eq!(TagType::from_char('n').unwrap(), TagType::Number);
        assert_eq!(TagType::from_char('T').unwrap(), TagType::Temperature);
    }

    #[test]
    fn test_from_char_unknown() {
        let result = TagType::from_char('x');
        assert!(matches!(result, Err(TaggerError::InvalidTagType('x'))));
        assert!(TagType::from_char('q').is_err());
    }

    #[test]
    fn test_codes_are_unique() {
        let codes: HashSet<&str> = TagType::ALL.iter().map(|t| t.code()).collect();
        assert_eq!(codes.len(), TagType::ALL.len());
        assert_eq!(TagType::allowed_chars(), "fecnt");
    }

    #[test]
    fn test_policies() {
        assert!(TagType::FlushBuffer.flush_logs());
        assert!(TagType::Event.flush_logs());
        assert!(TagType::Change.flush_logs());
        assert!(!TagType::Number.flush_logs());
        assert!(!TagType::Temperature.flush_logs());

        assert!(TagType::Number.is_searchable());
        assert!(TagType::Temperature.is_searchable());
        assert!(!TagType::Event.is_searchable());
        assert!(!TagType::Invalid.is_searchable());
    }

    #[test]
    fn test_prompts() {
        assert!(!TagType::FlushBuffer.has_prompt());
        assert!(TagType::Event.has_prompt());
        assert_eq!(
            TagType::Number.search_prompt(),
            "Enter the number to search for in previous frames: "
        );
    }

    #[test]
    fn test_menu_lists_real_types_only() {
        let menu = TagType::menu();
        assert!(menu.starts_with("followed by [duration(s|m|h)]"));
        assert!(menu.contains("f: flush the log buffer"));
        assert!(menu.contains("t: search for a temperature"));
        assert_eq!(menu.matches(": ").count(), 5);
    }
}
