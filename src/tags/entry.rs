use chrono::{DateTime, Local, TimeDelta, Utc};
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;
use std::time::Duration;

use crate::error::{Result, TaggerError};
use crate::prompt::Prompter;
use crate::tags::TagType;

/// Time format used for markers and timestamps inserted into log lines
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn command_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        let pattern = format!(r"^([{}])\s*(\d+)?\s*([smh])?", TagType::allowed_chars());
        Regex::new(&pattern).expect("tag command pattern is valid")
    })
}

/// Inclusive time range a flush scans
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Local>,
    pub end: DateTime<Local>,
}

impl TimeWindow {
    pub fn contains(&self, time: DateTime<Local>) -> bool {
        self.start <= time && time <= self.end
    }
}

/// A tagging request issued by the operator
#[derive(Debug, Clone)]
pub struct TagEntry {
    pub tag_type: TagType,
    pub delay: Duration,
    pub label: String,
    pub search_number: f64,
    pub created_at: DateTime<Local>,
}

impl TagEntry {
    pub fn new(tag_type: TagType, delay: Duration) -> Self {
        Self {
            tag_type,
            delay,
            label: String::new(),
            search_number: 0.0,
            created_at: Local::now(),
        }
    }

    pub fn invalid() -> Self {
        Self::new(TagType::Invalid, Duration::ZERO)
    }

    /// Override the creation time
    pub fn with_created_at(mut self, created_at: DateTime<Local>) -> Self {
        self.created_at = created_at;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_search_number(mut self, value: f64) -> Self {
        self.search_number = value;
        self
    }

    /// Parse an operator command such as `e30s`, `c 2m` or `t`
    ///
    /// Never fails: input that does not match yields an invalid entry.
    pub fn parse(input: &str) -> Self {
        let normalized = input.trim().to_lowercase();
        let Some(caps) = command_pattern().captures(&normalized) else {
            return Self::invalid();
        };

        let tag_type = caps
            .get(1)
            .and_then(|m| m.as_str().chars().next())
            .and_then(|c| TagType::from_char(c).ok());
        let Some(tag_type) = tag_type else {
            return Self::invalid();
        };

        let count = match caps.get(2) {
            Some(m) => match m.as_str().parse::<u32>() {
                Ok(count) => u64::from(count),
                Err(_) => return Self::invalid(),
            },
            None => 0,
        };

        let multiplier = match caps.get(3).map(|m| m.as_str()) {
            Some("m") => 60,
            Some("h") => 3600,
            _ => 1,
        };

        Self::new(tag_type, Duration::from_secs(count * multiplier))
    }

    pub fn is_valid(&self) -> bool {
        self.tag_type != TagType::Invalid
    }

    pub fn is_searchable(&self) -> bool {
        self.tag_type.is_searchable()
    }

    pub fn has_prompt(&self) -> bool {
        self.tag_type.has_prompt()
    }

    /// True when the buffer should be cleared instead of windowed
    pub fn reset_buffer(&self) -> bool {
        self.tag_type == TagType::FlushBuffer
    }

    /// True when a flush removes the lines it matched, so later tags cannot
    /// pick them up again
    ///
    /// Applies to the log-flush types; searches leave the buffer untouched.
    /// Unmatched lines always stay for later searches.
    pub fn consumes_matches(&self) -> bool {
        self.is_valid() && self.tag_type.flush_logs() && !self.reset_buffer()
    }

    /// Label shown on markers, falls back to the type description
    pub fn display_label(&self) -> &str {
        if self.label.is_empty() {
            self.tag_type.description()
        } else {
            &self.label
        }
    }

    /// Start of the scanned window
    ///
    /// Only events and searches look back by `delay`; other types start at
    /// the moment the tag was created.
    pub fn start_time(&self) -> DateTime<Local> {
        match self.tag_type {
            TagType::Event | TagType::Temperature | TagType::Number => {
                let delay = TimeDelta::from_std(self.delay).unwrap_or(TimeDelta::MAX);
                self.created_at
                    .checked_sub_signed(delay)
                    .unwrap_or_else(|| DateTime::<Utc>::MIN_UTC.with_timezone(&Local))
            }
            _ => self.created_at,
        }
    }

    /// Window ending at `now`, the latest device arrival time
    pub fn window(&self, now: DateTime<Local>) -> TimeWindow {
        TimeWindow {
            start: self.start_time(),
            end: now,
        }
    }

    /// Ask the operator for the follow-up value of this tag
    ///
    /// Searchable types expect a number and get a synthesized label; other
    /// types store the answer as their label. Returns `Ok(false)` when input
    /// was closed before an answer arrived.
    pub async fn prompt_user(&mut self, prompter: &dyn Prompter) -> Result<bool> {
        if !self.has_prompt() {
            return Ok(true);
        }

        let Some(answer) = prompter.prompt(&self.tag_type.search_prompt()).await? else {
            return Ok(false);
        };
        let answer = answer.trim();

        if self.is_searchable() {
            let value: f64 = answer
                .parse()
                .map_err(|_| TaggerError::InvalidSearchValue(answer.to_string()))?;
            if !value.is_finite() {
                return Err(TaggerError::InvalidSearchValue(answer.to_string()));
            }
            self.search_number = value;
            self.label = format!("{}:{:.1}", self.tag_type.description(), value);
        } else {
            self.label = answer.to_string();
        }

        Ok(true)
    }
}

impl fmt::Display for TagEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TagType({}) at {}",
            self.tag_type.code(),
            self.created_at.format(TIME_FORMAT)
        )?;
        if !self.label.is_empty() {
            write!(f, " with text: '{}'", self.label)?;
        }
        write!(f, ", search_number: {}", self.search_number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::ScriptedPrompter;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Local> {
        Local.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn test_parse_units() {
        let entry = TagEntry::parse("e30s");
        assert_eq!(entry.tag_type, TagType::Event);
        assert_eq!(entry.delay, Duration::from_secs(30));

        let entry = TagEntry::parse("c2m");
        assert_eq!(entry.tag_type, TagType::Change);
        assert_eq!(entry.delay, Duration::from_secs(120));

        let entry = TagEntry::parse("T1h");
        assert_eq!(entry.tag_type, TagType::Temperature);
        assert_eq!(entry.delay, Duration::from_secs(3600));
    }

    #[test]
    fn test_parse_defaults() {
        let entry = TagEntry::parse("n");
        assert_eq!(entry.tag_type, TagType::Number);
        assert_eq!(entry.delay, Duration::ZERO);

        // Unit defaults to seconds
        assert_eq!(TagEntry::parse("e45").delay, Duration::from_secs(45));
        // Whitespace between parts is tolerated
        assert_eq!(TagEntry::parse("  e 1 m ").delay, Duration::from_secs(60));
        assert_eq!(TagEntry::parse("f").tag_type, TagType::FlushBuffer);
    }

    #[test]
    fn test_parse_invalid() {
        assert!(!TagEntry::parse("").is_valid());
        assert!(!TagEntry::parse("x30s").is_valid());
        assert!(!TagEntry::parse("q").is_valid());
        assert!(!TagEntry::parse("30e").is_valid());
        // Count does not fit
        assert!(!TagEntry::parse("e99999999999s").is_valid());
    }

    #[test]
    fn test_window_for_lookback_types() {
        let now = at(100);
        for input in ["e30s", "n30s", "t30s"] {
            let entry = TagEntry::parse(input).with_created_at(at(100));
            let window = entry.window(now);
            assert_eq!(window.start, at(70), "{}", input);
            assert_eq!(window.end, now);
        }
    }

    #[test]
    fn test_window_without_lookback() {
        let entry = TagEntry::parse("c30s").with_created_at(at(100));
        let window = entry.window(at(130));
        assert_eq!(window.start, at(100));
        assert_eq!(window.end, at(130));
    }

    #[test]
    fn test_window_contains_is_inclusive() {
        let window = TimeWindow {
            start: at(0),
            end: at(10),
        };
        assert!(window.contains(at(0)));
        assert!(window.contains(at(10)));
        assert!(!window.contains(at(11)));
        assert!(!window.contains(at(-1)));
    }

    #[test]
    fn test_reset_buffer_only_for_flush() {
        assert!(TagEntry::parse("f").reset_buffer());
        for input in ["e", "c", "n", "t"] {
            assert!(!TagEntry::parse(input).reset_buffer(), "{}", input);
        }
    }

    #[test]
    fn test_consumes_matches_for_flush_types() {
        assert!(TagEntry::parse("e").consumes_matches());
        assert!(TagEntry::parse("c").consumes_matches());
        assert!(!TagEntry::parse("n").consumes_matches());
        assert!(!TagEntry::parse("t").consumes_matches());
        assert!(!TagEntry::parse("f").consumes_matches());
        assert!(!TagEntry::invalid().consumes_matches());
    }

    #[tokio::test]
    async fn test_prompt_user_searchable_sets_label() {
        let prompter = ScriptedPrompter::new([" 21.5 "]);
        let mut entry = TagEntry::parse("t30s");

        assert!(entry.prompt_user(&prompter).await.unwrap());
        assert_eq!(entry.search_number, 21.5);
        assert_eq!(entry.label, "search for a temperature:21.5");
        assert_eq!(
            prompter.shown(),
            vec!["Enter the temperature to search for in previous frames: "]
        );
    }

    #[tokio::test]
    async fn test_prompt_user_text_label() {
        let prompter = ScriptedPrompter::new(["  defrost started \n"]);
        let mut entry = TagEntry::parse("e");

        assert!(entry.prompt_user(&prompter).await.unwrap());
        assert_eq!(entry.label, "defrost started");
        assert_eq!(entry.search_number, 0.0);
    }

    #[tokio::test]
    async fn test_prompt_user_rejects_non_numeric() {
        let prompter = ScriptedPrompter::new(["warm"]);
        let mut entry = TagEntry::parse("n");

        let result = entry.prompt_user(&prompter).await;
        assert!(matches!(result, Err(TaggerError::InvalidSearchValue(_))));
        assert!(entry.label.is_empty());
    }

    #[tokio::test]
    async fn test_prompt_user_skips_types_without_prompt() {
        let prompter = ScriptedPrompter::new(Vec::<String>::new());
        let mut entry = TagEntry::parse("f");

        assert!(entry.prompt_user(&prompter).await.unwrap());
        assert!(prompter.shown().is_empty());
        assert_eq!(entry.display_label(), "flush the log buffer");
    }

    #[tokio::test]
    async fn test_prompt_user_closed_input() {
        let prompter = ScriptedPrompter::new(Vec::<String>::new());
        let mut entry = TagEntry::parse("e");
        assert!(!entry.prompt_user(&prompter).await.unwrap());
    }
}
