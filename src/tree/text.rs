//! Text cleaning for prompts and summary excerpts

use std::sync::OnceLock;

use regex::Regex;

use crate::error::Result;
use crate::models::{ContentBlock, MessageContent};

/// Longest excerpt kept from a single message, in characters
pub const DEFAULT_MAX_EXCERPT_CHARS: usize = 500;

/// Boilerplate injected into user messages by editor integrations
pub const IDE_NOISE_PATTERNS: &[&str] = &[
    r"^The user opened the file .+$",
    r"^This may or may not be related to the current task\.?$",
    r"^The user is currently viewing",
    r"^The user's cursor is",
    r"^The user has the following file",
    r"^The user selected the lines",
];

fn tag_pattern() -> &'static Regex {
    static TAG: OnceLock<Regex> = OnceLock::new();
    TAG.get_or_init(|| Regex::new(r"<[^>]+>").expect("tag pattern is valid"))
}

fn line_break_pattern() -> &'static Regex {
    static LINES: OnceLock<Regex> = OnceLock::new();
    LINES.get_or_init(|| Regex::new(r"\n+").expect("line break pattern is valid"))
}

/// Remove markup tags and surrounding whitespace
pub fn strip_tags(text: &str) -> String {
    tag_pattern().replace_all(text, "").trim().to_string()
}

/// Truncate to at most `max_chars` characters, never splitting a character
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

#[derive(Debug, Clone)]
pub struct TextCleaner {
    noise: Vec<Regex>,
    max_chars: usize,
}

impl Default for TextCleaner {
    fn default() -> Self {
        let noise = IDE_NOISE_PATTERNS
            .iter()
            .map(|p| Regex::new(p).expect("built-in noise pattern is valid"))
            .collect();
        Self { noise, max_chars: DEFAULT_MAX_EXCERPT_CHARS }
    }
}

impl TextCleaner {
    /// Built-in noise patterns plus `extra`, truncating to `max_chars`
    pub fn new(extra: &[String], max_chars: usize) -> Result<Self> {
        let mut cleaner = Self { max_chars, ..Self::default() };
        for pattern in extra {
            cleaner.noise.push(Regex::new(pattern)?);
        }
        Ok(cleaner)
    }

    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    /// Blank text counts as noise too
    pub fn is_noise(&self, text: &str) -> bool {
        let trimmed = text.trim();
        trimmed.is_empty() || self.noise.iter().any(|p| p.is_match(trimmed))
    }

    /// Cleaned, truncated text of a message, or `None` if nothing meaningful is left
    ///
    /// Plain strings are judged as a whole. Block content collapses to the first
    /// text block that still has text once noise lines are dropped.
    pub fn clean(&self, content: &MessageContent) -> Option<String> {
        match content {
            MessageContent::Text(text) => {
                let cleaned = strip_tags(text);
                if self.is_noise(&cleaned) {
                    return None;
                }
                Some(truncate_chars(&cleaned, self.max_chars))
            }
            MessageContent::Blocks(blocks) => blocks.iter().find_map(|block| {
                let ContentBlock::Text { text } = block else { return None };
                let cleaned = strip_tags(text);
                let kept: Vec<&str> = line_break_pattern()
                    .split(&cleaned)
                    .filter(|line| !self.is_noise(line))
                    .collect();
                let joined = kept.join(" ");
                let joined = joined.trim();
                (!joined.is_empty()).then(|| truncate_chars(joined, self.max_chars))
            }),
        }
    }
}
