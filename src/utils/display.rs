//! Formatting of transcript text for terminal output
//!
//! Transcript content is written by another program and may carry escape
//! sequences; anything printed by the CLI goes through [`sanitize`] first.

use std::sync::OnceLock;

use regex::Regex;

fn escape_pattern() -> &'static Regex {
    static ESCAPES: OnceLock<Regex> = OnceLock::new();
    // CSI sequences, then OSC sequences terminated by BEL or ST
    ESCAPES.get_or_init(|| {
        Regex::new(r"\x1b\[[0-9;?]*[ -/]*[@-~]|\x1b\][^\x07\x1b]*(?:\x07|\x1b\\)")
            .expect("escape pattern is valid")
    })
}

/// Remove terminal escape sequences and control characters other than `\t`, `\n`, `\r`
pub fn sanitize(text: &str) -> String {
    escape_pattern()
        .replace_all(text, "")
        .chars()
        .filter(|c| !c.is_control() || matches!(c, '\t' | '\n' | '\r'))
        .collect()
}

/// Sanitized single-line preview of at most `max_chars` characters
pub fn preview(text: &str, max_chars: usize) -> String {
    let flat = sanitize(text).split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max_chars {
        return flat;
    }
    let cut: String = flat.chars().take(max_chars.saturating_sub(1)).collect();
    format!("{}…", cut.trim_end())
}

/// First eight characters of an identity
pub fn short_id(id: &str) -> &str {
    match id.char_indices().nth(8) {
        Some((idx, _)) => &id[..idx],
        None => id,
    }
}
