use crate::tree::{MAX_SUMMARY_EXCERPTS, MessageTree, TextCleaner};

/// Instructions sent alongside the excerpts
pub const SUMMARY_INSTRUCTIONS: &str = "Summarize this conversation in 5-10 words. Be specific about what was discussed. Return only the summary, nothing else.";

/// Cleaned user-message excerpts eligible for a summary, in conversation order
pub fn summary_excerpts(tree: &MessageTree, cleaner: &TextCleaner) -> Vec<String> {
    tree.user_excerpts(cleaner, MAX_SUMMARY_EXCERPTS)
}

/// Numbered excerpts separated by blank lines
///
/// ```
/// use session_keeper::summary::build_prompt;
///
/// let prompt = build_prompt(&["Fix login".to_string(), "Add tests".to_string()]);
/// assert_eq!(prompt, "Message 1: Fix login\n\nMessage 2: Add tests");
/// ```
pub fn build_prompt(excerpts: &[String]) -> String {
    excerpts
        .iter()
        .enumerate()
        .map(|(i, text)| format!("Message {}: {}", i + 1, text))
        .collect::<Vec<_>>()
        .join("\n\n")
}
