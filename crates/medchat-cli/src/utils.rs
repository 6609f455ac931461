//! Shared utilities

/// Truncate a string to `max` characters, appending "..." if truncated.
/// Operates on Unicode char boundaries, not bytes.
pub fn truncate_chars(s: &str, max: usize) -> String {
    let mut chars = s.chars();
    let truncated: String = chars.by_ref().take(max).collect();
    if chars.next().is_some() {
        format!("{}...", truncated)
    } else {
        truncated
    }
}

/// The part of `text` after its first `printed` characters
pub fn suffix_after_chars(text: &str, printed: usize) -> &str {
    match text.char_indices().nth(printed) {
        Some((offset, _)) => &text[offset..],
        None => "",
    }
}
