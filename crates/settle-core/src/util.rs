//! Text helpers for profile values and error messages.

/// Longest excerpt of a user-supplied value echoed back in an error.
pub const MAX_EXCERPT_CHARS: usize = 64;

/// Trimmed profile value, or `None` when it is missing or blank.
pub fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Stored values can be arbitrarily long; errors quote at most
/// [`MAX_EXCERPT_CHARS`] of them, marking the cut with `...`.
pub fn excerpt(value: &str) -> String {
    let value = value.trim();
    let mut chars = value.chars();
    let head: String = chars.by_ref().take(MAX_EXCERPT_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}
