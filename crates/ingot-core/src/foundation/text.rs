//! Small text helpers shared by logging and reply formatting.

/// Truncates `s` to at most `max` characters, appending `...` when cut.
///
/// Counts characters rather than bytes so multi-byte text never splits
/// mid-codepoint.
pub fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_owned(),
    }
}
