// src/matching/normalize.rs

/// Canonicalizes free text for comparison: lowercase, punctuation stripped,
/// whitespace collapsed, trimmed. Absent input yields the empty string.
///
/// Idempotent: the output contains only lowercase alphanumerics separated
/// by single spaces, so normalizing it again returns it unchanged.
pub fn normalize(input: Option<&str>) -> String {
    let raw = match input {
        Some(s) => s,
        None => return String::new(),
    };
    let mut out = String::with_capacity(raw.len());
    let mut pending_space = false;
    for c in raw.chars() {
        if c.is_alphanumeric() {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            for lower in c.to_lowercase() {
                out.push(lower);
            }
        } else {
            // Punctuation and whitespace both act as token separators.
            pending_space = true;
        }
    }
    out
}
