// src/util.rs — Small text helpers shared by logging call sites

/// Cut `s` to at most `max_len` bytes without splitting a UTF-8 character.
pub fn truncate_str(s: &str, max_len: usize) -> &str {
    if s.len() <= max_len {
        return s;
    }
    let mut end = max_len;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// One-line preview of compiler output or record text for log messages:
/// whitespace runs collapse to a single space and long text is cut with `...`.
pub fn excerpt(s: &str, max_len: usize) -> String {
    let flat = s.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.len() <= max_len {
        flat
    } else {
        format!("{}...", truncate_str(&flat, max_len))
    }
}
