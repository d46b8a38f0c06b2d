//! Pattern extraction from Adblock Plus style block lists.
//!
//! Only hostname-anchored network filters are used: lines of the form
//! `||domain/path^options`. The anchor is stripped and the line is cut at the
//! first separator, leaving `domain/path`.

/// Hostname anchor prefix.
pub const ANCHOR_PREFIX: &str = "||";
/// Separator marker terminating the pattern.
pub const SEPARATOR: char = '^';

/// Extract raw `domain/path` patterns, in list order.
pub fn extract_patterns(text: &str) -> Vec<String> {
    text.lines()
        .filter_map(extract_pattern)
        .map(str::to_string)
        .collect()
}

/// Pattern of a single list line, if the line has the anchored shape.
pub fn extract_pattern(line: &str) -> Option<&str> {
    let rest = line.strip_prefix(ANCHOR_PREFIX)?;
    let end = rest.find(SEPARATOR)?;
    let pattern = &rest[..end];
    if pattern.is_empty() {
        return None;
    }
    Some(pattern)
}
