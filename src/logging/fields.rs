//! Field helpers for structured logging

/// Truncate text for a log preview, appending `...` when cut.
///
/// # Examples
///
/// ```
/// use lens::logging::preview;
///
/// assert_eq!(preview("def main():", 3), "def...");
/// assert_eq!(preview("ok", 10), "ok");
/// ```
pub fn preview(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}

/// Tracing field value for a file path that may be absent.
pub fn path_field(path: Option<&str>) -> &str {
    path.unwrap_or("<direct>")
}
