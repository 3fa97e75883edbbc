//! Text helpers for log fields.

/// Maximum characters of a payload echoed into a log field.
pub const LOG_PREVIEW_CHARS: usize = 100;

/// Shorten `text` to at most `max` bytes on a char boundary, appending `...` when cut.
pub fn truncate(text: &str, max: usize) -> String {
    if text.len() <= max {
        return text.to_string();
    }
    let mut end = max;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}

/// [`truncate`] at the log preview length.
pub fn preview(text: &str) -> String {
    truncate(text, LOG_PREVIEW_CHARS)
}
