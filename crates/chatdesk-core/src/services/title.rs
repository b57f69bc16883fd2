/// Number of characters of the first user message kept in a derived title
pub const TITLE_MAX_CHARS: usize = 30;

/// Appended when the message was longer than [`TITLE_MAX_CHARS`]
pub const TITLE_ELLIPSIS: &str = "...";

/// Truncate text to max length (in characters, not bytes)
fn truncate_text(text: &str, max_len: usize) -> String {
    text.chars().take(max_len).collect()
}

/// Derive a conversation title from the first user message.
///
/// Blank content (an attachment-only message) yields an empty title.
pub fn derive_title(content: &str) -> String {
    if content.chars().count() > TITLE_MAX_CHARS {
        format!("{}{}", truncate_text(content, TITLE_MAX_CHARS), TITLE_ELLIPSIS)
    } else {
        content.to_string()
    }
}
