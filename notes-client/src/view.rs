//! Plain-text rendering of notes for the terminal.
//!
//! Note bodies are rich-text markup from an editor. The terminal shows a
//! flattened excerpt: tags removed, common entities decoded, whitespace collapsed.

use chrono::Local;
use notes_types::Note;
use regex::Regex;
use std::sync::LazyLock;

/// Characters of body text shown per note in a listing
pub const EXCERPT_CHARS: usize = 120;

// Block-level boundaries become spaces so words from adjacent paragraphs don't merge
static BLOCK_BREAK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<\s*(br\s*/?|/\s*(p|div|li|h[1-6]|blockquote|pre))\s*>").unwrap()
});
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());
static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Markup to a single line of text.
pub fn plain_text(markup: &str) -> String {
    let spaced = BLOCK_BREAK_RE.replace_all(markup, " ");
    let stripped = TAG_RE.replace_all(&spaced, "");
    let decoded = decode_entities(&stripped);
    WHITESPACE_RE.replace_all(&decoded, " ").trim().to_string()
}

/// `plain_text` cut to `max_chars`, with an ellipsis when shortened.
pub fn excerpt(markup: &str, max_chars: usize) -> String {
    let text = plain_text(markup);
    if text.chars().count() <= max_chars {
        return text;
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{}…", cut.trim_end())
}

fn decode_entities(text: &str) -> String {
    // &amp; last so "&amp;lt;" stays "&lt;"
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

/// One listing line: id, title, excerpt.
pub fn note_line(note: &Note) -> String {
    let body = excerpt(&note.content, EXCERPT_CHARS);
    if body.is_empty() {
        format!("{}  {}", note.id, note.title)
    } else {
        format!("{}  {}  {}", note.id, note.title, body)
    }
}

/// Full note for `show`.
pub fn note_detail(note: &Note) -> String {
    format!(
        "{}\n{}\nlast modified {}\n\n{}",
        note.title,
        "=".repeat(note.title.chars().count().max(1)),
        note.last_modified
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M"),
        plain_text(&note.content)
    )
}
