//! Post-processing: deterministic cleanup of the transcription text.
//!
//! Vision models wrap answers in code fences and pad them with stray
//! whitespace often enough that every client ends up scrubbing the output.
//! These passes only touch layout, never wording:
//!
//! 1. drop invisible code points (zero-width spaces, BOM, soft hyphen)
//! 2. unwrap a single outer ```` ```markdown ```` / ```` ``` ```` fence
//! 3. CRLF / CR → LF
//! 4. strip trailing whitespace on each line
//! 5. collapse runs of blank lines to one
//! 6. end with exactly one newline
//!
//! Invisible code points go first: a line holding only a zero-width space is
//! blank, and a leading BOM would hide the fence from its anchors.

use once_cell::sync::Lazy;
use regex::Regex;

static RE_OUTER_FENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)\A```(?:markdown|md)?[ \t]*\r?\n(.*?)\r?\n```[ \t]*\z")
        .expect("static regex")
});

static RE_BLANK_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").expect("static regex"));

const INVISIBLE: &[char] = &[
    '\u{200B}', '\u{200C}', '\u{200D}', '\u{2060}', '\u{FEFF}', '\u{00AD}',
];

/// Apply every cleanup pass to a raw transcription.
pub fn clean_markdown(raw: &str) -> String {
    let visible: String = raw.chars().filter(|c| !INVISIBLE.contains(c)).collect();
    let text = unwrap_fence(visible.trim());
    let text = text.replace("\r\n", "\n").replace('\r', "\n");

    let text: String = text
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n");

    let text = RE_BLANK_RUN.replace_all(&text, "\n\n");

    let body = text.trim_matches('\n');
    if body.is_empty() {
        String::new()
    } else {
        format!("{body}\n")
    }
}

fn unwrap_fence(text: &str) -> &str {
    match RE_OUTER_FENCE.captures(text).and_then(|c| c.get(1)) {
        // A fence inside the body means the outer pair is not a wrapper.
        Some(inner) if !inner.as_str().contains("\n```") => inner.as_str(),
        _ => text,
    }
}
