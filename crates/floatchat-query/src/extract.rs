//! SQL extraction from raw model output.
//!
//! Strips Markdown code-fence markers and surrounding whitespace, nothing
//! else. Prose that survives is passed through and left to the store's
//! parser to reject.

use regex::Regex;
use std::sync::OnceLock;

/// An opening or closing fence, with an optional SQL language tag on the
/// same line. Any other word after a fence is statement text and is kept.
fn fence() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| {
        Regex::new(
            r"```(?:(?i:sqlite3|sqlite|sql|postgresql|postgres|psql|mysql|plsql|tsql)?[ \t]*\r?\n)?",
        )
        .expect("fence pattern compiles")
    })
}

/// Recover the statement from model output.
///
/// Idempotent: the result never contains a fence marker and is already
/// trimmed, so a second pass changes nothing.
pub fn extract_sql(raw: &str) -> String {
    let mut text = raw.to_string();
    // Repeat until no marker is left so that a second pass is a no-op.
    while text.contains("```") {
        text = fence().replace_all(&text, "").into_owned();
    }
    text.trim().to_string()
}
