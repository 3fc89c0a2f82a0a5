//! Small text-cleanup helpers shared by every stage.

use std::sync::LazyLock;

use regex::Regex;

static WHITESPACE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static CRLF: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\r\n?").unwrap());
static TRAILING_WHITESPACE_BEFORE_NEWLINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t]+\n").unwrap());
static BLANK_LINE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

/// Collapses internal whitespace runs to a single space and trims ends.
#[must_use]
pub fn clean_text(raw: &str) -> String {
    WHITESPACE_RUN.replace_all(raw.trim(), " ").into_owned()
}

/// Normalizes a multi-line text block: CRLF to LF, trims trailing
/// whitespace before newlines, collapses 3+ blank lines to one, trims ends.
#[must_use]
pub fn clean_text_block(raw: &str) -> String {
    let text = CRLF.replace_all(raw, "\n");
    let text = TRAILING_WHITESPACE_BEFORE_NEWLINE.replace_all(&text, "\n");
    let text = BLANK_LINE_RUN.replace_all(&text, "\n\n");
    text.trim().to_string()
}

/// Returns `None` for empty-after-clean strings, `Some` otherwise.
#[must_use]
pub fn nonempty(raw: &str) -> Option<String> {
    let cleaned = clean_text(raw);
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

/// Joins non-empty values with `|`, matching the pipe-joined multi-valued
/// CSV column convention used throughout the export schemas.
#[must_use]
pub fn pipe_join<I, S>(values: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    values
        .into_iter()
        .map(|v| v.as_ref().to_string())
        .collect::<Vec<_>>()
        .join("|")
}

/// Splits a pipe-joined column back into its component strings, dropping
/// empty segments produced by an empty source column.
#[must_use]
pub fn pipe_split(raw: &str) -> Vec<String> {
    if raw.is_empty() {
        return Vec::new();
    }
    raw.split('|').map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_text_collapses_whitespace() {
        assert_eq!(clean_text("  a\t\tb\n c "), "a b c");
    }

    #[test]
    fn clean_text_block_collapses_blank_runs() {
        let input = "a\r\n\r\n\r\n\r\nb   \n";
        assert_eq!(clean_text_block(input), "a\n\nb");
    }

    #[test]
    fn pipe_join_roundtrips() {
        let values = vec!["a".to_string(), "b".to_string()];
        let joined = pipe_join(&values);
        assert_eq!(joined, "a|b");
        assert_eq!(pipe_split(&joined), values);
        assert!(pipe_split("").is_empty());
    }
}
