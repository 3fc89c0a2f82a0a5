//! Name normalization and the alias map (§4.1 "Name normalization").

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use tsugie_core::text::clean_text;

static YEAR_BRACKET: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\(（]\s*20\d{2}\s*[\)）]").unwrap());
static EVENT_INFO_TAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(開催情報|日程[^\s]*)\s*$").unwrap());
static NTH_PREFIX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^第\s*\d+\s*回\s*").unwrap());
static PAREN_TRAILER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\(（][^\)）]{1,20}[\)）]\s*$").unwrap());
static SITE_DECORATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\|\-]\s*(じゃらん|ウォーカープラス|ことりっぷ)\s*$").unwrap());
static PUNCT_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[・･·\-_−]+").unwrap());

/// Unescapes the handful of HTML entities likely to appear in scraped
/// Japanese event titles (`&amp;`, `&nbsp;`, numeric/hex references).
#[must_use]
pub fn unescape_html_entities(raw: &str) -> String {
    let mut text = raw
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ");

    // Numeric character references: &#12345; and &#x30A2;
    let numeric = Regex::new(r"&#(\d+);").unwrap();
    text = numeric
        .replace_all(&text, |caps: &regex::Captures| {
            caps[1]
                .parse::<u32>()
                .ok()
                .and_then(char::from_u32)
                .map(String::from)
                .unwrap_or_default()
        })
        .into_owned();
    let hex = Regex::new(r"&#x([0-9a-fA-F]+);").unwrap();
    text = hex
        .replace_all(&text, |caps: &regex::Captures| {
            u32::from_str_radix(&caps[1], 16)
                .ok()
                .and_then(char::from_u32)
                .map(String::from)
                .unwrap_or_default()
        })
        .into_owned();
    text
}

/// Produces the "raw normalized name" per §4.1: lower-case, unescape
/// entities, strip fixed suffix/prefix decorations, collapse punctuation
/// runs and whitespace.
#[must_use]
pub fn raw_normalize_name(raw: &str) -> String {
    let text = unescape_html_entities(raw).to_lowercase();
    let text = YEAR_BRACKET.replace_all(&text, "");
    let text = EVENT_INFO_TAIL.replace_all(&text, "");
    let text = NTH_PREFIX.replace_all(&text, "");
    let text = PAREN_TRAILER.replace_all(&text, "");
    let text = SITE_DECORATION.replace_all(&text, "");
    let text = PUNCT_RUN.replace_all(&text, " ");
    clean_text(&text)
}

/// Immutable mapping from raw-normalized alias to canonical normalized
/// name, loaded once per run (§3 `AliasMap`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AliasMap {
    #[serde(flatten)]
    entries: HashMap<String, String>,
}

impl AliasMap {
    /// Loads an alias map from a JSON object file (`{"alias": "canonical"}`).
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O or JSON error.
    pub fn load(path: &std::path::Path) -> std::io::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let entries: HashMap<String, String> = serde_json::from_str(&contents)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        Ok(Self { entries })
    }

    /// Exact lookup on an already raw-normalized name.
    #[must_use]
    pub fn canonicalize(&self, raw_normalized: &str) -> Option<&str> {
        self.entries.get(raw_normalized).map(String::as_str)
    }

    /// Applies the alias map to `raw_normalized`, returning the canonical
    /// name (falling back to the input unchanged) and whether the alias
    /// map fired.
    #[must_use]
    pub fn apply(&self, raw_normalized: &str) -> (String, bool) {
        match self.canonicalize(raw_normalized) {
            Some(canonical) => (canonical.to_string(), true),
            None => (raw_normalized.to_string(), false),
        }
    }

    /// Number of alias entries loaded.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the alias map has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_year_brackets_and_nth_prefix() {
        let normalized = raw_normalize_name("第38回 隅田川花火大会（2024）");
        assert!(!normalized.contains("2024"));
        assert!(!normalized.contains("第"));
    }

    #[test]
    fn collapses_punctuation_runs() {
        assert_eq!(raw_normalize_name("隅田川・花火―大会"), "隅田川 花火 大会");
    }

    #[test]
    fn alias_map_falls_back_when_missing() {
        let map = AliasMap::default();
        let (canonical, applied) = map.apply("隅田川花火大会");
        assert_eq!(canonical, "隅田川花火大会");
        assert!(!applied);
    }
}
