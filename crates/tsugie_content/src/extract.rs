//! Description extraction (§4.3 "Extraction").
//!
//! Three strategies, tried in order, each scoped to the final page the
//! fetch landed on:
//! 1. **Schedule-anchor**: when the source URL carries a fragment and the
//!    page has a node with that id/name, walk up from it to the first
//!    ancestor whose trimmed text is at least 6 characters.
//! 2. **Visible-line scan**: every visible line on the page, matched
//!    against the event name after normalization, excluding a fixed list
//!    of generic boilerplate lines, shortest match wins.
//! 3. **Selector cascade**: paragraph selectors plus meta/JSON-LD
//!    description tags, longest candidate wins.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};
use tsugie_core::text::{clean_text, clean_text_block};

const DESCRIPTION_SELECTORS: &[&str] = &[
    "article p",
    "main p",
    ".entry-content p",
    ".post-content p",
    ".article-body p",
    ".event-detail p",
    ".event-content p",
    ".content p",
];

const GENERIC_LINE_MARKERS: &[&str] = &[
    "今日は何の祭り",
    "一覧形式で紹介",
    "ご注意",
    "メルマガ",
    "トップページ",
];

static FRAGMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"#(.+)$").unwrap());

/// Extracts a URL fragment (`#anchor`), if present.
fn url_fragment(url: &str) -> Option<String> {
    FRAGMENT.captures(url).map(|c| c[1].to_string())
}

/// Strategy 1: schedule-anchor extraction scoped to an id/name match.
fn anchor_scoped_description(document: &Html, fragment: &str) -> Option<String> {
    let id_selector = Selector::parse(&format!("#{}", css_escape(fragment))).ok()?;
    let name_selector = Selector::parse(&format!("[name='{fragment}']")).ok()?;

    let anchor = document
        .select(&id_selector)
        .next()
        .or_else(|| document.select(&name_selector).next())?;

    for ancestor in anchor.ancestors() {
        let Some(element) = scraper::ElementRef::wrap(ancestor) else {
            continue;
        };
        let text = clean_text_block(&element.text().collect::<Vec<_>>().join(" "));
        if text.chars().count() >= 6 {
            return Some(text);
        }
    }
    None
}

fn css_escape(fragment: &str) -> String {
    fragment
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c.to_string() } else { format!("\\{c}") })
        .collect()
}

/// Strategy 2: visible-line scan for a line matching the (normalized)
/// event name, excluding generic boilerplate lines, shortest wins.
fn visible_line_match(document: &Html, normalized_event_name: &str) -> Option<String> {
    if normalized_event_name.is_empty() {
        return None;
    }

    let body_selector = Selector::parse("body").ok()?;
    let body = document.select(&body_selector).next()?;

    let mut best: Option<String> = None;
    for text_node in body.text() {
        let line = clean_text(text_node);
        if line.is_empty() || line.chars().count() < 6 {
            continue;
        }
        if GENERIC_LINE_MARKERS.iter().any(|m| line.contains(m)) {
            continue;
        }
        let normalized_line = clean_text(&line.to_lowercase());
        if !normalized_line.contains(normalized_event_name) {
            continue;
        }
        match &best {
            Some(current) if current.chars().count() <= line.chars().count() => {}
            _ => best = Some(line),
        }
    }
    best
}

/// Strategy 3: selector cascade plus meta/JSON-LD fallback (§4.3).
fn selector_cascade_description(document: &Html, max_chars: usize) -> String {
    let mut chunks: Vec<String> = Vec::new();
    let mut seen = std::collections::HashSet::new();
    let mut total_len = 0usize;

    'outer: for raw_selector in DESCRIPTION_SELECTORS {
        let Ok(selector) = Selector::parse(raw_selector) else {
            continue;
        };
        for node in document.select(&selector) {
            let text = clean_text_block(&node.text().collect::<Vec<_>>().join(" "));
            if text.chars().count() < 18 || !seen.insert(text.clone()) {
                continue;
            }
            total_len += text.chars().count();
            chunks.push(text);
            if total_len >= max_chars {
                break 'outer;
            }
        }
    }

    if chunks.is_empty() {
        return String::new();
    }
    let joined = chunks.join("\n");
    truncate_chars(&joined, max_chars)
}

fn meta_content(document: &Html, attr: &str, key: &str) -> Vec<String> {
    let Ok(selector) = Selector::parse(&format!("meta[{attr}='{key}']")) else {
        return Vec::new();
    };
    document
        .select(&selector)
        .filter_map(|el| el.value().attr("content"))
        .map(clean_text)
        .filter(|s| !s.is_empty())
        .collect()
}

fn jsonld_descriptions(document: &Html) -> Vec<String> {
    let Ok(selector) = Selector::parse(r#"script[type="application/ld+json"]"#) else {
        return Vec::new();
    };
    let mut out = Vec::new();
    for node in document.select(&selector) {
        let raw: String = node.text().collect();
        let Ok(value) = serde_json::from_str::<serde_json::Value>(raw.trim()) else {
            continue;
        };
        collect_jsonld_descriptions(&value, &mut out);
    }
    out
}

fn collect_jsonld_descriptions(value: &serde_json::Value, out: &mut Vec<String>) {
    match value {
        serde_json::Value::Object(map) => {
            if let Some(serde_json::Value::String(desc)) = map.get("description") {
                let cleaned = clean_text_block(desc);
                if !cleaned.is_empty() {
                    out.push(cleaned);
                }
            }
            for v in map.values() {
                collect_jsonld_descriptions(v, out);
            }
        }
        serde_json::Value::Array(items) => {
            for item in items {
                collect_jsonld_descriptions(item, out);
            }
        }
        _ => {}
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    text.chars().take(max_chars).collect::<String>().trim_end().to_string()
}

/// Result of extracting a description from a single fetched page.
pub struct DescriptionExtract {
    pub raw_description: String,
    pub strategy: &'static str,
}

/// Runs the full extraction cascade for one page.
#[must_use]
pub fn extract_description(
    html: &str,
    source_url: &str,
    normalized_event_name: &str,
    max_chars: usize,
) -> DescriptionExtract {
    let document = Html::parse_document(html);

    if let Some(fragment) = url_fragment(source_url)
        && let Some(text) = anchor_scoped_description(&document, &fragment)
    {
        return DescriptionExtract {
            raw_description: truncate_chars(&text, max_chars),
            strategy: "schedule_anchor",
        };
    }

    if let Some(text) = visible_line_match(&document, normalized_event_name) {
        return DescriptionExtract {
            raw_description: truncate_chars(&text, max_chars),
            strategy: "visible_line_scan",
        };
    }

    let mut candidates: Vec<String> = Vec::new();
    candidates.extend(meta_content(&document, "property", "og:description"));
    candidates.extend(meta_content(&document, "name", "description"));
    candidates.extend(meta_content(&document, "name", "twitter:description"));
    candidates.extend(jsonld_descriptions(&document));

    let selector_text = selector_cascade_description(&document, max_chars);
    if !selector_text.is_empty() {
        candidates.push(selector_text);
    }

    let mut cleaned: Vec<String> = Vec::new();
    let mut seen = std::collections::HashSet::new();
    for c in candidates {
        let text = clean_text_block(&c);
        if !text.is_empty() && seen.insert(text.clone()) {
            cleaned.push(text);
        }
    }
    cleaned.sort_by_key(|b| std::cmp::Reverse(b.chars().count()));

    let best = cleaned.into_iter().next().unwrap_or_default();
    DescriptionExtract {
        raw_description: truncate_chars(&best, max_chars),
        strategy: "selector_cascade",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selector_cascade_picks_longest_candidate() {
        let html = r"<html><body><article><p>短い</p><article><p>この段落は十分に長い文章であることを確認するためのテストです。</p></article></body></html>";
        let result = extract_description(html, "https://example.com/page", "", 1800);
        assert_eq!(result.strategy, "selector_cascade");
        assert!(!result.raw_description.is_empty());
    }

    #[test]
    fn meta_description_used_when_no_paragraphs() {
        let html = r#"<html><head><meta property="og:description" content="花火大会のお知らせです"></head><body></body></html>"#;
        let result = extract_description(html, "https://example.com/page", "", 1800);
        assert_eq!(result.raw_description, "花火大会のお知らせです");
    }

    #[test]
    fn generic_marker_lines_are_excluded_from_visible_scan() {
        let html = r"<html><body><p>今日は何の祭り会場のご案内</p><p>隅田川花火大会の詳細情報です</p></body></html>";
        let result = extract_description(html, "https://example.com/page", "隅田川花火大会", 1800);
        assert_eq!(result.strategy, "visible_line_scan");
        assert!(!result.raw_description.contains("今日は何の祭り"));
    }
}
