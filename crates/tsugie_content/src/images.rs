//! Image URL extraction and download (§4.3 "Images"/"Image download").

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};
use sha1::{Digest, Sha1};
use tsugie_core::ratelimit::RateLimiter;
use tsugie_core::text::clean_text;

const IMAGE_SELECTORS: &[&str] = &[
    "article img[src]",
    "article img[data-src]",
    "main img[src]",
    "main img[data-src]",
    ".entry-content img[src]",
    ".post-content img[src]",
    ".event-detail img[src]",
    "img[src]",
    "img[data-src]",
];

const SKIP_PATTERNS: &[&str] = &[
    "sprite",
    "icon",
    "logo",
    "blank",
    "spacer",
    "tracking",
    "avatar",
    "banner1_069a0e3420",
    "/img/header.jpg",
    "ogp0.png",
];

/// Resolves a possibly-relative URL against `base_url`, rejecting data URIs
/// and non-http(s) schemes.
#[must_use]
pub fn normalize_url(raw: &str, base_url: &str) -> Option<String> {
    let text = clean_text(raw);
    if text.is_empty() || text.starts_with("data:") {
        return None;
    }
    let base = reqwest::Url::parse(base_url).ok()?;
    let absolute = base.join(&text).ok()?;
    if absolute.scheme() != "http" && absolute.scheme() != "https" {
        return None;
    }
    Some(absolute.to_string())
}

fn looks_like_image_url(candidate: &str) -> bool {
    let low = candidate.to_lowercase();
    !SKIP_PATTERNS.iter().any(|p| low.contains(p)) && !low.starts_with("data:")
}

fn meta_image_urls(document: &Html, base_url: &str) -> Vec<String> {
    let mut out = Vec::new();
    for (attr, key) in [
        ("property", "og:image"),
        ("name", "twitter:image"),
        ("itemprop", "image"),
    ] {
        let Ok(selector) = Selector::parse(&format!("meta[{attr}='{key}']")) else {
            continue;
        };
        for node in document.select(&selector) {
            if let Some(content) = node.value().attr("content")
                && let Some(url) = normalize_url(content, base_url)
            {
                out.push(url);
            }
        }
    }
    out
}

fn jsonld_image_urls(document: &Html, base_url: &str) -> Vec<String> {
    let Ok(selector) = Selector::parse(r#"script[type="application/ld+json"]"#) else {
        return Vec::new();
    };
    let mut out = Vec::new();
    for node in document.select(&selector) {
        let raw: String = node.text().collect();
        let Ok(value) = serde_json::from_str::<serde_json::Value>(raw.trim()) else {
            continue;
        };
        walk_jsonld_images(&value, base_url, &mut out);
    }
    out
}

fn walk_jsonld_images(value: &serde_json::Value, base_url: &str, out: &mut Vec<String>) {
    match value {
        serde_json::Value::Object(map) => {
            if let Some(image) = map.get("image") {
                collect_image_field(image, base_url, out);
            }
            for v in map.values() {
                walk_jsonld_images(v, base_url, out);
            }
        }
        serde_json::Value::Array(items) => {
            for item in items {
                walk_jsonld_images(item, base_url, out);
            }
        }
        _ => {}
    }
}

fn collect_image_field(value: &serde_json::Value, base_url: &str, out: &mut Vec<String>) {
    match value {
        serde_json::Value::String(s) => {
            if let Some(url) = normalize_url(s, base_url) {
                out.push(url);
            }
        }
        serde_json::Value::Object(map) => {
            if let Some(serde_json::Value::String(s)) = map.get("url")
                && let Some(url) = normalize_url(s, base_url)
            {
                out.push(url);
            }
        }
        serde_json::Value::Array(items) => {
            for item in items {
                collect_image_field(item, base_url, out);
            }
        }
        _ => {}
    }
}

static FRAGMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"#(.+)$").unwrap());

/// Extracts a URL fragment (`#anchor`), if present. Mirrors
/// `extract::url_fragment`; kept local since each extraction strategy
/// module owns its own small helpers.
fn url_fragment(url: &str) -> Option<String> {
    FRAGMENT.captures(url).map(|c| c[1].to_string())
}

fn css_escape(fragment: &str) -> String {
    fragment
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c.to_string() } else { format!("\\{c}") })
        .collect()
}

static MONTH_ANCHOR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)^(month|schedule|sched)?[-_]?(0?[1-9]|1[0-2])(gatsu|月)?$").unwrap());

/// `true` when `fragment` names a month-numbered schedule section (e.g.
/// `#8`, `#month08`, `#schedule-08`, `#8gatsu`) rather than a specific
/// event anchor. §4.3: "for month-schedule anchor URLs, generic
/// page-level images are always excluded" — such a page's meta/OG/JSON-LD
/// images describe the whole monthly listing, not this event.
fn is_month_schedule_anchor(fragment: &str) -> bool {
    MONTH_ANCHOR.is_match(fragment)
}

/// Strategy: anchor-scoped `<img>` collection, mirroring
/// `extract::anchor_scoped_description`'s ancestor walk — finds the node
/// matching `fragment`'s id/name, then the first ancestor container that
/// holds at least one image.
fn anchor_scoped_image_urls(document: &Html, fragment: &str, base_url: &str) -> Vec<String> {
    let Ok(id_selector) = Selector::parse(&format!("#{}", css_escape(fragment))) else {
        return Vec::new();
    };
    let Ok(name_selector) = Selector::parse(&format!("[name='{fragment}']")) else {
        return Vec::new();
    };
    let Ok(img_selector) = Selector::parse("img[src], img[data-src]") else {
        return Vec::new();
    };

    let Some(anchor) = document.select(&id_selector).next().or_else(|| document.select(&name_selector).next()) else {
        return Vec::new();
    };

    // The anchor node itself first (it may already be the container that
    // wraps the event's images), then its ancestors, same direction as
    // `extract::anchor_scoped_description`'s walk.
    let containers = std::iter::once(anchor).chain(anchor.ancestors().filter_map(scraper::ElementRef::wrap));
    for element in containers {
        let mut urls = Vec::new();
        for img in element.select(&img_selector) {
            let src = img.value().attr("src").or_else(|| img.value().attr("data-src"));
            if let Some(src) = src
                && let Some(url) = normalize_url(src, base_url)
            {
                urls.push(url);
            }
        }
        if !urls.is_empty() {
            return urls;
        }
    }
    Vec::new()
}

fn selector_image_urls(document: &Html, base_url: &str) -> Vec<String> {
    let mut out = Vec::new();
    for raw_selector in IMAGE_SELECTORS {
        let Ok(selector) = Selector::parse(raw_selector) else {
            continue;
        };
        for node in document.select(&selector) {
            let src = node
                .value()
                .attr("src")
                .or_else(|| node.value().attr("data-src"));
            if let Some(src) = src
                && let Some(url) = normalize_url(src, base_url)
            {
                out.push(url);
            }
        }
    }
    out
}

/// Collects image URLs from a parsed page (§4.3 "Images"). `request_url`
/// is the event's source URL as selected (before redirects), used only to
/// recover its fragment for anchor scoping — `base_url` (the final,
/// post-redirect location) is what relative `src`/`data-src` values
/// resolve against.
///
/// Anchor-scoped `<img>`s are preferred when the fragment resolves to a
/// node on the page; only when that scope holds no images do meta/OG,
/// JSON-LD, and the selector cascade get consulted — except for
/// month-schedule anchors, where page-level images are never used,
/// matching or not, since they describe the whole monthly listing rather
/// than this one event. Deduplicates preserving order and caps to
/// `max_images`.
#[must_use]
pub fn collect_image_urls(html: &str, base_url: &str, request_url: &str, max_images: usize) -> Vec<String> {
    let document = Html::parse_document(html);

    let fragment = url_fragment(request_url);
    let anchor_images = fragment.as_deref().map_or_else(Vec::new, |f| anchor_scoped_image_urls(&document, f, base_url));
    let month_schedule = fragment.as_deref().is_some_and(is_month_schedule_anchor);

    let mut candidates = anchor_images;
    if candidates.is_empty() && !month_schedule {
        candidates.extend(meta_image_urls(&document, base_url));
        candidates.extend(jsonld_image_urls(&document, base_url));
        candidates.extend(selector_image_urls(&document, base_url));
    }

    let mut out = Vec::new();
    let mut seen = std::collections::HashSet::new();
    for url in candidates {
        if seen.insert(url.clone()) && looks_like_image_url(&url) {
            out.push(url);
            if out.len() >= max_images {
                break;
            }
        }
    }
    out
}

/// Sanitizes an arbitrary string fragment down to a filesystem-safe stem,
/// capped at 80 characters.
#[must_use]
pub fn sanitize_filename_fragment(text: &str) -> String {
    let sanitized: String = text
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-' { c } else { '_' })
        .collect();

    let collapsed = Regex::new("_+").unwrap().replace_all(&sanitized, "_");
    let trimmed = collapsed.trim_matches('_');
    if trimmed.is_empty() {
        "image".to_string()
    } else {
        trimmed.chars().take(80).collect()
    }
}

/// Infers a file extension from content-type first, then the URL path.
/// `jpeg` normalizes to `jpg`; an unrecognized type yields `img`.
#[must_use]
pub fn infer_extension(url: &str, content_type: &str) -> &'static str {
    let ct = content_type.to_lowercase();
    if ct.contains("image/jpeg") {
        return "jpg";
    }
    if ct.contains("image/png") {
        return "png";
    }
    if ct.contains("image/webp") {
        return "webp";
    }
    if ct.contains("image/gif") {
        return "gif";
    }
    if ct.contains("image/avif") {
        return "avif";
    }

    let path = reqwest::Url::parse(url).map(|u| u.path().to_lowercase()).unwrap_or_default();
    let ext_re = Regex::new(r"\.([a-z0-9]{2,5})$").unwrap();
    let Some(captures) = ext_re.captures(&path) else {
        return "img";
    };
    match &captures[1] {
        "jpg" | "jpeg" => "jpg",
        "png" => "png",
        "webp" => "webp",
        "gif" => "gif",
        "avif" => "avif",
        _ => "img",
    }
}

/// One downloaded image, saved under `target_dir`.
pub struct DownloadedImage {
    pub path: std::path::PathBuf,
}

/// Downloads up to `max_images` of `image_urls` into `target_dir`, rate
/// limited, rejecting non-`image/*` responses and anything over
/// `max_bytes`. File names follow `"{NN}_{stem}_{10-hex}.{ext}"` where the
/// hex fragment is `sha1(url)[:10]`.
pub async fn download_images(
    client: &reqwest::Client,
    limiter: &mut RateLimiter,
    image_urls: &[String],
    target_dir: &Path,
    max_images: usize,
    max_bytes: u64,
) -> std::io::Result<Vec<DownloadedImage>> {
    tokio::fs::create_dir_all(target_dir).await?;

    let mut downloaded = Vec::new();
    for (idx, url) in image_urls.iter().take(max_images).enumerate() {
        limiter.wait_async().await;

        let Ok(response) = client.get(url).send().await else {
            continue;
        };
        if response.status().as_u16() != 200 {
            continue;
        }
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        if !content_type.to_lowercase().contains("image/") {
            continue;
        }
        let Ok(bytes) = response.bytes().await else {
            continue;
        };
        if bytes.is_empty() || (max_bytes > 0 && bytes.len() as u64 > max_bytes) {
            continue;
        }

        let ext = infer_extension(url, &content_type);
        let path_stem = reqwest::Url::parse(url)
            .ok()
            .and_then(|u| u.path_segments().and_then(|mut s| s.next_back().map(str::to_string)))
            .map(|last_segment| {
                Path::new(&last_segment)
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or(last_segment)
            })
            .unwrap_or_default();
        let stem = sanitize_filename_fragment(&path_stem);
        let mut hasher = Sha1::new();
        hasher.update(url.as_bytes());
        let digest = hex::encode(hasher.finalize());
        let short_digest = &digest[..10];

        let file_name = format!("{:02}_{stem}_{short_digest}.{ext}", idx + 1);
        let out_path = target_dir.join(file_name);
        tokio::fs::write(&out_path, &bytes).await?;
        downloaded.push(DownloadedImage { path: out_path });
    }

    Ok(downloaded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skip_patterns_reject_known_generic_fingerprints() {
        assert!(!looks_like_image_url("https://example.com/img/header.jpg"));
        assert!(!looks_like_image_url("https://example.com/sprite-icons.png"));
        assert!(looks_like_image_url("https://example.com/hanabi-2024.jpg"));
    }

    #[test]
    fn infer_extension_normalizes_jpeg() {
        assert_eq!(infer_extension("https://x/a", "image/jpeg"), "jpg");
        assert_eq!(infer_extension("https://x/a.jpeg", ""), "jpg");
        assert_eq!(infer_extension("https://x/a.unknown", ""), "img");
    }

    #[test]
    fn sanitize_filename_fragment_strips_unsafe_chars() {
        assert_eq!(sanitize_filename_fragment("隅田川/花火??.jpg"), "image");
        assert_eq!(sanitize_filename_fragment("photo 01.jpg"), "photo_01.jpg");
    }

    #[test]
    fn normalize_url_rejects_data_uris() {
        assert_eq!(
            normalize_url("data:image/png;base64,AAAA", "https://example.com"),
            None
        );
    }

    #[test]
    fn is_month_schedule_anchor_matches_month_tokens() {
        assert!(is_month_schedule_anchor("8"));
        assert!(is_month_schedule_anchor("08"));
        assert!(is_month_schedule_anchor("month08"));
        assert!(is_month_schedule_anchor("schedule-08"));
        assert!(is_month_schedule_anchor("8gatsu"));
        assert!(!is_month_schedule_anchor("sumida-river-fireworks"));
    }

    #[test]
    fn collect_image_urls_prefers_anchor_scoped_images() {
        let html = r#"<html><body>
            <img src="/site-banner.jpg">
            <div id="event-42"><img src="/events/42.jpg"></div>
        </body></html>"#;
        let urls = collect_image_urls(html, "https://example.com", "https://example.com/page#event-42", 5);
        assert_eq!(urls, vec!["https://example.com/events/42.jpg".to_string()]);
    }

    #[test]
    fn collect_image_urls_falls_back_to_page_level_without_anchor_match() {
        let html = r#"<html><head><meta property="og:image" content="/og.jpg"></head><body></body></html>"#;
        let urls = collect_image_urls(html, "https://example.com", "https://example.com/page#missing-anchor", 5);
        assert_eq!(urls, vec!["https://example.com/og.jpg".to_string()]);
    }

    #[test]
    fn collect_image_urls_excludes_page_level_for_month_schedule_anchor() {
        let html = r#"<html><head><meta property="og:image" content="/og.jpg"></head><body></body></html>"#;
        let urls = collect_image_urls(html, "https://example.com", "https://example.com/calendar#08", 5);
        assert!(urls.is_empty());
    }
}
