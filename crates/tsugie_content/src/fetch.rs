//! Page fetch with retries and layered charset decoding (§4.3).
//!
//! The decode order is load-bearing for Japanese sites: declared charset
//! from the `Content-Type` header, then an HTML `<meta charset>` /
//! `http-equiv` hint, then the transport-inferred encoding, then a fixed
//! fallback chain of `utf-8` / `cp932` / `shift_jis` / `euc_jp`, finally
//! UTF-8 with lossy replacement.

use std::time::Duration;

use encoding_rs::Encoding;
use tsugie_core::ratelimit::RateLimiter;

/// Result of a successful fetch: the final (post-redirect) URL and decoded
/// body text.
pub struct FetchedPage {
    pub final_url: String,
    pub body: String,
}

/// Fetches `url` with up to `max_retries` attempts, waiting on `limiter`
/// before each attempt. Only HTTP 200 is accepted; anything else or a
/// transport error is retried with an exponential-ish backoff
/// (`min(4.0, 0.5 * attempt)` seconds) until attempts are exhausted.
pub async fn fetch_with_retries(
    client: &reqwest::Client,
    limiter: &mut RateLimiter,
    url: &str,
    max_retries: u32,
) -> Result<FetchedPage, String> {
    let mut last_error = String::new();

    for attempt in 1..=max_retries.max(1) {
        limiter.wait_async().await;

        match client.get(url).send().await {
            Ok(response) => {
                let final_url = response.url().to_string();
                if response.status().as_u16() == 200 {
                    let declared_charset = declared_charset(response.headers());
                    let bytes = match response.bytes().await {
                        Ok(b) => b,
                        Err(e) => {
                            last_error = e.to_string();
                            continue;
                        }
                    };
                    let body = decode_body(&bytes, declared_charset.as_deref());
                    return Ok(FetchedPage { final_url, body });
                }
                last_error = format!("http_{}", response.status().as_u16());
            }
            Err(e) => {
                last_error = e.to_string();
            }
        }

        if attempt < max_retries {
            tokio::time::sleep(Duration::from_secs_f64((0.5 * f64::from(attempt)).min(4.0))).await;
        }
    }

    Err(last_error)
}

fn declared_charset(headers: &reqwest::header::HeaderMap) -> Option<String> {
    let content_type = headers.get(reqwest::header::CONTENT_TYPE)?.to_str().ok()?;
    let lower = content_type.to_ascii_lowercase();
    let idx = lower.find("charset=")?;
    let rest = &lower[idx + "charset=".len()..];
    let charset = rest.split([';', ' ']).next()?.trim_matches('"');
    if charset.is_empty() {
        None
    } else {
        Some(charset.to_string())
    }
}

/// Sniffs an HTML `<meta charset="...">` or
/// `<meta http-equiv="Content-Type" content="...charset=...">` hint from
/// the first few KB of raw bytes (cheap ASCII scan, works regardless of
/// the real encoding since the meta tag itself is ASCII in practice).
fn meta_charset(bytes: &[u8]) -> Option<String> {
    let probe_len = bytes.len().min(4096);
    let probe = String::from_utf8_lossy(&bytes[..probe_len]);
    let lower = probe.to_ascii_lowercase();

    if let Some(idx) = lower.find("charset=") {
        let rest = &lower[idx + "charset=".len()..];
        let charset: String = rest
            .trim_start_matches(['"', '\''])
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
            .collect();
        if !charset.is_empty() {
            return Some(charset);
        }
    }
    None
}

fn resolve_encoding(label: &str) -> Option<&'static Encoding> {
    Encoding::for_label(label.as_bytes())
}

/// Sniffs a charset from a byte-order mark at the start of the body — the
/// cheapest thing a transport layer can infer without a declared or
/// `<meta>` hint.
fn transport_inferred_charset(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(&[0xEF, 0xBB, 0xBF]) {
        Some("utf-8")
    } else if bytes.starts_with(&[0xFE, 0xFF]) {
        Some("utf-16be")
    } else if bytes.starts_with(&[0xFF, 0xFE]) {
        Some("utf-16le")
    } else {
        None
    }
}

/// Decodes `bytes` using the layered fallback chain (§4.3): declared
/// charset, then `<meta>` charset, then a transport-inferred guess, then
/// `utf-8`/`cp932`/`shift_jis`/`euc_jp`, finally UTF-8 with lossy
/// replacement.
fn decode_body(bytes: &[u8], declared: Option<&str>) -> String {
    let candidates: Vec<&str> = [
        declared,
        meta_charset(bytes).as_deref(),
        transport_inferred_charset(bytes),
        Some("utf-8"),
        Some("cp932"),
        Some("shift_jis"),
        Some("euc-jp"),
    ]
    .into_iter()
    .flatten()
    .collect();

    for label in candidates {
        if let Some(encoding) = resolve_encoding(label) {
            let (decoded, _, had_errors) = encoding.decode(bytes);
            if !had_errors {
                return decoded.into_owned();
            }
        }
    }

    String::from_utf8_lossy(bytes).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_plain_utf8() {
        let body = decode_body("こんにちは".as_bytes(), None);
        assert_eq!(body, "こんにちは");
    }

    #[test]
    fn declared_charset_parses_content_type_header() {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::CONTENT_TYPE,
            "text/html; charset=Shift_JIS".parse().unwrap(),
        );
        assert_eq!(declared_charset(&headers).as_deref(), Some("shift_jis"));
    }

    #[test]
    fn meta_charset_finds_html_hint() {
        let html = b"<html><head><meta charset=\"utf-8\"></head></html>";
        assert_eq!(meta_charset(html).as_deref(), Some("utf-8"));
    }
}
