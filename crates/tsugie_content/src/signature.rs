//! `source_urls_sig` (§6, §8 property 6): `sha256(join("\n", sorted(urls))
//! + "\n")`, used to detect when a canonical event's source set changed.

use sha2::{Digest, Sha256};

/// Computes the content-input signature over a set of source URLs.
#[must_use]
pub fn source_urls_sig(urls: &[String]) -> String {
    let mut sorted: Vec<&str> = urls.iter().map(String::as_str).collect();
    sorted.sort_unstable();

    let mut hasher = Sha256::new();
    for url in sorted {
        hasher.update(url.as_bytes());
        hasher.update(b"\n");
    }
    hex::encode(hasher.finalize())
}

/// Merges `source_urls` and `description_source_url` into the deduplicated,
/// order-preserving URL set used for signature/resolver keys (§9
/// `source_url_set`).
#[must_use]
pub fn source_url_set(source_urls: &[String], description_source_url: &str) -> Vec<String> {
    let mut out = Vec::with_capacity(source_urls.len() + 1);
    let mut seen = std::collections::HashSet::new();
    for url in source_urls {
        if seen.insert(url.clone()) {
            out.push(url.clone());
        }
    }
    if !description_source_url.is_empty() && seen.insert(description_source_url.to_string()) {
        out.push(description_source_url.to_string());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_is_order_independent() {
        let a = source_urls_sig(&["https://b.example".to_string(), "https://a.example".to_string()]);
        let b = source_urls_sig(&["https://a.example".to_string(), "https://b.example".to_string()]);
        assert_eq!(a, b);
    }

    #[test]
    fn empty_set_hashes_consistently() {
        assert_eq!(
            source_urls_sig(&[]),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b85"
        );
    }
}
