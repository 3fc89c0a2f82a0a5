//! Prefecture derivation and dedup-key construction (§4.1 "Dedup key").

use tsugie_core::prefecture::extract_prefecture;

/// Derives a prefecture name from the usual three candidate fields, in
/// priority order: venue address, then venue name, then event name.
#[must_use]
pub fn derive_prefecture(venue_address: &str, venue_name: &str, event_name: &str) -> Option<String> {
    extract_prefecture(venue_address)
        .or_else(|| extract_prefecture(venue_name))
        .or_else(|| extract_prefecture(event_name))
}

/// Extracts a `YYYY-MM-DD` literal from `event_date_start`, if present.
#[must_use]
pub fn extract_iso_date(event_date_start: &str) -> Option<String> {
    let re = regex::Regex::new(r"\d{4}-\d{2}-\d{2}").unwrap();
    re.find(event_date_start).map(|m| m.as_str().to_string())
}

/// Inputs to dedup-key construction, already normalized/derived.
pub struct DedupInputs<'a> {
    /// Canonical normalized event name, if any name field was present.
    pub canonical_name: Option<&'a str>,
    /// Extracted event year.
    pub year: Option<i32>,
    /// `YYYY-MM-DD` literal extracted from the start date, if parseable.
    pub iso_date: Option<&'a str>,
    /// Derived prefecture, if any.
    pub prefecture: Option<&'a str>,
    /// Source URL, used as a last-resort identity when no name is known.
    pub source_url: &'a str,
}

/// Builds the dedup key per §4.1's four-tier degradation:
/// `name|year|date|pref` → `name|year|pref` → `name|unknown|pref` →
/// `url|year|source_url`.
#[must_use]
pub fn build_dedup_key(inputs: &DedupInputs<'_>) -> String {
    let year_str = inputs
        .year
        .map_or_else(|| "unknown".to_string(), |y| y.to_string());

    match inputs.canonical_name {
        Some(name) => {
            let pref = inputs.prefecture.unwrap_or("");
            match inputs.iso_date {
                Some(date) if !date.is_empty() => format!("{name}|{year_str}|{date}|{pref}"),
                _ => format!("{name}|{year_str}|{pref}"),
            }
        }
        None => format!("url|{year_str}|{}", inputs.source_url),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_key_when_all_present() {
        let key = build_dedup_key(&DedupInputs {
            canonical_name: Some("隅田川花火大会"),
            year: Some(2024),
            iso_date: Some("2024-07-27"),
            prefecture: Some("東京都"),
            source_url: "https://example.com",
        });
        assert_eq!(key, "隅田川花火大会|2024|2024-07-27|東京都");
    }

    #[test]
    fn degrades_when_date_missing() {
        let key = build_dedup_key(&DedupInputs {
            canonical_name: Some("隅田川花火大会"),
            year: Some(2024),
            iso_date: None,
            prefecture: Some("東京都"),
            source_url: "https://example.com",
        });
        assert_eq!(key, "隅田川花火大会|2024|東京都");
    }

    #[test]
    fn url_key_when_no_name() {
        let key = build_dedup_key(&DedupInputs {
            canonical_name: None,
            year: Some(2024),
            iso_date: None,
            prefecture: None,
            source_url: "https://example.com/event",
        });
        assert_eq!(key, "url|2024|https://example.com/event");
    }
}
