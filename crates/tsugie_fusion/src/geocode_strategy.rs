//! Geocode query-list construction (§4.1 "Geocoding", step 2, and the
//! overlap-repair query list of §4.1 "Overlap-repair", step 2).

use std::sync::LazyLock;

use regex::Regex;

static BRACKETED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"【[^】]*】|\[[^\]]*\]").unwrap());
static PAREN_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\(（][^\)）]*[\)）]\s*$").unwrap());
static DASH_TAIL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s-\s.*$").unwrap());

/// One candidate geocoding query paired with the named strategy that
/// produced it, so the winning `geo_source` suffix can be derived.
#[derive(Debug, Clone)]
pub struct GeocodeQuery {
    /// The query string submitted to the geocoder.
    pub query: String,
    /// Name of the strategy, e.g. `"venue_address"` or `"pref_event_name"`.
    pub strategy: &'static str,
}

/// Strips `【…】`/`[…]`, a trailing full/half-width parenthesized suffix,
/// and anything after " - ", producing the "normalized event name" used
/// as a geocoding query fallback.
#[must_use]
pub fn normalize_event_name_for_query(event_name: &str) -> String {
    let text = BRACKETED.replace_all(event_name, "");
    let text = PAREN_SUFFIX.replace_all(&text, "");
    let text = DASH_TAIL.replace_all(&text, "");
    tsugie_core::text::clean_text(&text)
}

fn push_unique(queries: &mut Vec<GeocodeQuery>, seen: &mut std::collections::HashSet<String>, query: String, strategy: &'static str) {
    if query.chars().count() < 4 {
        return;
    }
    if seen.insert(query.clone()) {
        queries.push(GeocodeQuery { query, strategy });
    }
}

/// Fields fusion can build a geocoding query from.
pub struct QueryFields<'a> {
    pub venue_address: &'a str,
    pub prefecture: &'a str,
    pub city: &'a str,
    pub venue_name: &'a str,
    pub event_name: &'a str,
}

/// Builds the layered, deduplicated, length-filtered query list for the
/// primary geocoding pass (§4.1 step 2).
#[must_use]
pub fn build_query_list(fields: &QueryFields<'_>) -> Vec<GeocodeQuery> {
    let normalized_name = normalize_event_name_for_query(fields.event_name);
    let mut queries = Vec::new();
    let mut seen = std::collections::HashSet::new();

    let candidates: Vec<(String, &'static str)> = vec![
        (fields.venue_address.to_string(), "venue_address"),
        (
            format!("{}{}{}", fields.prefecture, fields.city, fields.venue_name),
            "pref_city_venue",
        ),
        (
            format!("{}{}", fields.prefecture, fields.venue_name),
            "pref_venue",
        ),
        (
            format!("{}{}", fields.city, fields.venue_name),
            "city_venue",
        ),
        (fields.venue_name.to_string(), "venue"),
        (
            format!("{}{}", fields.prefecture, fields.event_name),
            "pref_event_name",
        ),
        (
            format!("{}{}", fields.prefecture, normalized_name),
            "pref_event_name",
        ),
        (normalized_name.clone(), "event_name"),
        (fields.event_name.to_string(), "event_name"),
    ];

    for (query, strategy) in candidates {
        push_unique(&mut queries, &mut seen, query, strategy);
    }
    queries
}

/// Builds the repair query list used by overlap-repair (§4.1 step 2):
/// venue-address, pref+city+event, pref+event+venue, pref+event,
/// event+venue, venue-address+event, venue-address, pref+venue,
/// normalized-event, raw-event.
#[must_use]
pub fn build_repair_query_list(fields: &QueryFields<'_>) -> Vec<GeocodeQuery> {
    let normalized_name = normalize_event_name_for_query(fields.event_name);
    let mut queries = Vec::new();
    let mut seen = std::collections::HashSet::new();

    let candidates: Vec<(String, &'static str)> = vec![
        (fields.venue_address.to_string(), "venue_address"),
        (
            format!("{}{}{}", fields.prefecture, fields.city, fields.event_name),
            "pref_city_event",
        ),
        (
            format!("{}{}{}", fields.prefecture, fields.event_name, fields.venue_name),
            "pref_event_venue",
        ),
        (
            format!("{}{}", fields.prefecture, fields.event_name),
            "pref_event_name",
        ),
        (
            format!("{}{}", fields.event_name, fields.venue_name),
            "event_venue",
        ),
        (
            format!("{}{}", fields.venue_address, fields.event_name),
            "venue_address_event",
        ),
        (fields.venue_address.to_string(), "venue_address"),
        (
            format!("{}{}", fields.prefecture, fields.venue_name),
            "pref_venue",
        ),
        (normalized_name, "event_name"),
        (fields.event_name.to_string(), "event_name"),
    ];

    for (query, strategy) in candidates {
        push_unique(&mut queries, &mut seen, query, strategy);
    }
    queries
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_bracketed_and_dash_tail() {
        let normalized =
            normalize_event_name_for_query("【中止】隅田川花火大会(雨天順延) - 詳細はこちら");
        assert_eq!(normalized, "隅田川花火大会");
    }

    #[test]
    fn drops_short_queries() {
        let fields = QueryFields {
            venue_address: "",
            prefecture: "",
            city: "",
            venue_name: "ab",
            event_name: "",
        };
        let queries = build_query_list(&fields);
        assert!(queries.iter().all(|q| q.query.chars().count() >= 4));
    }

    #[test]
    fn deduplicates_identical_queries() {
        let fields = QueryFields {
            venue_address: "隅田川河川敷",
            prefecture: "東京都",
            city: "",
            venue_name: "隅田川河川敷",
            event_name: "隅田川花火大会",
        };
        let queries = build_query_list(&fields);
        let unique: std::collections::HashSet<_> = queries.iter().map(|q| &q.query).collect();
        assert_eq!(unique.len(), queries.len());
    }
}
