//! Year extraction (§4.1 "Year extraction").
//!
//! Tries `event_date_start`, then `event_name`, then `source_url`, in that
//! order; within each field tries `YYYY-MM-DD`, then `YYYY年M月D日`, then a
//! bare `YYYY`. First hit wins.

use std::sync::LazyLock;

use regex::Regex;

static ISO_DATE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d{4})-\d{1,2}-\d{1,2}").unwrap());
static JP_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{4})年\d{1,2}月\d{1,2}日").unwrap());
static BARE_YEAR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(20\d{2}|19\d{2})").unwrap());

fn extract_from_field(text: &str) -> Option<i32> {
    for pattern in [&*ISO_DATE, &*JP_DATE, &*BARE_YEAR] {
        if let Some(caps) = pattern.captures(text) {
            if let Ok(year) = caps[1].parse::<i32>() {
                return Some(year);
            }
        }
    }
    None
}

/// Extracts the event year by trying `event_date_start`, `event_name`,
/// then `source_url` in order.
#[must_use]
pub fn extract_year(event_date_start: &str, event_name: &str, source_url: &str) -> Option<i32> {
    extract_from_field(event_date_start)
        .or_else(|| extract_from_field(event_name))
        .or_else(|| extract_from_field(source_url))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_date_start_over_name() {
        let year = extract_year("2024-08-15", "2023年花火大会", "https://example.com/2022");
        assert_eq!(year, Some(2024));
    }

    #[test]
    fn falls_back_to_event_name() {
        let year = extract_year("", "2023年8月1日開催", "https://example.com/x");
        assert_eq!(year, Some(2023));
    }

    #[test]
    fn falls_back_to_url_bare_year() {
        let year = extract_year("", "", "https://example.com/events/2021/summer");
        assert_eq!(year, Some(2021));
    }

    #[test]
    fn no_hit_anywhere_is_none() {
        assert_eq!(extract_year("", "", ""), None);
    }
}
