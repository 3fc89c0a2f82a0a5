//! Per-run selection: date-window filters and the `prioritize_near_start`
//! ordering (§4.3 "Selection filters").

use chrono::NaiveDate;
use tsugie_core::config::ContentConfig;
use tsugie_fusion::canonical::{CanonicalEvent, UpdatePriority};

/// Extracts the first `YYYY-MM-DD` literal from a date field, mirroring
/// `tsugie_fusion::dedup::extract_iso_date`'s tolerance of surrounding
/// free text.
#[must_use]
pub fn parse_start_date(event_date_start: &str) -> Option<NaiveDate> {
    let re = regex::Regex::new(r"(\d{4})-(\d{2})-(\d{2})").ok()?;
    let caps = re.captures(event_date_start)?;
    NaiveDate::from_ymd_opt(
        caps[1].parse().ok()?,
        caps[2].parse().ok()?,
        caps[3].parse().ok()?,
    )
}

/// Days from `today` to the event's start date: positive means the event
/// has already started that many days ago, negative means it's upcoming.
/// `None` when the start date can't be parsed.
#[must_use]
pub fn days_since_start(event_date_start: &str, today: NaiveDate) -> Option<i64> {
    let start = parse_start_date(event_date_start)?;
    Some((today - start).num_days())
}

/// `only_past_days`: keep only rows strictly older than `n` days.
/// Unknown-date rows are kept — there's no date to judge them against.
#[must_use]
fn passes_only_past_days(event_date_start: &str, n: i64, today: NaiveDate) -> bool {
    match days_since_start(event_date_start, today) {
        Some(days) => days > n,
        None => true,
    }
}

/// `skip_past_days`: drop rows older than `n` days. Unknown-date rows
/// are kept.
#[must_use]
fn passes_skip_past_days(event_date_start: &str, n: i64, today: NaiveDate) -> bool {
    match days_since_start(event_date_start, today) {
        Some(days) => days <= n,
        None => true,
    }
}

/// Applies `only_past_days`/`skip_past_days` to `events`, returning the
/// surviving indices in original order.
#[must_use]
pub fn apply_date_filters(
    events: &[CanonicalEvent],
    config: &ContentConfig,
    today: NaiveDate,
) -> Vec<usize> {
    (0..events.len())
        .filter(|&i| {
            let date = &events[i].event_date_start;
            if let Some(n) = config.only_past_days {
                if !passes_only_past_days(date, n, today) {
                    return false;
                }
            }
            if let Some(n) = config.skip_past_days {
                if !passes_skip_past_days(date, n, today) {
                    return false;
                }
            }
            true
        })
        .collect()
}

fn work_rank(priority: UpdatePriority) -> u8 {
    match priority {
        UpdatePriority::High => 0,
        UpdatePriority::Medium => 1,
        UpdatePriority::Low => 2,
        UpdatePriority::None => 3,
    }
}

/// Sort key for `prioritize_near_start`: `(work_rank, bucket, |days|,
/// original_index)`. `work_rank` reuses the fused `update_priority` field
/// as the "needs attention" signal shared across stages (§9 previous-
/// record resolver note: the same ranking concept recurs in content,
/// scoring, and export). Bucket 0 is upcoming-or-today, bucket 1 is past;
/// unknown-date rows sort last within their position.
#[must_use]
fn near_start_sort_key(event: &CanonicalEvent, today: NaiveDate, original_index: usize) -> (u8, u8, i64, usize) {
    match days_since_start(&event.event_date_start, today) {
        Some(days) if days <= 0 => (work_rank(event.update_priority), 0, days.abs(), original_index),
        Some(days) => (work_rank(event.update_priority), 1, days, original_index),
        None => (work_rank(event.update_priority), 2, i64::MAX, original_index),
    }
}

/// Orders `indices` (into `events`) per `prioritize_near_start` when the
/// config requests it; otherwise returns them unchanged.
#[must_use]
pub fn order_indices(events: &[CanonicalEvent], indices: Vec<usize>, config: &ContentConfig, today: NaiveDate) -> Vec<usize> {
    if !config.prioritize_near_start {
        return indices;
    }
    let mut ordered = indices;
    ordered.sort_by_key(|&i| near_start_sort_key(&events[i], today, i));
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parses_iso_date_from_free_text() {
        assert_eq!(parse_start_date("2024-07-27 開催"), Some(date(2024, 7, 27)));
        assert_eq!(parse_start_date("未定"), None);
    }

    #[test]
    fn only_past_days_keeps_strictly_older() {
        let today = date(2026, 7, 28);
        assert!(!passes_only_past_days("2026-07-20", 10, today));
        assert!(passes_only_past_days("2026-06-01", 10, today));
        assert!(passes_only_past_days("未定", 10, today));
    }

    #[test]
    fn skip_past_days_drops_older_than_n() {
        let today = date(2026, 7, 28);
        assert!(!passes_skip_past_days("2026-06-01", 10, today));
        assert!(passes_skip_past_days("2026-07-25", 10, today));
    }

    #[test]
    fn near_start_orders_upcoming_before_past_and_unknown_last() {
        let mut upcoming = CanonicalEvent {
            event_date_start: "2026-08-01".to_string(),
            ..Default::default()
        };
        let mut past = CanonicalEvent {
            event_date_start: "2026-07-01".to_string(),
            ..Default::default()
        };
        let mut unknown = CanonicalEvent::default();
        upcoming.update_priority = UpdatePriority::None;
        past.update_priority = UpdatePriority::None;
        unknown.update_priority = UpdatePriority::None;

        let events = vec![past, upcoming, unknown];
        let today = date(2026, 7, 28);
        let ordered = order_indices(
            &events,
            vec![0, 1, 2],
            &ContentConfig {
                prioritize_near_start: true,
                ..Default::default()
            },
            today,
        );
        assert_eq!(ordered, vec![1, 0, 2]);
    }
}
