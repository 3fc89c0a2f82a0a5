//! Incompleteness tagging and `update_priority` derivation (§4.1
//! "Incompleteness tagging").

use std::sync::LazyLock;

use regex::Regex;

const UNCERTAIN_HINTS: &[&str] = &["未定", "調査中", "確認中", "予定", "頃"];

static TIME_HHMM: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d{1,2}:\d{2}").unwrap());
static TIME_H_JI: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d{1,2}時").unwrap());
static HAS_DIGIT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d").unwrap());

/// Why a single field was flagged incomplete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncompleteReason {
    /// The field was empty.
    Missing,
    /// The field held a hedging/placeholder phrase.
    Uncertain,
    /// `launch_count` had no digit in it.
    MissingNumeric,
    /// `event_time_start` had no parseable `HH:MM` or `H時` pattern.
    UnparsedTime,
}

impl IncompleteReason {
    fn as_str(self) -> &'static str {
        match self {
            Self::Missing => "missing",
            Self::Uncertain => "uncertain",
            Self::MissingNumeric => "missing_numeric",
            Self::UnparsedTime => "unparsed_time",
        }
    }
}

fn classify_generic(value: &str) -> Option<IncompleteReason> {
    if value.trim().is_empty() {
        return Some(IncompleteReason::Missing);
    }
    if UNCERTAIN_HINTS.iter().any(|hint| value.contains(hint)) {
        return Some(IncompleteReason::Uncertain);
    }
    None
}

fn classify_launch_count(value: &str) -> Option<IncompleteReason> {
    if value.trim().is_empty() {
        return Some(IncompleteReason::Missing);
    }
    if UNCERTAIN_HINTS.iter().any(|hint| value.contains(hint)) {
        return Some(IncompleteReason::Uncertain);
    }
    if !HAS_DIGIT.is_match(value) {
        return Some(IncompleteReason::MissingNumeric);
    }
    None
}

fn classify_time_start(value: &str) -> Option<IncompleteReason> {
    if value.trim().is_empty() {
        return Some(IncompleteReason::Missing);
    }
    if UNCERTAIN_HINTS.iter().any(|hint| value.contains(hint)) {
        return Some(IncompleteReason::Uncertain);
    }
    if !TIME_HHMM.is_match(value) && !TIME_H_JI.is_match(value) {
        return Some(IncompleteReason::UnparsedTime);
    }
    None
}

/// The five incompleteness-tracked fields of a canonical event.
pub struct IncompletenessInputs<'a> {
    pub launch_count: &'a str,
    pub event_time_start: &'a str,
    pub event_date_start: &'a str,
    pub venue_name: &'a str,
    pub venue_address: &'a str,
}

/// Result of classifying a canonical event's incompleteness-tracked
/// fields: the pipe-joined `field:reason` list and derived priority.
pub struct IncompletenessResult {
    /// `field:reason` entries, in a fixed field order.
    pub fields: Vec<String>,
    /// `high`/`medium`/`low`/`none`.
    pub update_priority: &'static str,
}

/// Classifies every incompleteness-tracked field and derives
/// `update_priority` (`high` if launch_count or time_start is flagged,
/// `medium` for date-start or venue-name, `low` otherwise, `none` if
/// nothing was flagged).
#[must_use]
pub fn classify(inputs: &IncompletenessInputs<'_>) -> IncompletenessResult {
    let mut flagged: Vec<(&'static str, IncompleteReason)> = Vec::new();

    if let Some(reason) = classify_launch_count(inputs.launch_count) {
        flagged.push(("launch_count", reason));
    }
    if let Some(reason) = classify_time_start(inputs.event_time_start) {
        flagged.push(("event_time_start", reason));
    }
    if let Some(reason) = classify_generic(inputs.event_date_start) {
        flagged.push(("event_date_start", reason));
    }
    if let Some(reason) = classify_generic(inputs.venue_name) {
        flagged.push(("venue_name", reason));
    }
    if let Some(reason) = classify_generic(inputs.venue_address) {
        flagged.push(("venue_address", reason));
    }

    let names: Vec<&str> = flagged.iter().map(|(f, _)| *f).collect();
    let high = names.contains(&"launch_count") || names.contains(&"event_time_start");
    let medium = names.contains(&"event_date_start") || names.contains(&"venue_name");

    let update_priority = if flagged.is_empty() {
        "none"
    } else if high {
        "high"
    } else if medium {
        "medium"
    } else {
        "low"
    };

    IncompletenessResult {
        fields: flagged
            .into_iter()
            .map(|(field, reason)| format!("{field}:{}", reason.as_str()))
            .collect(),
        update_priority,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_issues_is_none_priority() {
        let result = classify(&IncompletenessInputs {
            launch_count: "1万発",
            event_time_start: "19:30",
            event_date_start: "2024-07-27",
            venue_name: "隅田川河川敷",
            venue_address: "東京都台東区今戸1丁目",
        });
        assert!(result.fields.is_empty());
        assert_eq!(result.update_priority, "none");
    }

    #[test]
    fn missing_launch_count_is_high_priority() {
        let result = classify(&IncompletenessInputs {
            launch_count: "未定",
            event_time_start: "19:30",
            event_date_start: "2024-07-27",
            venue_name: "隅田川河川敷",
            venue_address: "東京都台東区今戸1丁目",
        });
        assert_eq!(result.update_priority, "high");
        assert!(result.fields.contains(&"launch_count:uncertain".to_string()));
    }

    #[test]
    fn launch_count_without_digit_is_missing_numeric() {
        let result = classify(&IncompletenessInputs {
            launch_count: "多数",
            event_time_start: "19:30",
            event_date_start: "2024-07-27",
            venue_name: "x",
            venue_address: "x",
        });
        assert!(result
            .fields
            .contains(&"launch_count:missing_numeric".to_string()));
    }

    #[test]
    fn unparsed_time_is_flagged() {
        let result = classify(&IncompletenessInputs {
            launch_count: "1000発",
            event_time_start: "夕方",
            event_date_start: "2024-07-27",
            venue_name: "x",
            venue_address: "x",
        });
        assert!(result
            .fields
            .contains(&"event_time_start:unparsed_time".to_string()));
    }
}
