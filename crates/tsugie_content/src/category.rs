//! `category` derivation (§3 `ContentRecord`).
//!
//! The fused data model carries no explicit category field (§3
//! `CanonicalEvent`): fireworks vs. festival is a property of the event
//! name itself, so content enrichment is where it's first assigned and
//! carried downstream to scoring and export via the content record.

const FIREWORKS_MARKERS: &[&str] = &["花火"];
const FESTIVAL_MARKERS: &[&str] = &["祭", "まつり", "フェス"];

/// Classifies an event name as `"hanabi"` or `"matsuri"`, defaulting to
/// `"matsuri"` when neither marker is present (the broader of the two
/// categories per §1's "fireworks and festivals" scope).
#[must_use]
pub fn infer_category(event_name: &str) -> &'static str {
    if FIREWORKS_MARKERS.iter().any(|m| event_name.contains(m)) {
        return "hanabi";
    }
    if FESTIVAL_MARKERS.iter().any(|m| event_name.contains(m)) {
        return "matsuri";
    }
    "matsuri"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fireworks_marker_wins() {
        assert_eq!(infer_category("隅田川花火大会"), "hanabi");
    }

    #[test]
    fn festival_marker_falls_back_to_matsuri() {
        assert_eq!(infer_category("神田祭"), "matsuri");
    }

    #[test]
    fn no_marker_defaults_to_matsuri() {
        assert_eq!(infer_category("サマーナイトイベント"), "matsuri");
    }
}
