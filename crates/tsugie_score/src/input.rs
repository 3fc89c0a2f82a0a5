//! The bounded model input built per fused row (§4.4) and its
//! `input_hash`.

use std::collections::BTreeMap;

use serde::Serialize;
use sha2::{Digest, Sha256};
use tsugie_fusion::canonical::CanonicalEvent;

const MAX_DESCRIPTION_CHARS: usize = 2000;
const MAX_ONE_LINER_CHARS: usize = 240;

fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    text.chars().take(max_chars).collect()
}

/// The bounded, model-facing view of one fused event: the fields a
/// scoring prompt is built from, plus a capped description/one-liner.
#[derive(Debug, Clone, Serialize)]
pub struct ScoreInput {
    pub canonical_id: String,
    pub event_name: String,
    pub event_date_start: String,
    pub event_date_end: String,
    pub venue_name: String,
    pub venue_address: String,
    pub prefecture: String,
    pub city: String,
    pub launch_count: String,
    pub launch_scale: String,
    pub source_count: usize,
    pub category: String,
    pub description_jp: String,
    pub one_liner_jp: String,
}

impl ScoreInput {
    /// Builds a bounded input from `event`, `category` (hanabi/matsuri),
    /// and the content stage's polished Japanese description/one-liner.
    #[must_use]
    pub fn build(event: &CanonicalEvent, category: &str, description_jp: &str, one_liner_jp: &str) -> Self {
        Self {
            canonical_id: event.canonical_id.clone(),
            event_name: event.event_name.clone(),
            event_date_start: event.event_date_start.clone(),
            event_date_end: event.event_date_end.clone(),
            venue_name: event.venue_name.clone(),
            venue_address: event.venue_address.clone(),
            prefecture: event.prefecture.clone(),
            city: event.city.clone(),
            launch_count: event.launch_count.clone(),
            launch_scale: event.launch_scale.clone(),
            source_count: event.source_count,
            category: category.to_string(),
            description_jp: truncate_chars(description_jp, MAX_DESCRIPTION_CHARS),
            one_liner_jp: truncate_chars(one_liner_jp, MAX_ONE_LINER_CHARS),
        }
    }

    /// `input_hash = sha256(canonical JSON, sorted keys)` (§4.4).
    #[must_use]
    pub fn input_hash(&self) -> String {
        let value = serde_json::to_value(self).unwrap_or(serde_json::Value::Null);
        let sorted: BTreeMap<String, serde_json::Value> = match value {
            serde_json::Value::Object(map) => map.into_iter().collect(),
            _ => BTreeMap::new(),
        };
        let canonical_json = serde_json::to_string(&sorted).unwrap_or_default();

        let mut hasher = Sha256::new();
        hasher.update(canonical_json.as_bytes());
        hex::encode(hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncates_description_and_one_liner() {
        let event = CanonicalEvent::default();
        let long_description = "あ".repeat(MAX_DESCRIPTION_CHARS + 50);
        let long_one_liner = "い".repeat(MAX_ONE_LINER_CHARS + 50);
        let input = ScoreInput::build(&event, "hanabi", &long_description, &long_one_liner);
        assert_eq!(input.description_jp.chars().count(), MAX_DESCRIPTION_CHARS);
        assert_eq!(input.one_liner_jp.chars().count(), MAX_ONE_LINER_CHARS);
    }

    #[test]
    fn input_hash_is_stable_for_identical_fields() {
        let mut event = CanonicalEvent::default();
        event.canonical_id = "E0001".to_string();
        let a = ScoreInput::build(&event, "hanabi", "desc", "one");
        let b = ScoreInput::build(&event, "hanabi", "desc", "one");
        assert_eq!(a.input_hash(), b.input_hash());
    }

    #[test]
    fn input_hash_changes_with_content() {
        let event = CanonicalEvent::default();
        let a = ScoreInput::build(&event, "hanabi", "desc a", "one");
        let b = ScoreInput::build(&event, "hanabi", "desc b", "one");
        assert_ne!(a.input_hash(), b.input_hash());
    }
}
