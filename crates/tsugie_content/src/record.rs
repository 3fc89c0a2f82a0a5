//! `ContentRecord`: the content stage's output row (§3).

use serde::{Deserialize, Serialize};
use tsugie_core::resolver::ResolverKey;

/// One enriched, per-run content record.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ContentRecord {
    pub canonical_id: String,
    pub category: String,
    pub event_name: String,
    pub event_date_start: String,
    pub event_date_end: String,
    pub fused_run_id: String,

    pub description_source_url: String,
    pub raw_description: String,

    pub polished_description: String,
    pub one_liner: String,
    pub polished_description_zh: String,
    pub one_liner_zh: String,
    pub polished_description_en: String,
    pub one_liner_en: String,

    pub image_urls: Vec<String>,
    pub downloaded_images: Vec<String>,

    pub source_urls: Vec<String>,
    pub source_urls_sig: String,

    pub status: String,
    pub error: String,
    pub fetched_at: String,
    pub polish_mode: String,
    pub polish_model: String,
}

impl ContentRecord {
    /// `true` when the record's status and description/language fields are
    /// a "good success" reusable under `failed_only` (§4.3): `ok`/`cached`
    /// status, a raw description, all three polished languages, and
    /// nonempty one-liners.
    #[must_use]
    pub fn is_good_success(&self) -> bool {
        matches!(self.status.as_str(), "ok" | "cached")
            && !self.raw_description.trim().is_empty()
            && !self.polished_description.trim().is_empty()
            && !self.polished_description_zh.trim().is_empty()
            && !self.polished_description_en.trim().is_empty()
            && !self.one_liner.trim().is_empty()
    }

    /// Rank used by the previous-record resolver's comparator
    /// (`score_content_entry`, §9): `(status_rank, has_polished,
    /// has_one_liner_and_i18n, fetched_at)`.
    #[must_use]
    pub fn selection_rank(&self) -> (u8, u8, u8, String) {
        let status_rank = match self.status.as_str() {
            "ok" => 4,
            "cached" => 3,
            "partial" => 2,
            "empty" => 1,
            _ => 0,
        };
        let has_polished = u8::from(!self.polished_description.trim().is_empty());
        let has_one_liner_i18n = u8::from(
            !self.one_liner.trim().is_empty()
                && !self.polished_description_zh.trim().is_empty()
                && !self.polished_description_en.trim().is_empty(),
        );
        (
            status_rank,
            has_polished,
            has_one_liner_i18n,
            self.fetched_at.clone(),
        )
    }
}

impl ResolverKey for ContentRecord {
    fn canonical_id(&self) -> &str {
        &self.canonical_id
    }

    fn source_urls(&self) -> &[String] {
        &self.source_urls
    }

    fn name_date_key(&self) -> Option<String> {
        if self.event_name.is_empty() || self.event_date_start.is_empty() {
            None
        } else {
            Some(format!("{}|{}", self.event_name, self.event_date_start))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn good_success_requires_all_three_languages() {
        let mut rec = ContentRecord {
            status: "ok".to_string(),
            raw_description: "x".to_string(),
            polished_description: "x".to_string(),
            one_liner: "x".to_string(),
            ..Default::default()
        };
        assert!(!rec.is_good_success());
        rec.polished_description_zh = "x".to_string();
        rec.polished_description_en = "x".to_string();
        assert!(rec.is_good_success());
    }

    #[test]
    fn selection_rank_orders_by_status() {
        let ok = ContentRecord {
            status: "ok".to_string(),
            ..Default::default()
        };
        let empty = ContentRecord {
            status: "empty".to_string(),
            ..Default::default()
        };
        assert!(ok.selection_rank() > empty.selection_rank());
    }
}
