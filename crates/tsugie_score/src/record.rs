//! `ScoreRecord`: the scoring stage's output row (§3).

use serde::{Deserialize, Serialize};
use tsugie_core::resolver::ResolverKey;

/// Where a record's scores came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreSource {
    Ai,
    Fallback,
}

/// One scored, per-run record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub canonical_id: String,
    pub event_name: String,
    pub event_date_start: String,
    pub source_urls: Vec<String>,

    pub initial_heat_score: i64,
    pub surprise_score: i64,
    pub reason: String,

    pub status: String,
    pub score_source: ScoreSource,
    pub score_provider: String,
    pub score_model: String,
    pub input_hash: String,
    pub error: String,
    pub generated_at: String,
}

impl Default for ScoreRecord {
    fn default() -> Self {
        Self {
            canonical_id: String::new(),
            event_name: String::new(),
            event_date_start: String::new(),
            source_urls: Vec::new(),
            initial_heat_score: 0,
            surprise_score: 0,
            reason: String::new(),
            status: String::new(),
            score_source: ScoreSource::Fallback,
            score_provider: String::new(),
            score_model: String::new(),
            input_hash: String::new(),
            error: String::new(),
            generated_at: String::new(),
        }
    }
}

impl ScoreRecord {
    /// `true` when the record is an AI-scored success reusable verbatim
    /// under `failed_only` (§4.4: "reuse when status is `ok` and
    /// `failed_only` is set").
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }

    /// Rank used by the previous-record resolver's comparator
    /// (`score_score_entry`, §9): prefers `ok` AI scores over cached
    /// reuse over any fallback variant, then the most recent.
    #[must_use]
    pub fn selection_rank(&self) -> (u8, String) {
        let status_rank = match self.status.as_str() {
            "ok" => 3,
            "cached" => 2,
            _ if self.status.starts_with("fallback") => 1,
            _ => 0,
        };
        (status_rank, self.generated_at.clone())
    }
}

impl ResolverKey for ScoreRecord {
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
    fn is_ok_requires_exact_ok_status() {
        let mut rec = ScoreRecord {
            status: "cached".to_string(),
            ..Default::default()
        };
        assert!(!rec.is_ok());
        rec.status = "ok".to_string();
        assert!(rec.is_ok());
    }

    #[test]
    fn selection_rank_prefers_ok_over_fallback() {
        let ok = ScoreRecord {
            status: "ok".to_string(),
            ..Default::default()
        };
        let fallback = ScoreRecord {
            status: "fallback_no_api_key".to_string(),
            ..Default::default()
        };
        assert!(ok.selection_rank() > fallback.selection_rank());
    }
}
