//! CSV projection of [`ScoreRecord`], mirroring the fixed-header
//! convention the fusion and content stages use (§6) even though the
//! scoring artifact's exact column set is not spec'd there: the ambient
//! persistence shape should still match the rest of the pipeline.

use serde::Serialize;

use crate::ScoreError;
use crate::record::{ScoreRecord, ScoreSource};

/// One row of the scoring stage's CSV output.
#[derive(Debug, Clone, Serialize)]
pub struct ScoreCsvRow {
    pub canonical_id: String,
    pub event_name: String,
    pub event_date_start: String,
    pub source_urls: String,
    pub initial_heat_score: i64,
    pub surprise_score: i64,
    pub reason: String,
    pub status: String,
    pub score_source: String,
    pub score_provider: String,
    pub score_model: String,
    pub input_hash: String,
    pub error: String,
    pub generated_at: String,
}

impl From<&ScoreRecord> for ScoreCsvRow {
    fn from(record: &ScoreRecord) -> Self {
        Self {
            canonical_id: record.canonical_id.clone(),
            event_name: record.event_name.clone(),
            event_date_start: record.event_date_start.clone(),
            source_urls: tsugie_core::text::pipe_join(&record.source_urls),
            initial_heat_score: record.initial_heat_score,
            surprise_score: record.surprise_score,
            reason: record.reason.clone(),
            status: record.status.clone(),
            score_source: match record.score_source {
                ScoreSource::Ai => "ai".to_string(),
                ScoreSource::Fallback => "fallback".to_string(),
            },
            score_provider: record.score_provider.clone(),
            score_model: record.score_model.clone(),
            input_hash: record.input_hash.clone(),
            error: record.error.clone(),
            generated_at: record.generated_at.clone(),
        }
    }
}

/// Writes the scoring stage's CSV output for `records`, creating parent
/// directories as needed.
///
/// # Errors
///
/// Returns [`ScoreError`] on I/O or CSV encoding failure.
pub fn write_score_csv(records: &[ScoreRecord], path: &std::path::Path) -> Result<(), ScoreError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = csv::Writer::from_path(path)?;
    for record in records {
        writer.serialize(ScoreCsvRow::from(record))?;
    }
    writer.flush()?;
    Ok(())
}
