//! `events_content.csv`'s fixed header (§6) and the CSV projection of
//! [`ContentRecord`].

use serde::Serialize;

use crate::ContentError;
use crate::record::ContentRecord;

/// One row of `events_content.csv`. Field order is the wire contract: it
/// is the exact header downstream dashboards depend on (§6).
#[derive(Debug, Clone, Serialize)]
pub struct ContentCsvRow {
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
    pub image_urls: String,
    pub downloaded_images: String,
    pub source_urls: String,
    pub source_urls_sig: String,
    pub status: String,
    pub error: String,
    pub fetched_at: String,
    pub polish_mode: String,
    pub polish_model: String,
}

impl From<&ContentRecord> for ContentCsvRow {
    fn from(record: &ContentRecord) -> Self {
        Self {
            canonical_id: record.canonical_id.clone(),
            category: record.category.clone(),
            event_name: record.event_name.clone(),
            event_date_start: record.event_date_start.clone(),
            event_date_end: record.event_date_end.clone(),
            fused_run_id: record.fused_run_id.clone(),
            description_source_url: record.description_source_url.clone(),
            raw_description: record.raw_description.clone(),
            polished_description: record.polished_description.clone(),
            one_liner: record.one_liner.clone(),
            polished_description_zh: record.polished_description_zh.clone(),
            one_liner_zh: record.one_liner_zh.clone(),
            polished_description_en: record.polished_description_en.clone(),
            one_liner_en: record.one_liner_en.clone(),
            image_urls: tsugie_core::text::pipe_join(&record.image_urls),
            downloaded_images: tsugie_core::text::pipe_join(&record.downloaded_images),
            source_urls: tsugie_core::text::pipe_join(&record.source_urls),
            source_urls_sig: record.source_urls_sig.clone(),
            status: record.status.clone(),
            error: record.error.clone(),
            fetched_at: record.fetched_at.clone(),
            polish_mode: record.polish_mode.clone(),
            polish_model: record.polish_model.clone(),
        }
    }
}

/// Writes `events_content.csv` for `records`, creating parent directories
/// as needed.
///
/// # Errors
///
/// Returns [`ContentError`] on I/O or CSV encoding failure.
pub fn write_content_csv(records: &[ContentRecord], path: &std::path::Path) -> Result<(), ContentError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = csv::Writer::from_path(path)?;
    for record in records {
        writer.serialize(ContentCsvRow::from(record))?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multi_valued_columns_are_pipe_joined() {
        let record = ContentRecord {
            image_urls: vec!["https://a".to_string(), "https://b".to_string()],
            ..Default::default()
        };
        let row = ContentCsvRow::from(&record);
        assert_eq!(row.image_urls, "https://a|https://b");
    }
}
