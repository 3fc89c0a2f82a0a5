//! Export orchestration (§4.5): join fused+content+score, derive entries,
//! build the image and spatial payloads, and assemble the index.

use std::path::Path;

use chrono::Utc;
use sha2::{Digest, Sha256};

use tsugie_content::record::ContentRecord;
use tsugie_core::config::ExportConfig;
use tsugie_core::geohash::clamp_precision;
use tsugie_core::resolver::PreviousRecordIndex;
use tsugie_fusion::canonical::CanonicalEvent;
use tsugie_score::record::ScoreRecord;

use crate::ExportError;
use crate::entry::derive_entries;
use crate::images::ImagePayloadBuilder;
use crate::index::{CodecDescriptor, ContentCounts, ExportIndex, ImagePayloadDescriptor, RecordCounts, SourceRunIds, SpatialIndexDescriptor};
use crate::spatial;

/// Current `index.json` schema version (§6).
pub const EXPORT_INDEX_VERSION: u32 = 4;

/// Everything one export run produces, ready to be written to disk by
/// the caller (or discarded under `--dry-run`).
#[derive(Debug)]
pub struct ExportOutput {
    pub index: ExportIndex,
    pub spatial_payload: Vec<u8>,
    pub image_payload: Vec<u8>,
}

/// Joins `events`/`content_records`/`score_records` via the tri-key
/// resolver, derives one [`crate::entry::ExportEntry`] per event, builds
/// both obfuscated payloads, and self-checks every chunk before
/// returning. `image_root` resolves `ContentRecord::downloaded_images`'
/// repo-relative paths.
///
/// # Errors
///
/// Returns [`ExportError::SelfCheckFailed`] if any obfuscated chunk fails
/// its round-trip check (§7: fatal, aborts the run). Other variants are
/// configuration/IO errors encountered while re-encoding images.
pub fn run(
    events: &[CanonicalEvent],
    content_records: &[ContentRecord],
    score_records: &[ScoreRecord],
    fused_run_id: &str,
    content_run_id: &str,
    score_run_id: &str,
    config: &ExportConfig,
    image_root: &Path,
) -> Result<ExportOutput, ExportError> {
    let precision = clamp_precision(config.geohash_precision);
    let content_index = PreviousRecordIndex::build(content_records);
    let score_index = PreviousRecordIndex::build(score_records);

    let mut derived = derive_entries(events, &content_index, &score_index, precision);

    let mut image_builder = ImagePayloadBuilder::new();
    for (entry, local_path) in &mut derived {
        let Some(rel_path) = local_path else { continue };
        let full_path = image_root.join(&rel_path);
        if !full_path.is_file() {
            continue;
        }
        match image_builder.add_image(&full_path, config.image_quality, config.image_max_px, &config.key_seed) {
            Ok((raw_sha, offset, length)) => {
                entry.image_raw_sha = Some(raw_sha);
                entry.image_offset = Some(offset);
                entry.image_length = Some(length);
            }
            Err(e) => log::warn!("image re-encode failed for {} ({}): {e}", entry.canonical_id, full_path.display()),
        }
    }
    let (image_payload, image_entries) = image_builder.finish();

    let entries: Vec<_> = derived.into_iter().map(|(entry, _)| entry).collect();
    let (spatial_payload, payload_buckets) = spatial::build(&entries, &config.key_seed)?;

    let hanabi = entries.iter().filter(|e| e.category == "hanabi").count();
    let matsuri = entries.len() - hanabi;
    let with_description = entries.iter().filter(|e| !e.description_ja.is_empty()).count();
    let with_image = entries.iter().filter(|e| e.image_raw_sha.is_some()).count();

    let index = ExportIndex {
        version: EXPORT_INDEX_VERSION,
        generated_at: Utc::now().to_rfc3339(),
        codec: CodecDescriptor::default(),
        source_run_ids: SourceRunIds {
            fused_run_id: fused_run_id.to_string(),
            content_run_id: content_run_id.to_string(),
            score_run_id: score_run_id.to_string(),
        },
        record_counts: RecordCounts {
            total: entries.len(),
            hanabi,
            matsuri,
        },
        content_counts: ContentCounts { with_description, with_image },
        spatial_index: SpatialIndexDescriptor {
            scheme: "geohash_prefix_v1",
            precision,
            bucket_count: payload_buckets.len(),
        },
        payload_buckets,
        image_payload: ImagePayloadDescriptor {
            sha256: hex::encode(Sha256::digest(&image_payload)),
            size: image_payload.len() as u64,
            entry_count: image_entries.len(),
        },
    };

    Ok(ExportOutput {
        index,
        spatial_payload,
        image_payload,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_produces_empty_bundle() {
        let config = ExportConfig::default();
        let output = run(&[], &[], &[], "run-a", "run-b", "run-c", &config, Path::new(".")).unwrap();
        assert_eq!(output.index.record_counts.total, 0);
        assert_eq!(output.index.version, EXPORT_INDEX_VERSION);
        assert!(output.spatial_payload.is_empty());
        assert!(output.image_payload.is_empty());
    }

    #[test]
    fn joins_one_event_without_content_or_score() {
        let mut event = CanonicalEvent::default();
        event.canonical_id = "E0001".to_string();
        event.event_name = "隅田川花火大会".to_string();
        let config = ExportConfig::default();
        let output = run(&[event], &[], &[], "run-a", "run-b", "run-c", &config, Path::new(".")).unwrap();
        assert_eq!(output.index.record_counts.total, 1);
        assert_eq!(output.index.record_counts.hanabi, 1);
    }
}
