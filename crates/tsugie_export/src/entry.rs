//! `ExportEntry`: the client-visible join of fused + content + score
//! (§3, §4.5).

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use tsugie_content::category::infer_category;
use tsugie_content::record::ContentRecord;
use tsugie_core::geohash;
use tsugie_core::resolver::PreviousRecordIndex;
use tsugie_fusion::canonical::CanonicalEvent;
use tsugie_score::heuristic::{compute as heuristic_compute, parse_magnitude};
use tsugie_score::record::{ScoreRecord, ScoreSource};

/// One client-visible, joined event entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportEntry {
    pub ios_place_id: String,
    pub canonical_id: String,
    pub category: String,
    pub event_name: String,
    pub event_date_start: String,
    pub event_date_end: String,
    pub venue_name: String,
    pub prefecture: String,
    pub city: String,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub geohash: String,
    pub scale_score: i64,
    pub heat_score: i64,
    pub surprise_score: i64,
    pub score_source: String,
    pub distance_meters: u32,
    pub hint: String,
    pub description_ja: String,
    pub one_liner_ja: String,
    pub description_zh: String,
    pub one_liner_zh: String,
    pub description_en: String,
    pub one_liner_en: String,
    pub source_count: usize,
    pub content_image_source_url: String,
    pub image_raw_sha: Option<String>,
    /// Byte offset of this entry's chunk inside `he_images.payload.bin`,
    /// set once the export engine re-encodes its local image (§4.5 image-
    /// payload step 3).
    pub image_offset: Option<u64>,
    /// Byte length of that chunk.
    pub image_length: Option<u64>,
}

fn isqrt(n: u64) -> u64 {
    (n as f64).sqrt().floor() as u64
}

/// A display-only magnitude score (0-100) derived from `launch_count`,
/// independent of the heat/surprise AI-vs-heuristic choice: no score
/// record carries a scale value, so this is always heuristic.
fn scale_score(launch_count: &str) -> i64 {
    let magnitude = parse_magnitude(launch_count);
    let scaled = (isqrt(magnitude) / 2).min(80);
    (20 + i64::try_from(scaled).unwrap_or(80)).clamp(0, 100)
}

/// `distance_meters = 280 + (sha256(canonical_id)[0:4] as BE u32) mod 5200`
/// (§9 Open Question 1: a flagged stub, not an actual distance).
fn stub_distance_meters(canonical_id: &str) -> u32 {
    let digest = Sha256::digest(canonical_id.as_bytes());
    let prefix: [u8; 4] = digest[0..4].try_into().unwrap_or([0; 4]);
    280 + (u32::from_be_bytes(prefix) % 5200)
}

fn build_hint(event: &CanonicalEvent, category: &str) -> String {
    let location = if !event.city.is_empty() {
        event.city.as_str()
    } else if !event.prefecture.is_empty() {
        event.prefecture.as_str()
    } else {
        "開催地確認中"
    };
    let label = if category == "hanabi" { "花火" } else { "祭典" };
    format!("{location}・{label}候補（{}ソース統合）", event.source_count)
}

/// Prefers a usable AI score (`status` ok/cached, `score_source=ai`),
/// else recomputes the deterministic heuristic from fused fields (§4.5).
fn heat_and_surprise(score: Option<&ScoreRecord>, event: &CanonicalEvent, category: &str) -> (i64, i64, &'static str) {
    if let Some(s) = score {
        let usable_status = s.status == "ok" || s.status.starts_with("cached");
        if usable_status && s.score_source == ScoreSource::Ai {
            return (s.initial_heat_score, s.surprise_score, "ai");
        }
    }
    let heuristic = heuristic_compute(event.source_count, category, &event.launch_count);
    (heuristic.heat_score, heuristic.surprise_score, "fallback")
}

/// Joins `events` against the content and score indexes and derives one
/// [`ExportEntry`] per event, alongside its optional repo-relative local
/// image path (not part of the client-visible payload).
#[must_use]
pub fn derive_entries(
    events: &[CanonicalEvent],
    content_index: &PreviousRecordIndex<'_, ContentRecord>,
    score_index: &PreviousRecordIndex<'_, ScoreRecord>,
    geohash_precision: usize,
) -> Vec<(ExportEntry, Option<String>)> {
    events
        .iter()
        .map(|event| {
            let content = content_index.resolve(event, ContentRecord::selection_rank);
            let score = score_index.resolve(event, ScoreRecord::selection_rank);

            let category = content
                .map(|c| c.category.clone())
                .filter(|c| !c.is_empty())
                .unwrap_or_else(|| infer_category(&event.event_name).to_string());

            let ios_place_id = Uuid::new_v5(&Uuid::NAMESPACE_URL, format!("tsugie:{category}:{}", event.canonical_id).as_bytes()).to_string();

            let coordinates = event.coordinates();
            let geohash_value = match coordinates {
                Some((lat, lng)) => geohash::encode(lat, lng, geohash_precision).unwrap_or_else(|_| geohash::UNKNOWN_BUCKET.to_string()),
                None => geohash::UNKNOWN_BUCKET.to_string(),
            };

            let (heat_score, surprise_score, score_source) = heat_and_surprise(score, event, &category);

            let (description_ja, one_liner_ja, description_zh, one_liner_zh, description_en, one_liner_en, content_image_source_url, local_image_path) =
                match content {
                    Some(c) => (
                        c.polished_description.clone(),
                        c.one_liner.clone(),
                        c.polished_description_zh.clone(),
                        c.one_liner_zh.clone(),
                        c.polished_description_en.clone(),
                        c.one_liner_en.clone(),
                        c.image_urls.first().cloned().unwrap_or_default(),
                        c.downloaded_images.first().cloned(),
                    ),
                    None => (String::new(), String::new(), String::new(), String::new(), String::new(), String::new(), String::new(), None),
                };

            let entry = ExportEntry {
                ios_place_id,
                canonical_id: event.canonical_id.clone(),
                category: category.clone(),
                event_name: event.event_name.clone(),
                event_date_start: event.event_date_start.clone(),
                event_date_end: event.event_date_end.clone(),
                venue_name: event.venue_name.clone(),
                prefecture: event.prefecture.clone(),
                city: event.city.clone(),
                lat: coordinates.map(|(lat, _)| lat),
                lng: coordinates.map(|(_, lng)| lng),
                geohash: geohash_value,
                scale_score: scale_score(&event.launch_count),
                heat_score,
                surprise_score,
                score_source: score_source.to_string(),
                distance_meters: stub_distance_meters(&event.canonical_id),
                hint: build_hint(event, &category),
                description_ja,
                one_liner_ja,
                description_zh,
                one_liner_zh,
                description_en,
                one_liner_en,
                source_count: event.source_count,
                content_image_source_url,
                image_raw_sha: None,
                image_offset: None,
                image_length: None,
            };

            (entry, local_image_path)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stub_distance_is_deterministic_and_in_range() {
        let a = stub_distance_meters("E0001");
        let b = stub_distance_meters("E0001");
        assert_eq!(a, b);
        assert!((280..5480).contains(&a));
    }

    #[test]
    fn hint_falls_back_to_placeholder_location() {
        let event = CanonicalEvent::default();
        let hint = build_hint(&event, "matsuri");
        assert!(hint.contains("開催地確認中"));
        assert!(hint.contains("祭典"));
    }

    #[test]
    fn hint_prefers_city_over_prefecture() {
        let mut event = CanonicalEvent::default();
        event.city = "台東区".to_string();
        event.prefecture = "東京都".to_string();
        let hint = build_hint(&event, "hanabi");
        assert!(hint.starts_with("台東区"));
    }

    #[test]
    fn heat_and_surprise_prefers_usable_ai_score() {
        let event = CanonicalEvent::default();
        let score = ScoreRecord {
            status: "ok".to_string(),
            score_source: ScoreSource::Ai,
            initial_heat_score: 77,
            surprise_score: 33,
            ..Default::default()
        };
        let (heat, surprise, source) = heat_and_surprise(Some(&score), &event, "matsuri");
        assert_eq!((heat, surprise, source), (77, 33, "ai"));
    }

    #[test]
    fn heat_and_surprise_falls_back_when_score_source_is_heuristic() {
        let event = CanonicalEvent::default();
        let score = ScoreRecord {
            status: "fallback_no_api_key".to_string(),
            score_source: ScoreSource::Fallback,
            initial_heat_score: 10,
            surprise_score: 10,
            ..Default::default()
        };
        let (_, _, source) = heat_and_surprise(Some(&score), &event, "matsuri");
        assert_eq!(source, "fallback");
    }
}
