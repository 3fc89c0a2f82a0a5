//! Content enrichment orchestration (§4.3): fetch, extract, polish, and
//! assemble one [`ContentRecord`] per selected canonical event.

use chrono::{DateTime, NaiveDate, Utc};
use tsugie_core::config::{ContentConfig, PolishMode};
use tsugie_core::ratelimit::RateLimiter;
use tsugie_core::resolver::PreviousRecordIndex;
use tsugie_fusion::canonical::CanonicalEvent;
use tsugie_fusion::normalize::raw_normalize_name;

use crate::category::infer_category;
use crate::extract::extract_description;
use crate::fetch::fetch_with_retries;
use crate::images::{collect_image_urls, download_images};
use crate::polish::remote::RemoteChatPolisher;
use crate::polish::subprocess::LocalSubprocessPolisher;
use crate::polish::{fallback_one_liner, Polisher};
use crate::record::ContentRecord;
use crate::selection::{apply_date_filters, order_indices};
use crate::signature::source_urls_sig;

const MAX_FETCH_RETRIES: u32 = 3;
const OPENAI_MODEL: &str = "gpt-4.1-mini";
const CODEX_BINARY: &str = "codex";
const CODEX_CANDIDATE_MODELS: &[&str] = &["gpt-5-codex", "gpt-5"];

fn polish_mode_label(mode: PolishMode) -> &'static str {
    match mode {
        PolishMode::Openai => "openai",
        PolishMode::Codex => "codex",
        PolishMode::None => "none",
        PolishMode::Auto => "auto",
    }
}

fn build_polisher(mode: PolishMode, codex_timeout_secs: u64) -> Result<Option<Box<dyn Polisher>>, tsugie_core::CoreError> {
    match mode {
        PolishMode::None => Ok(None),
        PolishMode::Openai => {
            let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| {
                tsugie_core::CoreError::config("polish_mode=openai requires OPENAI_API_KEY")
            })?;
            Ok(Some(Box::new(RemoteChatPolisher::new(api_key, OPENAI_MODEL.to_string()))))
        }
        PolishMode::Codex => Ok(Some(Box::new(LocalSubprocessPolisher::new(
            CODEX_BINARY.to_string(),
            CODEX_CANDIDATE_MODELS.iter().map(|s| (*s).to_string()).collect(),
            codex_timeout_secs,
        )))),
        PolishMode::Auto => unreachable!("PolishMode::Auto must be resolved before reaching the content engine"),
    }
}

/// Everything produced by one content-enrichment run.
#[derive(Debug, Default)]
pub struct ContentOutput {
    pub records: Vec<ContentRecord>,
    pub selected: usize,
    pub reused_fresh: usize,
    pub reused_failed_only: usize,
    pub fetched_ok: usize,
    pub fetched_failed: usize,
}

fn parse_fetched_at(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.with_timezone(&Utc))
}

/// `true` when `prev` can be reused verbatim: a successful-or-cached status,
/// an unchanged source-URL signature, and a `fetched_at` within
/// `min_refresh_days` of `today` (§4.3 "freshness cache").
fn is_fresh(prev: &ContentRecord, event: &CanonicalEvent, today: NaiveDate, min_refresh_days: i64) -> bool {
    if !matches!(prev.status.as_str(), "ok" | "cached") {
        return false;
    }
    if prev.source_urls_sig != source_urls_sig(&event.source_urls) {
        return false;
    }
    if prev.raw_description.trim().is_empty() && prev.downloaded_images.is_empty() {
        return false;
    }
    match parse_fetched_at(&prev.fetched_at) {
        Some(fetched_at) => (today - fetched_at.date_naive()).num_days() < min_refresh_days,
        None => false,
    }
}

/// Reuses `prev` verbatim except for `status`, which becomes `cached` to
/// mark that no new network/model call produced this row (§4.3,
/// scenario S5).
fn reuse(prev: &ContentRecord) -> ContentRecord {
    ContentRecord {
        status: "cached".to_string(),
        ..prev.clone()
    }
}

/// Runs content enrichment over `events`, reusing `previous_records` per the
/// freshness cache and `failed_only` policy before touching the network.
///
/// # Errors
///
/// Returns [`tsugie_core::CoreError`] only for configuration problems (a
/// misconfigured polish backend); per-event fetch/polish failures are
/// recorded on that event's [`ContentRecord`] instead.
pub async fn run(
    events: &[CanonicalEvent],
    fused_run_id: &str,
    previous_records: &[ContentRecord],
    config: &ContentConfig,
    client: &reqwest::Client,
    today: NaiveDate,
) -> Result<ContentOutput, tsugie_core::CoreError> {
    let resolved_mode = config.polish_mode.resolve();
    let polisher = build_polisher(resolved_mode, config.codex_timeout_secs)?;

    let selected = order_indices(events, apply_date_filters(events, config, today), config, today);
    let previous_index = PreviousRecordIndex::build(previous_records);

    let mut fetch_limiter = RateLimiter::new(config.qps);
    let mut image_limiter = RateLimiter::new(config.qps);

    let mut output = ContentOutput {
        selected: selected.len(),
        ..Default::default()
    };

    for idx in selected {
        let event = &events[idx];
        let previous = previous_index.resolve(event, ContentRecord::selection_rank);

        if !config.force {
            if let Some(prev) = previous {
                if is_fresh(prev, event, today, config.min_refresh_days) {
                    output.records.push(reuse(prev));
                    output.reused_fresh += 1;
                    continue;
                }
                if config.failed_only && prev.is_good_success() {
                    output.records.push(reuse(prev));
                    output.reused_failed_only += 1;
                    continue;
                }
            }
        }

        let record = enrich_one(
            event,
            fused_run_id,
            resolved_mode,
            polisher.as_deref(),
            client,
            &mut fetch_limiter,
            &mut image_limiter,
            config,
        )
        .await;

        match record.status.as_str() {
            "ok" | "cached" => output.fetched_ok += 1,
            _ => output.fetched_failed += 1,
        }
        output.records.push(record);
    }

    Ok(output)
}

#[allow(clippy::too_many_arguments)]
async fn enrich_one(
    event: &CanonicalEvent,
    fused_run_id: &str,
    resolved_mode: PolishMode,
    polisher: Option<&dyn Polisher>,
    client: &reqwest::Client,
    fetch_limiter: &mut RateLimiter,
    image_limiter: &mut RateLimiter,
    config: &ContentConfig,
) -> ContentRecord {
    let mut record = ContentRecord {
        canonical_id: event.canonical_id.clone(),
        category: infer_category(&event.event_name).to_string(),
        event_name: event.event_name.clone(),
        event_date_start: event.event_date_start.clone(),
        event_date_end: event.event_date_end.clone(),
        fused_run_id: fused_run_id.to_string(),
        source_urls: event.source_urls.clone(),
        source_urls_sig: source_urls_sig(&event.source_urls),
        fetched_at: Utc::now().to_rfc3339(),
        polish_mode: polish_mode_label(resolved_mode).to_string(),
        ..Default::default()
    };

    if event.source_urls.is_empty() {
        record.status = "empty".to_string();
        record.error = "no source urls".to_string();
        return record;
    }

    let normalized_name = raw_normalize_name(&event.event_name);
    let mut raw_description = String::new();
    let mut description_source_url = String::new();
    let mut image_urls: Vec<String> = Vec::new();
    let mut last_error = String::new();
    let mut any_fetch_ok = false;

    for url in event.source_urls.iter().take(config.max_source_urls_per_event.max(1)) {
        match fetch_with_retries(client, fetch_limiter, url, MAX_FETCH_RETRIES).await {
            Ok(page) => {
                any_fetch_ok = true;
                if image_urls.is_empty() {
                    image_urls = collect_image_urls(&page.body, &page.final_url, url, config.max_images);
                }
                if raw_description.is_empty() {
                    let extracted = extract_description(&page.body, url, &normalized_name, config.max_description_chars);
                    if !extracted.raw_description.is_empty() {
                        raw_description = extracted.raw_description;
                        description_source_url = page.final_url.clone();
                    }
                }
                if !raw_description.is_empty() && !image_urls.is_empty() {
                    break;
                }
            }
            Err(e) => last_error = e,
        }
    }

    if !any_fetch_ok {
        record.status = "fetch_failed".to_string();
        record.error = last_error;
        return record;
    }

    record.raw_description.clone_from(&raw_description);
    record.description_source_url = description_source_url;
    record.image_urls.clone_from(&image_urls);

    if raw_description.is_empty() {
        record.status = "partial".to_string();
        return record;
    }

    let image_target_dir = config.image_dir.join(&event.canonical_id);
    match download_images(client, image_limiter, &image_urls, &image_target_dir, config.max_images, config.max_image_bytes).await {
        Ok(downloaded) => {
            record.downloaded_images = downloaded
                .into_iter()
                .map(|img| img.path.to_string_lossy().into_owned())
                .collect();
        }
        Err(e) => {
            log::warn!("image download failed for {}: {e}", event.canonical_id);
        }
    }

    match polisher {
        Some(p) => match p.polish(&raw_description, config.codex_single_pass_i18n).await {
            Ok(bundle) => {
                record.polished_description = bundle.description_ja;
                record.one_liner = bundle.one_liner_ja;
                record.polished_description_zh = bundle.description_zh;
                record.one_liner_zh = bundle.one_liner_zh;
                record.polished_description_en = bundle.description_en;
                record.one_liner_en = bundle.one_liner_en;
                record.polish_model = bundle.model;
                record.status = "ok".to_string();
                if bundle.i18n_incomplete {
                    log::warn!("polish_i18n_incomplete for {}", event.canonical_id);
                }
            }
            Err(e) => {
                record.polished_description.clone_from(&raw_description);
                record.one_liner = fallback_one_liner(&raw_description);
                record.status = e.status_label(p.backend_name());
                record.error = e.to_string();
            }
        },
        None => {
            record.polished_description = raw_description.clone();
            record.one_liner = fallback_one_liner(&raw_description);
            record.status = "ok".to_string();
        }
    }

    record
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(canonical_id: &str, date: &str) -> CanonicalEvent {
        CanonicalEvent {
            canonical_id: canonical_id.to_string(),
            event_name: "隅田川花火大会".to_string(),
            event_date_start: date.to_string(),
            source_urls: vec!["https://example.com/a".to_string()],
            ..Default::default()
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn is_fresh_requires_matching_signature_and_status() {
        let ev = event("E0001", "2026-07-01");
        let mut prev = ContentRecord {
            status: "ok".to_string(),
            source_urls_sig: source_urls_sig(&ev.source_urls),
            fetched_at: Utc::now().to_rfc3339(),
            raw_description: "隅田川花火大会は今年も開催予定".to_string(),
            ..Default::default()
        };
        assert!(is_fresh(&prev, &ev, date(2026, 7, 28), 45));

        prev.source_urls_sig = "stale".to_string();
        assert!(!is_fresh(&prev, &ev, date(2026, 7, 28), 45));
    }

    #[test]
    fn is_fresh_requires_description_or_image() {
        let ev = event("E0001", "2026-07-01");
        let prev = ContentRecord {
            status: "ok".to_string(),
            source_urls_sig: source_urls_sig(&ev.source_urls),
            fetched_at: Utc::now().to_rfc3339(),
            ..Default::default()
        };
        assert!(!is_fresh(&prev, &ev, date(2026, 7, 28), 45));
    }

    #[test]
    fn is_fresh_expires_after_min_refresh_days() {
        let ev = event("E0001", "2026-07-01");
        let old = Utc::now() - chrono::Duration::days(90);
        let prev = ContentRecord {
            status: "ok".to_string(),
            source_urls_sig: source_urls_sig(&ev.source_urls),
            fetched_at: old.to_rfc3339(),
            raw_description: "隅田川花火大会は今年も開催予定".to_string(),
            ..Default::default()
        };
        assert!(!is_fresh(&prev, &ev, date(2026, 7, 28), 45));
    }

    #[test]
    fn build_polisher_rejects_openai_without_api_key() {
        std::env::remove_var("OPENAI_API_KEY");
        let result = build_polisher(PolishMode::Openai, 120);
        assert!(result.is_err());
    }
}
