//! Scoring orchestration (§4.4): heuristic fallback plus an optional
//! remote AI pass, reusing previous scores where allowed.

use std::collections::HashMap;
use std::sync::LazyLock;

use chrono::{NaiveDate, Utc};
use regex::Regex;
use tsugie_core::config::ScoreConfig;
use tsugie_core::ratelimit::RateLimiter;
use tsugie_core::resolver::PreviousRecordIndex;
use tsugie_fusion::canonical::CanonicalEvent;

use crate::heuristic::{compute, fallback_reason};
use crate::input::ScoreInput;
use crate::record::{ScoreRecord, ScoreSource};
use crate::remote::RemoteScorer;

const OPENAI_MODEL: &str = "gpt-4.1-mini";

static ISO_DATE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d{4})-(\d{2})-(\d{2})").unwrap());

/// The per-event context the content stage contributes to scoring: its
/// derived category and Japanese description/one-liner.
#[derive(Debug, Clone, Default)]
pub struct ContentContext {
    pub category: String,
    pub description_jp: String,
    pub one_liner_jp: String,
}

/// Everything produced by one scoring run.
#[derive(Debug, Default)]
pub struct ScoreOutput {
    pub records: Vec<ScoreRecord>,
    pub reused_failed_only: usize,
    pub reused_input_hash: usize,
    pub ai_scored: usize,
    pub fallback_scored: usize,
}

fn days_since_start(event_date_start: &str, today: NaiveDate) -> Option<i64> {
    let caps = ISO_DATE.captures(event_date_start)?;
    let date = NaiveDate::from_ymd_opt(caps[1].parse().ok()?, caps[2].parse().ok()?, caps[3].parse().ok()?)?;
    Some((today - date).num_days())
}

/// Orders events by `|days-to-start|`, unknown-date rows last (§4.4).
fn order_for_prioritize_near_start(events: &[CanonicalEvent], today: NaiveDate) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..events.len()).collect();
    indices.sort_by_key(|&i| match days_since_start(&events[i].event_date_start, today) {
        Some(days) => (0u8, days.abs(), i),
        None => (1u8, i64::MAX, i),
    });
    indices
}

/// Runs scoring over `events`, reusing `previous_records` per §4.4's
/// policy and falling back to the deterministic heuristic whenever no API
/// key is configured, the remote call fails, or the `max_events` budget is
/// exhausted.
///
/// # Errors
///
/// Returns [`tsugie_core::CoreError`] only for configuration problems;
/// per-event scoring failures fall back to the heuristic instead of
/// propagating.
pub async fn run(
    events: &[CanonicalEvent],
    content_by_id: &HashMap<String, ContentContext>,
    previous_records: &[ScoreRecord],
    config: &ScoreConfig,
    today: NaiveDate,
) -> Result<ScoreOutput, tsugie_core::CoreError> {
    let api_key = std::env::var(&config.api_key_env).ok().filter(|k| !k.is_empty());
    let scorer = api_key.map(|key| RemoteScorer::new(key, OPENAI_MODEL.to_string()));

    let previous_index = PreviousRecordIndex::build(previous_records);
    let mut limiter = RateLimiter::new(config.qps);

    let order = if config.prioritize_near_start {
        order_for_prioritize_near_start(events, today)
    } else {
        (0..events.len()).collect()
    };

    let mut output = ScoreOutput::default();
    let mut calls_made = 0usize;
    let empty_context = ContentContext::default();

    for idx in order {
        let event = &events[idx];
        let context = content_by_id.get(&event.canonical_id).unwrap_or(&empty_context);
        let input = ScoreInput::build(event, &context.category, &context.description_jp, &context.one_liner_jp);
        let input_hash = input.input_hash();

        let previous = previous_index.resolve(event, ScoreRecord::selection_rank);

        if config.failed_only
            && let Some(prev) = previous
            && prev.is_ok()
        {
            output.records.push(reuse(prev));
            output.reused_failed_only += 1;
            continue;
        }

        if let Some(prev) = previous
            && matches!(prev.status.as_str(), "ok" | "cached")
            && prev.input_hash == input_hash
        {
            output.records.push(reuse(prev));
            output.reused_input_hash += 1;
            continue;
        }

        let budget_exhausted = config.max_events.is_some_and(|max| calls_made >= max);

        let record = if budget_exhausted {
            fallback_record(event, &context.category, &input_hash, "fallback_max_events", "")
        } else if let Some(scorer) = &scorer {
            limiter.wait_async().await;
            calls_made += 1;
            match scorer.score(&input).await {
                Ok(scored) => ScoreRecord {
                    canonical_id: event.canonical_id.clone(),
                    event_name: event.event_name.clone(),
                    event_date_start: event.event_date_start.clone(),
                    source_urls: event.source_urls.clone(),
                    initial_heat_score: scored.initial_heat_score,
                    surprise_score: scored.surprise_score,
                    reason: scored.reason,
                    status: "ok".to_string(),
                    score_source: ScoreSource::Ai,
                    score_provider: "openai".to_string(),
                    score_model: OPENAI_MODEL.to_string(),
                    input_hash: input_hash.clone(),
                    error: String::new(),
                    generated_at: Utc::now().to_rfc3339(),
                },
                Err(e) => {
                    log::warn!("remote scoring failed for {}: {e}", event.canonical_id);
                    fallback_record(event, &context.category, &input_hash, "fallback_ai_error", &e.to_string())
                }
            }
        } else {
            fallback_record(event, &context.category, &input_hash, "fallback_no_api_key", "")
        };

        match record.score_source {
            ScoreSource::Ai => output.ai_scored += 1,
            ScoreSource::Fallback => output.fallback_scored += 1,
        }
        output.records.push(record);
    }

    Ok(output)
}

/// Reuses `prev` verbatim except for `status`, which becomes `cached` to
/// mark that no new network/model call produced this row.
fn reuse(prev: &ScoreRecord) -> ScoreRecord {
    ScoreRecord {
        status: "cached".to_string(),
        ..prev.clone()
    }
}

fn fallback_record(event: &CanonicalEvent, category: &str, input_hash: &str, status: &str, error: &str) -> ScoreRecord {
    let scores = compute(event.source_count, category, &event.launch_count);
    ScoreRecord {
        canonical_id: event.canonical_id.clone(),
        event_name: event.event_name.clone(),
        event_date_start: event.event_date_start.clone(),
        source_urls: event.source_urls.clone(),
        initial_heat_score: scores.heat_score,
        surprise_score: scores.surprise_score,
        reason: fallback_reason(category, event.source_count),
        status: status.to_string(),
        score_source: ScoreSource::Fallback,
        score_provider: String::new(),
        score_model: String::new(),
        input_hash: input_hash.to_string(),
        error: error.to_string(),
        generated_at: Utc::now().to_rfc3339(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prioritize_near_start_orders_by_absolute_distance() {
        let today = NaiveDate::from_ymd_opt(2026, 7, 28).unwrap();
        let mut far = CanonicalEvent::default();
        far.canonical_id = "far".to_string();
        far.event_date_start = "2026-12-01".to_string();
        let mut near = CanonicalEvent::default();
        near.canonical_id = "near".to_string();
        near.event_date_start = "2026-07-30".to_string();
        let mut unknown = CanonicalEvent::default();
        unknown.canonical_id = "unknown".to_string();

        let events = vec![far, near, unknown];
        let order = order_for_prioritize_near_start(&events, today);
        assert_eq!(order, vec![1, 0, 2]);
    }

    #[test]
    fn fallback_record_carries_heuristic_scores() {
        let mut event = CanonicalEvent::default();
        event.canonical_id = "E0001".to_string();
        event.source_count = 2;
        let record = fallback_record(&event, "hanabi", "hash", "fallback_no_api_key", "");
        assert_eq!(record.score_source, ScoreSource::Fallback);
        assert!((20..=95).contains(&record.initial_heat_score));
    }
}
