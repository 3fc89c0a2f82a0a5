//! `score` subcommand (§4.4): heuristic/remote scoring over a fused run's
//! events, joined against a content run for category/description context.

use std::collections::HashMap;

use chrono::Utc;
use tsugie_core::config::{ContentConfig, FusionConfig, ScoreConfig};
use tsugie_core::summary::SummaryLine;
use tsugie_fusion::canonical::CanonicalEvent;
use tsugie_score::csv_row::write_score_csv;
use tsugie_score::engine::ContentContext;
use tsugie_score::record::ScoreRecord;

use crate::common::{mint_run_id, resolve_input_run_id, update_latest_run};

pub struct ScoreArgs {
    pub fused_run_id: Option<String>,
    pub content_run_id: Option<String>,
    pub run_id: Option<String>,
}

/// Scores the resolved fused run's events and persists a new score run.
///
/// # Errors
///
/// Propagates configuration and I/O failures, or an error if no fused
/// run can be resolved.
pub async fn run(args: ScoreArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = ScoreConfig::from_env()?;
    let fusion_config = FusionConfig::from_env()?;
    let content_config = ContentConfig::from_env()?;

    let fused_run_id = resolve_input_run_id(args.fused_run_id, &fusion_config.fused_root)?;
    let events: Vec<CanonicalEvent> =
        tsugie_core::jsonl::read(&config.fused_dir.join(&fused_run_id).join("events_fused.jsonl"))?;

    let content_run_id = args.content_run_id.or_else(|| {
        tsugie_core::run::LatestRun::read(&content_config.content_root).map(|latest| latest.run_id)
    });
    let content_by_id: HashMap<String, ContentContext> = match content_run_id {
        Some(id) => {
            let records: Vec<tsugie_content::record::ContentRecord> =
                tsugie_core::jsonl::read(&content_config.content_root.join(&id).join("events_content.jsonl"))?;
            records
                .into_iter()
                .map(|r| {
                    (
                        r.canonical_id.clone(),
                        ContentContext {
                            category: r.category,
                            description_jp: r.polished_description,
                            one_liner_jp: r.one_liner,
                        },
                    )
                })
                .collect()
        }
        None => HashMap::new(),
    };

    let previous_records: Vec<ScoreRecord> = match tsugie_core::run::LatestRun::read(&config.score_root) {
        Some(latest) => tsugie_core::jsonl::read(&config.score_root.join(&latest.run_id).join("events_score.jsonl"))?,
        None => Vec::new(),
    };

    let run_id = args.run_id.unwrap_or_else(mint_run_id);
    let run_dir = config.score_root.join(&run_id);
    let today = Utc::now().date_naive();

    let output = tsugie_score::engine::run(&events, &content_by_id, &previous_records, &config, today).await?;

    tsugie_core::jsonl::write(&run_dir.join("events_score.jsonl"), &output.records)?;
    write_score_csv(&output.records, &run_dir.join("events_score.csv"))?;

    update_latest_run(&config.score_root, &run_id);

    println!(
        "{}",
        SummaryLine::new("score")
            .field("run_id", &run_id)
            .field("fused_run_id", &fused_run_id)
            .field("ai_scored", output.ai_scored)
            .field("fallback_scored", output.fallback_scored)
            .field("reused_failed_only", output.reused_failed_only)
            .field("reused_input_hash", output.reused_input_hash)
    );

    Ok(())
}
