//! `enrich` subcommand (§4.3): description/image/polish enrichment over a
//! fused run's events.

use chrono::Utc;
use tsugie_content::csv_row::write_content_csv;
use tsugie_content::record::ContentRecord;
use tsugie_content::summary::ContentSummary;
use tsugie_core::config::{ContentConfig, FusionConfig};
use tsugie_core::summary::SummaryLine;
use tsugie_fusion::canonical::CanonicalEvent;

use crate::common::{mint_run_id, resolve_input_run_id, update_latest_run};

pub struct EnrichArgs {
    pub fused_run_id: Option<String>,
    pub run_id: Option<String>,
}

/// Enriches the resolved fused run's events and persists a new content run.
///
/// # Errors
///
/// Propagates configuration, fetch, and I/O failures, or an error if no
/// fused run can be resolved.
pub async fn run(args: EnrichArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = ContentConfig::from_env()?;
    let fusion_config = FusionConfig::from_env()?;

    let fused_run_id = resolve_input_run_id(args.fused_run_id, &fusion_config.fused_root)?;
    let events: Vec<CanonicalEvent> =
        tsugie_core::jsonl::read(&config.fused_dir.join(&fused_run_id).join("events_fused.jsonl"))?;

    let previous_records: Vec<ContentRecord> = match tsugie_core::run::LatestRun::read(&config.content_root) {
        Some(latest) => tsugie_core::jsonl::read(&config.content_root.join(&latest.run_id).join("events_content.jsonl"))?,
        None => Vec::new(),
    };

    let run_id = args.run_id.unwrap_or_else(mint_run_id);
    let run_dir = config.content_root.join(&run_id);
    let client = reqwest::Client::new();
    let today = Utc::now().date_naive();

    let output = tsugie_content::engine::run(&events, &fused_run_id, &previous_records, &config, &client, today).await?;

    tsugie_core::jsonl::write(&run_dir.join("events_content.jsonl"), &output.records)?;
    write_content_csv(&output.records, &run_dir.join("events_content.csv"))?;

    let summary = ContentSummary::build(&run_id, &fused_run_id, &output, &config, &Utc::now().to_rfc3339());
    std::fs::create_dir_all(&run_dir)?;
    std::fs::write(run_dir.join("content_summary.json"), serde_json::to_string_pretty(&summary)?)?;

    update_latest_run(&config.content_root, &run_id);

    println!(
        "{}",
        SummaryLine::new("enrich")
            .field("run_id", &run_id)
            .field("fused_run_id", &fused_run_id)
            .field("selected", output.selected)
            .field("reused_fresh", output.reused_fresh)
            .field("reused_failed_only", output.reused_failed_only)
            .field("fetched_ok", output.fetched_ok)
            .field("fetched_failed", output.fetched_failed)
    );

    Ok(())
}
