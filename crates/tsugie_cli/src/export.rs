//! `export` subcommand (§4.5): joins fused+content+score into the
//! obfuscated spatial bundle the mobile client consumes.

use tsugie_content::record::ContentRecord;
use tsugie_core::config::{ContentConfig, ExportConfig, FusionConfig, ScoreConfig};
use tsugie_core::summary::SummaryLine;
use tsugie_fusion::canonical::CanonicalEvent;
use tsugie_score::record::ScoreRecord;

use crate::common::{resolve_input_run_id, update_latest_run};

pub struct ExportArgs {
    pub fused_run_id: Option<String>,
    pub content_run_id: Option<String>,
    pub score_run_id: Option<String>,
    pub dry_run: bool,
}

/// Joins the resolved fused/content/score runs and writes the export
/// bundle (`he_places.index.json`, `he_places.payload.bin`,
/// `he_images.payload.bin`) unless `--dry-run` is set.
///
/// # Errors
///
/// Returns [`tsugie_export::ExportError::SelfCheckFailed`] if an
/// obfuscated chunk fails its round-trip check, or propagates
/// configuration/I/O failures.
pub async fn run(args: ExportArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = ExportConfig::from_env()?;
    if args.dry_run {
        config.dry_run = true;
    }

    let fusion_config = FusionConfig::from_env()?;
    let content_config = ContentConfig::from_env()?;
    let score_config = ScoreConfig::from_env()?;

    let fused_run_id = resolve_input_run_id(args.fused_run_id, &fusion_config.fused_root)?;
    let events: Vec<CanonicalEvent> =
        tsugie_core::jsonl::read(&config.fused_dir.join(&fused_run_id).join("events_fused.jsonl"))?;

    let content_run_id = args.content_run_id.or_else(|| {
        tsugie_core::run::LatestRun::read(&content_config.content_root).map(|latest| latest.run_id)
    });
    let content_records: Vec<ContentRecord> = match &content_run_id {
        Some(id) => tsugie_core::jsonl::read(&config.content_dir.join(id).join("events_content.jsonl"))?,
        None => Vec::new(),
    };

    let score_run_id = args.score_run_id.or_else(|| {
        tsugie_core::run::LatestRun::read(&score_config.score_root).map(|latest| latest.run_id)
    });
    let score_records: Vec<ScoreRecord> = match &score_run_id {
        Some(id) => tsugie_core::jsonl::read(&config.score_dir.join(id).join("events_score.jsonl"))?,
        None => Vec::new(),
    };

    let content_run_id = content_run_id.unwrap_or_default();
    let score_run_id = score_run_id.unwrap_or_default();

    let output = tsugie_export::engine::run(
        &events,
        &content_records,
        &score_records,
        &fused_run_id,
        &content_run_id,
        &score_run_id,
        &config,
        std::path::Path::new("."),
    )?;

    if !config.dry_run {
        std::fs::create_dir_all(&config.out_dir)?;
        let index_json = if config.pretty_index {
            serde_json::to_string_pretty(&output.index)?
        } else {
            serde_json::to_string(&output.index)?
        };
        std::fs::write(config.out_dir.join("he_places.index.json"), index_json)?;
        std::fs::write(config.out_dir.join("he_places.payload.bin"), &output.spatial_payload)?;
        std::fs::write(config.out_dir.join("he_images.payload.bin"), &output.image_payload)?;
        update_latest_run(&config.out_dir, &format!("{fused_run_id}+{content_run_id}+{score_run_id}"));
    }

    println!(
        "{}",
        SummaryLine::new("export")
            .field("fused_run_id", &fused_run_id)
            .field("content_run_id", &content_run_id)
            .field("score_run_id", &score_run_id)
            .field("records", output.index.record_counts.total)
            .field("buckets", output.index.payload_buckets.len())
            .field("dry_run", config.dry_run)
    );

    Ok(())
}
